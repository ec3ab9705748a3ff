//! Splitting a tag's parameter text into individual parameters.
//!
//! A parameter is a quoted string, a comparison/assignment operator or a
//! dotted path, optionally followed by filters attached without spaces
//! (`a.b|default : 'x'|upper`).

/// Longest first, so `!==` is not read as `!=` followed by `=`.
pub(crate) const OPERATORS: &[&str] = &["!==", "===", "<=", ">=", "!=", "==", "=", ">", "<"];

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Params<'a> {
    pub tokens: Vec<&'a str>,
    /// Characters that fit no parameter shape and were dropped.
    pub skipped: Vec<char>,
}

pub(crate) fn is_path_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '#' | '-')
}

pub(crate) fn tokenize(text: &str) -> Params<'_> {
    let mut params = Params::default();
    let mut cursor = Cursor { text, pos: 0 };

    loop {
        cursor.skip_whitespace();
        let Some(ch) = cursor.peek() else {
            break;
        };
        let start = cursor.pos;

        if ch == '\'' || ch == '"' {
            cursor.quoted();
        } else if let Some(op) = OPERATORS.iter().find(|op| cursor.rest().starts_with(**op)) {
            cursor.pos += op.len();
            params.tokens.push(&text[start..cursor.pos]);
            continue;
        } else if is_path_char(ch) {
            cursor.path();
        } else {
            params.skipped.push(ch);
            cursor.pos += ch.len_utf8();
            continue;
        }

        cursor.filters();
        params.tokens.push(&text[start..cursor.pos]);
    }

    params
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl Cursor<'_> {
    fn rest(&self) -> &str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) {
        let rest = self.rest();
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
    }

    fn path(&mut self) {
        self.take_while(is_path_char);
    }

    /// Consume a quoted string. A runaway quote takes the rest of the text.
    fn quoted(&mut self) {
        let Some(quote) = self.peek() else {
            return;
        };
        self.pos += quote.len_utf8();
        match self.rest().find(quote) {
            Some(end) => self.pos += end + quote.len_utf8(),
            None => self.pos = self.text.len(),
        }
    }

    fn filters(&mut self) {
        while self.peek() == Some('|') {
            self.pos += 1;
            self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');

            let checkpoint = self.pos;
            self.skip_whitespace();
            if self.peek() != Some(':') {
                self.pos = checkpoint;
                continue;
            }
            self.pos += 1;
            self.skip_whitespace();
            match self.peek() {
                Some('\'' | '"') => self.quoted(),
                _ => self.path(),
            }
        }
    }
}
