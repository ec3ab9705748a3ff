//! Line scanner for `{{ variable }}` and `{% tag %}` units.
//!
//! The scanner works on one buffered line at a time, as raw bytes: template
//! text is copied through untouched whatever its encoding, and only unit text
//! is decoded. A unit is an opener (`{{` or `{%`), optional spaces, a name
//! made of `[A-Za-z0-9'_#.]`, a parameter blob and a terminator. Terminators
//! inside quoted parameter text are ignored; a unit that reaches the end of
//! its line unterminated is still reported, flagged as [`Closer::LineEnd`],
//! so the caller can warn about it.

use std::borrow::Cow;

use memchr::memchr;
use memchr::memmem;

use crate::codegen;

const BLOCK_TAG_START: &[u8] = b"{%";
const BLOCK_TAG_END: &[u8] = b"%}";
const VARIABLE_TAG_END: &[u8] = b"}}";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitKind {
    Tag,
    Variable,
}

/// How a unit ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Closer {
    /// `%}`
    Tag,
    /// `}}`
    Variable,
    /// The line (or buffer) ran out first.
    LineEnd,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unit<'a> {
    /// Byte offset of the opener.
    pub start: usize,
    /// Byte offset just past the terminator. For [`Closer::LineEnd`] the
    /// line break itself is not part of the unit.
    pub end: usize,
    pub opener: UnitKind,
    pub closer: Closer,
    pub name: &'a str,
    /// Parameter text after the name, trimmed.
    pub params: Cow<'a, str>,
    /// Everything between the delimiters, trimmed: `name|upper` for
    /// `{{ name|upper }}`.
    pub content: Cow<'a, str>,
}

impl Unit<'_> {
    /// The terminator decides what a unit is; an unterminated unit keeps the
    /// kind its opener promised.
    #[must_use]
    pub fn kind(&self) -> UnitKind {
        match self.closer {
            Closer::Tag => UnitKind::Tag,
            Closer::Variable => UnitKind::Variable,
            Closer::LineEnd => self.opener,
        }
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.closer != Closer::LineEnd
    }
}

pub struct Scanner<'a> {
    line: &'a [u8],
    current: usize,
}

impl<'a> Scanner<'a> {
    #[must_use]
    pub fn new(line: &'a [u8]) -> Self {
        Self { line, current: 0 }
    }

    /// The first unit on `line`.
    #[must_use]
    pub fn first(line: &'a [u8]) -> Option<Unit<'a>> {
        Self::new(line).next_unit()
    }

    /// The first `{% marker %}` on `line`.
    ///
    /// Nothing else on the line is lexed: text waiting for its marker is
    /// foreign markup, and its quotes and braces mean nothing here.
    #[must_use]
    pub fn find_marker(line: &'a [u8], marker: &str) -> Option<Unit<'a>> {
        memmem::find_iter(line, BLOCK_TAG_START).find_map(|start| {
            let mut pos = skip_spaces(line, start + BLOCK_TAG_START.len());
            let name_start = pos;
            if !line[pos..].starts_with(marker.as_bytes()) {
                return None;
            }
            pos += marker.len();
            if line.get(pos).copied().is_some_and(is_name_byte) {
                return None;
            }
            let name_end = pos;
            pos = skip_spaces(line, pos);
            if !line[pos..].starts_with(BLOCK_TAG_END) {
                return None;
            }

            let name = std::str::from_utf8(&line[name_start..name_end]).ok()?;
            Some(Unit {
                start,
                end: pos + BLOCK_TAG_END.len(),
                opener: UnitKind::Tag,
                closer: Closer::Tag,
                name,
                params: Cow::Borrowed(""),
                content: Cow::Borrowed(name),
            })
        })
    }

    pub fn next_unit(&mut self) -> Option<Unit<'a>> {
        let bytes = self.line;

        while self.current < bytes.len() {
            let brace = self.current + memchr(b'{', &bytes[self.current..])?;
            let opener = match bytes.get(brace + 1) {
                Some(b'%') => Some(UnitKind::Tag),
                Some(b'{') => Some(UnitKind::Variable),
                _ => None,
            };

            if let Some(opener) = opener {
                if let Some(unit) = self.lex_unit(brace, opener) {
                    self.current = unit.end;
                    return Some(unit);
                }
            }

            self.current = brace + 1;
        }

        None
    }

    fn lex_unit(&self, start: usize, opener: UnitKind) -> Option<Unit<'a>> {
        let bytes = self.line;
        let mut pos = skip_spaces(bytes, start + 2);

        let name_start = pos;
        while bytes.get(pos).copied().is_some_and(is_name_byte) {
            pos += 1;
        }
        if pos == name_start {
            return None;
        }
        let name_end = pos;
        let name = std::str::from_utf8(&bytes[name_start..name_end]).ok()?;

        // a quote opened inside the name (`{{'a b'}}`) carries into the params
        let mut quote = (name.matches('\'').count() % 2 == 1).then_some(b'\'');

        // delimiters and quotes are ASCII, so stepping over bytes never
        // splits a match inside a multi-byte character
        let (params_end, end, closer) = loop {
            let rest = &bytes[pos..];
            let Some(&b) = rest.first() else {
                break (pos, pos, Closer::LineEnd);
            };

            if b == b'\n' || rest.starts_with(b"\r\n") {
                break (pos, pos, Closer::LineEnd);
            }

            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None if b == b'\'' || b == b'"' => quote = Some(b),
                None if rest.starts_with(BLOCK_TAG_END) => {
                    break (pos, pos + BLOCK_TAG_END.len(), Closer::Tag);
                }
                None if rest.starts_with(VARIABLE_TAG_END) => {
                    break (pos, pos + VARIABLE_TAG_END.len(), Closer::Variable);
                }
                None => {}
            }

            pos += 1;
        };

        Some(Unit {
            start,
            end,
            opener,
            closer,
            name,
            params: String::from_utf8_lossy(bytes[name_end..params_end].trim_ascii()),
            content: String::from_utf8_lossy(bytes[name_start..params_end].trim_ascii_end()),
        })
    }
}

fn skip_spaces(bytes: &[u8], mut pos: usize) -> usize {
    while bytes.get(pos) == Some(&b' ') {
        pos += 1;
    }
    pos
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'\'' | b'_' | b'#' | b'.')
}

/// A raw code opener was found at this byte offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForbiddenMarker(pub usize);

/// Reject executable `<?php`, `<? `, `<% ` style openers and rewrite every
/// other `<?name` / `<%name` marker so it is printed verbatim.
///
/// Returns the line unchanged (borrowed) when there is nothing to do.
pub fn sanitize(line: &[u8]) -> Result<Cow<'_, [u8]>, ForbiddenMarker> {
    let mut out: Option<Vec<u8>> = None;
    let mut copied = 0;
    let mut pos = 0;

    while let Some(found) = memchr(b'<', &line[pos..]) {
        let lt = pos + found;
        if !matches!(line.get(lt + 1), Some(b'?' | b'%')) {
            pos = lt + 1;
            continue;
        }

        let after = &line[lt + 2..];
        if after.starts_with(b"php") || after.starts_with(b" ") || after.starts_with(b"\n") {
            return Err(ForbiddenMarker(lt));
        }

        let letters = after.iter().take_while(|b| b.is_ascii_alphabetic()).count();
        let marker_end = lt + 2 + letters;
        // ASCII by construction
        let marker = String::from_utf8_lossy(&line[lt..marker_end]);

        let buf = out.get_or_insert_with(|| Vec::with_capacity(line.len() + 32));
        buf.extend_from_slice(&line[copied..lt]);
        buf.extend_from_slice(codegen::literal_marker(&marker).as_bytes());
        copied = marker_end;
        pos = marker_end;
    }

    Ok(match out {
        Some(mut buf) => {
            buf.extend_from_slice(&line[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(line),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_has_no_units() {
        assert_eq!(Scanner::first(b"<div class=\"x\">hello</div>\n"), None);
        assert_eq!(Scanner::first(b"function() { return {a: 1}; }\n"), None);
    }

    #[test]
    fn test_variable() {
        let line = b"Hello {{ name|upper }}!\n";
        let unit = Scanner::first(line).unwrap();
        assert_eq!(unit.kind(), UnitKind::Variable);
        assert_eq!(unit.name, "name");
        assert_eq!(unit.params, "|upper");
        assert_eq!(unit.content, "name|upper");
        assert_eq!(&line[..unit.start], b"Hello ");
        assert_eq!(&line[unit.end..], b"!\n");
    }

    #[test]
    fn test_tag() {
        let line = b"{% if a.count > 0 %}yes{% endif %}";
        let mut scanner = Scanner::new(line);

        let first = scanner.next_unit().unwrap();
        assert_eq!(first.kind(), UnitKind::Tag);
        assert_eq!(first.name, "if");
        assert_eq!(first.params, "a.count > 0");

        let second = scanner.next_unit().unwrap();
        assert_eq!(second.name, "endif");
        assert_eq!(second.params, "");
        assert_eq!(&line[first.end..second.start], b"yes");
        assert_eq!(scanner.next_unit(), None);
    }

    #[test]
    fn test_non_utf8_text_around_units() {
        let line = b"caf\xe9 {{ name }} \xff\n";
        let unit = Scanner::first(line).unwrap();
        assert_eq!(unit.name, "name");
        assert_eq!(&line[..unit.start], b"caf\xe9 ");
        assert_eq!(&line[unit.end..], b" \xff\n");
    }

    #[test]
    fn test_multibyte_parameters_are_kept() {
        let unit = Scanner::first("{{ x|default:'été' }}".as_bytes()).unwrap();
        assert_eq!(unit.params, "|default:'été'");
    }

    #[test]
    fn test_terminator_inside_quotes_is_ignored() {
        let unit = Scanner::first(b"{{ x|default:'%} or }}' }}").unwrap();
        assert_eq!(unit.closer, Closer::Variable);
        assert_eq!(unit.params, "|default:'%} or }}'");
    }

    #[test]
    fn test_quoted_name_carries_quote_state() {
        let unit = Scanner::first(b"{{'a }} b'}}").unwrap();
        assert_eq!(unit.content, "'a }} b'");
    }

    #[test]
    fn test_runaway_quote_ends_at_line_break() {
        let line = b"{% include 'oops %}\nnext";
        let unit = Scanner::first(line).unwrap();
        assert_eq!(unit.closer, Closer::LineEnd);
        assert_eq!(unit.kind(), UnitKind::Tag);
        assert_eq!(&line[unit.end..], b"\nnext");
    }

    #[test]
    fn test_unterminated_keeps_opener_kind() {
        let unit = Scanner::first(b"{{ name\n").unwrap();
        assert_eq!(unit.closer, Closer::LineEnd);
        assert_eq!(unit.kind(), UnitKind::Variable);
        assert_eq!(unit.content, "name");
        assert!(!unit.is_terminated());

        let unit = Scanner::first(b"{% block body").unwrap();
        assert_eq!(unit.kind(), UnitKind::Tag);
        assert_eq!(unit.params, "body");
    }

    #[test]
    fn test_closer_decides_kind() {
        let unit = Scanner::first(b"{% name }}").unwrap();
        assert_eq!(unit.opener, UnitKind::Tag);
        assert_eq!(unit.kind(), UnitKind::Variable);
    }

    #[test]
    fn test_opener_without_name_is_text() {
        assert_eq!(Scanner::first(b"{{ }}"), None);
        assert_eq!(Scanner::first(b"{%%}"), None);
        let unit = Scanner::first(b"{{ {{ a }} }}").unwrap();
        assert_eq!(unit.start, 3);
        assert_eq!(unit.name, "a");
    }

    #[test]
    fn test_config_and_literal_names() {
        assert_eq!(Scanner::first(b"{{#site_name#}}").unwrap().name, "#site_name#");
        assert_eq!(Scanner::first(b"{{ a.b.c }}").unwrap().name, "a.b.c");
    }

    #[test]
    fn test_find_marker_skips_other_units() {
        let line = b"{{ raw }} {% if %} {% endliteral %} tail";
        let unit = Scanner::find_marker(line, "endliteral").unwrap();
        assert_eq!(&line[..unit.start], b"{{ raw }} {% if %} ");
        assert_eq!(&line[unit.end..], b" tail");
        assert_eq!(unit.name, "endliteral");
        assert_eq!(Scanner::find_marker(b"{{ endliteral }}", "endliteral"), None);
    }

    #[test]
    fn test_find_marker_ignores_quotes_in_foreign_markup() {
        let line = b"<p>{{ user's name }}</p>{%endliteral%}\n";
        let unit = Scanner::find_marker(line, "endliteral").unwrap();
        assert_eq!(&line[..unit.start], b"<p>{{ user's name }}</p>");
        assert_eq!(&line[unit.end..], b"\n");
    }

    #[test]
    fn test_find_marker_needs_the_whole_name() {
        assert_eq!(Scanner::find_marker(b"{% endliterals %}", "endliteral"), None);
        assert_eq!(Scanner::find_marker(b"{% endliteral x %}", "endliteral"), None);
        assert_eq!(Scanner::find_marker(b"{% endliteral", "endliteral"), None);
    }

    #[test]
    fn test_sanitize_passes_plain_lines_through() {
        assert!(matches!(sanitize(b"<p>1 < 2</p>"), Ok(Cow::Borrowed(_))));
        assert!(matches!(sanitize(b"caf\xe9 <\xff"), Ok(Cow::Borrowed(_))));
    }

    #[test]
    fn test_sanitize_rejects_executable_markers() {
        assert_eq!(sanitize(b"a <?php echo 1; ?>"), Err(ForbiddenMarker(2)));
        assert!(sanitize(b"<? echo 1; ?>").is_err());
        assert!(sanitize(b"<?\n").is_err());
        assert!(sanitize(b"<% x %>").is_err());
    }

    #[test]
    fn test_sanitize_rewrites_other_markers() {
        assert_eq!(
            sanitize(b"<?xml version=\"1.0\"?>\n").unwrap().as_ref(),
            b"<?php print '<?xml'; ?> version=\"1.0\"?>\n"
        );
        assert_eq!(sanitize(b"<?=").unwrap().as_ref(), b"<?php print '<?'; ?>=");
    }
}
