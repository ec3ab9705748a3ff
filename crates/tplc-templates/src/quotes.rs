/// Find positions of a delimiter character in `s`, skipping occurrences inside
/// single- or double-quoted regions.
///
/// The callback receives the byte index of each unquoted delimiter found.
/// Return `true` from the callback to stop early.
pub(crate) fn for_each_unquoted(
    s: &str,
    delimiter: impl Fn(char) -> bool,
    mut cb: impl FnMut(usize) -> bool,
) {
    let mut quote: Option<char> = None;

    for (idx, ch) in s.char_indices() {
        match ch {
            '"' | '\'' if quote == Some(ch) => {
                quote = None;
            }
            '"' | '\'' if quote.is_none() => {
                quote = Some(ch);
            }
            _ if quote.is_some() => {}
            _ if delimiter(ch) => {
                if cb(idx) {
                    return;
                }
            }
            _ => {}
        }
    }
}

/// Split `s` on every unquoted `delimiter`.
pub(crate) fn split_unquoted(s: &str, delimiter: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;

    for_each_unquoted(
        s,
        |ch| ch == delimiter,
        |idx| {
            pieces.push(&s[start..idx]);
            start = idx + delimiter.len_utf8();
            false
        },
    );

    pieces.push(&s[start..]);
    pieces
}

/// Byte index of the first unquoted `delimiter`.
pub(crate) fn find_unquoted(s: &str, delimiter: char) -> Option<usize> {
    let mut found = None;
    for_each_unquoted(
        s,
        |ch| ch == delimiter,
        |idx| {
            found = Some(idx);
            true
        },
    );
    found
}

/// True when `s` is a complete single- or double-quoted literal.
pub(crate) fn is_quoted(s: &str) -> bool {
    s.len() >= 2
        && ((s.starts_with('\'') && s.ends_with('\'')) || (s.starts_with('"') && s.ends_with('"')))
}
