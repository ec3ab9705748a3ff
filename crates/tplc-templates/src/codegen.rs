//! Syntax of the compiled artifacts.
//!
//! Artifacts are passthrough text with embedded `<?php ... ?>` segments. The
//! runtime that loads them exposes template variables under `$this->vars`,
//! configuration under `$this->config` and the escaping helper as
//! `$this->escape(value, context)`. Everything that knows about that runtime
//! lives here.

pub const OPEN: &str = "<?php ";
pub const CLOSE: &str = " ?>";

/// Root of the template variable namespace.
pub const NAMESPACE: &str = "$this->vars";
/// Root of the configuration namespace (`#name#` lookups).
pub const CONFIG: &str = "$this->config";
/// The transient slot a filter chain operates on.
pub const FILTER_SLOT: &str = "$filter_var";
/// Stand-in for an operator used where operators are not allowed.
pub const EMPTY: &str = "null";

/// `base->name`
#[must_use]
pub fn property(base: &str, name: &str) -> String {
    format!("{base}->{name}")
}

#[must_use]
pub fn config(name: &str) -> String {
    property(CONFIG, name)
}

/// Wrap `expr` in the runtime escape call. The second argument only feeds
/// the runtime's diagnostics.
#[must_use]
pub fn escape(expr: &str, raw: &str, requested: &str, line: usize) -> String {
    let context = format!("Found in {{{{{raw}}}}} for {requested} / {line}.");
    format!("$this->escape({expr}, {})", string_literal(&context))
}

/// A single-quoted string literal.
#[must_use]
pub fn string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        if matches!(ch, '\'' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}

/// A complete code segment.
#[must_use]
pub fn code(statements: &str) -> String {
    format!("{OPEN}{statements}{CLOSE}")
}

#[must_use]
pub fn echo(expr: &str) -> String {
    code(&format!("echo {expr};"))
}

/// Emit an angle marker such as `<?xml` so it is printed rather than run.
#[must_use]
pub fn literal_marker(marker: &str) -> String {
    code(&format!("print {};", string_literal(marker)))
}

/// Name of the `n`th transient parameter slot within a session.
#[must_use]
pub fn slot_name(n: usize) -> String {
    format!("__tmp{n}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_literal_escapes() {
        assert_eq!(string_literal("it's"), r"'it\'s'");
        assert_eq!(string_literal(r"a\b"), r"'a\\b'");
    }

    #[test]
    fn test_escape_wrapper() {
        assert_eq!(
            escape("$this->vars->name", "name", "page.html", 4),
            "$this->escape($this->vars->name, 'Found in {{name}} for page.html / 4.')"
        );
    }

    #[test]
    fn test_literal_marker() {
        assert_eq!(literal_marker("<?xml"), "<?php print '<?xml'; ?>");
    }
}
