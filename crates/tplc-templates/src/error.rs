use std::fmt;
use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;
use tplc_source::SafeJoinError;

/// Where in a template something happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub path: Utf8PathBuf,
    pub line: usize,
}

impl Location {
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>, line: usize) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file: {} / line: {}", self.path, self.line)
    }
}

/// A fatal compile error. Any of these aborts the whole session.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Raw executable code was found in a template that is being parsed.
    ///
    /// ```text
    /// <p><?php echo $secret; ?></p>
    /// ```
    #[error("cannot use raw code tags in template file: <?, <?php, or <% are all forbidden ({location})")]
    ForbiddenMarker { location: Location },

    /// A dotted path segment is neither an identifier, a permitted operator
    /// nor part of a number.
    #[error("invalid variable/operator found: {text} ({location})")]
    InvalidVariable { text: String, location: Location },

    #[error("unknown tag `{name}` ({location})")]
    UnknownTag { name: String, location: Location },

    #[error("unknown filter `{name}` ({location})")]
    UnknownFilter { name: String, location: Location },

    /// A legacy variable name relied on the implicit unescaped output while
    /// strict mode is on.
    #[error("deprecated: {{{{{name}}}}} is missing the |safe filter ({location})")]
    DeprecatedUnescaped { name: String, location: Location },

    /// A closing tag did not match the innermost open tag.
    #[error("expecting {expected} and found {found} end tag ({location})")]
    HierarchyMismatch {
        expected: String,
        found: String,
        location: Location,
    },

    #[error("found {found} end tag without an open tag ({location})")]
    UnopenedTag { found: String, location: Location },

    /// An intermediate tag (`else`, `empty`, ...) outside of its parent.
    #[error("the tag {tag} has to be nested within {expected} tags ({location})")]
    NotNested {
        tag: String,
        expected: String,
        location: Location,
    },

    #[error("template {path} is already being extended, inheritance is circular ({location})")]
    CircularExtends { path: String, location: Location },

    /// Raised by a tag handler for malformed usage.
    #[error("{message} ({location})")]
    Tag { message: String, location: Location },

    #[error("template file {path} could not be found{}", below_suffix(.below))]
    TemplateNotFound { path: String, below: Option<String> },

    #[error(transparent)]
    InvalidPath(#[from] SafeJoinError),

    #[error("could not open {path} for writing, does the cache folder have write permissions?")]
    DestinationOpen {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error on {path}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{pending} template source(s) are paused and nothing is left to resume them")]
    Stalled { pending: usize },
}

fn below_suffix(below: &Option<String>) -> String {
    match below {
        Some(level) => format!(" in app hierarchy levels below {level}"),
        None => " anywhere".to_string(),
    }
}

impl CompileError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::ForbiddenMarker { .. } => "C100",
            CompileError::InvalidVariable { .. } => "C101",
            CompileError::UnknownTag { .. } => "C102",
            CompileError::UnknownFilter { .. } => "C103",
            CompileError::DeprecatedUnescaped { .. } => "C104",
            CompileError::HierarchyMismatch { .. } => "C200",
            CompileError::UnopenedTag { .. } => "C201",
            CompileError::NotNested { .. } => "C202",
            CompileError::CircularExtends { .. } => "C203",
            CompileError::Tag { .. } => "C210",
            CompileError::TemplateNotFound { .. } => "C300",
            CompileError::InvalidPath(_) => "C301",
            CompileError::DestinationOpen { .. } => "C900",
            CompileError::Io { .. } => "C901",
            CompileError::Stalled { .. } => "C902",
        }
    }

    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        match self {
            CompileError::ForbiddenMarker { location }
            | CompileError::InvalidVariable { location, .. }
            | CompileError::UnknownTag { location, .. }
            | CompileError::UnknownFilter { location, .. }
            | CompileError::DeprecatedUnescaped { location, .. }
            | CompileError::HierarchyMismatch { location, .. }
            | CompileError::UnopenedTag { location, .. }
            | CompileError::NotNested { location, .. }
            | CompileError::CircularExtends { location, .. }
            | CompileError::Tag { location, .. } => Some(location),
            CompileError::TemplateNotFound { .. }
            | CompileError::InvalidPath(_)
            | CompileError::DestinationOpen { .. }
            | CompileError::Io { .. }
            | CompileError::Stalled { .. } => None,
        }
    }
}

/// A recoverable problem. Compilation carries on after logging it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileWarning {
    pub message: String,
    pub location: Location,
}

impl fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_location() {
        let err = CompileError::HierarchyMismatch {
            expected: "if".to_string(),
            found: "endfor".to_string(),
            location: Location::new("/site/app/view/a.html", 3),
        };
        assert_eq!(
            err.to_string(),
            "expecting if and found endfor end tag (file: /site/app/view/a.html / line: 3)"
        );
        assert_eq!(err.code(), "C200");
        assert_eq!(err.location().map(|l| l.line), Some(3));
    }

    #[test]
    fn test_not_found_messages() {
        let anywhere = CompileError::TemplateNotFound {
            path: "a.html".to_string(),
            below: None,
        };
        assert_eq!(
            anywhere.to_string(),
            "template file a.html could not be found anywhere"
        );

        let below = CompileError::TemplateNotFound {
            path: "a.html".to_string(),
            below: Some("local".to_string()),
        };
        assert_eq!(
            below.to_string(),
            "template file a.html could not be found in app hierarchy levels below local"
        );
    }

    #[test]
    fn test_deprecated_message_braces() {
        let err = CompileError::DeprecatedUnescaped {
            name: "ofw.js".to_string(),
            location: Location::new("a.html", 1),
        };
        assert_eq!(
            err.to_string(),
            "deprecated: {{ofw.js}} is missing the |safe filter (file: a.html / line: 1)"
        );
    }
}
