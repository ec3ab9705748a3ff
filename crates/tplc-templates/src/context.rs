use std::any::Any;
use std::sync::Arc;

use crate::error::CompileError;
use crate::error::CompileWarning;
use crate::error::Location;
use crate::hierarchy::HierarchyError;
use crate::options::CompileOptions;
use crate::registry::Library;
use crate::session::Session;
use crate::source::Source;

/// What a tag or filter handler sees: the running session and the source the
/// unit came from.
pub struct Context<'a> {
    session: &'a mut Session,
    source: &'a mut Source,
}

impl<'a> Context<'a> {
    pub fn new(session: &'a mut Session, source: &'a mut Source) -> Self {
        Self { session, source }
    }

    pub fn session(&mut self) -> &mut Session {
        self.session
    }

    pub fn source(&mut self) -> &mut Source {
        self.source
    }

    #[must_use]
    pub fn options(&self) -> &CompileOptions {
        self.session.options()
    }

    #[must_use]
    pub fn library(&self) -> Arc<Library> {
        Arc::clone(self.session.library())
    }

    #[must_use]
    pub fn current_tag(&self) -> Option<&str> {
        self.source.current_tag()
    }

    #[must_use]
    pub fn location(&self) -> Location {
        self.source.location()
    }

    /// Fan `content` out to every open destination.
    pub fn write(&mut self, content: &str) -> Result<(), CompileError> {
        self.session.write(content)
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        let warning = CompileWarning {
            message: message.into(),
            location: self.source.location(),
        };
        self.session.warn(warning);
    }

    /// A [`CompileError::Tag`] at the current position.
    #[must_use]
    pub fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::Tag {
            message: message.into(),
            location: self.location(),
        }
    }

    pub fn next_slot(&mut self) -> String {
        self.session.next_slot()
    }

    /// Open a paired tag.
    pub fn push<T: Any>(&mut self, tag: &str, data: T) {
        self.source.hierarchy_mut().push(tag, Box::new(data));
    }

    /// Close the innermost paired tag, which must have been opened by `tag`.
    pub fn pop<T: Any>(&mut self, tag: &str) -> Result<T, CompileError> {
        let data = self
            .source
            .hierarchy_mut()
            .pop(tag)
            .map_err(|err| self.hierarchy_error(tag, err, true))?;
        data.downcast::<T>()
            .map(|data| *data)
            .map_err(|_| self.error(format!("{tag} frame holds unexpected data")))
    }

    /// The data of the innermost paired tag, which must have been opened by
    /// `tag`. Used by intermediate tags such as `else`.
    pub fn peek<T: Any>(&mut self, tag: &str) -> Result<&mut T, CompileError> {
        let open = self.source.hierarchy().peek(tag).map(|_| ());
        if let Err(err) = open {
            return Err(self.hierarchy_error(tag, err, false));
        }
        let location = self.source.location();
        self.source
            .hierarchy_mut()
            .peek_mut(tag)
            .ok()
            .and_then(|data| data.downcast_mut::<T>())
            .ok_or_else(|| CompileError::Tag {
                message: format!("{tag} frame holds unexpected data"),
                location,
            })
    }

    fn hierarchy_error(&self, expected: &str, err: HierarchyError, closing: bool) -> CompileError {
        let found = self.current_tag().unwrap_or(expected).to_string();
        let location = self.location();
        match (err, closing) {
            (HierarchyError::Mismatch { open }, true) => CompileError::HierarchyMismatch {
                expected: open,
                found,
                location,
            },
            (HierarchyError::Empty, true) => CompileError::UnopenedTag { found, location },
            (_, false) => CompileError::NotNested {
                tag: found,
                expected: expected.to_string(),
                location,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;

    #[test]
    fn test_pop_returns_typed_data() {
        let mut harness = Harness::new();
        harness.with_context(Some("endblock"), |cx| {
            cx.push("block", "content".to_string());
            assert_eq!(cx.source().hierarchy().depth(), 1);
            let name: String = cx.pop("block").unwrap();
            assert_eq!(name, "content");
            assert_eq!(cx.source().hierarchy().depth(), 0);
        });
    }

    #[test]
    fn test_pop_mismatch() {
        let mut harness = Harness::new();
        harness.with_context(Some("endfor"), |cx| {
            cx.push("if", ());
            let err = cx.pop::<()>("for").unwrap_err();
            assert_eq!(
                err.to_string(),
                "expecting if and found endfor end tag (file: /site/app/view/page.html / line: 1)"
            );
        });
    }

    #[test]
    fn test_pop_without_open_tag() {
        let mut harness = Harness::new();
        harness.with_context(Some("endif"), |cx| {
            let err = cx.pop::<()>("if").unwrap_err();
            assert!(matches!(err, CompileError::UnopenedTag { ref found, .. } if found == "endif"));
        });
    }

    #[test]
    fn test_peek_outside_parent() {
        let mut harness = Harness::new();
        harness.with_context(Some("else"), |cx| {
            let err = cx.peek::<()>("if").unwrap_err();
            assert_eq!(err.code(), "C202");
            assert!(err.to_string().starts_with("the tag else has to be nested within if tags"));
        });
    }

    #[test]
    fn test_peek_allows_mutation() {
        let mut harness = Harness::new();
        harness.with_context(Some("empty"), |cx| {
            cx.push("for", false);
            *cx.peek::<bool>("for").unwrap() = true;
            assert!(cx.pop::<bool>("for").unwrap());
        });
    }

    #[test]
    fn test_warning_is_collected() {
        let mut harness = Harness::new();
        harness.with_context(None, |cx| cx.warning("careful"));
        assert_eq!(harness.warnings()[0].to_string(), "careful (file: /site/app/view/page.html / line: 1)");
    }
}
