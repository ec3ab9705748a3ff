//! The pluggable tag and filter registries.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::context::Context;
use crate::error::CompileError;
use crate::tag::Tag;
use crate::variable::FilterCall;

/// Compiles one `{% name ... %}` occurrence.
pub trait TagHandler: Send + Sync {
    fn compile(&self, tag: &Tag, cx: &mut Context<'_>) -> Result<(), CompileError>;
}

impl<F> TagHandler for F
where
    F: Fn(&Tag, &mut Context<'_>) -> Result<(), CompileError> + Send + Sync,
{
    fn compile(&self, tag: &Tag, cx: &mut Context<'_>) -> Result<(), CompileError> {
        self(tag, cx)
    }
}

/// Emits the statements that apply one filter to the filter slot.
///
/// `position` is the 1-based index of the filter within its chain.
pub trait FilterHandler: Send + Sync {
    fn compile(
        &self,
        filter: &FilterCall,
        position: usize,
        cx: &mut Context<'_>,
    ) -> Result<(), CompileError>;
}

impl<F> FilterHandler for F
where
    F: Fn(&FilterCall, usize, &mut Context<'_>) -> Result<(), CompileError> + Send + Sync,
{
    fn compile(
        &self,
        filter: &FilterCall,
        position: usize,
        cx: &mut Context<'_>,
    ) -> Result<(), CompileError> {
        self(filter, position, cx)
    }
}

/// Tag and filter handlers keyed by name.
#[derive(Default)]
pub struct Library {
    tags: FxHashMap<String, Box<dyn TagHandler>>,
    filters: FxHashMap<String, Box<dyn FilterHandler>>,
}

impl Library {
    /// An empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard tags and filters.
    #[must_use]
    pub fn builtin() -> Self {
        let mut library = Self::new();
        crate::builtins::register(&mut library);
        library
    }

    /// Register (or replace) a tag handler.
    pub fn register_tag(
        &mut self,
        name: impl Into<String>,
        handler: impl TagHandler + 'static,
    ) -> &mut Self {
        self.tags.insert(name.into(), Box::new(handler));
        self
    }

    /// Register (or replace) a filter handler.
    pub fn register_filter(
        &mut self,
        name: impl Into<String>,
        handler: impl FilterHandler + 'static,
    ) -> &mut Self {
        self.filters.insert(name.into(), Box::new(handler));
        self
    }

    #[must_use]
    pub fn tag(&self, name: &str) -> Option<&dyn TagHandler> {
        self.tags.get(name).map(AsRef::as_ref)
    }

    #[must_use]
    pub fn filter(&self, name: &str) -> Option<&dyn FilterHandler> {
        self.filters.get(name).map(AsRef::as_ref)
    }
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.tags.keys().collect();
        tags.sort();
        let mut filters: Vec<_> = self.filters.keys().collect();
        filters.sort();
        f.debug_struct("Library")
            .field("tags", &tags)
            .field("filters", &filters)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names() {
        let library = Library::builtin();
        for tag in ["if", "endif", "for", "block", "extends", "literal", "comment"] {
            assert!(library.tag(tag).is_some(), "missing tag {tag}");
        }
        for filter in ["upper", "default", "truncate", "json"] {
            assert!(library.filter(filter).is_some(), "missing filter {filter}");
        }
        assert!(library.tag("safe").is_none());
        assert!(library.filter("safe").is_none());
    }

    fn now(_: &Tag, cx: &mut Context<'_>) -> Result<(), CompileError> {
        cx.write("<?php echo time(); ?>")
    }

    fn noop(_: &FilterCall, _: usize, _: &mut Context<'_>) -> Result<(), CompileError> {
        Ok(())
    }

    #[test]
    fn test_register_replaces() {
        let mut library = Library::new();
        assert!(library.tag("now").is_none());
        library.register_tag("now", now).register_filter("noop", noop);
        assert!(library.tag("now").is_some());
        assert!(library.filter("noop").is_some());
    }
}
