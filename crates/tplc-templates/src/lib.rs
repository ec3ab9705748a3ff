//! Template compiler.
//!
//! Templates are text files with `{{ variable|filter }}` interpolations and
//! `{% tag %}` control tags. Compiling one produces an artifact: the
//! template's text with every unit replaced by a `<?php ... ?>` segment,
//! written to the artifact cache for a runtime to execute later.
//!
//! ## Pipeline
//!
//! 1. A [`Session`] queues the requested template as a [`Source`] and opens
//!    the main [`Destination`].
//! 2. Each source is read line by line. The [`scanner`] finds the next unit;
//!    text before it goes straight to the destinations.
//! 3. Variables are resolved and emitted by [`Variable`]; tags are parsed by
//!    [`Tag`] and dispatched to the [`TagHandler`] registered in the
//!    [`Library`] under their name.
//! 4. Paired tags track their nesting through the source's [`Hierarchy`].
//!    Inheritance (`extends`/`block`) queues more sources and opens
//!    temporary destinations while the queue drains.
//! 5. Once the queue is empty, destinations are closed and temporary
//!    artifacts deleted.
//!
//! ## Example
//!
//! ```ignore
//! use tplc_conf::Settings;
//! use tplc_templates::Compiler;
//!
//! let settings = Settings::new(project_root)?;
//! let compiler = Compiler::new(&settings, project_root);
//! let report = compiler.compile("shop/list.html")?;
//! println!("{}", report.artifact);
//! ```

mod builtins;
mod cache;
pub mod codegen;
mod compiler;
mod context;
mod destination;
pub mod element;
mod error;
mod hierarchy;
mod options;
mod params;
mod quotes;
mod registry;
pub mod scanner;
mod session;
mod source;
mod tag;
#[cfg(test)]
mod testing;
mod variable;

pub use cache::ArtifactCache;
pub use compiler::Compiler;
pub use context::Context;
pub use destination::Destination;
pub use error::CompileError;
pub use error::CompileWarning;
pub use error::Location;
pub use hierarchy::Hierarchy;
pub use hierarchy::HierarchyError;
pub use options::CompileOptions;
pub use registry::FilterHandler;
pub use registry::Library;
pub use registry::TagHandler;
pub use session::CompileReport;
pub use session::PauseState;
pub use session::Session;
pub use session::SessionId;
pub use session::SourceId;
pub use session::SourceMeta;
pub use source::Source;
pub use tag::Tag;
pub use variable::FilterCall;
pub use variable::Variable;
