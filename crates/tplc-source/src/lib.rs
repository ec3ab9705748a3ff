mod path;
mod resolve;
mod system;

pub use path::clean_utf8_path;
pub use path::safe_join;
pub use path::SafeJoinError;
pub use resolve::Resolved;
pub use resolve::SearchRoot;
pub use resolve::TemplateResolver;
pub use system::FileSystem;
pub use system::InMemoryFileSystem;
pub use system::OsFileSystem;
