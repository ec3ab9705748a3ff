use std::fs::File;
use std::io;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Cursor;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use rustc_hash::FxHashMap;

/// Read access to template files.
///
/// Sources are streamed line by line, so the file system hands out buffered
/// readers rather than whole strings.
pub trait FileSystem: Send + Sync {
    fn open(&self, path: &Utf8Path) -> io::Result<Box<dyn BufRead + Send>>;
    fn exists(&self, path: &Utf8Path) -> bool;
}

pub struct InMemoryFileSystem {
    files: FxHashMap<Utf8PathBuf, String>,
}

impl InMemoryFileSystem {
    #[must_use]
    pub fn new() -> Self {
        Self {
            files: FxHashMap::default(),
        }
    }

    pub fn add_file(&mut self, path: Utf8PathBuf, content: String) {
        self.files.insert(path, content);
    }
}

impl Default for InMemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for InMemoryFileSystem {
    fn open(&self, path: &Utf8Path) -> io::Result<Box<dyn BufRead + Send>> {
        self.files
            .get(path)
            .map(|content| Box::new(Cursor::new(content.clone().into_bytes())) as Box<dyn BufRead + Send>)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "File not found"))
    }

    fn exists(&self, path: &Utf8Path) -> bool {
        self.files.contains_key(path)
    }
}

/// Standard file system implementation that uses [`std::fs`].
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn open(&self, path: &Utf8Path) -> io::Result<Box<dyn BufRead + Send>> {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }

    fn exists(&self, path: &Utf8Path) -> bool {
        path.is_file()
    }
}
