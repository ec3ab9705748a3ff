use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::io::Write;

use camino::Utf8Path;
use camino::Utf8PathBuf;

use crate::error::CompileError;

/// One artifact file being written.
#[derive(Debug)]
pub struct Destination {
    name: String,
    path: Utf8PathBuf,
    writer: Option<BufWriter<File>>,
    paused: bool,
    temporary: bool,
    exists: bool,
}

impl Destination {
    /// Open `path` for writing, creating parent directories as needed.
    ///
    /// A temporary artifact that is already on disk is left untouched and
    /// every write to it is skipped.
    pub fn open(
        name: impl Into<String>,
        path: Utf8PathBuf,
        temporary: bool,
    ) -> Result<Self, CompileError> {
        let exists = path.is_file();
        let writer = if exists && temporary {
            None
        } else {
            Some(create(&path)?)
        };

        Ok(Self {
            name: name.into(),
            path,
            writer,
            paused: false,
            temporary,
            exists,
        })
    }

    pub fn write(&mut self, content: &[u8]) -> Result<(), CompileError> {
        if self.paused {
            return Ok(());
        }
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        writer
            .write_all(content)
            .map_err(|source| CompileError::Io {
                path: self.path.clone(),
                source,
            })
    }

    /// Flush and close the file. Returns the path when the artifact is
    /// temporary and should be deleted once the session succeeds.
    pub fn close(self) -> Result<Option<Utf8PathBuf>, CompileError> {
        if let Some(mut writer) = self.writer {
            writer.flush().map_err(|source| CompileError::Io {
                path: self.path.clone(),
                source,
            })?;
        }
        Ok(self.temporary.then_some(self.path))
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether the artifact was already on disk when this destination opened.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.exists
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

fn create(path: &Utf8Path) -> Result<BufWriter<File>, CompileError> {
    let open = |source| CompileError::DestinationOpen {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(open)?;
    }
    File::create(path).map(BufWriter::new).map_err(open)
}
