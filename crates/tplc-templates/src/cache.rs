use camino::Utf8Path;
use camino::Utf8PathBuf;
use tplc_source::safe_join;
use tplc_source::SafeJoinError;

const COMPILED_DIR: &str = "view";
const TEMP_DIR: &str = "temp";
const EXTENSION: &str = "php";
const BLOCK_PREFIX: &str = "__block";

/// Where compiled and temporary artifacts live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactCache {
    root: Utf8PathBuf,
}

impl ArtifactCache {
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// `<root>/view/<name>.php`
    pub fn compiled_path(&self, name: &str) -> Result<Utf8PathBuf, SafeJoinError> {
        safe_join(&self.root.join(COMPILED_DIR), &format!("{name}.{EXTENSION}"))
    }

    /// `<root>/temp/<name>.php`
    pub fn temp_path(&self, name: &str) -> Result<Utf8PathBuf, SafeJoinError> {
        safe_join(&self.root.join(TEMP_DIR), &format!("{name}.{EXTENSION}"))
    }

    /// Name of the temporary artifact holding block `block` while `root`
    /// compiles in session `session`.
    #[must_use]
    pub fn block_name(session: &str, root: &str, block: &str) -> String {
        format!("{BLOCK_PREFIX}/{session}/{root}/{block}")
    }

    /// Directory holding every block artifact of one session.
    #[must_use]
    pub fn block_dir(&self, session: &str) -> Utf8PathBuf {
        self.root.join(TEMP_DIR).join(BLOCK_PREFIX).join(session)
    }
}
