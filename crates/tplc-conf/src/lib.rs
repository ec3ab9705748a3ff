use camino::Utf8Path;
use camino::Utf8PathBuf;
use config::Config;
use config::ConfigError as ExternalConfigError;
use config::File;
use config::FileFormat;
use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration build/deserialize error")]
    Config(#[from] ExternalConfigError),
}

/// Project-wide compiler settings.
///
/// Every field has a default, so an empty project (no config files at all)
/// compiles with escaping enabled and the stock operator allow-list.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Strict mode. Deprecated compatibility paths become hard errors.
    pub debug: bool,
    /// Trace every compile step at DEBUG level.
    pub verbose: bool,
    /// Wrap interpolated values in the runtime escape call.
    pub escaping: bool,
    /// Tags whose parameters may contain comparison/assignment operators.
    pub operator_tags: Vec<String>,
    /// Variable names that historically rendered unescaped without `|safe`.
    pub legacy_unescaped: Vec<String>,
    /// Plugin levels searched after the project's own views, in order.
    pub plugins: Vec<String>,
    /// System plugin levels searched after the system views, in order.
    pub system_plugins: Vec<String>,
    /// Artifact cache root. Relative paths are taken from the project root.
    pub cache_dir: Utf8PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            verbose: false,
            escaping: true,
            operator_tags: vec!["if".to_string(), "elseif".to_string(), "with".to_string()],
            legacy_unescaped: vec!["ofw.js".to_string(), "zaj.js".to_string()],
            plugins: Vec::new(),
            system_plugins: Vec::new(),
            cache_dir: Utf8PathBuf::from("cache"),
        }
    }
}

impl Settings {
    pub fn new(project_root: &Utf8Path) -> Result<Self, ConfigError> {
        let user_config_file = ProjectDirs::from("org", "tplc", "tplc")
            .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.config_dir().join("tplc.toml")).ok());

        Self::load_from_paths(project_root, user_config_file.as_deref())
    }

    fn load_from_paths(
        project_root: &Utf8Path,
        user_config_path: Option<&Utf8Path>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = user_config_path {
            builder = builder.add_source(
                File::from(path.as_std_path())
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        for name in [".tplc.toml", "tplc.toml"] {
            builder = builder.add_source(
                File::from(project_root.join(name).as_std_path())
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        tracing::debug!(root = %project_root, ?settings, "loaded settings");
        Ok(settings)
    }

    /// The artifact cache root resolved against `project_root`.
    #[must_use]
    pub fn cache_root(&self, project_root: &Utf8Path) -> Utf8PathBuf {
        if self.cache_dir.is_absolute() {
            self.cache_dir.clone()
        } else {
            project_root.join(&self.cache_dir)
        }
    }
}
