use tplc_conf::Settings;

/// Flags every part of a compile run consults.
///
/// Built once per [`Compiler`](crate::Compiler) and handed to each session,
/// so nothing in the pipeline reads global state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileOptions {
    pub verbose: bool,
    pub escaping: bool,
    pub debug: bool,
    pub operator_tags: Vec<String>,
    pub legacy_unescaped: Vec<String>,
}

impl CompileOptions {
    #[must_use]
    pub fn allows_operators(&self, tag: Option<&str>) -> bool {
        tag.is_some_and(|tag| self.operator_tags.iter().any(|t| t == tag))
    }

    #[must_use]
    pub fn is_legacy_unescaped(&self, name: &str) -> bool {
        self.legacy_unescaped.iter().any(|n| n == name)
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for CompileOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            verbose: settings.verbose,
            escaping: settings.escaping,
            debug: settings.debug,
            operator_tags: settings.operator_tags.clone(),
            legacy_unescaped: settings.legacy_unescaped.clone(),
        }
    }
}
