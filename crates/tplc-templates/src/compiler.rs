use std::io;
use std::sync::Arc;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use tplc_conf::Settings;
use tplc_source::FileSystem;
use tplc_source::OsFileSystem;
use tplc_source::TemplateResolver;
use walkdir::WalkDir;

use crate::cache::ArtifactCache;
use crate::error::CompileError;
use crate::options::CompileOptions;
use crate::registry::Library;
use crate::session::CompileReport;
use crate::session::Session;

/// Everything a compile needs that outlives one session.
#[derive(Clone)]
pub struct Compiler {
    options: CompileOptions,
    library: Arc<Library>,
    fs: Arc<dyn FileSystem>,
    resolver: Arc<TemplateResolver>,
    cache: ArtifactCache,
}

impl Compiler {
    /// A compiler for the project at `project_root`, reading templates from
    /// disk with the built-in tags and filters.
    #[must_use]
    pub fn new(settings: &Settings, project_root: &Utf8Path) -> Self {
        let cache_root = settings.cache_root(project_root);
        let resolver = TemplateResolver::for_project(
            project_root,
            &settings.plugins,
            &settings.system_plugins,
            &cache_root,
        );
        Self::with_parts(
            CompileOptions::from(settings),
            Library::builtin(),
            Arc::new(OsFileSystem),
            resolver,
            ArtifactCache::new(cache_root),
        )
    }

    #[must_use]
    pub fn with_parts(
        options: CompileOptions,
        library: Library,
        fs: Arc<dyn FileSystem>,
        resolver: TemplateResolver,
        cache: ArtifactCache,
    ) -> Self {
        Self {
            options,
            library: Arc::new(library),
            fs,
            resolver: Arc::new(resolver),
            cache,
        }
    }

    /// Compile `template` into the artifact of the same name.
    pub fn compile(&self, template: &str) -> Result<CompileReport, CompileError> {
        self.compile_to(template, template)
    }

    /// Compile `template` into the artifact named `destination`.
    pub fn compile_to(
        &self,
        template: &str,
        destination: &str,
    ) -> Result<CompileReport, CompileError> {
        Session::new(self, template, destination)?.compile()
    }

    /// Compile every file below the `local` search root, in path order.
    /// Stops at the first failure.
    pub fn compile_all(&self) -> Result<Vec<CompileReport>, CompileError> {
        let Some(root) = self.resolver.root("local") else {
            return Ok(Vec::new());
        };
        if !root.dir().is_dir() {
            return Ok(Vec::new());
        }

        let mut templates = Vec::new();
        for entry in WalkDir::new(root.dir()).sort_by_file_name() {
            let entry = entry.map_err(|err| CompileError::Io {
                path: err
                    .path()
                    .and_then(Utf8Path::from_path)
                    .map_or_else(|| root.dir().to_path_buf(), Utf8Path::to_path_buf),
                source: io::Error::from(err),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(path) = Utf8Path::from_path(entry.path()) else {
                tracing::warn!(path = %entry.path().display(), "skipping non UTF-8 template path");
                continue;
            };
            if let Ok(relative) = path.strip_prefix(root.dir()) {
                templates.push(relative_name(relative));
            }
        }

        templates
            .iter()
            .map(|template| self.compile(template))
            .collect()
    }

    #[must_use]
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    #[must_use]
    pub fn library(&self) -> &Arc<Library> {
        &self.library
    }

    #[must_use]
    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    #[must_use]
    pub fn resolver(&self) -> &Arc<TemplateResolver> {
        &self.resolver
    }

    #[must_use]
    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }
}

/// Template names always use `/`.
fn relative_name(path: &Utf8Path) -> String {
    path.components()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join("/")
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("options", &self.options)
            .field("library", &self.library)
            .field("resolver", &self.resolver)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_name() {
        assert_eq!(relative_name(Utf8Path::new("shop/list.html")), "shop/list.html");
    }

    #[test]
    fn test_new_uses_project_layout() {
        let settings = Settings::default();
        let compiler = Compiler::new(&settings, Utf8Path::new("/site"));
        assert_eq!(compiler.cache().root(), Utf8Path::new("/site/cache"));
        assert_eq!(
            compiler.resolver().root("local").map(|r| r.dir().to_path_buf()),
            Some(Utf8PathBuf::from("/site/app/view"))
        );
    }
}
