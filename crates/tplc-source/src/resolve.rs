use camino::Utf8Path;
use camino::Utf8PathBuf;

use crate::path::clean_utf8_path;
use crate::path::safe_join;
use crate::path::SafeJoinError;
use crate::system::FileSystem;

/// One directory templates are looked up in, tagged with the level
/// (app, plugin or system name) it belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchRoot {
    level: String,
    dir: Utf8PathBuf,
}

impl SearchRoot {
    #[must_use]
    pub fn new(level: impl Into<String>, dir: impl AsRef<Utf8Path>) -> Self {
        Self {
            level: level.into(),
            dir: clean_utf8_path(dir.as_ref()),
        }
    }

    #[must_use]
    pub fn level(&self) -> &str {
        &self.level
    }

    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }
}

/// A successful lookup: the absolute file and the level it was found at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub path: Utf8PathBuf,
    pub level: String,
}

/// Ordered template search path.
///
/// Earlier roots shadow later ones, which is how a project overrides a
/// plugin's template and a plugin overrides the system one.
#[derive(Clone, Debug, Default)]
pub struct TemplateResolver {
    roots: Vec<SearchRoot>,
}

impl TemplateResolver {
    #[must_use]
    pub fn new(roots: Vec<SearchRoot>) -> Self {
        Self { roots }
    }

    /// The standard project layout: local views, plugin views, system views,
    /// system plugin views, then the two artifact cache folders.
    #[must_use]
    pub fn for_project(
        project_root: &Utf8Path,
        plugins: &[String],
        system_plugins: &[String],
        cache_root: &Utf8Path,
    ) -> Self {
        let mut roots = vec![SearchRoot::new("local", project_root.join("app/view"))];
        roots.extend(
            plugins
                .iter()
                .map(|p| SearchRoot::new(p.as_str(), project_root.join("plugins").join(p).join("view"))),
        );
        roots.push(SearchRoot::new("system", project_root.join("system/app/view")));
        roots.extend(system_plugins.iter().map(|s| {
            SearchRoot::new(
                s.as_str(),
                project_root.join("system/plugins").join(s).join("view"),
            )
        }));
        roots.push(SearchRoot::new("temp_block", cache_root.join("temp")));
        roots.push(SearchRoot::new("compiled", cache_root.join("view")));
        Self { roots }
    }

    #[must_use]
    pub fn roots(&self) -> &[SearchRoot] {
        &self.roots
    }

    /// The first root registered under `level`.
    #[must_use]
    pub fn root(&self, level: &str) -> Option<&SearchRoot> {
        self.roots.iter().find(|r| r.level == level)
    }

    /// Find `requested` in the first root that has it.
    ///
    /// With `ignore_level` set, every root up to and including the one named
    /// `ignore_level` is skipped. This lets a template extend another
    /// template of the same name further down the search path.
    ///
    /// A path that tries to leave its root is an error; a path that simply
    /// does not exist anywhere is `Ok(None)`.
    pub fn resolve(
        &self,
        fs: &dyn FileSystem,
        requested: &str,
        ignore_level: Option<&str>,
    ) -> Result<Option<Resolved>, SafeJoinError> {
        let mut ignoring = ignore_level;

        for root in &self.roots {
            let candidate = safe_join(&root.dir, requested)?;

            if ignoring.is_none() && fs.exists(&candidate) {
                tracing::trace!(%candidate, level = %root.level, "resolved template");
                return Ok(Some(Resolved {
                    path: candidate,
                    level: root.level.clone(),
                }));
            }

            if ignoring == Some(root.level.as_str()) {
                ignoring = None;
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::InMemoryFileSystem;

    fn resolver() -> TemplateResolver {
        TemplateResolver::for_project(
            Utf8Path::new("/site"),
            &["shop".to_string()],
            &["admin".to_string()],
            Utf8Path::new("/site/cache"),
        )
    }

    fn fs_with(paths: &[&str]) -> InMemoryFileSystem {
        let mut fs = InMemoryFileSystem::new();
        for p in paths {
            fs.add_file(Utf8PathBuf::from(*p), String::new());
        }
        fs
    }

    #[test]
    fn test_root_order() {
        let resolver = resolver();
        let levels: Vec<&str> = resolver.roots().iter().map(SearchRoot::level).collect();
        assert_eq!(
            levels,
            vec!["local", "shop", "system", "admin", "temp_block", "compiled"]
        );
    }

    #[test]
    fn test_local_shadows_plugin() {
        let fs = fs_with(&[
            "/site/app/view/base.html",
            "/site/plugins/shop/view/base.html",
        ]);
        let found = resolver().resolve(&fs, "base.html", None).unwrap().unwrap();
        assert_eq!(found.path, Utf8PathBuf::from("/site/app/view/base.html"));
        assert_eq!(found.level, "local");
    }

    #[test]
    fn test_ignore_level_skips_up_to_and_including() {
        let fs = fs_with(&[
            "/site/app/view/base.html",
            "/site/plugins/shop/view/base.html",
            "/site/system/app/view/base.html",
        ]);
        let found = resolver()
            .resolve(&fs, "base.html", Some("local"))
            .unwrap()
            .unwrap();
        assert_eq!(found.level, "shop");

        let found = resolver()
            .resolve(&fs, "base.html", Some("shop"))
            .unwrap()
            .unwrap();
        assert_eq!(found.level, "system");
    }

    #[test]
    fn test_not_found() {
        let fs = fs_with(&["/site/app/view/base.html"]);
        assert_eq!(resolver().resolve(&fs, "missing.html", None).unwrap(), None);
        assert_eq!(
            resolver().resolve(&fs, "base.html", Some("local")).unwrap(),
            None
        );
    }

    #[test]
    fn test_escape_attempt_is_an_error() {
        let fs = fs_with(&[]);
        assert!(resolver().resolve(&fs, "../../etc/passwd", None).is_err());
    }

    #[test]
    fn test_cache_roots_are_searched_last() {
        let fs = fs_with(&["/site/cache/temp/__block/page.html/content.php"]);
        let found = resolver()
            .resolve(&fs, "__block/page.html/content.php", None)
            .unwrap()
            .unwrap();
        assert_eq!(found.level, "temp_block");
    }
}
