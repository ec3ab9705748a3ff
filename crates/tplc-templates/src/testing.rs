//! Helpers for driving handlers and sessions in unit tests.

use std::fs;
use std::sync::Arc;

use camino::Utf8Path;
use tplc_source::InMemoryFileSystem;
use tplc_source::TemplateResolver;

use crate::cache::ArtifactCache;
use crate::compiler::Compiler;
use crate::context::Context;
use crate::error::CompileError;
use crate::error::CompileWarning;
use crate::options::CompileOptions;
use crate::registry::Library;
use crate::session::Session;

const ROOT: &str = "/site";

/// A project at `/site` held in memory, with `app/view/page.html` as the
/// template under test and the artifact cache in a temporary directory.
pub(crate) struct Harness {
    pub options: CompileOptions,
    files: Vec<(String, String)>,
    cache: tempfile::TempDir,
    session: Option<Session>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            options: CompileOptions::default(),
            files: vec![("app/view/page.html".to_string(), String::new())],
            cache: tempfile::tempdir().unwrap(),
            session: None,
        }
    }

    /// Add or replace a file relative to the project root.
    pub fn add_file(&mut self, path: &str, content: &str) {
        self.files.retain(|(existing, _)| existing != path);
        self.files.push((path.to_string(), content.to_string()));
    }

    pub fn compiler(&self) -> Compiler {
        let mut fs = InMemoryFileSystem::new();
        for (path, content) in &self.files {
            fs.add_file(Utf8Path::new(ROOT).join(path), content.clone());
        }
        let cache_root = Utf8Path::from_path(self.cache.path()).unwrap().to_path_buf();
        let resolver = TemplateResolver::for_project(Utf8Path::new(ROOT), &[], &[], &cache_root);
        Compiler::with_parts(
            self.options.clone(),
            Library::builtin(),
            Arc::new(fs),
            resolver,
            ArtifactCache::new(cache_root),
        )
    }

    /// The session compiling `page.html`, started on first use.
    pub fn session(&mut self) -> &mut Session {
        if self.session.is_none() {
            let session = Session::new(&self.compiler(), "page.html", "page.html").unwrap();
            self.session = Some(session);
        }
        self.session.as_mut().unwrap()
    }

    /// Run `f` as if a unit on line 1 of `page.html` was being compiled
    /// inside `tag`.
    pub fn with_context<R>(
        &mut self,
        tag: Option<&str>,
        f: impl FnOnce(&mut Context<'_>) -> R,
    ) -> R {
        let session = self.session();
        let mut source = session.open_for_test("page.html").unwrap();
        source.set_position(1, tag);
        let mut cx = Context::new(session, &mut source);
        f(&mut cx)
    }

    pub fn warnings(&self) -> &[CompileWarning] {
        self.session.as_ref().map(Session::warnings).unwrap_or_default()
    }

    /// Compile the session and return the main artifact.
    pub fn try_finish(mut self) -> Result<String, CompileError> {
        self.session();
        let session = self.session.take().unwrap();
        let report = session.compile()?;
        Ok(fs::read_to_string(report.artifact).unwrap())
    }

    pub fn finish(self) -> String {
        self.try_finish().unwrap()
    }
}
