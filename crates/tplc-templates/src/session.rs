use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::fs::File;
use std::io;
use std::io::BufReader;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use tplc_source::FileSystem;
use tplc_source::Resolved;
use tplc_source::TemplateResolver;

use crate::cache::ArtifactCache;
use crate::compiler::Compiler;
use crate::destination::Destination;
use crate::error::CompileError;
use crate::error::CompileWarning;
use crate::options::CompileOptions;
use crate::registry::Library;
use crate::source::Source;

/// Identifies a source within its session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(usize);

/// Unique name of one compile run.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    fn generate() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();
        let sequence = NEXT.fetch_add(1, Ordering::Relaxed);
        Self(format!("{nanos:x}-{:x}-{sequence}", std::process::id()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the session remembers about every source it opened, including the
/// ones already drained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceMeta {
    pub requested: String,
    pub path: Utf8PathBuf,
    pub level: String,
    pub ignore_level: Option<String>,
    pub child: Option<SourceId>,
}

/// Pause flags of every destination, captured by [`Session::pause_all`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PauseState {
    main: bool,
    others: Vec<(String, bool)>,
}

/// The outcome of a successful compile.
#[derive(Clone, Debug)]
pub struct CompileReport {
    pub session: SessionId,
    pub template: String,
    pub artifact: Utf8PathBuf,
    pub warnings: Vec<CompileWarning>,
    /// Queued sources drained to the end, the template itself included.
    pub sources: usize,
}

/// One compile run: a queue of sources feeding a set of destinations.
///
/// The first destination is the main artifact. Others are added and removed
/// by tags while the queue drains; every write goes to all of them.
pub struct Session {
    id: SessionId,
    options: CompileOptions,
    library: Arc<Library>,
    fs: Arc<dyn FileSystem>,
    resolver: Arc<TemplateResolver>,
    cache: ArtifactCache,
    template: String,
    main: Destination,
    others: Vec<Destination>,
    catalog: Vec<SourceMeta>,
    queue: VecDeque<Source>,
    active: Option<SourceId>,
    unlinks: Vec<Utf8PathBuf>,
    warnings: Vec<CompileWarning>,
    slots: usize,
    drained: usize,
}

impl Session {
    /// Start a session compiling `template` into the artifact named
    /// `destination`.
    pub fn new(
        compiler: &Compiler,
        template: &str,
        destination: &str,
    ) -> Result<Self, CompileError> {
        let template = template.trim_matches('/');

        // fail before the artifact is truncated
        if compiler
            .resolver()
            .resolve(compiler.fs().as_ref(), template, None)?
            .is_none()
        {
            return Err(CompileError::TemplateNotFound {
                path: template.to_string(),
                below: None,
            });
        }

        let cache = compiler.cache().clone();
        let main = Destination::open(destination, cache.compiled_path(destination)?, false)?;

        let mut session = Self {
            id: SessionId::generate(),
            options: compiler.options().clone(),
            library: Arc::clone(compiler.library()),
            fs: Arc::clone(compiler.fs()),
            resolver: Arc::clone(compiler.resolver()),
            cache,
            template: template.to_string(),
            main,
            others: Vec::new(),
            catalog: Vec::new(),
            queue: VecDeque::new(),
            active: None,
            unlinks: Vec::new(),
            warnings: Vec::new(),
            slots: 0,
            drained: 0,
        };

        if session.options.verbose {
            tracing::debug!(session = %session.id, template, destination, "starting compile session");
        }

        session.add_source(template, None, None)?;
        Ok(session)
    }

    /// Queue `requested` for compilation.
    ///
    /// A path already queued or being compiled with the same `ignore_level`
    /// is not queued again and `Ok(None)` is returned.
    pub fn add_source(
        &mut self,
        requested: &str,
        ignore_level: Option<&str>,
        child: Option<SourceId>,
    ) -> Result<Option<SourceId>, CompileError> {
        let requested = requested.trim_matches('/');
        let duplicate = self
            .queue
            .iter()
            .map(Source::id)
            .chain(self.active)
            .filter_map(|id| self.source_meta(id))
            .any(|meta| meta.requested == requested && meta.ignore_level.as_deref() == ignore_level);

        if duplicate {
            if self.options.verbose {
                tracing::debug!(session = %self.id, requested, "source already queued");
            }
            return Ok(None);
        }

        let source = self.open_source(requested, ignore_level, child)?;
        let id = source.id();
        if self.options.verbose {
            tracing::debug!(session = %self.id, requested, path = %source.path(), "queued source");
        }
        self.queue.push_back(source);
        Ok(Some(id))
    }

    /// Copy the template `requested` into the destinations verbatim.
    pub fn insert_file(&mut self, requested: &str) -> Result<(), CompileError> {
        let mut source = self.open_source(requested.trim_matches('/'), None, None)?;
        source.set_parse(false, None);
        self.drain_inserted(source)
    }

    /// Copy an artifact already on disk into the destinations verbatim.
    ///
    /// Artifacts are read from the OS file system, not through the session's
    /// [`FileSystem`]: the cache is always on disk, wherever templates live.
    pub fn insert_artifact(&mut self, path: &Utf8Path) -> Result<(), CompileError> {
        let file = File::open(path).map_err(|source| CompileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let id = self.register(SourceMeta {
            requested: path.to_string(),
            path: path.to_path_buf(),
            level: "artifact".to_string(),
            ignore_level: None,
            child: None,
        });
        let mut source = Source::new(
            id,
            Box::new(BufReader::new(file)),
            path.to_path_buf(),
            path.to_string(),
            "artifact".to_string(),
            None,
        );
        source.set_parse(false, None);
        self.drain_inserted(source)
    }

    fn drain_inserted(&mut self, mut source: Source) -> Result<(), CompileError> {
        while !source.eof() {
            source.compile(self)?;
        }
        Ok(())
    }

    /// Look `requested` up along the search path.
    pub fn resolve(
        &self,
        requested: &str,
        ignore_level: Option<&str>,
    ) -> Result<Option<Resolved>, CompileError> {
        Ok(self
            .resolver
            .resolve(self.fs.as_ref(), requested, ignore_level)?)
    }

    fn open_source(
        &mut self,
        requested: &str,
        ignore_level: Option<&str>,
        child: Option<SourceId>,
    ) -> Result<Source, CompileError> {
        let Some(resolved) = self.resolve(requested, ignore_level)? else {
            return Err(CompileError::TemplateNotFound {
                path: requested.to_string(),
                below: ignore_level.map(ToString::to_string),
            });
        };

        let reader = self
            .fs
            .open(&resolved.path)
            .map_err(|source| CompileError::Io {
                path: resolved.path.clone(),
                source,
            })?;

        let id = self.register(SourceMeta {
            requested: requested.to_string(),
            path: resolved.path.clone(),
            level: resolved.level.clone(),
            ignore_level: ignore_level.map(ToString::to_string),
            child,
        });

        Ok(Source::new(
            id,
            reader,
            resolved.path,
            requested.to_string(),
            resolved.level,
            child,
        ))
    }

    fn register(&mut self, meta: SourceMeta) -> SourceId {
        let id = SourceId(self.catalog.len());
        self.catalog.push(meta);
        id
    }

    #[must_use]
    pub fn source_meta(&self, id: SourceId) -> Option<&SourceMeta> {
        self.catalog.get(id.0)
    }

    /// Sources waiting in the queue.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Open an extra destination. Returns whether its artifact already
    /// existed. A destination of the same name is closed first.
    pub fn add_destination(&mut self, name: &str, temporary: bool) -> Result<bool, CompileError> {
        let path = if temporary {
            self.cache.temp_path(name)?
        } else {
            self.cache.compiled_path(name)?
        };
        self.remove_destination(name)?;

        let destination = Destination::open(name, path, temporary)?;
        let exists = destination.exists();
        if self.options.verbose {
            tracing::debug!(session = %self.id, name, temporary, exists, "opened destination");
        }
        self.others.push(destination);
        Ok(exists)
    }

    /// Close an extra destination. Temporary artifacts are deleted when the
    /// session completes.
    pub fn remove_destination(&mut self, name: &str) -> Result<bool, CompileError> {
        let Some(index) = self.others.iter().position(|d| d.name() == name) else {
            return Ok(false);
        };
        let destination = self.others.remove(index);
        if let Some(path) = destination.close()? {
            self.unlinks.push(path);
        }
        Ok(true)
    }

    #[must_use]
    pub fn destination(&self, name: &str) -> Option<&Destination> {
        self.others.iter().find(|d| d.name() == name)
    }

    #[must_use]
    pub fn main_destination(&self) -> &Destination {
        &self.main
    }

    pub fn main_destination_mut(&mut self) -> &mut Destination {
        &mut self.main
    }

    /// Pause every destination, returning the flags to restore later.
    pub fn pause_all(&mut self) -> PauseState {
        let state = PauseState {
            main: self.main.is_paused(),
            others: self
                .others
                .iter()
                .map(|d| (d.name().to_string(), d.is_paused()))
                .collect(),
        };
        self.main.pause();
        for destination in &mut self.others {
            destination.pause();
        }
        state
    }

    /// Put back pause flags captured by [`Session::pause_all`]. Destinations
    /// closed in between are skipped.
    pub fn restore(&mut self, state: &PauseState) {
        set_paused(&mut self.main, state.main);
        for (name, paused) in &state.others {
            if let Some(destination) = self.others.iter_mut().find(|d| d.name() == name) {
                set_paused(destination, *paused);
            }
        }
    }

    /// Send `content` to every destination.
    pub fn write(&mut self, content: &str) -> Result<(), CompileError> {
        self.write_bytes(content.as_bytes())
    }

    /// Send template text to every destination as read, whatever its
    /// encoding.
    pub fn write_bytes(&mut self, content: &[u8]) -> Result<(), CompileError> {
        self.main.write(content)?;
        for destination in &mut self.others {
            destination.write(content)?;
        }
        Ok(())
    }

    pub fn warn(&mut self, warning: CompileWarning) {
        tracing::warn!(session = %self.id, "{warning}");
        self.warnings.push(warning);
    }

    /// A fresh parameter slot name, numbered per session.
    pub fn next_slot(&mut self) -> String {
        let slot = crate::codegen::slot_name(self.slots);
        self.slots += 1;
        slot
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// The template this session was started for.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
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
    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    #[must_use]
    pub fn warnings(&self) -> &[CompileWarning] {
        &self.warnings
    }

    /// Drain the queue, then close every destination and delete the
    /// temporary artifacts.
    ///
    /// A source is drained in one go unless it pauses; a paused source moves
    /// to the back of the queue with its position intact.
    pub fn compile(mut self) -> Result<CompileReport, CompileError> {
        let mut skipped = 0;

        while let Some(mut source) = self.queue.pop_front() {
            if source.is_paused() {
                skipped += 1;
                self.queue.push_back(source);
                if skipped >= self.queue.len() {
                    return Err(CompileError::Stalled {
                        pending: self.queue.len(),
                    });
                }
                continue;
            }
            skipped = 0;

            if source.line_number() == 0 {
                self.main.resume();
            }

            self.active = Some(source.id());
            while !source.is_paused() && !source.eof() {
                source.compile(&mut self)?;
            }
            self.active = None;

            if !source.eof() {
                self.queue.push_back(source);
                continue;
            }

            if let Some(open) = source.hierarchy().top() {
                let warning = CompileWarning {
                    message: format!("{open} tag was never closed"),
                    location: source.location(),
                };
                self.warn(warning);
            }
            self.drained += 1;
        }

        self.finish()
    }

    fn finish(self) -> Result<CompileReport, CompileError> {
        let Session {
            id,
            cache,
            template,
            main,
            others,
            mut unlinks,
            warnings,
            drained,
            ..
        } = self;

        let artifact = main.path().to_path_buf();
        main.close()?;
        for destination in others {
            if let Some(path) = destination.close()? {
                unlinks.push(path);
            }
        }

        for path in &unlinks {
            if let Err(err) = fs::remove_file(path) {
                if err.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(%path, "could not delete temporary artifact: {err}");
                }
            }
        }
        let blocks = cache.block_dir(id.as_str());
        if blocks.is_dir() {
            if let Err(err) = fs::remove_dir_all(&blocks) {
                tracing::warn!(path = %blocks, "could not delete block artifacts: {err}");
            }
        }

        tracing::info!(
            session = %id,
            template = %template,
            artifact = %artifact,
            warnings = warnings.len(),
            "compiled template"
        );

        Ok(CompileReport {
            session: id,
            template,
            artifact,
            warnings,
            sources: drained,
        })
    }

    #[cfg(test)]
    pub(crate) fn open_for_test(&mut self, requested: &str) -> Result<Source, CompileError> {
        self.open_source(requested, None, None)
    }
}

fn set_paused(destination: &mut Destination, paused: bool) {
    if paused {
        destination.pause();
    } else {
        destination.resume();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("template", &self.template)
            .field("queue", &self.queue)
            .field("main", &self.main)
            .field("others", &self.others)
            .finish_non_exhaustive()
    }
}
