use std::borrow::Cow;
use std::fmt;
use std::io::BufRead;

use camino::Utf8Path;
use camino::Utf8PathBuf;

use crate::context::Context;
use crate::error::CompileError;
use crate::error::CompileWarning;
use crate::error::Location;
use crate::hierarchy::Hierarchy;
use crate::scanner;
use crate::scanner::Scanner;
use crate::scanner::UnitKind;
use crate::session::Session;
use crate::session::SourceId;
use crate::tag::Tag;
use crate::variable::Variable;

/// One template being streamed through the compiler.
pub struct Source {
    id: SourceId,
    reader: Box<dyn BufRead + Send>,
    buffer: Vec<u8>,
    sanitized: bool,
    exhausted: bool,
    line_number: usize,
    hierarchy: Hierarchy,
    parse: bool,
    resume_at: Option<String>,
    paused: bool,
    path: Utf8PathBuf,
    requested: String,
    level: String,
    child: Option<SourceId>,
    current_tag: Option<String>,
    tags_seen: usize,
    extends: Option<String>,
}

/// A unit detached from the line buffer it was found in.
struct Found {
    start: usize,
    end: usize,
    kind: UnitKind,
    terminated: bool,
    name: String,
    params: String,
    content: String,
}

impl Source {
    pub(crate) fn new(
        id: SourceId,
        reader: Box<dyn BufRead + Send>,
        path: Utf8PathBuf,
        requested: String,
        level: String,
        child: Option<SourceId>,
    ) -> Self {
        Self {
            id,
            reader,
            buffer: Vec::new(),
            sanitized: false,
            exhausted: false,
            line_number: 0,
            hierarchy: Hierarchy::default(),
            parse: true,
            resume_at: None,
            paused: false,
            path,
            requested,
            level,
            child,
            current_tag: None,
            tags_seen: 0,
            extends: None,
        }
    }

    /// Process the next unit of the buffered line, reading a new line first
    /// when the buffer is empty.
    ///
    /// Text before the unit goes to the session's destinations byte for
    /// byte, then the unit is dispatched. Without a unit the rest of the line
    /// is written as is.
    pub fn compile(&mut self, session: &mut Session) -> Result<(), CompileError> {
        if self.paused || self.eof() {
            return Ok(());
        }

        if self.buffer.is_empty() {
            let read = self
                .reader
                .read_until(b'\n', &mut self.buffer)
                .map_err(|source| CompileError::Io {
                    path: self.path.clone(),
                    source,
                })?;
            if read == 0 {
                self.exhausted = true;
                return Ok(());
            }
            self.line_number += 1;
            self.sanitized = false;
        }

        if self.parse && !self.sanitized {
            match scanner::sanitize(&self.buffer) {
                Ok(Cow::Borrowed(_)) => {}
                Ok(Cow::Owned(line)) => self.buffer = line,
                Err(_) => {
                    return Err(CompileError::ForbiddenMarker {
                        location: self.location(),
                    })
                }
            }
            self.sanitized = true;
        }

        let Some(found) = self.find_unit() else {
            session.write_bytes(&self.buffer)?;
            self.buffer.clear();
            return Ok(());
        };

        if !found.terminated {
            session.warn(CompileWarning {
                message: "line terminated before end of tag".to_string(),
                location: self.location(),
            });
        }

        session.write_bytes(&self.buffer[..found.start])?;
        self.buffer.drain(..found.end);

        if session.options().verbose {
            tracing::debug!(
                source = %self.requested,
                line = self.line_number,
                unit = %found.content,
                "compiling unit"
            );
        }

        match found.kind {
            UnitKind::Tag => {
                self.current_tag = Some(found.name.clone());
                self.tags_seen += 1;
                let mut cx = Context::new(session, self);
                Tag::compile(&found.name, &found.params, &mut cx)
            }
            UnitKind::Variable => {
                self.current_tag = None;
                let mut cx = Context::new(session, self);
                Variable::compile(&found.content, &mut cx)
            }
        }
    }

    fn find_unit(&self) -> Option<Found> {
        let unit = if self.parse {
            Scanner::first(&self.buffer)
        } else {
            Scanner::find_marker(&self.buffer, self.resume_at.as_deref()?)
        }?;

        Some(Found {
            start: unit.start,
            end: unit.end,
            kind: unit.kind(),
            terminated: unit.is_terminated(),
            name: unit.name.to_string(),
            params: unit.params.into_owned(),
            content: unit.content.into_owned(),
        })
    }

    /// True once the buffered line is used up and the reader has nothing
    /// more to give.
    pub fn eof(&mut self) -> bool {
        if !self.buffer.is_empty() {
            return false;
        }
        if !self.exhausted {
            self.exhausted = matches!(self.reader.fill_buf(), Ok(rest) if rest.is_empty());
        }
        self.exhausted
    }

    /// Turn unit matching on or off. While off, the line is copied verbatim
    /// until a `{% resume_at %}` tag shows up.
    pub fn set_parse(&mut self, parse: bool, resume_at: Option<&str>) {
        self.parse = parse;
        self.resume_at = resume_at.map(ToString::to_string);
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

    #[must_use]
    pub fn id(&self) -> SourceId {
        self.id
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// The path as it was asked for, relative to the search roots.
    #[must_use]
    pub fn requested(&self) -> &str {
        &self.requested
    }

    /// The search root level the file was found at.
    #[must_use]
    pub fn level(&self) -> &str {
        &self.level
    }

    /// The source that extended this one.
    #[must_use]
    pub fn child(&self) -> Option<SourceId> {
        self.child
    }

    #[must_use]
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    #[must_use]
    pub fn location(&self) -> Location {
        Location::new(self.path.clone(), self.line_number)
    }

    #[must_use]
    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn hierarchy_mut(&mut self) -> &mut Hierarchy {
        &mut self.hierarchy
    }

    /// Name of the tag being compiled; `None` while a variable is.
    #[must_use]
    pub fn current_tag(&self) -> Option<&str> {
        self.current_tag.as_deref()
    }

    /// How many tags this source has dispatched, the current one included.
    #[must_use]
    pub fn tags_seen(&self) -> usize {
        self.tags_seen
    }

    /// The parent template this source extends, once `extends` ran.
    #[must_use]
    pub fn extends(&self) -> Option<&str> {
        self.extends.as_deref()
    }

    pub fn set_extends(&mut self, parent: &str) {
        self.extends = Some(parent.to_string());
    }

    #[cfg(test)]
    pub(crate) fn set_position(&mut self, line_number: usize, current_tag: Option<&str>) {
        self.line_number = line_number;
        self.current_tag = current_tag.map(ToString::to_string);
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("id", &self.id)
            .field("requested", &self.requested)
            .field("path", &self.path)
            .field("level", &self.level)
            .field("line_number", &self.line_number)
            .field("parse", &self.parse)
            .field("paused", &self.paused)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::Harness;

    #[test]
    fn test_compile_advances_one_unit_at_a_time() {
        let mut harness = Harness::new();
        harness.add_file("app/view/part.html", "a {{ x|safe }} b\nc\n");
        let session = harness.session();
        let mut source = session.open_for_test("part.html").unwrap();
        assert!(!source.eof());

        source.compile(session).unwrap();
        assert_eq!(source.line_number(), 1);
        assert_eq!(source.buffer, b" b\n");
        assert!(source.current_tag().is_none());

        source.compile(session).unwrap();
        assert!(source.buffer.is_empty());
        assert!(!source.eof());

        source.compile(session).unwrap();
        assert_eq!(source.line_number(), 2);
        assert!(source.eof());

        assert_eq!(harness.finish(), "a <?php echo $this->vars->x; ?> b\nc\n");
    }

    #[test]
    fn test_empty_source_is_at_eof() {
        let mut harness = Harness::new();
        let session = harness.session();
        let mut source = session.open_for_test("page.html").unwrap();
        assert!(source.eof());
        source.compile(session).unwrap();
        assert_eq!(source.line_number(), 0);
    }

    #[test]
    fn test_paused_source_does_nothing() {
        let mut harness = Harness::new();
        harness.add_file("app/view/part.html", "text\n");
        let session = harness.session();
        let mut source = session.open_for_test("part.html").unwrap();
        source.pause();
        source.compile(session).unwrap();
        assert_eq!(source.line_number(), 0);
        source.resume();
        source.compile(session).unwrap();
        assert!(source.eof());
    }

    #[test]
    fn test_tags_are_counted() {
        let mut harness = Harness::new();
        harness.add_file("app/view/part.html", "{% if a %}{{ b }}{% endif %}");
        let session = harness.session();
        let mut source = session.open_for_test("part.html").unwrap();

        source.compile(session).unwrap();
        assert_eq!(source.current_tag(), Some("if"));
        assert_eq!(source.hierarchy().top(), Some("if"));
        source.compile(session).unwrap();
        assert_eq!(source.current_tag(), None);
        source.compile(session).unwrap();
        assert_eq!(source.tags_seen(), 2);
        assert_eq!(source.hierarchy().depth(), 0);
    }

    #[test]
    fn test_parse_off_copies_until_marker() {
        let mut harness = Harness::new();
        harness.add_file("app/view/part.html", "{{ a }}{% stop %}{{ b|safe }}");
        let session = harness.session();
        let mut source = session.open_for_test("part.html").unwrap();
        source.set_parse(false, Some("nothing"));

        source.compile(session).unwrap();
        assert!(source.eof());
        assert_eq!(harness.finish(), "{{ a }}{% stop %}{{ b|safe }}");
    }
}
