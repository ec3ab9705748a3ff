use std::any::Any;
use std::fmt;

/// One open paired tag and whatever its handler wants to remember until the
/// closing tag shows up.
pub struct Frame {
    tag: String,
    data: Box<dyn Any>,
}

impl Frame {
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame").field("tag", &self.tag).finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HierarchyError {
    /// The innermost frame belongs to a different tag.
    Mismatch { open: String },
    /// Nothing is open at all.
    Empty,
}

/// Stack of open paired tags for one source.
#[derive(Debug, Default)]
pub struct Hierarchy {
    frames: Vec<Frame>,
}

impl Hierarchy {
    pub fn push(&mut self, tag: &str, data: Box<dyn Any>) {
        self.frames.push(Frame {
            tag: tag.to_string(),
            data,
        });
    }

    /// Close the innermost frame, which must have been opened by `tag`.
    ///
    /// On mismatch the frame stays on the stack.
    pub fn pop(&mut self, tag: &str) -> Result<Box<dyn Any>, HierarchyError> {
        self.check_top(tag)?;
        self.frames
            .pop()
            .map(|frame| frame.data)
            .ok_or(HierarchyError::Empty)
    }

    pub fn peek(&self, tag: &str) -> Result<&dyn Any, HierarchyError> {
        self.check_top(tag)?;
        self.frames
            .last()
            .map(|frame| frame.data.as_ref())
            .ok_or(HierarchyError::Empty)
    }

    pub fn peek_mut(&mut self, tag: &str) -> Result<&mut dyn Any, HierarchyError> {
        self.check_top(tag)?;
        self.frames
            .last_mut()
            .map(|frame| frame.data.as_mut())
            .ok_or(HierarchyError::Empty)
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn top(&self) -> Option<&str> {
        self.frames.last().map(Frame::tag)
    }

    fn check_top(&self, tag: &str) -> Result<(), HierarchyError> {
        match self.frames.last() {
            None => Err(HierarchyError::Empty),
            Some(frame) if frame.tag != tag => Err(HierarchyError::Mismatch {
                open: frame.tag.clone(),
            }),
            Some(_) => Ok(()),
        }
    }
}
