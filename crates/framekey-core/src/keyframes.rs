//! The keyframe index: which frames represent which groups.

use crate::error::{Error, Result};

/// Default visualization width in characters (13 glyphs).
pub const DEFAULT_LINE_WIDTH: usize = 39;

const KEYFRAME_GLYPH: &str = "_X_";
const CHILD_GLYPH: &str = "___";
const GLYPH_WIDTH: usize = 3;

/// A keyframe and the frames it stands in for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyframe {
    keyframe_index: usize,
    frame_index: usize,
    children: Vec<usize>,
}

impl Keyframe {
    pub fn new(keyframe_index: usize, frame_index: usize, children: Vec<usize>) -> Self {
        Self {
            keyframe_index,
            frame_index,
            children,
        }
    }

    /// Position of this keyframe within the index.
    pub fn keyframe_index(&self) -> usize {
        self.keyframe_index
    }

    /// Original sequence position of the keyframe itself.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Original positions of the child frames, ascending.
    pub fn children(&self) -> &[usize] {
        &self.children
    }

    /// Children plus the keyframe itself.
    pub fn group_size(&self) -> usize {
        self.children.len() + 1
    }

    /// Every frame of the group in ascending order, keyframe first.
    pub fn members(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::once(self.frame_index).chain(self.children.iter().copied())
    }

    fn last_member(&self) -> usize {
        self.children.last().copied().unwrap_or(self.frame_index)
    }
}

/// How a single frame was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameClass {
    Keyframe { keyframe_index: usize },
    Child { keyframe_index: usize },
}

impl FrameClass {
    pub fn is_keyframe(&self) -> bool {
        matches!(self, FrameClass::Keyframe { .. })
    }

    /// The keyframe this frame is, or belongs to.
    pub fn keyframe_index(&self) -> usize {
        match *self {
            FrameClass::Keyframe { keyframe_index } | FrameClass::Child { keyframe_index } => {
                keyframe_index
            }
        }
    }
}

/// Group size figures for a finished index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupSummary {
    pub keyframe_count: usize,
    pub frame_count: usize,
    /// Keyframes per frame.
    pub keyframe_ratio: f64,
    /// Frames per keyframe.
    pub average_group_size: f64,
    pub largest_group_size: usize,
    pub smallest_group_size: usize,
}

/// Ordered keyframes covering a whole sequence.
///
/// Frame 0 is always the first keyframe, and each keyframe owns the
/// contiguous run of frames up to the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyframeIndex {
    keyframes: Vec<Keyframe>,
    frame_count: usize,
}

impl KeyframeIndex {
    /// Rebuild an index from persisted groups, checking that they cover
    /// `0..frame_count` as consecutive runs in keyframe order.
    pub fn from_groups(keyframes: Vec<Keyframe>, frame_count: usize) -> Result<Self> {
        if keyframes.is_empty() {
            return Err(Error::InvalidIndex("no keyframes".into()));
        }

        let mut expected = 0;
        for (position, kf) in keyframes.iter().enumerate() {
            if kf.keyframe_index != position {
                return Err(Error::InvalidIndex(format!(
                    "keyframe at position {position} has index {}",
                    kf.keyframe_index
                )));
            }
            if kf.frame_index != expected {
                return Err(Error::InvalidIndex(format!(
                    "keyframe {position} starts at frame {}, expected {expected}",
                    kf.frame_index
                )));
            }
            for (offset, &child) in kf.children.iter().enumerate() {
                if child != kf.frame_index + 1 + offset {
                    return Err(Error::InvalidIndex(format!(
                        "keyframe {position} has non-consecutive child {child}"
                    )));
                }
            }
            expected = kf.last_member() + 1;
        }

        if expected != frame_count {
            return Err(Error::InvalidIndex(format!(
                "groups cover {expected} frames, expected {frame_count}"
            )));
        }

        Ok(Self {
            keyframes,
            frame_count,
        })
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Original positions of the keyframes, in keyframe order.
    pub fn original_indices(&self) -> Vec<usize> {
        self.keyframes.iter().map(Keyframe::frame_index).collect()
    }

    /// Classification of every frame, in frame order.
    pub fn classes(&self) -> impl Iterator<Item = FrameClass> + '_ {
        self.keyframes.iter().flat_map(|kf| {
            let keyframe_index = kf.keyframe_index;
            std::iter::once(FrameClass::Keyframe { keyframe_index }).chain(
                kf.children
                    .iter()
                    .map(move |_| FrameClass::Child { keyframe_index }),
            )
        })
    }

    pub fn summary(&self) -> GroupSummary {
        let sizes = self.keyframes.iter().map(Keyframe::group_size);
        GroupSummary {
            keyframe_count: self.len(),
            frame_count: self.frame_count,
            keyframe_ratio: self.len() as f64 / self.frame_count as f64,
            average_group_size: self.frame_count as f64 / self.len() as f64,
            largest_group_size: sizes.clone().max().unwrap_or(0),
            smallest_group_size: sizes.min().unwrap_or(0),
        }
    }

    /// One glyph per frame (`_X_` for keyframes, `___` for children),
    /// starting a new line once `line_width` characters have been written.
    pub fn visualization(&self, line_width: usize) -> String {
        let mut out = String::with_capacity(self.frame_count * (GLYPH_WIDTH + 1));
        let mut width = 0;
        for class in self.classes() {
            out.push_str(if class.is_keyframe() {
                KEYFRAME_GLYPH
            } else {
                CHILD_GLYPH
            });
            width += GLYPH_WIDTH;
            if width >= line_width {
                out.push('\n');
                width = 0;
            }
        }
        out
    }
}

/// Grows an index one frame at a time. The anchor is always present, so a
/// child can never be attached before a keyframe exists.
#[derive(Debug)]
pub(crate) struct IndexBuilder {
    sealed: Vec<Keyframe>,
    anchor: Keyframe,
}

impl IndexBuilder {
    /// Start an index whose first keyframe is frame 0.
    pub(crate) fn seed() -> Self {
        Self {
            sealed: Vec::new(),
            anchor: Keyframe::new(0, 0, Vec::new()),
        }
    }

    pub(crate) fn anchor(&self) -> &Keyframe {
        &self.anchor
    }

    pub(crate) fn attach(&mut self, frame_index: usize) {
        debug_assert!(frame_index > self.anchor.last_member());
        self.anchor.children.push(frame_index);
    }

    /// Seal the current anchor and make `frame_index` the next keyframe.
    /// Returns the new keyframe's index.
    pub(crate) fn promote(&mut self, frame_index: usize) -> usize {
        debug_assert!(frame_index > self.anchor.last_member());
        let keyframe_index = self.anchor.keyframe_index + 1;
        let next = Keyframe::new(keyframe_index, frame_index, Vec::new());
        self.sealed.push(std::mem::replace(&mut self.anchor, next));
        keyframe_index
    }

    pub(crate) fn finish(self) -> KeyframeIndex {
        let frame_count = self.anchor.last_member() + 1;
        let mut keyframes = self.sealed;
        keyframes.push(self.anchor);
        KeyframeIndex {
            keyframes,
            frame_count,
        }
    }
}
