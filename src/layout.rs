//! Value objects produced by the layout engine. The render context only
//! borrows them for the duration of a single draw call; the measuring
//! helpers (`set_text_item_size`, `set_graph_item_size_*`) fill in their
//! box fields.

use crate::color::Rgb;
use crate::geometry::Vec2;

/// Nominal font size categories; actual sizes come from
/// [`crate::options::RenderSettings`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FontSize {
    Label = 0,
    Attr,
    RGroupLogic,
    RGroupLogicIndex,
    Indices,
    AttachmentPointIndex,
    RSiteAttachmentIndex,
    Comment,
    Title,
    DataSGroup,
    Property,
}

impl FontSize {
    pub const COUNT: usize = 11;
}

/// Laid-out text. `position` is the top-left of the box, `baseline_offset`
/// is the pen position relative to it.
#[derive(Clone, Debug, PartialEq)]
pub struct TextItem {
    pub text: String,
    pub font_size: FontSize,
    pub position: Vec2,
    pub size: Vec2,
    pub baseline_offset: Vec2,
    pub color: Option<Rgb>,
    pub highlighted: bool,
}

impl TextItem {
    pub fn new(text: impl Into<String>, font_size: FontSize) -> Self {
        Self {
            text: text.into(),
            font_size,
            position: Vec2::ZERO,
            size: Vec2::ZERO,
            baseline_offset: Vec2::ZERO,
            color: None,
            highlighted: false,
        }
    }

    pub fn center(&self) -> Vec2 {
        self.position + self.size * 0.5
    }
}

/// Per-call rendering flags for text items.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextStyle {
    pub color: Option<Rgb>,
    pub bold: bool,
    /// Placeholder rendering: a background rectangle is drawn behind the text.
    pub idle: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphItemKind {
    Dot,
    Cap,
    Plus,
    Minus,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphItem {
    pub kind: GraphItemKind,
    pub position: Vec2,
    pub size: Vec2,
    /// Anchor of the glyph relative to `position`.
    pub relative_position: Vec2,
    pub color: Option<Rgb>,
    pub highlighted: bool,
}

impl GraphItem {
    pub fn new(kind: GraphItemKind) -> Self {
        Self {
            kind,
            position: Vec2::ZERO,
            size: Vec2::ZERO,
            relative_position: Vec2::ZERO,
            color: None,
            highlighted: false,
        }
    }
}

/// A bracket spine from `p0` to `p1`; the ticks at both ends point along
/// `direction` for `width` units.
#[derive(Clone, Debug, PartialEq)]
pub struct BracketItem {
    pub p0: Vec2,
    pub p1: Vec2,
    pub direction: Vec2,
    pub width: f64,
    pub color: Option<Rgb>,
    pub highlighted: bool,
}

/// Attachment point marker: a stub from `p0` to `p1` crossed by a wavy line
/// at `p1`, optionally labelled with `number`.
#[derive(Clone, Debug, PartialEq)]
pub struct AttachmentPointItem {
    pub p0: Vec2,
    pub p1: Vec2,
    pub direction: Vec2,
    pub number: Option<u32>,
    pub color: Option<Rgb>,
    pub highlighted: bool,
}

/// R-site attachment index: a number enclosed in a circle.
#[derive(Clone, Debug, PartialEq)]
pub struct RSiteAttachmentIndexItem {
    pub position: Vec2,
    pub size: Vec2,
    pub radius: f64,
    pub number: u32,
    pub color: Option<Rgb>,
}
