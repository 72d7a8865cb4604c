//! Backend traits. A backend is a vector-graphics surface driven through a
//! small Cairo-like state machine; the render context never looks past these
//! interfaces, so Cairo, the SVG writer and the recorder are interchangeable.

use crate::color::Rgb;
use crate::error::Result;
use crate::geometry::{Affine, Vec2};
use crate::lock::BackendLock;

/// Source used for fill/stroke.
#[derive(Clone, Debug, PartialEq)]
pub enum Paint {
    Solid(Rgb),
    /// Two-stop linear gradient from `start` (color `from`) to `end` (color `to`).
    LinearGradient {
        from: Rgb,
        to: Rgb,
        start: Vec2,
        end: Vec2,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineCap {
    Butt,
    Round,
    Square,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineJoin {
    Round,
    Bevel,
    Miter,
}

/// Text measurements in user units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextExtents {
    pub x_bearing: f64,
    pub y_bearing: f64,
    pub width: f64,
    pub height: f64,
    pub x_advance: f64,
    /// Line height of the font.
    pub line_height: f64,
    pub ascent: f64,
    pub descent: f64,
}

pub trait CanvasState {
    /// Saves the backend graphics state. Mirrors cairo_save().
    fn save(&mut self) -> Result<()>;
    /// Restores the last saved graphics state. Mirrors cairo_restore().
    fn restore(&mut self) -> Result<()>;
}

pub trait CanvasTransforms {
    /// Replaces the current transform. Mirrors cairo_set_matrix().
    fn set_transform(&mut self, m: Affine) -> Result<()>;
    /// Returns the current transform.
    fn transform(&self) -> Affine;
}

pub trait CanvasLineStyles {
    fn set_line_width(&mut self, value: f64) -> Result<()>;
    fn line_width(&self) -> f64;
    fn set_line_cap(&mut self, value: LineCap) -> Result<()>;
    fn set_line_join(&mut self, value: LineJoin) -> Result<()>;
    /// Sets the dash segments and phase; an empty slice means solid strokes.
    fn set_line_dash(&mut self, segments: &[f64], offset: f64) -> Result<()>;
    fn line_dash(&self) -> (Vec<f64>, f64);
}

pub trait CanvasFillStrokeStyles {
    /// Makes `paint` the source for subsequent fills and strokes.
    fn set_source(&mut self, paint: &Paint) -> Result<()>;
}

pub trait CanvasPaths {
    fn begin_path(&mut self) -> Result<()>;
    fn close_path(&mut self) -> Result<()>;
    fn move_to(&mut self, x: f64, y: f64) -> Result<()>;
    fn line_to(&mut self, x: f64, y: f64) -> Result<()>;
    /// Adds a clockwise (increasing angle) arc. Mirrors cairo_arc().
    fn arc(&mut self, x: f64, y: f64, radius: f64, start_angle: f64, end_angle: f64) -> Result<()>;
    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()>;
    /// Fills and consumes the current path.
    fn fill(&mut self) -> Result<()>;
    /// Strokes and consumes the current path.
    fn stroke(&mut self) -> Result<()>;
}

pub trait CanvasText {
    /// Backend font handle, cheap to clone.
    type Font: Clone;

    fn create_font(&mut self, family: &str, size: f64, bold: bool) -> Result<Self::Font>;
    /// Measures `text` without changing the drawing state.
    fn text_extents(&mut self, font: &Self::Font, text: &str) -> Result<TextExtents>;
    /// Paints `text` with its baseline origin at (x, y) using the current source.
    fn fill_text(&mut self, font: &Self::Font, text: &str, x: f64, y: f64) -> Result<()>;
}

pub trait CanvasSurface {
    /// Fails if the backend has entered an error status.
    fn status(&self) -> Result<()>;
    /// Finalizes the surface and returns the encoded document.
    fn finish(&mut self) -> Result<Vec<u8>>;
}

pub trait Canvas:
    CanvasState
    + CanvasTransforms
    + CanvasLineStyles
    + CanvasFillStrokeStyles
    + CanvasPaths
    + CanvasText
    + CanvasSurface
{
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Svg,
}

/// What kind of surface a backend is asked to create.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceTarget {
    Document {
        format: DocumentFormat,
        width: u32,
        height: u32,
    },
    Raster {
        width: u32,
        height: u32,
    },
    /// Measuring surface; its output is never written.
    Null,
}

/// Platform print destinations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrintTarget {
    /// Opaque platform device handle.
    Device(usize),
    Metafile { width: u32, height: u32 },
}

/// Surface factory for one kind of canvas.
pub trait Backend {
    type Canvas: Canvas;

    fn create_surface(&mut self, target: SurfaceTarget) -> Result<Self::Canvas>;

    /// Lock guarding backend-global calls. Backends without global state
    /// return [`BackendLock::none`].
    fn lock(&self) -> BackendLock {
        BackendLock::none()
    }

    /// Print/metafile capability, if this backend has one.
    fn print_support(&mut self) -> Option<&mut dyn PrintSupport<Canvas = Self::Canvas>> {
        None
    }
}

pub trait PrintSupport {
    type Canvas;

    fn create_print_surface(&mut self, target: PrintTarget) -> Result<Self::Canvas>;
}
