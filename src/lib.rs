//! Stateful 2D rendering context for laid-out chemical structure depictions.
//!
//! A [`RenderContext`] turns already positioned atoms, bonds, labels,
//! brackets and reaction glyphs into vector drawing calls on a pluggable
//! [`Backend`], while tracking the transform stack, the bounding box of
//! everything painted, fonts, dash patterns and the active paint source.
//!
//! ```no_run
//! use molcanvas::backends::recording::RecordingBackend;
//! use molcanvas::{Rgb, RenderContext, RenderOptions, Vec2};
//!
//! # fn main() -> molcanvas::Result<()> {
//! let mut ctx = RenderContext::new(RecordingBackend::new(), RenderOptions::default(), 60.0, 1.0);
//! ctx.set_output(Box::new(std::io::sink()));
//! ctx.initialize(300, 200)?;
//! let s = ctx.session()?;
//! s.set_single_source(Rgb::BLACK);
//! s.draw_line(Vec2::new(10.0, 10.0), Vec2::new(70.0, 10.0))?;
//! ctx.close(false)?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod backends;
pub mod bbox;
pub mod color;
pub mod context;
pub mod error;
pub mod fonts;
pub mod geometry;
pub mod layout;
pub mod lock;
pub mod options;
pub mod transform;

pub use api::{Backend, Canvas, DocumentFormat, Paint, PrintTarget, SurfaceTarget};
pub use bbox::BoundingBox;
pub use color::{ColorKey, Rgb, element_color};
pub use context::{PaintMode, RenderContext, Session, SessionTarget};
pub use error::{RenderError, Result};
pub use geometry::{Affine, Vec2};
pub use layout::{
    AttachmentPointItem, BracketItem, FontSize, GraphItem, GraphItemKind,
    RSiteAttachmentIndexItem, TextItem, TextStyle,
};
pub use lock::BackendLock;
pub use options::{OutputFormat, RenderOptions, RenderSettings};
pub use transform::TransformStack;
