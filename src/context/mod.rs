//! The render context: session lifecycle plus the per-session drawing state.
//!
//! A [`RenderContext`] owns a [`Backend`] and moves through
//! `Uninitialized → Initialized → Closed`. While initialized it holds a
//! [`Session`], which carries the surface and every piece of mutable drawing
//! state (transforms, bounding box, fonts, dash, line width, paint source,
//! highlight). Drawing goes through [`RenderContext::session`]; the primitive
//! and chemistry operations live in the `primitives` and `chemistry` modules.

mod chemistry;
mod primitives;

pub use primitives::PaintMode;

use std::io::Write;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::api::{
    Backend, Canvas, CanvasSurface, DocumentFormat, LineCap, LineJoin, Paint, PrintTarget,
    SurfaceTarget, TextExtents,
};
use crate::bbox::{BoundingBox, PathExtent};
use crate::color::{ColorKey, PatternSource, Rgb, element_color};
use crate::error::{RenderError, Result};
use crate::fonts::FontCache;
use crate::geometry::{Affine, Vec2};
use crate::layout::FontSize;
use crate::lock::BackendLock;
use crate::options::{OutputFormat, RenderOptions, RenderSettings};
use crate::transform::TransformStack;

/// Largest page side, in points, a PDF viewer is guaranteed to accept.
const MAX_PDF_PAGE_SIZE: u32 = 14400;

enum ContextState<C: Canvas> {
    Uninitialized,
    Initialized(Box<Session<C>>),
    Closed {
        min: Option<Vec2>,
        max: Option<Vec2>,
    },
}

/// Where the session's surface came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionTarget {
    Surface(SurfaceTarget),
    Print(PrintTarget),
}

impl SessionTarget {
    fn size(self) -> (u32, u32) {
        match self {
            SessionTarget::Surface(SurfaceTarget::Document { width, height, .. })
            | SessionTarget::Surface(SurfaceTarget::Raster { width, height })
            | SessionTarget::Print(PrintTarget::Metafile { width, height }) => (width, height),
            SessionTarget::Surface(SurfaceTarget::Null) | SessionTarget::Print(PrintTarget::Device(_)) => {
                (0, 0)
            }
        }
    }

    /// Whether closing the session produces bytes for the output sink.
    fn writes_output(self) -> bool {
        !matches!(
            self,
            SessionTarget::Surface(SurfaceTarget::Null) | SessionTarget::Print(PrintTarget::Device(_))
        )
    }
}

pub struct RenderContext<B: Backend> {
    backend: B,
    options: Arc<RenderOptions>,
    settings: Arc<RenderSettings>,
    lock: BackendLock,
    default_scale: f64,
    font_family: String,
    font_scale: f64,
    output: Option<Box<dyn Write + Send>>,
    state: ContextState<B::Canvas>,
}

impl<B: Backend> RenderContext<B> {
    /// Creates an uninitialized context; no backend resources are allocated
    /// until one of the `initialize*` calls.
    pub fn new(backend: B, options: RenderOptions, scale_factor: f64, line_width_factor: f64) -> Self {
        let lock = backend.lock();
        let font_family = options.font_family.clone();
        Self {
            backend,
            options: Arc::new(options),
            settings: Arc::new(RenderSettings::new(scale_factor, line_width_factor)),
            lock,
            default_scale: 1.0,
            font_family,
            font_scale: 1.0,
            output: None,
            state: ContextState::Uninitialized,
        }
    }

    /// Replaces the backend lock, e.g. to share one lock between backends
    /// that touch the same global state.
    pub fn with_lock(mut self, lock: BackendLock) -> Self {
        self.lock = lock;
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Scale folded into the baseline transform of the next session.
    pub fn set_default_scale(&mut self, scale: f64) {
        self.default_scale = scale;
    }

    pub fn set_output(&mut self, output: Box<dyn Write + Send>) {
        self.output = Some(output);
    }

    pub fn set_font_family(&mut self, family: &str) {
        self.font_family = family.to_owned();
        if let ContextState::Initialized(session) = &mut self.state {
            session.fonts.set_font_family(family);
        }
    }

    pub fn set_font_size(&mut self, scale: f64) {
        self.font_scale = scale;
        if let ContextState::Initialized(session) = &mut self.state {
            session.fonts.set_font_size(scale);
        }
    }

    /// Opens a document or raster session according to
    /// [`RenderOptions::format`].
    pub fn initialize(&mut self, width: u32, height: u32) -> Result<()> {
        let target = match self.options.format {
            OutputFormat::Svg => SurfaceTarget::Document {
                format: DocumentFormat::Svg,
                width,
                height,
            },
            OutputFormat::Pdf => SurfaceTarget::Document {
                format: DocumentFormat::Pdf,
                width,
                height,
            },
            OutputFormat::Png => SurfaceTarget::Raster { width, height },
        };
        self.create_surface(target)
    }

    /// Opens a measuring session; its output is never written.
    pub fn initialize_null(&mut self) -> Result<()> {
        self.create_surface(SurfaceTarget::Null)
    }

    pub fn create_surface(&mut self, target: SurfaceTarget) -> Result<()> {
        self.open(SessionTarget::Surface(target))
    }

    /// Opens a session on a print or metafile surface. Fails with
    /// [`RenderError::Unsupported`] when the backend has no print capability.
    pub fn initialize_print(&mut self, target: PrintTarget) -> Result<()> {
        self.open(SessionTarget::Print(target))
    }

    fn open(&mut self, target: SessionTarget) -> Result<()> {
        match self.state {
            ContextState::Uninitialized => {}
            ContextState::Initialized(_) => return Err(RenderError::AlreadyInitialized),
            ContextState::Closed { .. } => return Err(RenderError::Closed),
        }
        if matches!(target, SessionTarget::Print(_)) && self.backend.print_support().is_none() {
            return Err(RenderError::Unsupported("print surfaces"));
        }
        if target.writes_output() && self.output.is_none() {
            return Err(RenderError::NoOutput);
        }

        let canvas = {
            let _guard = self.lock.acquire();
            match target {
                SessionTarget::Surface(surface) => self.backend.create_surface(surface)?,
                SessionTarget::Print(print) => self
                    .backend
                    .print_support()
                    .ok_or(RenderError::Unsupported("print surfaces"))?
                    .create_print_surface(print)?,
            }
        };
        canvas.status()?;

        let (width, height) = target.size();
        let s = self.default_scale;
        let baseline = if self.options.flip_y {
            Affine::translation(0.0, height as f64).pre_multiply(Affine::scaling(s, -s))
        } else {
            Affine::scaling(s, s)
        };

        let mut fonts = FontCache::new(self.font_family.clone());
        fonts.set_font_size(self.font_scale);
        let mut session = Session {
            canvas,
            lock: self.lock.clone(),
            options: Arc::clone(&self.options),
            settings: Arc::clone(&self.settings),
            target,
            width,
            height,
            transforms: TransformStack::new(baseline),
            bounds: BoundingBox::new(),
            path: PathExtent::default(),
            current_point: None,
            fonts,
            dash: Vec::new(),
            dash_offset: 0.0,
            line_width: self.settings.bond_line_width,
            source: PatternSource::default(),
            highlight: None,
        };
        session.start()?;
        debug!(?target, width, height, "render session initialized");
        self.state = ContextState::Initialized(Box::new(session));
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, ContextState::Initialized(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, ContextState::Closed { .. })
    }

    /// The open session. Fails before `initialize` and after `close`.
    pub fn session(&mut self) -> Result<&mut Session<B::Canvas>> {
        match &mut self.state {
            ContextState::Initialized(session) => Ok(session),
            ContextState::Uninitialized => Err(RenderError::NotInitialized),
            ContextState::Closed { .. } => Err(RenderError::Closed),
        }
    }

    pub fn session_ref(&self) -> Result<&Session<B::Canvas>> {
        match &self.state {
            ContextState::Initialized(session) => Ok(session),
            ContextState::Uninitialized => Err(RenderError::NotInitialized),
            ContextState::Closed { .. } => Err(RenderError::Closed),
        }
    }

    /// Lower corner of everything drawn, in the current user space. Still
    /// available after `close`.
    pub fn bounds_min(&self) -> Option<Vec2> {
        match &self.state {
            ContextState::Initialized(session) => session.bounds_min(),
            ContextState::Closed { min, .. } => *min,
            ContextState::Uninitialized => None,
        }
    }

    pub fn bounds_max(&self) -> Option<Vec2> {
        match &self.state {
            ContextState::Initialized(session) => session.bounds_max(),
            ContextState::Closed { max, .. } => *max,
            ContextState::Uninitialized => None,
        }
    }

    /// Ends the session. With `discard = false` the finished document is
    /// written to the output sink in one piece; with `discard = true`, or for
    /// sessions without output, the surface is released unwritten. Closing
    /// twice is a no-op.
    pub fn close(&mut self, discard: bool) -> Result<()> {
        let mut session = match std::mem::replace(&mut self.state, ContextState::Uninitialized) {
            ContextState::Initialized(session) => session,
            ContextState::Uninitialized => return Err(RenderError::NotInitialized),
            closed @ ContextState::Closed { .. } => {
                self.state = closed;
                debug!("render context already closed");
                return Ok(());
            }
        };
        self.state = ContextState::Closed {
            min: session.bounds_min(),
            max: session.bounds_max(),
        };

        if session.transforms.depth() > 0 {
            warn!(
                depth = session.transforms.depth(),
                "closing session with unrestored transforms"
            );
        }
        session.fonts.dispose();

        if discard || !session.target.writes_output() {
            debug!(discard, "render session released without output");
            return Ok(());
        }

        session.canvas.status()?;
        let bytes = {
            let _guard = self.lock.acquire();
            session.canvas.finish()?
        };
        let output = self.output.as_mut().ok_or(RenderError::NoOutput)?;
        output.write_all(&bytes)?;
        output.flush()?;
        debug!(bytes = bytes.len(), "render session written");
        Ok(())
    }
}

impl<B: Backend> Drop for RenderContext<B> {
    fn drop(&mut self) {
        if self.is_initialized() {
            debug!("render context dropped with an open session; output discarded");
        }
    }
}

#[derive(Clone, Debug)]
struct SavedHighlight {
    line_width: f64,
    source: Option<Paint>,
}

/// Drawing state of one initialized render context.
pub struct Session<C: Canvas> {
    canvas: C,
    lock: BackendLock,
    options: Arc<RenderOptions>,
    settings: Arc<RenderSettings>,
    target: SessionTarget,
    width: u32,
    height: u32,
    transforms: TransformStack,
    /// Device space.
    bounds: BoundingBox,
    path: PathExtent,
    /// User space.
    current_point: Option<Vec2>,
    fonts: FontCache<C::Font>,
    dash: Vec<f64>,
    dash_offset: f64,
    line_width: f64,
    source: PatternSource,
    highlight: Option<SavedHighlight>,
}

impl<C: Canvas> Session<C> {
    fn start(&mut self) -> Result<()> {
        self.sync_transform()?;
        self.canvas.set_line_width(self.line_width)?;
        self.canvas.set_line_cap(LineCap::Round)?;
        self.canvas.set_line_join(LineJoin::Round)?;
        self.canvas.set_line_dash(&[], 0.0)?;
        for bold in [false, true] {
            self.font(FontSize::Label, bold)?;
        }
        self.canvas.status()
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn target(&self) -> SessionTarget {
        self.target
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn max_page_size(&self) -> Option<u32> {
        match self.target {
            SessionTarget::Surface(SurfaceTarget::Document {
                format: DocumentFormat::Pdf,
                ..
            }) => Some(MAX_PDF_PAGE_SIZE),
            _ => None,
        }
    }

    /// Fails if the backend surface has entered an error status.
    pub fn check_status(&self) -> Result<()> {
        self.canvas.status()
    }

    // Transforms

    fn sync_transform(&mut self) -> Result<()> {
        self.canvas.set_transform(self.transforms.current())
    }

    pub fn transform(&self) -> Affine {
        self.transforms.current()
    }

    pub fn translate(&mut self, dx: f64, dy: f64) -> Result<()> {
        self.transforms.translate(dx, dy);
        self.sync_transform()
    }

    pub fn scale(&mut self, s: f64) -> Result<()> {
        self.transforms.scale(s);
        self.sync_transform()
    }

    pub fn store_transform(&mut self) {
        self.transforms.store();
    }

    pub fn restore_transform(&mut self) -> Result<()> {
        self.transforms.restore()?;
        self.sync_transform()
    }

    pub fn remove_stored_transform(&mut self) -> Result<()> {
        self.transforms.remove()
    }

    pub fn reset_transform(&mut self) -> Result<()> {
        self.transforms.reset();
        trace!(depth = self.transforms.depth(), "transform reset to baseline");
        self.sync_transform()
    }

    fn to_device(&self, p: Vec2) -> Vec2 {
        self.transforms.current().apply(p)
    }

    // Bounding box

    pub fn include_point(&mut self, p: Vec2) {
        let d = self.to_device(p);
        self.bounds.include_point(d);
    }

    /// Grows the box by the current path, plus half the line width on every
    /// side when the path is about to be stroked.
    pub fn include_path(&mut self, stroke: bool) {
        let extent = if stroke {
            let half = self.line_width * self.transforms.current().scale_factor() / 2.0;
            self.path.extent().expanded(half)
        } else {
            *self.path.extent()
        };
        self.bounds.union(&extent);
    }

    /// The device-space box mapped back through the current transform, or
    /// through the baseline while the current one is singular.
    fn user_bounds(&self) -> BoundingBox {
        match self
            .transforms
            .current()
            .invert()
            .or_else(|| self.transforms.baseline().invert())
        {
            Some(inv) => self.bounds.transformed(inv),
            None => self.bounds,
        }
    }

    pub fn bounds_min(&self) -> Option<Vec2> {
        self.user_bounds().min()
    }

    pub fn bounds_max(&self) -> Option<Vec2> {
        self.user_bounds().max()
    }

    // Line width

    pub fn set_line_width(&mut self, width: f64) -> Result<()> {
        self.line_width = width;
        self.canvas.set_line_width(width)
    }

    pub fn current_line_width(&self) -> f64 {
        self.line_width
    }

    pub fn highlighted_bond_line_width(&self) -> f64 {
        self.settings.bond_line_width * self.options.highlight_thickness_factor
    }

    // Fonts

    pub fn set_font_family(&mut self, family: &str) {
        self.fonts.set_font_family(family);
    }

    pub fn set_font_size(&mut self, scale: f64) {
        self.fonts.set_font_size(scale);
    }

    pub fn font(&mut self, size: FontSize, bold: bool) -> Result<C::Font> {
        self.fonts
            .get_font(&mut self.canvas, &self.lock, &self.settings, size, bold)
    }

    pub fn text_extents(&mut self, text: &str, size: FontSize, bold: bool) -> Result<TextExtents> {
        self.fonts
            .text_extents(&mut self.canvas, &self.lock, &self.settings, text, size, bold)
    }

    pub fn dispose_fonts(&mut self) {
        self.fonts.dispose();
    }

    // Colors and paint source

    pub fn element_color(&self, label: u32) -> Rgb {
        self.options
            .element_colors
            .get(&label)
            .copied()
            .unwrap_or_else(|| element_color(label))
    }

    pub fn color(&self, key: ColorKey) -> Rgb {
        match key {
            ColorKey::Base => self.options.base_color,
            ColorKey::Background => self.options.background_color.unwrap_or(Rgb::WHITE),
            ColorKey::Highlight => self.options.highlight_color,
            ColorKey::White => Rgb::WHITE,
            ColorKey::Black => Rgb::BLACK,
            ColorKey::Red => Rgb::new(1.0, 0.0, 0.0),
            ColorKey::Green => Rgb::new(0.0, 1.0, 0.0),
            ColorKey::Blue => Rgb::new(0.0, 0.0, 1.0),
            ColorKey::DarkGreen => Rgb::new(0.0, 0.5, 0.0),
            ColorKey::Element(label) => self.element_color(label),
        }
    }

    pub fn set_single_source(&mut self, color: Rgb) {
        self.source.set_single(color);
    }

    pub fn set_single_source_key(&mut self, key: ColorKey) {
        let color = self.color(key);
        self.source.set_single(color);
    }

    pub fn set_gradient_source(&mut self, from: Rgb, to: Rgb, start: Vec2, end: Vec2) {
        self.source.set_gradient(from, to, start, end);
    }

    pub fn clear_pattern(&mut self) {
        self.source.clear();
    }

    pub fn paint_source(&self) -> Option<&Paint> {
        self.source.get()
    }

    /// Color for an item, honoring the highlight color when enabled.
    fn item_color(&self, color: Option<Rgb>, highlighted: bool) -> Rgb {
        if highlighted && self.options.highlight_color_enabled {
            self.options.highlight_color
        } else {
            color.unwrap_or(self.options.base_color)
        }
    }

    /// Pushes the active source to the backend under the backend lock.
    fn apply_source(&mut self) -> Result<()> {
        let paint = self.source.require()?.clone();
        let _guard = self.lock.acquire();
        self.canvas.set_source(&paint)
    }
}
