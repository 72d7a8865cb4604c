//! Backend that records every paint operation together with a snapshot of
//! the state it was issued under. Used for measuring sessions, tests and as
//! the print/metafile capability, where the recorded list is the metafile.

use std::fmt::Write as _;

use crate::api::*;
use crate::color::Rgb;
use crate::error::{RenderError, Result};
use crate::geometry::Affine;
use crate::lock::BackendLock;

#[derive(Debug, Clone, PartialEq)]
pub enum PathCommand {
    MoveTo {
        x: f64,
        y: f64,
    },
    LineTo {
        x: f64,
        y: f64,
    },
    Arc {
        x: f64,
        y: f64,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    },
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
    },
    ClosePath,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPath {
    pub commands: Vec<PathCommand>,
}

impl RecordedPath {
    pub fn new(commands: Vec<PathCommand>) -> Self {
        Self { commands }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFont {
    pub family: String,
    pub size: f64,
    pub bold: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub line_width: f64,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub line_dash: Vec<f64>,
    pub line_dash_offset: f64,
    pub source: Paint,
    pub transform: Affine,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    FillPath {
        path: RecordedPath,
        state: Snapshot,
    },
    StrokePath {
        path: RecordedPath,
        state: Snapshot,
    },
    FillText {
        text: String,
        x: f64,
        y: f64,
        font: RecordedFont,
        state: Snapshot,
    },
}

impl DrawOp {
    pub fn state(&self) -> &Snapshot {
        match self {
            DrawOp::FillPath { state, .. }
            | DrawOp::StrokePath { state, .. }
            | DrawOp::FillText { state, .. } => state,
        }
    }
}

#[derive(Clone, Debug)]
struct RecorderState {
    line_width: f64,
    line_cap: LineCap,
    line_join: LineJoin,
    line_dash: Vec<f64>,
    line_dash_offset: f64,
    source: Paint,
    transform: Affine,
}

impl Default for RecorderState {
    fn default() -> Self {
        Self {
            line_width: 2.0,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            line_dash: Vec::new(),
            line_dash_offset: 0.0,
            source: Paint::Solid(Rgb::BLACK),
            transform: Affine::IDENTITY,
        }
    }
}

pub struct RecordingCanvas {
    width: u32,
    height: u32,
    label: String,
    ops: Vec<DrawOp>,
    state: RecorderState,
    stack: Vec<RecorderState>,
    current_path: Vec<PathCommand>,
    fonts_created: usize,
    fail_fonts: bool,
    failure: Option<String>,
    finished: bool,
}

impl RecordingCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            label: String::from("recording"),
            ops: Vec::new(),
            state: RecorderState::default(),
            stack: Vec::new(),
            current_path: Vec::new(),
            fonts_created: 0,
            fail_fonts: false,
            failure: None,
            finished: false,
        }
    }

    fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn fonts_created(&self) -> usize {
        self.fonts_created
    }

    /// Makes subsequent font creation fail, as a backend without the
    /// requested face would.
    pub fn fail_font_creation(&mut self, fail: bool) {
        self.fail_fonts = fail;
    }

    /// Puts the surface into an error status.
    pub fn set_failed(&mut self, reason: impl Into<String>) {
        self.failure = Some(reason.into());
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            line_width: self.state.line_width,
            line_cap: self.state.line_cap,
            line_join: self.state.line_join,
            line_dash: self.state.line_dash.clone(),
            line_dash_offset: self.state.line_dash_offset,
            source: self.state.source.clone(),
            transform: self.state.transform,
        }
    }

    fn push_path(&mut self, cmd: PathCommand) {
        self.current_path.push(cmd);
    }

    fn consume_path(&mut self) -> RecordedPath {
        RecordedPath::new(std::mem::take(&mut self.current_path))
    }

    fn record_op(&mut self, op: DrawOp) {
        self.ops.push(op);
    }
}

impl CanvasState for RecordingCanvas {
    fn save(&mut self) -> Result<()> {
        self.stack.push(self.state.clone());
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
        Ok(())
    }
}

impl CanvasTransforms for RecordingCanvas {
    fn set_transform(&mut self, m: Affine) -> Result<()> {
        self.state.transform = m;
        Ok(())
    }

    fn transform(&self) -> Affine {
        self.state.transform
    }
}

impl CanvasLineStyles for RecordingCanvas {
    fn set_line_width(&mut self, value: f64) -> Result<()> {
        self.state.line_width = value;
        Ok(())
    }

    fn line_width(&self) -> f64 {
        self.state.line_width
    }

    fn set_line_cap(&mut self, value: LineCap) -> Result<()> {
        self.state.line_cap = value;
        Ok(())
    }

    fn set_line_join(&mut self, value: LineJoin) -> Result<()> {
        self.state.line_join = value;
        Ok(())
    }

    fn set_line_dash(&mut self, segments: &[f64], offset: f64) -> Result<()> {
        self.state.line_dash = segments.to_vec();
        self.state.line_dash_offset = offset;
        Ok(())
    }

    fn line_dash(&self) -> (Vec<f64>, f64) {
        (self.state.line_dash.clone(), self.state.line_dash_offset)
    }
}

impl CanvasFillStrokeStyles for RecordingCanvas {
    fn set_source(&mut self, paint: &Paint) -> Result<()> {
        self.state.source = paint.clone();
        Ok(())
    }
}

impl CanvasPaths for RecordingCanvas {
    fn begin_path(&mut self) -> Result<()> {
        self.current_path.clear();
        Ok(())
    }

    fn close_path(&mut self) -> Result<()> {
        self.push_path(PathCommand::ClosePath);
        Ok(())
    }

    fn move_to(&mut self, x: f64, y: f64) -> Result<()> {
        self.push_path(PathCommand::MoveTo { x, y });
        Ok(())
    }

    fn line_to(&mut self, x: f64, y: f64) -> Result<()> {
        self.push_path(PathCommand::LineTo { x, y });
        Ok(())
    }

    fn arc(&mut self, x: f64, y: f64, radius: f64, start_angle: f64, end_angle: f64) -> Result<()> {
        self.push_path(PathCommand::Arc {
            x,
            y,
            radius,
            start_angle,
            end_angle,
        });
        Ok(())
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        self.push_path(PathCommand::Rect { x, y, w, h });
        Ok(())
    }

    fn fill(&mut self) -> Result<()> {
        if self.current_path.is_empty() {
            return Ok(());
        }
        let path = self.consume_path();
        let op = DrawOp::FillPath {
            path,
            state: self.snapshot(),
        };
        self.record_op(op);
        Ok(())
    }

    fn stroke(&mut self) -> Result<()> {
        if self.current_path.is_empty() {
            return Ok(());
        }
        let path = self.consume_path();
        let op = DrawOp::StrokePath {
            path,
            state: self.snapshot(),
        };
        self.record_op(op);
        Ok(())
    }
}

impl CanvasText for RecordingCanvas {
    type Font = RecordedFont;

    fn create_font(&mut self, family: &str, size: f64, bold: bool) -> Result<RecordedFont> {
        if self.fail_fonts {
            return Err(RenderError::Unsupported("font creation"));
        }
        self.fonts_created += 1;
        Ok(RecordedFont {
            family: family.to_owned(),
            size,
            bold,
        })
    }

    /// Fixed-pitch approximation; the recorder has no real font metrics.
    fn text_extents(&mut self, font: &RecordedFont, text: &str) -> Result<TextExtents> {
        let s = font.size;
        let n = text.chars().count() as f64;
        let advance = if font.bold { 0.65 } else { 0.6 } * s;
        Ok(TextExtents {
            x_bearing: 0.0,
            y_bearing: -0.7 * s,
            width: advance * n,
            height: 0.7 * s,
            x_advance: advance * n,
            line_height: s,
            ascent: 0.8 * s,
            descent: 0.2 * s,
        })
    }

    fn fill_text(&mut self, font: &RecordedFont, text: &str, x: f64, y: f64) -> Result<()> {
        let op = DrawOp::FillText {
            text: text.to_owned(),
            x,
            y,
            font: font.clone(),
            state: self.snapshot(),
        };
        self.record_op(op);
        Ok(())
    }
}

impl CanvasSurface for RecordingCanvas {
    fn status(&self) -> Result<()> {
        match &self.failure {
            Some(reason) => Err(RenderError::Surface(reason.clone())),
            None => Ok(()),
        }
    }

    /// One line per recorded operation after a header naming the surface.
    fn finish(&mut self) -> Result<Vec<u8>> {
        self.status()?;
        if self.finished {
            return Err(RenderError::Surface(String::from("surface already finished")));
        }
        self.finished = true;
        let mut out = format!("{} {}x{}\n", self.label, self.width, self.height);
        for op in &self.ops {
            // Writing into a String cannot fail.
            let _ = writeln!(out, "{:?}", op);
        }
        Ok(out.into_bytes())
    }
}

impl Canvas for RecordingCanvas {}

/// Factory for [`RecordingCanvas`] surfaces.
#[derive(Clone, Debug, Default)]
pub struct RecordingBackend {
    lock: BackendLock,
    fail_surfaces: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes sessions through `lock`, as a backend with global state would.
    pub fn with_lock(lock: BackendLock) -> Self {
        Self {
            lock,
            fail_surfaces: false,
        }
    }

    /// Every surface created afterwards starts in an error status.
    pub fn fail_surfaces(&mut self, fail: bool) {
        self.fail_surfaces = fail;
    }

    fn surface(&self, canvas: RecordingCanvas) -> RecordingCanvas {
        let mut canvas = canvas;
        if self.fail_surfaces {
            canvas.set_failed("surface allocation failed");
        }
        canvas
    }
}

impl Backend for RecordingBackend {
    type Canvas = RecordingCanvas;

    fn create_surface(&mut self, target: SurfaceTarget) -> Result<RecordingCanvas> {
        let canvas = match target {
            SurfaceTarget::Document {
                format,
                width,
                height,
            } => RecordingCanvas::new(width, height).labelled(match format {
                DocumentFormat::Pdf => "pdf",
                DocumentFormat::Svg => "svg",
            }),
            SurfaceTarget::Raster { width, height } => {
                RecordingCanvas::new(width, height).labelled("raster")
            }
            SurfaceTarget::Null => RecordingCanvas::new(1, 1).labelled("null"),
        };
        Ok(self.surface(canvas))
    }

    fn lock(&self) -> BackendLock {
        self.lock.clone()
    }

    fn print_support(&mut self) -> Option<&mut dyn PrintSupport<Canvas = RecordingCanvas>> {
        Some(self)
    }
}

impl PrintSupport for RecordingBackend {
    type Canvas = RecordingCanvas;

    fn create_print_surface(&mut self, target: PrintTarget) -> Result<RecordingCanvas> {
        let canvas = match target {
            PrintTarget::Device(handle) => {
                RecordingCanvas::new(0, 0).labelled(format!("device:{handle:#x}"))
            }
            PrintTarget::Metafile { width, height } => {
                RecordingCanvas::new(width, height).labelled("metafile")
            }
        };
        Ok(self.surface(canvas))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_fill_with_state() {
        let mut c = RecordingCanvas::new(10, 10);
        c.set_source(&Paint::Solid(Rgb::new(1.0, 0.0, 0.0))).unwrap();
        c.rect(1.0, 2.0, 3.0, 4.0).unwrap();
        c.fill().unwrap();
        let ops = c.ops();
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            DrawOp::FillPath { path, state } => {
                assert_eq!(
                    path.commands,
                    vec![PathCommand::Rect {
                        x: 1.0,
                        y: 2.0,
                        w: 3.0,
                        h: 4.0
                    }]
                );
                assert_eq!(state.source, Paint::Solid(Rgb::new(1.0, 0.0, 0.0)));
                assert_eq!(state.transform, Affine::IDENTITY);
            }
            _ => panic!("unexpected op"),
        }
    }

    #[test]
    fn save_restore_brackets_state() {
        let mut c = RecordingCanvas::new(10, 10);
        c.save().unwrap();
        c.set_transform(Affine::translation(5.0, 6.0)).unwrap();
        c.set_line_dash(&[2.0, 1.0], 0.5).unwrap();
        c.restore().unwrap();
        assert_eq!(c.transform(), Affine::IDENTITY);
        assert_eq!(c.line_dash(), (Vec::new(), 0.0));
    }

    #[test]
    fn empty_paths_record_nothing() {
        let mut c = RecordingCanvas::new(10, 10);
        c.stroke().unwrap();
        c.fill().unwrap();
        assert!(c.ops().is_empty());
    }

    #[test]
    fn finish_lists_ops_once() {
        let mut c = RecordingCanvas::new(4, 3);
        c.move_to(0.0, 0.0).unwrap();
        c.line_to(1.0, 1.0).unwrap();
        c.stroke().unwrap();
        let text = String::from_utf8(c.finish().unwrap()).unwrap();
        assert!(text.starts_with("recording 4x3\n"));
        assert!(text.contains("StrokePath"));
        assert!(c.finish().is_err());
    }

    #[test]
    fn print_support_is_offered() {
        let mut backend = RecordingBackend::new();
        let printer = backend.print_support().expect("print capability");
        let canvas = printer
            .create_print_surface(PrintTarget::Metafile {
                width: 20,
                height: 10,
            })
            .unwrap();
        assert_eq!(canvas.size(), (20, 10));
    }
}
