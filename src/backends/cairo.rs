//! Cairo backend behind the optional `cairo` crate feature. PDF and SVG
//! documents are rendered into in-memory streams, raster output into an
//! ARGB image surface that is encoded as PNG when the session finishes.

use cairo::{
    Context, FontFace, FontSlant, FontWeight, Format, ImageSurface, LineCap as CairoLineCap,
    LineJoin as CairoLineJoin, Matrix, PdfSurface, Surface, SvgSurface,
};
use png::{BitDepth, ColorType, Encoder as PngEncoder};
use tracing::debug;

use crate::api::*;
use crate::error::{RenderError, Result};
use crate::geometry::Affine;
use crate::lock::BackendLock;

enum SurfaceKind {
    /// Document surface writing into a `Vec<u8>` stream.
    Stream(Surface),
    Raster(ImageSurface),
    Null,
}

#[derive(Clone)]
pub struct CairoFont {
    face: FontFace,
    size: f64,
}

impl CairoFont {
    pub fn size(&self) -> f64 {
        self.size
    }
}

/// Adapter that translates canvas calls into Cairo operations.
pub struct CairoCanvas {
    ctx: Context,
    surface: SurfaceKind,
    finished: bool,
}

impl CairoCanvas {
    fn new(ctx: Context, surface: SurfaceKind) -> Self {
        Self {
            ctx,
            surface,
            finished: false,
        }
    }

    fn apply_font(&self, font: &CairoFont) {
        self.ctx.set_font_face(&font.face);
        self.ctx.set_font_size(font.size);
    }

    fn finish_stream(surface: &Surface) -> Result<Vec<u8>> {
        let stream = surface
            .finish_output_stream()
            .map_err(|e| RenderError::Surface(e.error.to_string()))?;
        stream
            .downcast::<Vec<u8>>()
            .map(|bytes| *bytes)
            .map_err(|_| RenderError::Surface(String::from("unexpected output stream type")))
    }

    fn encode_png(surface: &ImageSurface) -> Result<Vec<u8>> {
        surface.flush();
        let width = surface.width() as u32;
        let height = surface.height() as u32;
        let stride = surface.stride() as usize;
        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        surface
            .with_data(|data| {
                for row in data.chunks(stride).take(height as usize) {
                    for px in row[..width as usize * 4].chunks_exact(4) {
                        rgba.extend_from_slice(&unpremultiply(u32::from_ne_bytes([
                            px[0], px[1], px[2], px[3],
                        ])));
                    }
                }
            })
            .map_err(|e| RenderError::Surface(e.to_string()))?;

        let mut out = Vec::new();
        let mut encoder = PngEncoder::new(&mut out, width, height);
        encoder.set_color(ColorType::Rgba);
        encoder.set_depth(BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&rgba)?;
        writer.finish()?;
        Ok(out)
    }
}

/// Cairo ARGB32 pixels are premultiplied, native-endian `0xAARRGGBB`.
fn unpremultiply(px: u32) -> [u8; 4] {
    let a = px >> 24;
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let channel = |shift: u32| (((px >> shift) & 0xff) * 255 + a / 2) / a;
    [
        channel(16) as u8,
        channel(8) as u8,
        channel(0) as u8,
        a as u8,
    ]
}

impl CanvasState for CairoCanvas {
    fn save(&mut self) -> Result<()> {
        self.ctx.save()?;
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        self.ctx.restore()?;
        Ok(())
    }
}

impl CanvasTransforms for CairoCanvas {
    fn set_transform(&mut self, m: Affine) -> Result<()> {
        let [a, b, c, d, e, f] = m.0;
        self.ctx.set_matrix(Matrix::new(a, b, c, d, e, f));
        Ok(())
    }

    fn transform(&self) -> Affine {
        let m = self.ctx.matrix();
        Affine([m.xx(), m.yx(), m.xy(), m.yy(), m.x0(), m.y0()])
    }
}

impl CanvasLineStyles for CairoCanvas {
    fn set_line_width(&mut self, value: f64) -> Result<()> {
        self.ctx.set_line_width(value);
        Ok(())
    }

    fn line_width(&self) -> f64 {
        self.ctx.line_width()
    }

    fn set_line_cap(&mut self, value: LineCap) -> Result<()> {
        self.ctx.set_line_cap(map_line_cap(value));
        Ok(())
    }

    fn set_line_join(&mut self, value: LineJoin) -> Result<()> {
        self.ctx.set_line_join(map_line_join(value));
        Ok(())
    }

    fn set_line_dash(&mut self, segments: &[f64], offset: f64) -> Result<()> {
        self.ctx.set_dash(segments, offset);
        Ok(())
    }

    fn line_dash(&self) -> (Vec<f64>, f64) {
        self.ctx.dash()
    }
}

impl CanvasFillStrokeStyles for CairoCanvas {
    fn set_source(&mut self, paint: &Paint) -> Result<()> {
        match paint {
            Paint::Solid(c) => self.ctx.set_source_rgb(c.r, c.g, c.b),
            Paint::LinearGradient {
                from,
                to,
                start,
                end,
            } => {
                let pattern = cairo::LinearGradient::new(start.x, start.y, end.x, end.y);
                pattern.add_color_stop_rgb(0.0, from.r, from.g, from.b);
                pattern.add_color_stop_rgb(1.0, to.r, to.g, to.b);
                self.ctx.set_source(&pattern)?;
            }
        }
        Ok(())
    }
}

impl CanvasPaths for CairoCanvas {
    fn begin_path(&mut self) -> Result<()> {
        self.ctx.new_path();
        Ok(())
    }

    fn close_path(&mut self) -> Result<()> {
        self.ctx.close_path();
        Ok(())
    }

    fn move_to(&mut self, x: f64, y: f64) -> Result<()> {
        self.ctx.move_to(x, y);
        Ok(())
    }

    fn line_to(&mut self, x: f64, y: f64) -> Result<()> {
        self.ctx.line_to(x, y);
        Ok(())
    }

    fn arc(&mut self, x: f64, y: f64, radius: f64, start_angle: f64, end_angle: f64) -> Result<()> {
        self.ctx.arc(x, y, radius, start_angle, end_angle);
        Ok(())
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        self.ctx.rectangle(x, y, w, h);
        Ok(())
    }

    fn fill(&mut self) -> Result<()> {
        self.ctx.fill()?;
        Ok(())
    }

    fn stroke(&mut self) -> Result<()> {
        self.ctx.stroke()?;
        Ok(())
    }
}

impl CanvasText for CairoCanvas {
    type Font = CairoFont;

    fn create_font(&mut self, family: &str, size: f64, bold: bool) -> Result<CairoFont> {
        let weight = if bold {
            FontWeight::Bold
        } else {
            FontWeight::Normal
        };
        let face = FontFace::toy_create(family, FontSlant::Normal, weight)?;
        Ok(CairoFont { face, size })
    }

    fn text_extents(&mut self, font: &CairoFont, text: &str) -> Result<TextExtents> {
        self.ctx.save()?;
        self.apply_font(font);
        let measured = self.ctx.text_extents(text).and_then(|te| {
            let fe = self.ctx.font_extents()?;
            Ok(TextExtents {
                x_bearing: te.x_bearing(),
                y_bearing: te.y_bearing(),
                width: te.width(),
                height: te.height(),
                x_advance: te.x_advance(),
                line_height: fe.height(),
                ascent: fe.ascent(),
                descent: fe.descent(),
            })
        });
        self.ctx.restore()?;
        Ok(measured?)
    }

    fn fill_text(&mut self, font: &CairoFont, text: &str, x: f64, y: f64) -> Result<()> {
        self.apply_font(font);
        self.ctx.move_to(x, y);
        self.ctx.show_text(text)?;
        self.ctx.new_path();
        Ok(())
    }
}

impl CanvasSurface for CairoCanvas {
    fn status(&self) -> Result<()> {
        self.ctx.status()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        if self.finished {
            return Err(RenderError::Surface(String::from("surface already finished")));
        }
        self.finished = true;
        let bytes = match &self.surface {
            SurfaceKind::Stream(surface) => Self::finish_stream(surface)?,
            SurfaceKind::Raster(surface) => Self::encode_png(surface)?,
            SurfaceKind::Null => Vec::new(),
        };
        debug!(bytes = bytes.len(), "cairo surface finished");
        Ok(bytes)
    }
}

impl Canvas for CairoCanvas {}

/// Creates Cairo surfaces. Cairo's font and surface bookkeeping is
/// process-global, so every Cairo session shares [`BackendLock::shared`].
#[derive(Clone, Debug, Default)]
pub struct CairoBackend;

impl CairoBackend {
    pub fn new() -> Self {
        CairoBackend
    }
}

impl Backend for CairoBackend {
    type Canvas = CairoCanvas;

    fn create_surface(&mut self, target: SurfaceTarget) -> Result<CairoCanvas> {
        let (ctx, surface) = match target {
            SurfaceTarget::Document {
                format: DocumentFormat::Pdf,
                width,
                height,
            } => {
                let s = PdfSurface::for_stream(width as f64, height as f64, Vec::<u8>::new())?;
                (Context::new(&s)?, SurfaceKind::Stream((*s).clone()))
            }
            SurfaceTarget::Document {
                format: DocumentFormat::Svg,
                width,
                height,
            } => {
                let s = SvgSurface::for_stream(width as f64, height as f64, Vec::<u8>::new())?;
                (Context::new(&s)?, SurfaceKind::Stream((*s).clone()))
            }
            SurfaceTarget::Raster { width, height } => {
                let s = ImageSurface::create(Format::ARgb32, width as i32, height as i32)?;
                (Context::new(&s)?, SurfaceKind::Raster(s))
            }
            SurfaceTarget::Null => {
                let s = ImageSurface::create(Format::ARgb32, 1, 1)?;
                (Context::new(&s)?, SurfaceKind::Null)
            }
        };
        Ok(CairoCanvas::new(ctx, surface))
    }

    fn lock(&self) -> BackendLock {
        BackendLock::shared()
    }
}

fn map_line_cap(cap: LineCap) -> CairoLineCap {
    match cap {
        LineCap::Butt => CairoLineCap::Butt,
        LineCap::Round => CairoLineCap::Round,
        LineCap::Square => CairoLineCap::Square,
    }
}

fn map_line_join(join: LineJoin) -> CairoLineJoin {
    match join {
        LineJoin::Bevel => CairoLineJoin::Bevel,
        LineJoin::Miter => CairoLineJoin::Miter,
        LineJoin::Round => CairoLineJoin::Round,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;

    fn draw_square(canvas: &mut CairoCanvas) -> Result<()> {
        canvas.set_source(&Paint::Solid(Rgb::new(1.0, 0.0, 0.0)))?;
        canvas.rect(1.0, 1.0, 2.0, 2.0)?;
        canvas.fill()
    }

    #[test]
    fn raster_output_is_png() {
        let mut backend = CairoBackend::new();
        let mut canvas = backend
            .create_surface(SurfaceTarget::Raster {
                width: 4,
                height: 4,
            })
            .unwrap();
        draw_square(&mut canvas).unwrap();
        let bytes = canvas.finish().unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        assert!(canvas.finish().is_err());
    }

    #[test]
    fn pdf_output_has_header() {
        let mut backend = CairoBackend::new();
        let mut canvas = backend
            .create_surface(SurfaceTarget::Document {
                format: DocumentFormat::Pdf,
                width: 20,
                height: 20,
            })
            .unwrap();
        draw_square(&mut canvas).unwrap();
        let bytes = canvas.finish().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn transform_round_trips_through_cairo() {
        let mut canvas = CairoBackend::new().create_surface(SurfaceTarget::Null).unwrap();
        let m = Affine([2.0, 0.0, 0.0, -2.0, 3.0, 40.0]);
        canvas.set_transform(m).unwrap();
        assert_eq!(canvas.transform(), m);
        canvas.status().unwrap();
    }

    #[test]
    fn text_extents_leave_state_alone() {
        let mut canvas = CairoBackend::new().create_surface(SurfaceTarget::Null).unwrap();
        let font = canvas.create_font("Sans", 12.0, true).unwrap();
        canvas.set_line_width(3.0).unwrap();
        assert_eq!(font.size(), 12.0);
        let te = canvas.text_extents(&font, "NH2").unwrap();
        assert!(te.x_advance > 0.0);
        assert_eq!(canvas.line_width(), 3.0);
    }

    #[test]
    fn unpremultiply_recovers_channels() {
        assert_eq!(unpremultiply(0x8080_0000), [255, 0, 0, 128]);
        assert_eq!(unpremultiply(0), [0, 0, 0, 0]);
    }
}
