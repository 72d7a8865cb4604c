//! SVG backend using a streaming XML writer. Paths are accumulated as SVG
//! path data and emitted as `<path>` elements carrying the transform, paint
//! and stroke attributes in effect when they are painted.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::api::*;
use crate::color::Rgb;
use crate::error::{RenderError, Result};
use crate::geometry::{Affine, Vec2};

/// Average glyph advance as a fraction of the font size; SVG output has no
/// access to real font metrics.
const REGULAR_ADVANCE: f64 = 0.55;
const BOLD_ADVANCE: f64 = 0.6;

#[derive(Clone, Debug, PartialEq)]
pub struct SvgFont {
    pub family: String,
    pub size: f64,
    pub bold: bool,
}

#[derive(Clone)]
struct SvgState {
    line_width: f64,
    line_cap: LineCap,
    line_join: LineJoin,
    line_dash: Vec<f64>,
    line_dash_offset: f64,
    source: Paint,
    transform: Affine,
}

impl Default for SvgState {
    fn default() -> Self {
        Self {
            line_width: 1.0,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            line_dash: Vec::new(),
            line_dash_offset: 0.0,
            source: Paint::Solid(Rgb::BLACK),
            transform: Affine::IDENTITY,
        }
    }
}

/// SVG document canvas around `quick_xml::Writer`, buffered in memory.
pub struct SvgCanvas {
    writer: Writer<Vec<u8>>,
    open_root: bool,
    width: f64,
    height: f64,
    current_path: String,
    current_point: Option<Vec2>,
    state: SvgState,
    stack: Vec<SvgState>,
    gradient_counter: usize,
}

impl SvgCanvas {
    /// Starts a document with the root `<svg>` element. Width and height are
    /// in CSS pixels; a matching `viewBox` is set.
    pub fn new(width: f64, height: f64) -> Result<Self> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let width_attr = width.to_string();
        let height_attr = height.to_string();
        let view_box_attr = format!("0 0 {} {}", width, height);

        let mut start = BytesStart::new("svg");
        start.push_attribute(("xmlns", "http://www.w3.org/2000/svg"));
        start.push_attribute(("version", "1.1"));
        start.push_attribute(("width", width_attr.as_str()));
        start.push_attribute(("height", height_attr.as_str()));
        start.push_attribute(("viewBox", view_box_attr.as_str()));
        writer.write_event(Event::Start(start))?;

        Ok(Self {
            writer,
            open_root: true,
            width,
            height,
            current_path: String::new(),
            current_point: None,
            state: SvgState::default(),
            stack: Vec::new(),
            gradient_counter: 0,
        })
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn write_empty(&mut self, elem: BytesStart<'_>) -> Result<()> {
        self.writer.write_event(Event::Empty(elem))?;
        Ok(())
    }

    fn paint_to_str(&mut self) -> Result<String> {
        match self.state.source.clone() {
            Paint::Solid(c) => Ok(c.to_hex_string()),
            Paint::LinearGradient {
                from,
                to,
                start,
                end,
            } => {
                let id = format!("grad{}", self.gradient_counter);
                self.gradient_counter += 1;
                self.write_gradient_def(&id, from, to, start, end)?;
                Ok(format!("url(#{})", id))
            }
        }
    }

    fn write_gradient_def(&mut self, id: &str, from: Rgb, to: Rgb, start: Vec2, end: Vec2) -> Result<()> {
        self.writer
            .write_event(Event::Start(BytesStart::new("defs")))?;

        let mut elem = BytesStart::new("linearGradient");
        elem.push_attribute(("id", id));
        elem.push_attribute(("gradientUnits", "userSpaceOnUse"));
        let x1_attr = start.x.to_string();
        let y1_attr = start.y.to_string();
        let x2_attr = end.x.to_string();
        let y2_attr = end.y.to_string();
        elem.push_attribute(("x1", x1_attr.as_str()));
        elem.push_attribute(("y1", y1_attr.as_str()));
        elem.push_attribute(("x2", x2_attr.as_str()));
        elem.push_attribute(("y2", y2_attr.as_str()));
        self.writer.write_event(Event::Start(elem))?;

        for (offset, color) in [("0", from), ("1", to)] {
            let mut stop_elem = BytesStart::new("stop");
            let color_attr = color.to_hex_string();
            stop_elem.push_attribute(("offset", offset));
            stop_elem.push_attribute(("stop-color", color_attr.as_str()));
            self.write_empty(stop_elem)?;
        }

        self.writer
            .write_event(Event::End(BytesEnd::new("linearGradient")))?;
        self.writer.write_event(Event::End(BytesEnd::new("defs")))?;
        Ok(())
    }

    fn flush_path_fill(&mut self) -> Result<()> {
        if self.current_path.is_empty() {
            return Ok(());
        }
        let fill = self.paint_to_str()?;
        let d = std::mem::take(&mut self.current_path);
        self.current_point = None;
        let mut elem = BytesStart::new("path");
        elem.push_attribute(("d", d.as_str()));
        elem.push_attribute(("fill", fill.as_str()));
        elem.push_attribute(("stroke", "none"));
        self.apply_transform_attr(&mut elem);
        self.write_empty(elem)
    }

    fn flush_path_stroke(&mut self) -> Result<()> {
        if self.current_path.is_empty() {
            return Ok(());
        }
        let stroke = self.paint_to_str()?;
        let d = std::mem::take(&mut self.current_path);
        self.current_point = None;
        let stroke_width_attr = self.state.line_width.to_string();
        let mut elem = BytesStart::new("path");
        elem.push_attribute(("d", d.as_str()));
        elem.push_attribute(("fill", "none"));
        elem.push_attribute(("stroke", stroke.as_str()));
        elem.push_attribute(("stroke-width", stroke_width_attr.as_str()));
        elem.push_attribute((
            "stroke-linecap",
            match self.state.line_cap {
                LineCap::Butt => "butt",
                LineCap::Round => "round",
                LineCap::Square => "square",
            },
        ));
        elem.push_attribute((
            "stroke-linejoin",
            match self.state.line_join {
                LineJoin::Round => "round",
                LineJoin::Bevel => "bevel",
                LineJoin::Miter => "miter",
            },
        ));
        if !self.state.line_dash.is_empty() {
            let dash = self
                .state
                .line_dash
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            elem.push_attribute(("stroke-dasharray", dash.as_str()));
        }
        if self.state.line_dash_offset != 0.0 {
            let dash_offset_attr = self.state.line_dash_offset.to_string();
            elem.push_attribute(("stroke-dashoffset", dash_offset_attr.as_str()));
        }
        self.apply_transform_attr(&mut elem);
        self.write_empty(elem)
    }

    fn push_path(&mut self, cmd: &str) {
        if !self.current_path.is_empty() {
            self.current_path.push(' ');
        }
        self.current_path.push_str(cmd);
    }

    /// Appends arc commands sweeping with increasing angle, split so that
    /// no single SVG arc exceeds half a turn.
    fn append_arc_segments(&mut self, center: Vec2, radius: f64, start_angle: f64, end_angle: f64) {
        let tau = std::f64::consts::TAU;
        let mut delta = end_angle - start_angle;
        while delta < 0.0 {
            delta += tau;
        }
        if delta.abs() < 1e-12 {
            return;
        }

        let mut remaining = delta;
        let mut current_angle = start_angle;
        let max_step = std::f64::consts::PI;

        while remaining > 1e-12 {
            let step = remaining.min(max_step);
            let next_angle = current_angle + step;
            let end = center + Vec2::new(next_angle.cos(), next_angle.sin()) * radius;
            let large_arc = if step >= max_step - 1e-9 { 1 } else { 0 };

            self.push_path(&format!(
                "A {} {} 0 {} 1 {} {}",
                radius, radius, large_arc, end.x, end.y
            ));
            self.current_point = Some(end);

            current_angle = next_angle;
            remaining -= step;
        }
    }

    fn apply_transform_attr(&self, elem: &mut BytesStart<'_>) {
        if self.state.transform != Affine::IDENTITY {
            let [a, b, c, d, e, f] = self.state.transform.0;
            let transform_attr = format!("matrix({} {} {} {} {} {})", a, b, c, d, e, f);
            elem.push_attribute(("transform", transform_attr.as_str()));
        }
    }
}

impl CanvasState for SvgCanvas {
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

impl CanvasTransforms for SvgCanvas {
    fn set_transform(&mut self, m: Affine) -> Result<()> {
        self.state.transform = m;
        Ok(())
    }

    fn transform(&self) -> Affine {
        self.state.transform
    }
}

impl CanvasLineStyles for SvgCanvas {
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

impl CanvasFillStrokeStyles for SvgCanvas {
    fn set_source(&mut self, paint: &Paint) -> Result<()> {
        self.state.source = paint.clone();
        Ok(())
    }
}

impl CanvasPaths for SvgCanvas {
    fn begin_path(&mut self) -> Result<()> {
        self.current_path.clear();
        self.current_point = None;
        Ok(())
    }

    fn close_path(&mut self) -> Result<()> {
        if !self.current_path.is_empty() {
            self.push_path("Z");
        }
        Ok(())
    }

    fn move_to(&mut self, x: f64, y: f64) -> Result<()> {
        self.push_path(&format!("M {} {}", x, y));
        self.current_point = Some(Vec2::new(x, y));
        Ok(())
    }

    fn line_to(&mut self, x: f64, y: f64) -> Result<()> {
        if self.current_point.is_none() {
            return self.move_to(x, y);
        }
        self.push_path(&format!("L {} {}", x, y));
        self.current_point = Some(Vec2::new(x, y));
        Ok(())
    }

    fn arc(&mut self, x: f64, y: f64, radius: f64, start_angle: f64, end_angle: f64) -> Result<()> {
        if radius <= 0.0 {
            return Ok(());
        }
        let center = Vec2::new(x, y);
        let start = center + Vec2::new(start_angle.cos(), start_angle.sin()) * radius;

        match self.current_point {
            Some(p) => {
                if (p.x - start.x).abs() > 1e-9 || (p.y - start.y).abs() > 1e-9 {
                    self.line_to(start.x, start.y)?;
                }
            }
            None => {
                self.move_to(start.x, start.y)?;
            }
        }

        self.append_arc_segments(center, radius, start_angle, end_angle);
        Ok(())
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        self.push_path(&format!("M {} {} h {} v {} h {} Z", x, y, w, h, -w));
        self.current_point = Some(Vec2::new(x, y));
        Ok(())
    }

    fn fill(&mut self) -> Result<()> {
        self.flush_path_fill()
    }

    fn stroke(&mut self) -> Result<()> {
        self.flush_path_stroke()
    }
}

impl CanvasText for SvgCanvas {
    type Font = SvgFont;

    fn create_font(&mut self, family: &str, size: f64, bold: bool) -> Result<SvgFont> {
        if family.is_empty() {
            return Err(RenderError::Unsupported("unnamed font families"));
        }
        Ok(SvgFont {
            family: family.to_owned(),
            size,
            bold,
        })
    }

    fn text_extents(&mut self, font: &SvgFont, text: &str) -> Result<TextExtents> {
        let s = font.size;
        let advance = s * if font.bold { BOLD_ADVANCE } else { REGULAR_ADVANCE };
        let width = advance * text.chars().count() as f64;
        Ok(TextExtents {
            x_bearing: 0.0,
            y_bearing: -0.72 * s,
            width,
            height: 0.72 * s,
            x_advance: width,
            line_height: 1.15 * s,
            ascent: 0.9 * s,
            descent: 0.25 * s,
        })
    }

    fn fill_text(&mut self, font: &SvgFont, text: &str, x: f64, y: f64) -> Result<()> {
        let mut elem = BytesStart::new("text");
        let x_attr = x.to_string();
        let y_attr = y.to_string();
        let size_attr = font.size.to_string();
        let fill = self.paint_to_str()?;
        elem.push_attribute(("x", x_attr.as_str()));
        elem.push_attribute(("y", y_attr.as_str()));
        elem.push_attribute(("fill", fill.as_str()));
        elem.push_attribute(("font-family", font.family.as_str()));
        elem.push_attribute(("font-size", size_attr.as_str()));
        if font.bold {
            elem.push_attribute(("font-weight", "bold"));
        }
        self.apply_transform_attr(&mut elem);
        self.writer.write_event(Event::Start(elem))?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.writer.write_event(Event::End(BytesEnd::new("text")))?;
        Ok(())
    }
}

impl CanvasSurface for SvgCanvas {
    fn status(&self) -> Result<()> {
        Ok(())
    }

    /// Closes the root element and hands back the document.
    fn finish(&mut self) -> Result<Vec<u8>> {
        if !self.open_root {
            return Err(RenderError::Surface(String::from("surface already finished")));
        }
        self.writer.write_event(Event::End(BytesEnd::new("svg")))?;
        self.open_root = false;
        Ok(std::mem::take(self.writer.get_mut()))
    }
}

impl Canvas for SvgCanvas {}

/// Creates standalone SVG documents without any native dependency.
#[derive(Clone, Debug, Default)]
pub struct SvgBackend;

impl SvgBackend {
    pub fn new() -> Self {
        SvgBackend
    }
}

impl Backend for SvgBackend {
    type Canvas = SvgCanvas;

    fn create_surface(&mut self, target: SurfaceTarget) -> Result<SvgCanvas> {
        match target {
            SurfaceTarget::Document {
                format: DocumentFormat::Svg,
                width,
                height,
            } => SvgCanvas::new(width as f64, height as f64),
            SurfaceTarget::Document {
                format: DocumentFormat::Pdf,
                ..
            } => Err(RenderError::Unsupported("PDF documents")),
            SurfaceTarget::Raster { .. } => Err(RenderError::Unsupported("raster surfaces")),
            SurfaceTarget::Null => SvgCanvas::new(1.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svg_output<F>(f: F) -> String
    where
        F: FnOnce(&mut SvgCanvas) -> Result<()>,
    {
        let mut svg = SvgCanvas::new(100.0, 100.0).expect("create svg");
        f(&mut svg).expect("draw operations");
        let out = svg.finish().expect("finish svg");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn writes_rect_fill() {
        let out = svg_output(|svg| {
            svg.set_source(&Paint::Solid(Rgb::new(1.0, 0.0, 0.0)))?;
            svg.rect(0.0, 0.0, 10.0, 10.0)?;
            svg.fill()
        });

        assert!(out.contains("<path d=\"M 0 0 h 10 v 10 h -10 Z\" fill=\"#ff0000\" stroke=\"none\"/>"));
        assert!(out.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn writes_linear_gradient_defs_and_usage() {
        let out = svg_output(|svg| {
            svg.set_source(&Paint::LinearGradient {
                from: Rgb::new(1.0, 0.0, 0.0),
                to: Rgb::new(0.0, 0.0, 1.0),
                start: Vec2::new(0.0, 0.0),
                end: Vec2::new(10.0, 0.0),
            })?;
            svg.rect(0.0, 0.0, 10.0, 10.0)?;
            svg.fill()
        });

        assert!(out.contains(
            "<linearGradient id=\"grad0\" gradientUnits=\"userSpaceOnUse\" x1=\"0\" y1=\"0\" x2=\"10\" y2=\"0\""
        ));
        assert!(out.contains("<stop offset=\"0\" stop-color=\"#ff0000\"/>"));
        assert!(out.contains("<stop offset=\"1\" stop-color=\"#0000ff\"/>"));
        assert!(out.contains("fill=\"url(#grad0)\""));
    }

    #[test]
    fn applies_transform_and_dash_to_stroke() {
        let out = svg_output(|svg| {
            svg.set_transform(Affine::translation(5.0, 6.0))?;
            svg.set_line_dash(&[2.0, 1.0], 0.5)?;
            svg.move_to(0.0, 0.0)?;
            svg.line_to(4.0, 0.0)?;
            svg.stroke()
        });

        assert!(out.contains("transform=\"matrix(1 0 0 1 5 6)\""));
        assert!(out.contains("stroke-dasharray=\"2 1\""));
        assert!(out.contains("stroke-dashoffset=\"0.5\""));
    }

    #[test]
    fn full_circle_is_two_half_arcs() {
        let out = svg_output(|svg| {
            svg.arc(10.0, 10.0, 5.0, 0.0, std::f64::consts::TAU)?;
            svg.stroke()
        });

        assert!(out.contains("M 15 10 A 5 5 0 1 1"));
        assert_eq!(out.matches(" A 5 5 ").count(), 2);
    }

    #[test]
    fn text_carries_font_attributes() {
        let out = svg_output(|svg| {
            let font = svg.create_font("Arial", 12.0, true)?;
            svg.fill_text(&font, "NH<2>", 1.0, 2.0)
        });

        assert!(out.contains("font-family=\"Arial\" font-size=\"12\" font-weight=\"bold\""));
        assert!(out.contains("NH&lt;2&gt;"));
    }

    #[test]
    fn finish_twice_fails() {
        let mut svg = SvgCanvas::new(1.0, 1.0).unwrap();
        svg.finish().unwrap();
        assert!(svg.finish().is_err());
    }

    #[test]
    fn backend_rejects_pdf_and_raster() {
        let mut backend = SvgBackend::new();
        assert!(matches!(
            backend.create_surface(SurfaceTarget::Raster {
                width: 1,
                height: 1
            }),
            Err(RenderError::Unsupported(_))
        ));
        let null = backend.create_surface(SurfaceTarget::Null).unwrap();
        assert_eq!(null.size(), (1.0, 1.0));
    }
}
