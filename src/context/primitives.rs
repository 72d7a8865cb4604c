//! Path construction and painting. Coordinates are user space; the backend
//! applies the session transform, while the path extent is kept in device
//! space for the bounding box.

use std::f64::consts::{FRAC_PI_2, TAU};

use super::Session;
use crate::api::{Canvas, Paint};
use crate::error::{RenderError, Result};
use crate::geometry::{Affine, Vec2};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaintMode {
    Fill,
    Stroke,
}

fn point_on(center: Vec2, radius: f64, angle: f64) -> Vec2 {
    center + Vec2::new(angle.cos(), angle.sin()) * radius
}

impl<C: Canvas> Session<C> {
    fn extend_path(&mut self, p: Vec2) {
        let d = self.to_device(p);
        self.path.add_point(d);
    }

    fn current_point(&self) -> Result<Vec2> {
        self.current_point.ok_or(RenderError::EmptyPath)
    }

    pub fn new_path(&mut self) -> Result<()> {
        self.path.clear();
        self.current_point = None;
        self.canvas.begin_path()
    }

    pub fn move_to(&mut self, p: Vec2) -> Result<()> {
        self.canvas.move_to(p.x, p.y)?;
        self.extend_path(p);
        self.path.add_command();
        self.current_point = Some(p);
        Ok(())
    }

    pub fn move_to_rel(&mut self, d: Vec2) -> Result<()> {
        let p = self.current_point()? + d;
        self.move_to(p)
    }

    pub fn line_to(&mut self, p: Vec2) -> Result<()> {
        self.canvas.line_to(p.x, p.y)?;
        self.extend_path(p);
        self.path.add_command();
        self.current_point = Some(p);
        Ok(())
    }

    pub fn line_to_rel(&mut self, d: Vec2) -> Result<()> {
        let p = self.current_point()? + d;
        self.line_to(p)
    }

    pub fn close_path(&mut self) -> Result<()> {
        self.canvas.close_path()?;
        self.path.add_command();
        Ok(())
    }

    /// Adds an arc swept with increasing angle from `a0` to `a1`.
    pub fn arc_path(&mut self, center: Vec2, radius: f64, a0: f64, a1: f64) -> Result<()> {
        self.canvas.arc(center.x, center.y, radius, a0, a1)?;
        let mut end = a1;
        if end < a0 {
            end += ((a0 - end) / TAU).ceil() * TAU;
        }
        self.extend_path(point_on(center, radius, a0));
        let mut a = (a0 / FRAC_PI_2).ceil() * FRAC_PI_2;
        while a < end {
            self.extend_path(point_on(center, radius, a));
            a += FRAC_PI_2;
        }
        let last = point_on(center, radius, end);
        self.extend_path(last);
        self.path.add_command();
        self.current_point = Some(last);
        Ok(())
    }

    pub fn rect_path(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        self.canvas.rect(x, y, w, h)?;
        for p in [
            Vec2::new(x, y),
            Vec2::new(x + w, y),
            Vec2::new(x + w, y + h),
            Vec2::new(x, y + h),
        ] {
            self.extend_path(p);
        }
        self.path.add_command();
        self.current_point = Some(Vec2::new(x, y));
        Ok(())
    }

    fn polygon_path(&mut self, points: &[Vec2]) -> Result<()> {
        self.new_path()?;
        if let Some((first, rest)) = points.split_first() {
            self.move_to(*first)?;
            for p in rest {
                self.line_to(*p)?;
            }
            self.close_path()?;
        }
        Ok(())
    }

    pub fn check_path_non_empty(&self) -> Result<()> {
        if self.path.commands() == 0 {
            return Err(RenderError::EmptyPath);
        }
        Ok(())
    }

    /// Paints and consumes the current path with the active source.
    pub fn paint(&mut self, mode: PaintMode) -> Result<()> {
        self.check_path_non_empty()?;
        self.apply_source()?;
        self.include_path(mode == PaintMode::Stroke);
        match mode {
            PaintMode::Fill => self.canvas.fill()?,
            PaintMode::Stroke => self.canvas.stroke()?,
        }
        self.path.clear();
        self.current_point = None;
        Ok(())
    }

    pub fn fill(&mut self) -> Result<()> {
        self.paint(PaintMode::Fill)
    }

    pub fn stroke(&mut self) -> Result<()> {
        self.paint(PaintMode::Stroke)
    }

    /// Runs `f` with the line width temporarily set to `width`.
    pub fn with_line_width<T>(
        &mut self,
        width: f64,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let saved = self.line_width;
        self.set_line_width(width)?;
        let out = f(self);
        self.set_line_width(saved)?;
        out
    }

    pub fn draw_line(&mut self, a: Vec2, b: Vec2) -> Result<()> {
        self.new_path()?;
        self.move_to(a)?;
        self.line_to(b)?;
        self.stroke()
    }

    pub fn draw_arc(&mut self, center: Vec2, radius: f64, a0: f64, a1: f64) -> Result<()> {
        self.new_path()?;
        self.arc_path(center, radius, a0, a1)?;
        self.stroke()
    }

    pub fn draw_circle(&mut self, center: Vec2, radius: f64) -> Result<()> {
        self.new_path()?;
        self.arc_path(center, radius, 0.0, TAU)?;
        self.stroke()
    }

    pub fn fill_circle(&mut self, center: Vec2, radius: f64) -> Result<()> {
        self.new_path()?;
        self.arc_path(center, radius, 0.0, TAU)?;
        self.fill()
    }

    /// Strokes the closed polygon through `points`.
    pub fn draw_poly(&mut self, points: &[Vec2]) -> Result<()> {
        self.polygon_path(points)?;
        self.stroke()
    }

    pub fn fill_polygon(&mut self, points: &[Vec2]) -> Result<()> {
        self.polygon_path(points)?;
        self.fill()
    }

    pub fn draw_quad(&mut self, v0: Vec2, v1: Vec2, v2: Vec2, v3: Vec2) -> Result<()> {
        self.draw_poly(&[v0, v1, v2, v3])
    }

    pub fn fill_quad(&mut self, v0: Vec2, v1: Vec2, v2: Vec2, v3: Vec2) -> Result<()> {
        self.fill_polygon(&[v0, v1, v2, v3])
    }

    pub fn fill_pentagon(&mut self, points: &[Vec2; 5]) -> Result<()> {
        self.fill_polygon(points)
    }

    pub fn fill_hex(&mut self, points: &[Vec2; 6]) -> Result<()> {
        self.fill_polygon(points)
    }

    /// Hashed wedge: `count` stripes across the quad, stepping from the
    /// `v0` edge towards the `v1` edge. The first stripe sits one step in.
    pub fn fill_quad_stripes(
        &mut self,
        v0r: Vec2,
        v0l: Vec2,
        v1r: Vec2,
        v1l: Vec2,
        count: usize,
    ) -> Result<()> {
        let count = count.max(1);
        self.new_path()?;
        for i in 1..=count {
            let t = i as f64 / count as f64;
            self.move_to(v0r.lerp(v1r, t))?;
            self.line_to(v0l.lerp(v1l, t))?;
        }
        self.stroke()
    }

    /// Wavy bond: a zigzag from `v0` alternating between the edges
    /// `v0-v1` and `v0-v2`.
    pub fn draw_triangle_zigzag(&mut self, v0: Vec2, v1: Vec2, v2: Vec2, count: usize) -> Result<()> {
        let count = count.max(1);
        self.new_path()?;
        self.move_to(v0)?;
        for i in 1..=count {
            let t = i as f64 / count as f64;
            let edge = if i % 2 == 1 { v1 } else { v2 };
            self.line_to(v0.lerp(edge, t))?;
        }
        self.stroke()
    }

    /// Strokes the rectangle with corner `p` and extent `size`.
    pub fn draw_rectangle(&mut self, p: Vec2, size: Vec2) -> Result<()> {
        self.new_path()?;
        self.rect_path(p.x, p.y, size.x, size.y)?;
        self.stroke()
    }

    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        self.new_path()?;
        self.rect_path(x, y, w, h)?;
        self.fill()
    }

    pub fn set_dash(&mut self, lengths: &[f64], offset: f64) -> Result<()> {
        self.dash = lengths.to_vec();
        self.dash_offset = offset;
        self.canvas.set_line_dash(lengths, offset)
    }

    pub fn reset_dash(&mut self) -> Result<()> {
        self.set_dash(&[], 0.0)
    }

    pub fn dash(&self) -> (&[f64], f64) {
        (&self.dash, self.dash_offset)
    }

    /// Dash phase that centers the pattern on a segment of `length`, so
    /// both ends get the same partial dash.
    pub fn dashed_line_alignment_offset(&self, length: f64) -> f64 {
        let cycle: f64 = self.dash.iter().sum();
        if cycle <= 0.0 {
            return 0.0;
        }
        length.rem_euclid(cycle) / 2.0
    }

    /// Covers the whole surface with the background color, if one is
    /// configured. Leaves the bounding box and the paint source untouched.
    pub fn fill_background(&mut self) -> Result<()> {
        let Some(background) = self.options.background_color else {
            return Ok(());
        };
        self.path.clear();
        self.current_point = None;
        self.canvas.save()?;
        self.canvas.set_transform(Affine::IDENTITY)?;
        self.canvas.begin_path()?;
        self.canvas
            .rect(0.0, 0.0, self.width as f64, self.height as f64)?;
        {
            let _guard = self.lock.acquire();
            self.canvas.set_source(&Paint::Solid(background))?;
        }
        self.canvas.fill()?;
        self.canvas.restore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::*;
    use crate::backends::recording::{DrawOp, PathCommand};
    use crate::color::Rgb;
    use crate::context::tests::{assert_almost_eq, context, context_with, ops};
    use crate::options::RenderOptions;

    #[test]
    fn filled_rectangle_bounds_are_exact() {
        let (mut ctx, _) = context();
        let s = ctx.session().unwrap();
        s.set_single_source(Rgb::BLACK);
        s.fill_rect(0.0, 0.0, 10.0, 5.0).unwrap();
        assert_eq!(s.bounds_min(), Some(Vec2::new(0.0, 0.0)));
        assert_eq!(s.bounds_max(), Some(Vec2::new(10.0, 5.0)));
    }

    #[test]
    fn stroke_grows_by_half_line_width() {
        let (mut ctx, _) = context();
        let s = ctx.session().unwrap();
        s.set_single_source(Rgb::BLACK);
        s.set_line_width(2.0).unwrap();
        s.draw_line(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0)).unwrap();
        assert_eq!(s.bounds_min(), Some(Vec2::new(-1.0, -1.0)));
        assert_eq!(s.bounds_max(), Some(Vec2::new(11.0, 1.0)));
    }

    #[test]
    fn circle_bounds_cover_the_full_turn() {
        let (mut ctx, _) = context();
        let s = ctx.session().unwrap();
        s.set_single_source(Rgb::BLACK);
        s.fill_circle(Vec2::new(10.0, 10.0), 5.0).unwrap();
        let min = s.bounds_min().unwrap();
        let max = s.bounds_max().unwrap();
        assert_almost_eq(min.x, 5.0);
        assert_almost_eq(min.y, 5.0);
        assert_almost_eq(max.x, 15.0);
        assert_almost_eq(max.y, 15.0);
    }

    #[test]
    fn fresh_session_has_no_path() {
        let (mut ctx, _) = context();
        let s = ctx.session().unwrap();
        assert!(matches!(s.check_path_non_empty(), Err(RenderError::EmptyPath)));
        assert!(matches!(s.stroke(), Err(RenderError::EmptyPath)));
        assert!(matches!(
            s.line_to_rel(Vec2::new(1.0, 1.0)),
            Err(RenderError::EmptyPath)
        ));
        s.move_to(Vec2::new(1.0, 1.0)).unwrap();
        s.check_path_non_empty().unwrap();
    }

    #[test]
    fn painting_needs_a_source() {
        let (mut ctx, _) = context();
        let s = ctx.session().unwrap();
        assert!(matches!(
            s.fill_rect(0.0, 0.0, 1.0, 1.0),
            Err(RenderError::NoPaintSource)
        ));
        s.set_single_source(Rgb::BLACK);
        s.fill_rect(0.0, 0.0, 1.0, 1.0).unwrap();
        s.clear_pattern();
        assert!(matches!(
            s.draw_line(Vec2::ZERO, Vec2::new(1.0, 0.0)),
            Err(RenderError::NoPaintSource)
        ));
    }

    #[test]
    fn relative_moves_follow_the_pen() {
        let (mut ctx, _) = context();
        let s = ctx.session().unwrap();
        s.set_single_source(Rgb::BLACK);
        s.new_path().unwrap();
        s.move_to(Vec2::new(1.0, 1.0)).unwrap();
        s.line_to_rel(Vec2::new(2.0, 0.0)).unwrap();
        s.move_to_rel(Vec2::new(0.0, 3.0)).unwrap();
        s.line_to_rel(Vec2::new(-3.0, 0.0)).unwrap();
        s.stroke().unwrap();
        match &ops(&ctx)[0] {
            DrawOp::StrokePath { path, .. } => assert_eq!(
                path.commands,
                vec![
                    PathCommand::MoveTo { x: 1.0, y: 1.0 },
                    PathCommand::LineTo { x: 3.0, y: 1.0 },
                    PathCommand::MoveTo { x: 3.0, y: 4.0 },
                    PathCommand::LineTo { x: 0.0, y: 4.0 },
                ]
            ),
            _ => panic!("unexpected op"),
        }
    }

    #[test]
    fn reset_dash_leaves_strokes_solid() {
        let (mut ctx, _) = context();
        let s = ctx.session().unwrap();
        s.set_single_source(Rgb::BLACK);
        s.set_dash(&[2.0, 1.0], 0.0).unwrap();
        s.draw_line(Vec2::ZERO, Vec2::new(4.0, 0.0)).unwrap();
        s.reset_dash().unwrap();
        s.draw_line(Vec2::ZERO, Vec2::new(4.0, 0.0)).unwrap();
        assert!(s.dash().0.is_empty());
        let recorded = ops(&ctx);
        assert_eq!(recorded[0].state().line_dash, vec![2.0, 1.0]);
        assert!(recorded[1].state().line_dash.is_empty());
    }

    #[test]
    fn dash_alignment_centers_the_remainder() {
        let (mut ctx, _) = context();
        let s = ctx.session().unwrap();
        assert_eq!(s.dashed_line_alignment_offset(10.0), 0.0);
        s.set_dash(&[2.0, 1.0], 0.0).unwrap();
        assert_almost_eq(s.dashed_line_alignment_offset(10.0), 0.5);
        assert_almost_eq(s.dashed_line_alignment_offset(9.0), 0.0);
    }

    #[test]
    fn stripes_and_zigzag_are_single_strokes() {
        let (mut ctx, _) = context();
        let s = ctx.session().unwrap();
        s.set_single_source(Rgb::BLACK);
        s.fill_quad_stripes(
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 2.0),
            Vec2::new(10.0, -2.0),
            4,
        )
        .unwrap();
        s.draw_triangle_zigzag(Vec2::ZERO, Vec2::new(10.0, 2.0), Vec2::new(10.0, -2.0), 3)
            .unwrap();
        let recorded = ops(&ctx);
        assert_eq!(recorded.len(), 2);
        match &recorded[0] {
            DrawOp::StrokePath { path, .. } => {
                assert_eq!(path.commands.len(), 8);
                assert_eq!(path.commands[7], PathCommand::LineTo { x: 10.0, y: -2.0 });
            }
            _ => panic!("unexpected op"),
        }
        match &recorded[1] {
            DrawOp::StrokePath { path, .. } => {
                assert_eq!(path.commands.len(), 4);
                assert_eq!(path.commands[3], PathCommand::LineTo { x: 10.0, y: 2.0 });
            }
            _ => panic!("unexpected op"),
        }
    }

    #[test]
    fn polygons_close_their_path() {
        let (mut ctx, _) = context();
        let s = ctx.session().unwrap();
        s.set_single_source(Rgb::BLACK);
        let hex = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 1.0),
            Vec2::new(1.0, 2.0),
            Vec2::new(0.0, 2.0),
            Vec2::new(-1.0, 1.0),
        ];
        s.fill_hex(&hex).unwrap();
        assert!(matches!(s.draw_poly(&[]), Err(RenderError::EmptyPath)));
        match &ops(&ctx)[0] {
            DrawOp::FillPath { path, .. } => {
                assert_eq!(path.commands.len(), 7);
                assert_eq!(path.commands[6], PathCommand::ClosePath);
            }
            _ => panic!("unexpected op"),
        }
    }

    #[test]
    fn background_does_not_touch_bounds_or_source() {
        let options = RenderOptions {
            background_color: Some(Rgb::new(0.9, 0.9, 0.9)),
            ..RenderOptions::default()
        };
        let (mut ctx, _) = context_with(options);
        let s = ctx.session().unwrap();
        s.translate(3.0, 3.0).unwrap();
        s.fill_background().unwrap();
        assert_eq!(s.bounds_min(), None);
        assert!(s.paint_source().is_none());
        assert_eq!(s.canvas().transform(), Affine::translation(3.0, 3.0));
        match &ops(&ctx)[0] {
            DrawOp::FillPath { path, state } => {
                assert_eq!(
                    path.commands,
                    vec![PathCommand::Rect {
                        x: 0.0,
                        y: 0.0,
                        w: 200.0,
                        h: 100.0
                    }]
                );
                assert_eq!(state.transform, Affine::IDENTITY);
            }
            _ => panic!("unexpected op"),
        }
    }

    #[test]
    fn temporary_line_width_is_restored() {
        let (mut ctx, _) = context();
        let s = ctx.session().unwrap();
        s.set_single_source(Rgb::BLACK);
        let before = s.current_line_width();
        s.with_line_width(0.5, |s| s.draw_line(Vec2::ZERO, Vec2::new(1.0, 0.0)))
            .unwrap();
        assert_eq!(s.current_line_width(), before);
        assert_eq!(ops(&ctx)[0].state().line_width, 0.5);
    }
}
