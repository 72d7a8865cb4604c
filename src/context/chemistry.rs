//! Composite drawing operations for chemical depictions: text labels,
//! brackets, attachment point markers, stereo and charge glyphs, reaction
//! connectives and highlighting.

use std::f64::consts::PI;

use tracing::trace;

use super::{SavedHighlight, Session};
use crate::api::{Canvas, Paint};
use crate::color::Rgb;
use crate::error::Result;
use crate::geometry::Vec2;
use crate::layout::{
    AttachmentPointItem, BracketItem, FontSize, GraphItem, GraphItemKind,
    RSiteAttachmentIndexItem, TextItem, TextStyle,
};

/// Line segments used to approximate each half wave of an attachment squiggle.
const WAVE_SEGMENTS: usize = 8;

impl<C: Canvas> Session<C> {
    /// Runs `f` with `color` as the paint source, then puts the previous
    /// source back.
    fn with_color<T>(&mut self, color: Rgb, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = self.source.replace(Some(Paint::Solid(color)));
        let out = f(self);
        self.source.replace(saved);
        out
    }

    /// Fills the padded box behind an item with the background color, or
    /// white when none is configured.
    pub fn draw_item_background(&mut self, position: Vec2, size: Vec2) -> Result<()> {
        let pad = self.settings.item_background_padding;
        let color = self.options.background_color.unwrap_or(Rgb::WHITE);
        self.with_color(color, |s| {
            s.fill_rect(
                position.x - pad,
                position.y - pad,
                size.x + 2.0 * pad,
                size.y + 2.0 * pad,
            )
        })
    }

    /// Measures `item.text` and stores its box size and pen offset.
    pub fn set_text_item_size(&mut self, item: &mut TextItem) -> Result<()> {
        let te = self.text_extents(&item.text, item.font_size, false)?;
        item.size = Vec2::new(te.width, te.height);
        item.baseline_offset = Vec2::new(-te.x_bearing, -te.y_bearing);
        Ok(())
    }

    /// Measures `item` and positions its box so that it is centered on `center`.
    pub fn set_text_item_size_centered(&mut self, item: &mut TextItem, center: Vec2) -> Result<()> {
        self.set_text_item_size(item)?;
        item.position = center - item.size * 0.5;
        Ok(())
    }

    pub fn draw_text_item_text(&mut self, item: &TextItem, style: TextStyle) -> Result<()> {
        if style.idle {
            self.draw_item_background(item.position, item.size)?;
        }
        let color = self.item_color(style.color.or(item.color), item.highlighted);
        let font = self.font(item.font_size, style.bold)?;
        let origin = item.position + item.baseline_offset;
        self.with_color(color, |s| {
            s.apply_source()?;
            s.include_point(item.position);
            s.include_point(item.position + item.size);
            s.canvas.fill_text(&font, &item.text, origin.x, origin.y)
        })
    }

    fn draw_index_text(&mut self, text: String, size: FontSize, center: Vec2, color: Rgb, idle: bool) -> Result<()> {
        let mut ti = TextItem::new(text, size);
        self.set_text_item_size_centered(&mut ti, center)?;
        self.draw_text_item_text(
            &ti,
            TextStyle {
                color: Some(color),
                bold: false,
                idle,
            },
        )
    }

    /// Tick, spine, tick.
    pub fn draw_bracket(&mut self, item: &BracketItem) -> Result<()> {
        let color = self.item_color(item.color, item.highlighted);
        let d = item.direction * item.width;
        let width = self.settings.bracket_line_width;
        self.with_color(color, |s| {
            s.with_line_width(width, |s| {
                s.new_path()?;
                s.move_to(item.p0 + d)?;
                s.line_to(item.p0)?;
                s.line_to(item.p1)?;
                s.line_to(item.p1 + d)?;
                s.stroke()
            })
        })
    }

    pub fn draw_attachment_point(&mut self, item: &AttachmentPointItem, idle: bool) -> Result<()> {
        let color = self.item_color(item.color, item.highlighted);
        let dir = item.direction.normalized();
        let across = dir.perp();
        let radius = self.settings.attachment_point_wave_radius;
        let waves = self.settings.attachment_point_wave_count.max(1);

        self.with_color(color, |s| {
            s.draw_line(item.p0, item.p1)?;
            s.new_path()?;
            let start = item.p1 - across * (radius * waves as f64);
            s.move_to(start)?;
            for i in 0..waves {
                let center = start + across * (radius * (2 * i + 1) as f64);
                let side = if i % 2 == 0 { 1.0 } else { -1.0 };
                for k in 1..=WAVE_SEGMENTS {
                    let t = PI * (1.0 - k as f64 / WAVE_SEGMENTS as f64);
                    s.line_to(center + across * (radius * t.cos()) + dir * (side * radius * t.sin()))?;
                }
            }
            s.stroke()
        })?;

        if let Some(number) = item.number {
            let center = item.p1 + dir * self.settings.attachment_point_index_offset;
            self.draw_index_text(
                number.to_string(),
                FontSize::AttachmentPointIndex,
                center,
                color,
                idle,
            )?;
        }
        Ok(())
    }

    pub fn draw_r_site_attachment_index(&mut self, item: &RSiteAttachmentIndexItem) -> Result<()> {
        let color = item.color.unwrap_or(self.options.base_color);
        let center = item.position + item.size * 0.5;
        let width = self.settings.r_site_index_line_width;
        self.with_color(color, |s| {
            s.with_line_width(width, |s| s.draw_circle(center, item.radius))
        })?;
        self.draw_index_text(
            item.number.to_string(),
            FontSize::RSiteAttachmentIndex,
            center,
            color,
            false,
        )
    }

    pub fn set_graph_item_size_dot(&self, item: &mut GraphItem) {
        let r = self.settings.graph_item_dot_radius;
        item.kind = GraphItemKind::Dot;
        item.size = Vec2::new(2.0 * r, 2.0 * r);
        item.relative_position = Vec2::new(r, r);
    }

    /// The cap is an inverted V; its anchor is the apex.
    pub fn set_graph_item_size_cap(&self, item: &mut GraphItem) {
        let base = self.settings.graph_item_cap_base;
        let height = base * self.settings.graph_item_cap_slope;
        item.kind = GraphItemKind::Cap;
        item.size = Vec2::new(2.0 * base, height);
        item.relative_position = Vec2::new(base, 0.0);
    }

    pub fn set_graph_item_size_sign(&self, item: &mut GraphItem, kind: GraphItemKind) {
        let edge = self.settings.graph_item_plus_edge;
        item.kind = kind;
        item.size = Vec2::new(2.0 * edge, 2.0 * edge);
        item.relative_position = Vec2::new(edge, edge);
    }

    /// Draws a dot, cap or sign glyph. `color` overrides the item color.
    pub fn draw_graph_item(&mut self, item: &GraphItem, color: Option<Rgb>) -> Result<()> {
        let color = self.item_color(color.or(item.color), item.highlighted);
        let anchor = item.position + item.relative_position;
        let st = self.settings.clone();
        self.with_color(color, |s| match item.kind {
            GraphItemKind::Dot => s.fill_circle(anchor, st.graph_item_dot_radius),
            GraphItemKind::Cap => {
                let base = st.graph_item_cap_base;
                let drop = Vec2::new(0.0, base * st.graph_item_cap_slope);
                s.with_line_width(st.graph_item_cap_width, |s| {
                    s.new_path()?;
                    s.move_to(anchor + drop - Vec2::new(base, 0.0))?;
                    s.line_to(anchor)?;
                    s.line_to(anchor + drop + Vec2::new(base, 0.0))?;
                    s.stroke()
                })
            }
            GraphItemKind::Plus | GraphItemKind::Minus => {
                let edge = st.graph_item_plus_edge;
                s.with_line_width(st.graph_item_sign_line_width, |s| {
                    s.new_path()?;
                    s.move_to(anchor - Vec2::new(edge, 0.0))?;
                    s.line_to(anchor + Vec2::new(edge, 0.0))?;
                    if item.kind == GraphItemKind::Plus {
                        s.move_to(anchor - Vec2::new(0.0, edge))?;
                        s.line_to(anchor + Vec2::new(0.0, edge))?;
                    }
                    s.stroke()
                })
            }
        })
    }

    /// Reaction plus sign of extent `size` centered on `pos`, in the current
    /// source.
    pub fn draw_plus(&mut self, pos: Vec2, line_width: f64, size: f64) -> Result<()> {
        let h = size / 2.0;
        self.with_line_width(line_width, |s| {
            s.new_path()?;
            s.move_to(pos - Vec2::new(h, 0.0))?;
            s.line_to(pos + Vec2::new(h, 0.0))?;
            s.move_to(pos - Vec2::new(0.0, h))?;
            s.line_to(pos + Vec2::new(0.0, h))?;
            s.stroke()
        })
    }

    /// Two horizontal bars of length `size`, `interval` apart.
    pub fn draw_equality(&mut self, pos: Vec2, line_width: f64, size: f64, interval: f64) -> Result<()> {
        let h = size / 2.0;
        let gap = interval / 2.0;
        self.with_line_width(line_width, |s| {
            s.new_path()?;
            for dy in [-gap, gap] {
                s.move_to(pos + Vec2::new(-h, dy))?;
                s.line_to(pos + Vec2::new(h, dy))?;
            }
            s.stroke()
        })
    }

    /// Filled arrow from `p1` to the tip at `p2`.
    pub fn draw_arrow(&mut self, p1: Vec2, p2: Vec2, width: f64, head_width: f64, head_size: f64) -> Result<()> {
        let dir = (p2 - p1).normalized();
        let n = dir.perp();
        let base = p2 - dir * head_size;
        let w = width / 2.0;
        let hw = head_width / 2.0;
        self.fill_polygon(&[
            p1 + n * w,
            base + n * w,
            base + n * hw,
            p2,
            base - n * hw,
            base - n * w,
            p1 - n * w,
        ])
    }

    /// Switches to highlight drawing. Only the first call saves the line
    /// width and source that `reset_highlight` brings back.
    pub fn set_highlight(&mut self) -> Result<()> {
        if self.highlight.is_none() {
            self.highlight = Some(SavedHighlight {
                line_width: self.line_width,
                source: self.source.get().cloned(),
            });
        }
        if self.options.highlight_color_enabled {
            self.source.set_single(self.options.highlight_color);
        }
        if self.options.highlight_thickness_enabled {
            let width = self.highlighted_bond_line_width();
            self.set_line_width(width)?;
        }
        Ok(())
    }

    pub fn reset_highlight(&mut self) -> Result<()> {
        let Some(saved) = self.highlight.take() else {
            trace!("reset_highlight without active highlight");
            return Ok(());
        };
        self.source.replace(saved.source);
        self.set_line_width(saved.line_width)
    }

    /// Restores the pre-highlight line width but stays in highlight mode.
    pub fn reset_highlight_thickness(&mut self) -> Result<()> {
        match self.highlight.as_ref().map(|h| h.line_width) {
            Some(width) => self.set_line_width(width),
            None => {
                trace!("reset_highlight_thickness without active highlight");
                Ok(())
            }
        }
    }

    pub fn is_highlighted(&self) -> bool {
        self.highlight.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::*;
    use crate::backends::recording::{DrawOp, PathCommand};
    use crate::context::tests::{assert_almost_eq, context, context_with, ops};
    use crate::options::RenderOptions;

    fn thick_highlight() -> RenderOptions {
        RenderOptions {
            highlight_thickness_enabled: true,
            ..RenderOptions::default()
        }
    }

    #[test]
    fn highlight_round_trip_restores_width() {
        let (mut ctx, _) = context_with(thick_highlight());
        let s = ctx.session().unwrap();
        s.set_single_source(Rgb::BLACK);
        let before = s.current_line_width();
        s.set_highlight().unwrap();
        assert_almost_eq(s.current_line_width(), before * 1.8);
        assert_eq!(
            s.paint_source(),
            Some(&Paint::Solid(Rgb::new(1.0, 0.0, 0.0)))
        );
        s.reset_highlight().unwrap();
        assert_eq!(s.current_line_width(), before);
        assert_eq!(s.paint_source(), Some(&Paint::Solid(Rgb::BLACK)));
        assert!(!s.is_highlighted());
    }

    #[test]
    fn reset_without_highlight_is_noop() {
        let (mut ctx, _) = context();
        let s = ctx.session().unwrap();
        s.set_line_width(3.0).unwrap();
        s.reset_highlight().unwrap();
        s.reset_highlight_thickness().unwrap();
        assert_eq!(s.current_line_width(), 3.0);
        assert!(s.paint_source().is_none());
    }

    #[test]
    fn nested_highlight_keeps_first_saved_state() {
        let (mut ctx, _) = context_with(thick_highlight());
        let s = ctx.session().unwrap();
        let before = s.current_line_width();
        s.set_highlight().unwrap();
        s.set_highlight().unwrap();
        s.reset_highlight_thickness().unwrap();
        assert_eq!(s.current_line_width(), before);
        assert!(s.is_highlighted());
        s.reset_highlight().unwrap();
        assert_eq!(s.current_line_width(), before);
        assert!(s.paint_source().is_none());
    }

    #[test]
    fn text_items_are_measured_and_bounded() {
        let (mut ctx, _) = context();
        let s = ctx.session().unwrap();
        let mut item = TextItem::new("OH", FontSize::Label);
        s.set_text_item_size(&mut item).unwrap();
        assert_almost_eq(item.size.x, 36.0);
        assert_almost_eq(item.size.y, 21.0);
        item.position = Vec2::new(10.0, 10.0);
        s.draw_text_item_text(&item, TextStyle::default()).unwrap();
        assert_eq!(s.bounds_min(), Some(Vec2::new(10.0, 10.0)));
        assert!(s.paint_source().is_none());
        match &ops(&ctx)[0] {
            DrawOp::FillText { text, x, y, state, .. } => {
                assert_eq!(text, "OH");
                assert_almost_eq(*x, 10.0);
                assert_almost_eq(*y, 31.0);
                assert_eq!(state.source, Paint::Solid(Rgb::BLACK));
            }
            _ => panic!("unexpected op"),
        }
    }

    #[test]
    fn idle_highlighted_text_gets_backdrop_and_tint() {
        let (mut ctx, _) = context();
        let s = ctx.session().unwrap();
        let mut item = TextItem::new("R1", FontSize::Label);
        item.highlighted = true;
        s.set_text_item_size_centered(&mut item, Vec2::new(50.0, 50.0)).unwrap();
        assert_almost_eq(item.center().x, 50.0);
        let style = TextStyle {
            bold: true,
            idle: true,
            ..TextStyle::default()
        };
        s.draw_text_item_text(&item, style).unwrap();
        let recorded = ops(&ctx);
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].state().source, Paint::Solid(Rgb::WHITE));
        match &recorded[1] {
            DrawOp::FillText { font, state, .. } => {
                assert!(font.bold);
                assert_eq!(state.source, Paint::Solid(Rgb::new(1.0, 0.0, 0.0)));
            }
            _ => panic!("unexpected op"),
        }
    }

    #[test]
    fn bracket_is_tick_spine_tick() {
        let (mut ctx, _) = context();
        let s = ctx.session().unwrap();
        let item = BracketItem {
            p0: Vec2::new(0.0, 0.0),
            p1: Vec2::new(0.0, 10.0),
            direction: Vec2::new(1.0, 0.0),
            width: 2.0,
            color: None,
            highlighted: false,
        };
        s.draw_bracket(&item).unwrap();
        match &ops(&ctx)[0] {
            DrawOp::StrokePath { path, state } => {
                assert_eq!(
                    path.commands,
                    vec![
                        PathCommand::MoveTo { x: 2.0, y: 0.0 },
                        PathCommand::LineTo { x: 0.0, y: 0.0 },
                        PathCommand::LineTo { x: 0.0, y: 10.0 },
                        PathCommand::LineTo { x: 2.0, y: 10.0 },
                    ]
                );
                assert_eq!(state.source, Paint::Solid(Rgb::BLACK));
            }
            _ => panic!("unexpected op"),
        }
    }

    #[test]
    fn attachment_point_draws_stub_squiggle_and_index() {
        let (mut ctx, _) = context();
        let s = ctx.session().unwrap();
        let item = AttachmentPointItem {
            p0: Vec2::new(0.0, 0.0),
            p1: Vec2::new(20.0, 0.0),
            direction: Vec2::new(1.0, 0.0),
            number: Some(2),
            color: None,
            highlighted: false,
        };
        s.draw_attachment_point(&item, false).unwrap();
        let recorded = ops(&ctx);
        assert_eq!(recorded.len(), 3);
        match &recorded[1] {
            DrawOp::StrokePath { path, .. } => assert_eq!(path.commands.len(), 1 + 3 * 8),
            _ => panic!("unexpected op"),
        }
        match &recorded[2] {
            DrawOp::FillText { text, .. } => assert_eq!(text, "2"),
            _ => panic!("unexpected op"),
        }
    }

    #[test]
    fn r_site_index_is_circled() {
        let (mut ctx, _) = context();
        let s = ctx.session().unwrap();
        let thin = s.settings().r_site_index_line_width;
        let item = RSiteAttachmentIndexItem {
            position: Vec2::new(0.0, 0.0),
            size: Vec2::new(10.0, 10.0),
            radius: 5.0,
            number: 1,
            color: None,
        };
        s.draw_r_site_attachment_index(&item).unwrap();
        let recorded = ops(&ctx);
        assert_eq!(recorded[0].state().line_width, thin);
        assert!(matches!(recorded[1], DrawOp::FillText { .. }));
    }

    #[test]
    fn graph_items_dispatch_on_kind() {
        let (mut ctx, _) = context();
        let s = ctx.session().unwrap();
        let mut dot = GraphItem::new(GraphItemKind::Dot);
        s.set_graph_item_size_dot(&mut dot);
        let mut plus = GraphItem::new(GraphItemKind::Plus);
        s.set_graph_item_size_sign(&mut plus, GraphItemKind::Plus);
        let mut cap = GraphItem::new(GraphItemKind::Cap);
        s.set_graph_item_size_cap(&mut cap);
        s.draw_graph_item(&dot, None).unwrap();
        s.draw_graph_item(&plus, Some(Rgb::new(0.0, 0.0, 1.0))).unwrap();
        s.draw_graph_item(&cap, None).unwrap();
        let recorded = ops(&ctx);
        assert!(matches!(recorded[0], DrawOp::FillPath { .. }));
        match &recorded[1] {
            DrawOp::StrokePath { path, state } => {
                assert_eq!(path.commands.len(), 4);
                assert_eq!(state.source, Paint::Solid(Rgb::new(0.0, 0.0, 1.0)));
            }
            _ => panic!("unexpected op"),
        }
        match &recorded[2] {
            DrawOp::StrokePath { path, .. } => assert_eq!(path.commands.len(), 3),
            _ => panic!("unexpected op"),
        }
    }

    #[test]
    fn reaction_glyphs_use_current_source() {
        let (mut ctx, _) = context();
        let s = ctx.session().unwrap();
        s.set_single_source(Rgb::new(0.0, 0.5, 0.0));
        s.draw_plus(Vec2::new(5.0, 5.0), 1.0, 4.0).unwrap();
        s.draw_equality(Vec2::new(5.0, 5.0), 1.0, 4.0, 2.0).unwrap();
        s.draw_arrow(Vec2::new(0.0, 0.0), Vec2::new(20.0, 0.0), 1.0, 4.0, 5.0)
            .unwrap();
        assert_almost_eq(s.bounds_max().unwrap().x, 20.0);
        let recorded = ops(&ctx);
        assert_eq!(recorded.len(), 3);
        match &recorded[2] {
            DrawOp::FillPath { path, state } => {
                assert_eq!(path.commands.len(), 8);
                assert_eq!(path.commands[3], PathCommand::LineTo { x: 20.0, y: 0.0 });
                assert_eq!(state.source, Paint::Solid(Rgb::new(0.0, 0.5, 0.0)));
            }
            _ => panic!("unexpected op"),
        }
    }
}
