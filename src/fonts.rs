//! Per-session font cache.

use std::collections::HashMap;

use tracing::trace;

use crate::api::{CanvasText, TextExtents};
use crate::error::{RenderError, Result};
use crate::layout::FontSize;
use crate::lock::BackendLock;
use crate::options::RenderSettings;

/// Backend fonts keyed by (size category, bold). The family and the size
/// scale are per-instance state; changing either drops every cached font.
#[derive(Debug)]
pub struct FontCache<F> {
    family: String,
    scale: f64,
    fonts: HashMap<(FontSize, bool), F>,
}

impl<F: Clone> FontCache<F> {
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            scale: 1.0,
            fonts: HashMap::new(),
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn set_font_family(&mut self, name: &str) {
        if self.family != name {
            self.family = name.to_owned();
            self.fonts.clear();
        }
    }

    /// Scale applied on top of every nominal size.
    pub fn set_font_size(&mut self, scale: f64) {
        if self.scale != scale {
            self.scale = scale;
            self.fonts.clear();
        }
    }

    pub fn point_size(&self, settings: &RenderSettings, size: FontSize) -> f64 {
        settings.font_size(size) * self.scale
    }

    pub fn get_font<C>(
        &mut self,
        canvas: &mut C,
        lock: &BackendLock,
        settings: &RenderSettings,
        size: FontSize,
        bold: bool,
    ) -> Result<F>
    where
        C: CanvasText<Font = F>,
    {
        if let Some(font) = self.fonts.get(&(size, bold)) {
            return Ok(font.clone());
        }
        let points = self.point_size(settings, size);
        trace!(family = %self.family, points, bold, "creating font");
        let font = {
            let _guard = lock.acquire();
            canvas
                .create_font(&self.family, points, bold)
                .map_err(|e| RenderError::Font {
                    family: self.family.clone(),
                    size: points,
                    bold,
                    reason: e.to_string(),
                })?
        };
        self.fonts.insert((size, bold), font.clone());
        Ok(font)
    }

    pub fn text_extents<C>(
        &mut self,
        canvas: &mut C,
        lock: &BackendLock,
        settings: &RenderSettings,
        text: &str,
        size: FontSize,
        bold: bool,
    ) -> Result<TextExtents>
    where
        C: CanvasText<Font = F>,
    {
        let font = self.get_font(canvas, lock, settings, size, bold)?;
        canvas.text_extents(&font, text)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Releases every cached font. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        self.fonts.clear();
    }
}
