//! Caller-facing configuration: [`RenderOptions`] and the derived
//! [`RenderSettings`] metrics.

use std::collections::HashMap;

use crate::color::Rgb;
use crate::layout::FontSize;

/// Kind of document the context produces on `initialize`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OutputFormat {
    #[default]
    Svg,
    Pdf,
    Png,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RenderOptions {
    pub format: OutputFormat,
    pub font_family: String,
    pub base_color: Rgb,
    /// `None` leaves the background transparent.
    pub background_color: Option<Rgb>,
    pub highlight_color_enabled: bool,
    pub highlight_color: Rgb,
    pub highlight_thickness_enabled: bool,
    pub highlight_thickness_factor: f64,
    /// Overrides [`crate::color::element_color`] for individual labels.
    pub element_colors: HashMap<u32, Rgb>,
    /// Flip the y axis at the baseline so layout coordinates grow upwards.
    pub flip_y: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Svg,
            font_family: String::from("Arial"),
            base_color: Rgb::BLACK,
            background_color: None,
            highlight_color_enabled: true,
            highlight_color: Rgb::new(1.0, 0.0, 0.0),
            highlight_thickness_enabled: false,
            highlight_thickness_factor: 1.8,
            element_colors: HashMap::new(),
            flip_y: false,
        }
    }
}

/// Layout metrics derived from the scale factor (pixels per bond length)
/// and the line width factor.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderSettings {
    pub bond_length: f64,
    pub bond_line_width: f64,
    pub bond_space: f64,
    pub font_sizes: [f64; FontSize::COUNT],
    pub dash_unit: f64,
    pub graph_item_dot_radius: f64,
    pub graph_item_cap_slope: f64,
    pub graph_item_cap_base: f64,
    pub graph_item_cap_width: f64,
    pub graph_item_sign_line_width: f64,
    pub graph_item_plus_edge: f64,
    pub attachment_point_wave_count: usize,
    pub attachment_point_wave_radius: f64,
    pub attachment_point_index_offset: f64,
    pub r_site_index_line_width: f64,
    pub bracket_line_width: f64,
    pub item_background_padding: f64,
}

impl RenderSettings {
    pub fn new(scale_factor: f64, line_width_factor: f64) -> Self {
        let sf = scale_factor;
        let bond_line_width = line_width_factor * sf / 30.0;
        let mut font_sizes = [sf / 3.0; FontSize::COUNT];
        font_sizes[FontSize::Label as usize] = sf / 2.0;
        font_sizes[FontSize::Comment as usize] = sf / 2.0;
        font_sizes[FontSize::Title as usize] = sf / 2.0;
        Self {
            bond_length: sf,
            bond_line_width,
            bond_space: 2.5 * bond_line_width,
            font_sizes,
            dash_unit: 2.0 * bond_line_width,
            graph_item_dot_radius: sf / 20.0,
            graph_item_cap_slope: 2.0,
            graph_item_cap_base: 0.7 * sf / 8.0,
            graph_item_cap_width: 1.2 * bond_line_width,
            graph_item_sign_line_width: 0.8 * bond_line_width,
            graph_item_plus_edge: 0.85 * sf / 8.0,
            attachment_point_wave_count: 3,
            attachment_point_wave_radius: 0.1 * sf,
            attachment_point_index_offset: 0.25 * sf,
            r_site_index_line_width: bond_line_width / 2.0,
            bracket_line_width: bond_line_width,
            item_background_padding: bond_line_width,
        }
    }

    pub fn font_size(&self, size: FontSize) -> f64 {
        self.font_sizes[size as usize]
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings::new(100.0, 1.0)
    }
}
