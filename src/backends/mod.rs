//! Canvas backends. The recorder is always available; Cairo and SVG are
//! behind their crate features.

#[cfg(feature = "cairo")]
pub mod cairo;
pub mod recording;
#[cfg(feature = "svg")]
pub mod svg;
