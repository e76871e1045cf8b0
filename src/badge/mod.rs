mod builtin;
mod font;
mod layout;
mod locate;
mod render;

pub use font::{FontMetrics, FontSource, ResolvedFont, load_font_metrics, resolve_font};
pub use layout::{GlyphSpec, TextLayout, font_size_for, layout, scale_factor};
pub use locate::{Detection, Located, locate};
pub use render::{encode_png, render};

use anyhow::{Context, Result, anyhow};
use image::{DynamicImage, GenericImageView};
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Color(pub [u8; 3]);

impl Color {
    pub fn parse_hex(value: &str) -> Result<Self> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(anyhow!("invalid color '{}', expected #rrggbb", value));
        }
        let channel = |idx: usize| {
            u8::from_str_radix(&hex[idx..idx + 2], 16)
                .with_context(|| format!("invalid color '{}'", value))
        };
        Ok(Self([channel(0)?, channel(2)?, channel(4)?]))
    }

    pub fn to_hex(self) -> String {
        let [r, g, b] = self.0;
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }
}

/// Inclusive per-channel RGB range used to find the banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorBand {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl ColorBand {
    pub fn contains(&self, rgb: [u8; 3]) -> bool {
        (0..3).all(|idx| rgb[idx] >= self.lower[idx] && rgb[idx] <= self.upper[idx])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Anchor {
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Whole caption drawn in one call, centered on the anchor.
    Straight,
    /// Per-character placement on a parabola.
    Bend,
    /// Per-character placement along a circular arc, each glyph rotated.
    Arc,
}

impl FromStr for LayoutMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "straight" => Ok(Self::Straight),
            "bend" | "curved" => Ok(Self::Bend),
            "arc" => Ok(Self::Arc),
            other => Err(anyhow!(
                "unknown layout mode '{}' (expected straight, bend or arc)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BendStyle {
    /// Captions with at most this many characters use the `short` magnitude.
    pub short_max_chars: usize,
    pub short: f32,
    pub long: f32,
    pub baseline_lift: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArcStyle {
    pub radius: f32,
    /// Degrees, clockwise from +x in image space.
    pub start_angle: f32,
    pub end_angle: f32,
    pub padding: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleConfig {
    pub mode: LayoutMode,
    pub font_path: Option<PathBuf>,
    /// `None` means the platform default list.
    pub fallback_font_paths: Option<Vec<PathBuf>>,
    pub system_fonts: bool,
    pub reference_width: f32,
    pub font_size_base: f32,
    pub font_size_min: f32,
    pub font_size_max: f32,
    pub fill_color: Color,
    pub stroke_color: Color,
    pub stroke_width: f32,
    pub letter_spacing: f32,
    pub bend: BendStyle,
    pub arc: ArcStyle,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            mode: LayoutMode::Straight,
            font_path: Some(PathBuf::from(
                "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
            )),
            fallback_font_paths: None,
            system_fonts: true,
            reference_width: 1024.0,
            font_size_base: 60.0,
            font_size_min: 30.0,
            font_size_max: 80.0,
            fill_color: Color([0x4a, 0x37, 0x28]),
            stroke_color: Color([0x00, 0x00, 0x00]),
            stroke_width: 3.0,
            letter_spacing: 0.08,
            bend: BendStyle {
                short_max_chars: 12,
                short: 20.0,
                long: 12.0,
                baseline_lift: 4.0,
            },
            arc: ArcStyle {
                radius: 400.0,
                start_angle: -140.0,
                end_angle: -40.0,
                padding: 20.0,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocatorConfig {
    pub band: ColorBand,
    /// Fraction of the height where the search starts; rows above are skipped.
    pub search_start: f32,
    pub fallback_x: f32,
    pub fallback_y: f32,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            band: ColorBand {
                lower: [200, 160, 40],
                upper: [255, 220, 100],
            },
            search_start: 0.6,
            fallback_x: 0.5,
            fallback_y: 0.93,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BadgeOutcome {
    #[serde(skip)]
    pub png: Vec<u8>,
    pub located: Located,
    pub font_source: FontSource,
    pub layout: TextLayout,
}

pub fn add_text_to_badge(
    image_bytes: &[u8],
    text: &str,
    style: &StyleConfig,
    locator: &LocatorConfig,
) -> Result<BadgeOutcome> {
    let image =
        image::load_from_memory(image_bytes).with_context(|| "failed to decode badge image")?;
    add_text_to_image(image, text, style, locator)
}

pub fn add_text_to_image(
    image: DynamicImage,
    text: &str,
    style: &StyleConfig,
    locator: &LocatorConfig,
) -> Result<BadgeOutcome> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(anyhow!("badge image has zero size ({}x{})", width, height));
    }
    let mut canvas = image.to_rgba8();
    let text = text.to_uppercase();
    info!("adding text '{}' to badge", text);

    let font = resolve_font(style);
    let located = locate(&canvas, locator);
    let layout = layout(&text, &font.metrics, located.anchor, width, style);
    info!(
        "image size: {}x{}, scale factor: {:.2}, font size: {}",
        width, height, layout.scale, layout.font_size
    );

    render(&mut canvas, &layout, &font, style)?;
    let png = encode_png(&canvas)?;
    info!(
        "badge completed: font {}px, text at ({}, {})",
        layout.font_size, located.anchor.x, located.anchor.y
    );
    Ok(BadgeOutcome {
        png,
        located,
        font_source: font.source,
        layout,
    })
}
