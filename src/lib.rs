use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

pub mod badge;
pub mod logging;
pub mod settings;
mod test_util;

pub use badge::{
    Anchor, BadgeOutcome, Color, ColorBand, Detection, FontSource, GlyphSpec, LayoutMode,
    Located, LocatorConfig, StyleConfig, TextLayout, add_text_to_badge, add_text_to_image,
};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub settings_path: Option<String>,
    pub mode: Option<String>,
    pub font_path: Option<String>,
}

/// Loads settings, applies command-line overrides and captions `image_bytes`.
pub fn run(config: &Config, image_bytes: &[u8], text: &str) -> Result<BadgeOutcome> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let mut settings = settings::load_settings(settings_path)?;
    let mode = config
        .mode
        .as_deref()
        .map(str::parse::<LayoutMode>)
        .transpose()?;
    settings.apply_overrides(mode, config.font_path.as_deref().map(Path::new));

    if text.trim().is_empty() {
        info!("caption is empty; the image is re-encoded without text");
    }
    add_text_to_badge(image_bytes, text, &settings.style, &settings.locator)
        .with_context(|| "failed to add text to badge")
}

/// Human-readable JSON describing where and how the caption was placed.
pub fn format_outcome(outcome: &BadgeOutcome) -> Result<String> {
    serde_json::to_string_pretty(outcome).with_context(|| "failed to serialize layout")
}
