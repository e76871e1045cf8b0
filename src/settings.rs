use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::badge::{Color, ColorBand, LayoutMode, LocatorConfig, StyleConfig};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub style: StyleConfig,
    pub locator: LocatorConfig,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    text: Option<TextSettings>,
    banner: Option<BannerSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct TextSettings {
    mode: Option<String>,
    font_path: Option<String>,
    fallback_font_paths: Option<Vec<String>>,
    system_fonts: Option<bool>,
    reference_width: Option<f32>,
    font_size_base: Option<f32>,
    font_size_min: Option<f32>,
    font_size_max: Option<f32>,
    fill_color: Option<String>,
    stroke_color: Option<String>,
    stroke_width: Option<f32>,
    letter_spacing: Option<f32>,
    bend: Option<BendSettings>,
    arc: Option<ArcSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct BendSettings {
    short_max_chars: Option<usize>,
    short: Option<f32>,
    long: Option<f32>,
    baseline_lift: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct ArcSettings {
    radius: Option<f32>,
    start_angle: Option<f32>,
    end_angle: Option<f32>,
    padding: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct BannerSettings {
    lower: Option<[u8; 3]>,
    upper: Option<[u8; 3]>,
    search_start: Option<f32>,
    fallback_x: Option<f32>,
    fallback_y: Option<f32>,
}

/// Built-in defaults, then `settings.toml` and `settings.local.toml` from the
/// working directory, then `extra_path`. Later files override earlier ones.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    settings
        .merge_str(DEFAULT_SETTINGS_TOML)
        .with_context(|| "failed to parse built-in settings")?;

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            settings
                .merge_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
        }
    }

    settings.validate()?;
    Ok(settings)
}

impl Settings {
    pub fn merge_str(&mut self, content: &str) -> Result<()> {
        let parsed: SettingsFile = toml::from_str(content)?;
        self.merge(parsed)
    }

    fn merge(&mut self, incoming: SettingsFile) -> Result<()> {
        if let Some(text) = incoming.text {
            self.merge_text(text)?;
        }
        if let Some(banner) = incoming.banner {
            let locator = &mut self.locator;
            if let Some(lower) = banner.lower {
                locator.band.lower = lower;
            }
            if let Some(upper) = banner.upper {
                locator.band.upper = upper;
            }
            if let Some(value) = banner.search_start {
                locator.search_start = value;
            }
            if let Some(value) = banner.fallback_x {
                locator.fallback_x = value;
            }
            if let Some(value) = banner.fallback_y {
                locator.fallback_y = value;
            }
        }
        Ok(())
    }

    fn merge_text(&mut self, text: TextSettings) -> Result<()> {
        let style = &mut self.style;
        if let Some(mode) = text.mode {
            style.mode = mode.parse()?;
        }
        if let Some(path) = text.font_path {
            let path = path.trim();
            style.font_path = if path.is_empty() {
                None
            } else {
                Some(PathBuf::from(path))
            };
        }
        if let Some(paths) = text.fallback_font_paths {
            style.fallback_font_paths = Some(paths.into_iter().map(PathBuf::from).collect());
        }
        if let Some(value) = text.system_fonts {
            style.system_fonts = value;
        }
        if let Some(value) = text.reference_width {
            style.reference_width = value;
        }
        if let Some(value) = text.font_size_base {
            style.font_size_base = value;
        }
        if let Some(value) = text.font_size_min {
            style.font_size_min = value;
        }
        if let Some(value) = text.font_size_max {
            style.font_size_max = value;
        }
        if let Some(value) = text.fill_color {
            style.fill_color = Color::parse_hex(&value)?;
        }
        if let Some(value) = text.stroke_color {
            style.stroke_color = Color::parse_hex(&value)?;
        }
        if let Some(value) = text.stroke_width {
            style.stroke_width = value;
        }
        if let Some(value) = text.letter_spacing {
            style.letter_spacing = value;
        }
        if let Some(bend) = text.bend {
            if let Some(value) = bend.short_max_chars {
                style.bend.short_max_chars = value;
            }
            if let Some(value) = bend.short {
                style.bend.short = value;
            }
            if let Some(value) = bend.long {
                style.bend.long = value;
            }
            if let Some(value) = bend.baseline_lift {
                style.bend.baseline_lift = value;
            }
        }
        if let Some(arc) = text.arc {
            if let Some(value) = arc.radius {
                style.arc.radius = value;
            }
            if let Some(value) = arc.start_angle {
                style.arc.start_angle = value;
            }
            if let Some(value) = arc.end_angle {
                style.arc.end_angle = value;
            }
            if let Some(value) = arc.padding {
                style.arc.padding = value;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let style = &self.style;
        if style.reference_width <= 0.0 {
            return Err(anyhow!("text.reference_width must be positive"));
        }
        if style.font_size_min <= 0.0 || style.font_size_min > style.font_size_max {
            return Err(anyhow!(
                "text.font_size_min ({}) must be positive and not above font_size_max ({})",
                style.font_size_min,
                style.font_size_max
            ));
        }
        if style.stroke_width < 0.0 || style.letter_spacing < -0.9 {
            return Err(anyhow!("text.stroke_width and text.letter_spacing are out of range"));
        }
        let ColorBand { lower, upper } = self.locator.band;
        if (0..3).any(|idx| lower[idx] > upper[idx]) {
            return Err(anyhow!(
                "banner.lower {:?} must not exceed banner.upper {:?}",
                lower,
                upper
            ));
        }
        for (name, value) in [
            ("banner.search_start", self.locator.search_start),
            ("banner.fallback_x", self.locator.fallback_x),
            ("banner.fallback_y", self.locator.fallback_y),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{} must be within 0..1 (got {})", name, value));
            }
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, mode: Option<LayoutMode>, font_path: Option<&Path>) {
        if let Some(mode) = mode {
            self.style.mode = mode;
        }
        if let Some(path) = font_path {
            self.style.font_path = Some(path.to_path_buf());
        }
    }
}
