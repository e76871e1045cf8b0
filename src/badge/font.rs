use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use ttf_parser::Face;
use ttf_parser::name_id;
use usvg::fontdb;

use super::StyleConfig;
use super::builtin;

#[derive(Clone)]
pub struct FontMetrics {
    kind: FontKind,
}

#[derive(Clone)]
enum FontKind {
    TrueType(TrueTypeFont),
    Builtin,
}

#[derive(Clone)]
struct TrueTypeFont {
    data: Arc<Vec<u8>>,
    face_index: u32,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    space_advance: u16,
    family: Option<String>,
}

impl std::fmt::Debug for FontMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            FontKind::TrueType(font) => f
                .debug_struct("FontMetrics")
                .field("family", &font.family)
                .field("face_index", &font.face_index)
                .field("units_per_em", &font.units_per_em)
                .finish(),
            FontKind::Builtin => f.write_str("FontMetrics(builtin)"),
        }
    }
}

impl FontMetrics {
    pub fn builtin() -> Self {
        Self {
            kind: FontKind::Builtin,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.kind, FontKind::Builtin)
    }

    pub fn family(&self) -> Option<&str> {
        match &self.kind {
            FontKind::TrueType(font) => font.family.as_deref(),
            FontKind::Builtin => None,
        }
    }

    /// Raw font file bytes; `None` for the built-in font.
    pub fn data(&self) -> Option<&[u8]> {
        match &self.kind {
            FontKind::TrueType(font) => Some(font.data.as_slice()),
            FontKind::Builtin => None,
        }
    }

    /// Horizontal advance of one character. The built-in font ignores `font_size`.
    pub fn advance(&self, ch: char, font_size: f32) -> f32 {
        match &self.kind {
            FontKind::TrueType(font) => font.with_face(
                |face| {
                    let units = glyph_advance_units(face, font, ch);
                    units as f32 * font.scale(font_size)
                },
                || font.space_advance as f32 * font.scale(font_size),
            ),
            FontKind::Builtin => builtin::ADVANCE,
        }
    }

    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        match &self.kind {
            FontKind::TrueType(font) => font.with_face(
                |face| {
                    let advance: u32 = text
                        .chars()
                        .filter(|ch| *ch != '\n')
                        .map(|ch| glyph_advance_units(face, font, ch) as u32)
                        .sum();
                    advance as f32 * font.scale(font_size)
                },
                || 0.0,
            ),
            FontKind::Builtin => builtin::text_width(text),
        }
    }

    /// Ink bounding box of one character as (width, height).
    pub fn glyph_size(&self, ch: char, font_size: f32) -> (f32, f32) {
        match &self.kind {
            FontKind::TrueType(font) => font.with_face(
                |face| {
                    let scale = font.scale(font_size);
                    match face.glyph_index(ch).and_then(|id| face.glyph_bounding_box(id)) {
                        Some(rect) => (
                            (rect.x_max as f32 - rect.x_min as f32) * scale,
                            (rect.y_max as f32 - rect.y_min as f32) * scale,
                        ),
                        None => (glyph_advance_units(face, font, ch) as f32 * scale, 0.0),
                    }
                },
                || (0.0, 0.0),
            ),
            FontKind::Builtin => {
                if ch == ' ' {
                    (builtin::ADVANCE, 0.0)
                } else {
                    (builtin::GLYPH_WIDTH, builtin::GLYPH_HEIGHT)
                }
            }
        }
    }

    pub fn line_height(&self, font_size: f32) -> f32 {
        match &self.kind {
            FontKind::TrueType(font) => {
                (font.ascender as f32 - font.descender as f32) * font.scale(font_size)
            }
            FontKind::Builtin => builtin::GLYPH_HEIGHT,
        }
    }

    /// Distance from the vertical middle of a line (halfway between ascender and
    /// descender) down to its baseline.
    pub fn middle_to_baseline(&self, font_size: f32) -> f32 {
        match &self.kind {
            FontKind::TrueType(font) => {
                (font.ascender as f32 + font.descender as f32) * 0.5 * font.scale(font_size)
            }
            FontKind::Builtin => builtin::GLYPH_HEIGHT * 0.5,
        }
    }
}

impl TrueTypeFont {
    fn scale(&self, font_size: f32) -> f32 {
        font_size / self.units_per_em.max(1) as f32
    }

    fn with_face<T>(&self, with: impl FnOnce(&Face<'_>) -> T, missing: impl FnOnce() -> T) -> T {
        match Face::parse(&self.data, self.face_index) {
            Ok(face) => with(&face),
            Err(_) => missing(),
        }
    }
}

fn glyph_advance_units(face: &Face<'_>, font: &TrueTypeFont, ch: char) -> u16 {
    if ch == ' ' {
        return font.space_advance;
    }
    face.glyph_index(ch)
        .and_then(|glyph| face.glyph_hor_advance(glyph))
        .unwrap_or(font.space_advance)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FontSource {
    Primary(PathBuf),
    Fallback(PathBuf),
    System(String),
    Builtin,
}

#[derive(Debug, Clone)]
pub struct ResolvedFont {
    pub metrics: FontMetrics,
    pub source: FontSource,
}

pub fn load_font_metrics(path: &Path) -> Result<FontMetrics> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    load_font_metrics_from_data(data)
        .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))
}

/// Walks the font chain: primary file, platform fallback files, a system
/// sans-serif face, then the built-in bitmap font. Never fails.
pub fn resolve_font(style: &StyleConfig) -> ResolvedFont {
    if let Some(path) = style.font_path.as_deref() {
        match load_font_metrics(path) {
            Ok(metrics) => {
                info!("font loaded: {}", path.display());
                return ResolvedFont {
                    metrics,
                    source: FontSource::Primary(path.to_path_buf()),
                };
            }
            Err(err) => warn!("custom font not usable ({:#}), trying fallback fonts", err),
        }
    }

    let fallbacks = match &style.fallback_font_paths {
        Some(paths) => paths.clone(),
        None => platform_fallback_fonts()
            .iter()
            .map(PathBuf::from)
            .collect(),
    };
    for path in fallbacks {
        match load_font_metrics(&path) {
            Ok(metrics) => {
                info!("fallback font loaded: {}", path.display());
                return ResolvedFont {
                    metrics,
                    source: FontSource::Fallback(path),
                };
            }
            Err(err) => warn!("fallback font not usable ({:#})", err),
        }
    }

    if style.system_fonts {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        match load_font_metrics_from_family(&db, "sans-serif") {
            Ok((metrics, family)) => {
                info!("system font loaded: {}", family);
                return ResolvedFont {
                    metrics,
                    source: FontSource::System(family),
                };
            }
            Err(err) => warn!("system font lookup failed ({:#})", err),
        }
    }

    warn!("no font file usable, using built-in bitmap font (fixed size)");
    ResolvedFont {
        metrics: FontMetrics::builtin(),
        source: FontSource::Builtin,
    }
}

#[cfg(target_os = "macos")]
fn platform_fallback_fonts() -> &'static [&'static str] {
    &[
        "/System/Library/Fonts/Helvetica.ttc",
        "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    ]
}

#[cfg(target_os = "windows")]
fn platform_fallback_fonts() -> &'static [&'static str] {
    &["C:\\Windows\\Fonts\\arialbd.ttf", "C:\\Windows\\Fonts\\arial.ttf"]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn platform_fallback_fonts() -> &'static [&'static str] {
    &[
        "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
        "/usr/share/fonts/truetype/noto/NotoSans-Bold.ttf",
    ]
}

fn load_font_metrics_from_data(data: Vec<u8>) -> Result<FontMetrics> {
    let data = Arc::new(data);
    let count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
    (0..count)
        .find_map(|index| load_face_metrics(&data, index))
        .ok_or_else(|| anyhow!("failed to parse font data"))
}

fn load_face_metrics(data: &Arc<Vec<u8>>, index: u32) -> Option<FontMetrics> {
    let face = Face::parse(data, index).ok()?;
    let units_per_em = face.units_per_em().max(1);
    let space_advance = face
        .glyph_index(' ')
        .and_then(|id| face.glyph_hor_advance(id))
        .unwrap_or(units_per_em / 2);
    Some(FontMetrics {
        kind: FontKind::TrueType(TrueTypeFont {
            data: Arc::clone(data),
            face_index: index,
            units_per_em,
            ascender: face.ascender(),
            descender: face.descender(),
            space_advance,
            family: extract_family_name(&face),
        }),
    })
}

fn load_font_metrics_from_family(
    db: &fontdb::Database,
    family: &str,
) -> Result<(FontMetrics, String)> {
    let families = if family.eq_ignore_ascii_case("sans-serif") {
        vec![fontdb::Family::SansSerif]
    } else {
        vec![fontdb::Family::Name(family)]
    };
    let query = fontdb::Query {
        families: &families,
        weight: fontdb::Weight::BOLD,
        ..Default::default()
    };
    let id = db
        .query(&query)
        .ok_or_else(|| anyhow!("font not found: {}", family))?;
    let (data, face_index) = db
        .with_face_data(id, |data, index| (data.to_vec(), index))
        .ok_or_else(|| anyhow!("failed to load font data: {}", family))?;
    let metrics = load_face_metrics(&Arc::new(data), face_index)
        .ok_or_else(|| anyhow!("failed to parse font data: {}", family))?;
    let resolved_family = metrics
        .family()
        .map(|name| name.to_string())
        .unwrap_or_else(|| family.to_string());
    Ok((metrics, resolved_family))
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}
