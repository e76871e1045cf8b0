use serde::Serialize;

use super::{Anchor, FontMetrics, LayoutMode, StyleConfig};

/// One positioned piece of text. Straight layouts carry the whole caption in a
/// single run; the curved modes carry one entry per character.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlyphSpec {
    pub text: String,
    /// Visual center.
    pub x: f32,
    pub y: f32,
    pub baseline_y: f32,
    pub width: f32,
    pub height: f32,
    pub advance: f32,
    /// Upward displacement from the parabola (bend mode only).
    pub offset_y: f32,
    /// Clockwise rotation in degrees (arc mode only).
    pub rotation: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextLayout {
    pub mode: LayoutMode,
    pub scale: f32,
    pub font_size: f32,
    pub stroke_width: f32,
    /// Scaled bend magnitude; zero outside bend mode.
    pub bend: f32,
    pub glyphs: Vec<GlyphSpec>,
}

pub fn scale_factor(image_width: u32, style: &StyleConfig) -> f32 {
    image_width as f32 / style.reference_width.max(1.0)
}

pub fn font_size_for(scale: f32, style: &StyleConfig) -> f32 {
    let size = (style.font_size_base * scale).trunc();
    size.min(style.font_size_max).max(style.font_size_min)
}

pub fn layout(
    text: &str,
    font: &FontMetrics,
    anchor: Anchor,
    image_width: u32,
    style: &StyleConfig,
) -> TextLayout {
    let scale = scale_factor(image_width, style);
    let font_size = font_size_for(scale, style);
    let stroke_width = (style.stroke_width * scale).trunc().max(0.0);
    let mut result = TextLayout {
        mode: style.mode,
        scale,
        font_size,
        stroke_width,
        bend: 0.0,
        glyphs: Vec::new(),
    };
    if text.is_empty() {
        return result;
    }
    match style.mode {
        LayoutMode::Straight => {
            result.glyphs = straight(text, font, anchor, font_size);
        }
        LayoutMode::Bend => {
            let count = text.chars().count();
            let magnitude = if count <= style.bend.short_max_chars {
                style.bend.short
            } else {
                style.bend.long
            };
            result.bend = magnitude * scale;
            let lift = style.bend.baseline_lift * scale;
            result.glyphs = bend(text, font, anchor, font_size, style, result.bend, lift);
        }
        LayoutMode::Arc => {
            result.glyphs = arc(text, font, anchor, font_size, style, scale);
        }
    }
    result
}

fn straight(text: &str, font: &FontMetrics, anchor: Anchor, font_size: f32) -> Vec<GlyphSpec> {
    let width = font.text_width(text, font_size);
    let x = anchor.x as f32;
    let y = anchor.y as f32;
    vec![GlyphSpec {
        text: text.to_string(),
        x,
        y,
        baseline_y: y + font.middle_to_baseline(font_size),
        width,
        height: font.line_height(font_size),
        advance: width,
        offset_y: 0.0,
        rotation: 0.0,
    }]
}

fn bend(
    text: &str,
    font: &FontMetrics,
    anchor: Anchor,
    font_size: f32,
    style: &StyleConfig,
    bend: f32,
    lift: f32,
) -> Vec<GlyphSpec> {
    let advances: Vec<(char, f32)> = text
        .chars()
        .map(|ch| (ch, font.advance(ch, font_size) * (1.0 + style.letter_spacing)))
        .collect();
    let total: f32 = advances.iter().map(|(_, advance)| advance).sum();
    let half = (total * 0.5).max(f32::EPSILON);
    let center_x = anchor.x as f32;
    let to_baseline = font.middle_to_baseline(font_size);

    let mut cursor = center_x - total * 0.5;
    let mut glyphs = Vec::with_capacity(advances.len());
    for (ch, advance) in advances {
        let x = cursor + advance * 0.5;
        cursor += advance;
        let relative = ((x - center_x) / half).clamp(-1.0, 1.0);
        let offset_y = bend * relative * relative;
        let y = anchor.y as f32 - lift - offset_y;
        let (width, height) = font.glyph_size(ch, font_size);
        glyphs.push(GlyphSpec {
            text: ch.to_string(),
            x,
            y,
            baseline_y: y + to_baseline,
            width,
            height,
            advance,
            offset_y,
            rotation: 0.0,
        });
    }
    glyphs
}

fn arc(
    text: &str,
    font: &FontMetrics,
    anchor: Anchor,
    font_size: f32,
    style: &StyleConfig,
    scale: f32,
) -> Vec<GlyphSpec> {
    let count = text.chars().count();
    let radius = style.arc.radius * scale;
    let start = style.arc.start_angle.to_radians();
    let end = style.arc.end_angle.to_radians();
    let middle = (start + end) * 0.5;
    // The arc midpoint sits on the anchor.
    let center_x = anchor.x as f32 - radius * middle.cos();
    let center_y = anchor.y as f32 - radius * middle.sin();
    let step = (end - start) / (count as f32 + 1.0);
    let to_baseline = font.middle_to_baseline(font_size);

    text.chars()
        .enumerate()
        .map(|(idx, ch)| {
            let theta = start + step * (idx as f32 + 1.0);
            let x = center_x + radius * theta.cos();
            let y = center_y + radius * theta.sin();
            let (width, height) = font.glyph_size(ch, font_size);
            GlyphSpec {
                text: ch.to_string(),
                x,
                y,
                baseline_y: y + to_baseline,
                width,
                height,
                advance: font.advance(ch, font_size),
                offset_y: 0.0,
                rotation: theta.to_degrees() + 90.0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::builtin_style;

    const ANCHOR: Anchor = Anchor { x: 512, y: 900 };

    fn style(mode: LayoutMode) -> StyleConfig {
        // Quarter spacing keeps built-in advances exact in f32.
        StyleConfig {
            mode,
            letter_spacing: 0.25,
            ..builtin_style()
        }
    }

    #[test]
    fn font_size_scales_with_width_and_clamps() {
        let style = style(LayoutMode::Straight);
        let font = FontMetrics::builtin();
        assert_eq!(layout("A", &font, ANCHOR, 1024, &style).font_size, 60.0);
        assert_eq!(layout("A", &font, ANCHOR, 768, &style).font_size, 45.0);
        assert_eq!(layout("A", &font, ANCHOR, 2048, &style).font_size, 80.0);
        assert_eq!(layout("A", &font, ANCHOR, 256, &style).font_size, 30.0);
        assert_eq!(layout("A", &font, ANCHOR, 2048, &style).stroke_width, 6.0);
        assert_eq!(layout("A", &font, ANCHOR, 300, &style).stroke_width, 0.0);
    }

    #[test]
    fn straight_text_is_one_centered_run() {
        let style = style(LayoutMode::Straight);
        let font = FontMetrics::builtin();
        let result = layout("HELLO WORLD", &font, ANCHOR, 1024, &style);
        assert_eq!(result.glyphs.len(), 1);
        let glyph = &result.glyphs[0];
        assert_eq!(glyph.text, "HELLO WORLD");
        assert_eq!((glyph.x, glyph.y), (512.0, 900.0));
        assert_eq!(glyph.width, font.text_width("HELLO WORLD", 60.0));
        assert_eq!(result.bend, 0.0);
    }

    #[test]
    fn empty_text_has_no_glyphs() {
        let font = FontMetrics::builtin();
        for mode in [LayoutMode::Straight, LayoutMode::Bend, LayoutMode::Arc] {
            assert!(layout("", &font, ANCHOR, 1024, &style(mode)).glyphs.is_empty());
        }
    }

    #[test]
    fn bend_is_symmetric_with_lowest_middle() {
        let style = style(LayoutMode::Bend);
        let font = FontMetrics::builtin();
        let result = layout("LEVEL", &font, ANCHOR, 1024, &style);
        let glyphs = &result.glyphs;
        assert_eq!(glyphs.len(), 5);
        let first = &glyphs[0];
        let last = &glyphs[4];
        assert!((first.offset_y - last.offset_y).abs() < 1e-4);
        assert!((first.y - last.y).abs() < 1e-4);
        assert!(((first.x + last.x) * 0.5 - 512.0).abs() < 1e-3);

        let middle = &glyphs[2];
        assert_eq!(middle.x, 512.0);
        assert_eq!(middle.offset_y, 0.0);
        assert!(glyphs.iter().all(|glyph| glyph.y <= middle.y));
        assert!(glyphs.iter().all(|glyph| glyph.offset_y <= first.offset_y));
        assert_eq!(middle.y, 900.0 - style.bend.baseline_lift);
    }

    #[test]
    fn bend_switches_magnitude_after_twelve_characters() {
        let style = style(LayoutMode::Bend);
        let font = FontMetrics::builtin();
        let short = layout("ABCDEFGHIJKL", &font, ANCHOR, 1024, &style);
        let long = layout("ABCDEFGHIJKLM", &font, ANCHOR, 1024, &style);
        assert_eq!(short.bend, style.bend.short);
        assert_eq!(long.bend, style.bend.long);
    }

    #[test]
    fn bend_advance_includes_letter_spacing() {
        let style = StyleConfig {
            letter_spacing: 0.5,
            ..style(LayoutMode::Bend)
        };
        let font = FontMetrics::builtin();
        let result = layout("AB", &font, ANCHOR, 1024, &style);
        let advance = font.advance('A', 60.0) * 1.5;
        assert_eq!(result.glyphs[0].advance, advance);
        assert!((result.glyphs[1].x - result.glyphs[0].x - advance).abs() < 1e-4);
    }

    #[test]
    fn single_character_bend_sits_on_anchor() {
        let style = style(LayoutMode::Bend);
        let font = FontMetrics::builtin();
        let result = layout("A", &font, ANCHOR, 1024, &style);
        let glyph = &result.glyphs[0];
        assert_eq!(glyph.x, 512.0);
        assert_eq!(glyph.offset_y, 0.0);
    }

    #[test]
    fn arc_glyphs_sit_on_circle_with_tangent_rotation() {
        let style = style(LayoutMode::Arc);
        let font = FontMetrics::builtin();
        let result = layout("RADAR", &font, ANCHOR, 1024, &style);
        let glyphs = &result.glyphs;
        assert_eq!(glyphs.len(), 5);

        let middle = &glyphs[2];
        assert!((middle.x - 512.0).abs() < 1e-3);
        assert!((middle.y - 900.0).abs() < 1e-3);
        assert!(middle.rotation.abs() < 1e-3);

        let radius = style.arc.radius;
        let mid_angle = ((style.arc.start_angle + style.arc.end_angle) * 0.5).to_radians();
        let cx = 512.0 - radius * mid_angle.cos();
        let cy = 900.0 - radius * mid_angle.sin();
        let step = (style.arc.end_angle - style.arc.start_angle) / 6.0;
        for (idx, glyph) in glyphs.iter().enumerate() {
            let distance = ((glyph.x - cx).powi(2) + (glyph.y - cy).powi(2)).sqrt();
            assert!((distance - radius).abs() < 1e-2);
            let theta = style.arc.start_angle + step * (idx as f32 + 1.0);
            assert!((glyph.rotation - (theta + 90.0)).abs() < 1e-3);
        }
        assert!(glyphs[0].rotation < 0.0);
        assert!(glyphs[4].rotation > 0.0);
        assert!(glyphs[0].x < glyphs[4].x);
    }

    #[test]
    fn arc_radius_scales_with_image() {
        let style = style(LayoutMode::Arc);
        let font = FontMetrics::builtin();
        let wide = layout("AB", &font, ANCHOR, 2048, &style);
        let narrow = layout("AB", &font, ANCHOR, 1024, &style);
        let spread = |l: &TextLayout| l.glyphs[1].x - l.glyphs[0].x;
        assert!((spread(&wide) - 2.0 * spread(&narrow)).abs() < 1e-2);
    }
}
