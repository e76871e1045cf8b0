use anyhow::{Context, Result, anyhow};
use image::RgbaImage;
use std::io::Cursor;
use std::sync::Arc;
use tiny_skia::{FilterQuality, Pixmap, PixmapPaint, Transform};
use tracing::debug;
use usvg::{Options, Tree, fontdb};

use super::builtin;
use super::{Color, FontMetrics, GlyphSpec, LayoutMode, ResolvedFont, StyleConfig, TextLayout};

struct Pen {
    font_size: f32,
    fill: Color,
    stroke: Color,
    stroke_width: f32,
}

struct Placement<'a> {
    text: &'a str,
    x: f32,
    y: f32,
    baseline_y: f32,
}

impl<'a> From<&'a GlyphSpec> for Placement<'a> {
    fn from(glyph: &'a GlyphSpec) -> Self {
        Self {
            text: &glyph.text,
            x: glyph.x,
            y: glyph.y,
            baseline_y: glyph.baseline_y,
        }
    }
}

enum Painter {
    Svg {
        fontdb: Arc<fontdb::Database>,
        family: String,
    },
    Builtin,
}

impl Painter {
    fn for_font(metrics: &FontMetrics) -> Self {
        let Some(data) = metrics.data() else {
            return Self::Builtin;
        };
        let mut db = fontdb::Database::new();
        db.load_font_data(data.to_vec());
        let family = metrics
            .family()
            .map(|name| name.to_string())
            .or_else(|| {
                db.faces()
                    .next()
                    .and_then(|face| face.families.first().map(|(name, _)| name.clone()))
            })
            .unwrap_or_else(|| "sans-serif".to_string());
        Self::Svg {
            fontdb: Arc::new(db),
            family,
        }
    }

    fn paint(&self, target: &mut Pixmap, placements: &[Placement<'_>], pen: &Pen) -> Result<()> {
        match self {
            Self::Builtin => {
                for placement in placements {
                    builtin::draw_text(
                        target,
                        placement.text,
                        placement.x,
                        placement.y,
                        pen.fill,
                        pen.stroke,
                        pen.stroke_width,
                    );
                }
                Ok(())
            }
            Self::Svg { fontdb, family } => {
                let mut svg = String::new();
                svg.push_str(&format!(
                    r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
                    w = target.width(),
                    h = target.height()
                ));
                for placement in placements {
                    svg.push_str(&text_element(placement, family, pen));
                }
                svg.push_str("</svg>");

                let options = Options {
                    fontdb: Arc::clone(fontdb),
                    ..Options::default()
                };
                let tree =
                    Tree::from_str(&svg, &options).with_context(|| "failed to parse caption SVG")?;
                resvg::render(&tree, Transform::identity(), &mut target.as_mut());
                Ok(())
            }
        }
    }
}

fn text_element(placement: &Placement<'_>, family: &str, pen: &Pen) -> String {
    let stroke = if pen.stroke_width > 0.0 {
        // SVG strokes straddle the outline; double the width to grow it outward by `stroke_width`.
        format!(
            r#" stroke="{color}" stroke-width="{width}" stroke-linejoin="round" paint-order="stroke""#,
            color = pen.stroke.to_hex(),
            width = pen.stroke_width * 2.0
        )
    } else {
        String::new()
    };
    format!(
        r#"<text x="{x}" y="{y}" font-family="{family}" font-size="{size}" text-anchor="middle" fill="{fill}"{stroke} xml:space="preserve">{text}</text>"#,
        x = placement.x,
        y = placement.baseline_y,
        family = escape_xml(family),
        size = pen.font_size,
        fill = pen.fill.to_hex(),
        stroke = stroke,
        text = escape_xml(placement.text)
    )
}

/// Draws the laid-out caption onto `image`.
///
/// Glyphs are painted onto a transparent layer first. `image` is only touched
/// once every glyph has been painted, and only where the layer has coverage.
pub fn render(
    image: &mut RgbaImage,
    layout: &TextLayout,
    font: &ResolvedFont,
    style: &StyleConfig,
) -> Result<()> {
    if layout.glyphs.is_empty() {
        debug!("empty caption, nothing to draw");
        return Ok(());
    }
    let pen = Pen {
        font_size: layout.font_size,
        fill: style.fill_color,
        stroke: style.stroke_color,
        stroke_width: layout.stroke_width,
    };
    let painter = Painter::for_font(&font.metrics);
    let (width, height) = image.dimensions();
    let mut canvas = Pixmap::new(width, height)
        .ok_or_else(|| anyhow!("cannot draw on a {}x{} image", width, height))?;

    match layout.mode {
        LayoutMode::Straight | LayoutMode::Bend => {
            let placements: Vec<Placement<'_>> =
                layout.glyphs.iter().map(Placement::from).collect();
            painter.paint(&mut canvas, &placements, &pen)?;
        }
        LayoutMode::Arc => {
            for glyph in &layout.glyphs {
                paste_rotated(&mut canvas, glyph, &painter, &pen, style.arc.padding)?;
            }
        }
    }
    debug!("drew {} glyph(s) in {:?} mode", layout.glyphs.len(), layout.mode);

    composite(image, &canvas);
    Ok(())
}

/// Renders one glyph upright into a transparent square, rotates the square about
/// its center and pastes it centered on the glyph's arc point.
fn paste_rotated(
    canvas: &mut Pixmap,
    glyph: &GlyphSpec,
    painter: &Painter,
    pen: &Pen,
    padding: f32,
) -> Result<()> {
    let side = glyph_buffer_side(glyph, padding, pen.stroke_width);
    let mut upright = Pixmap::new(side, side)
        .ok_or_else(|| anyhow!("failed to allocate {}x{} glyph buffer", side, side))?;
    let center = side as f32 * 0.5;
    let placement = Placement {
        text: &glyph.text,
        x: center,
        y: center,
        baseline_y: center + (glyph.baseline_y - glyph.y),
    };
    painter.paint(&mut upright, &[placement], pen)?;

    let mut rotated = Pixmap::new(side, side)
        .ok_or_else(|| anyhow!("failed to allocate {}x{} glyph buffer", side, side))?;
    rotated.draw_pixmap(
        0,
        0,
        upright.as_ref(),
        &PixmapPaint {
            quality: FilterQuality::Bicubic,
            ..PixmapPaint::default()
        },
        Transform::from_rotate_at(glyph.rotation, center, center),
        None,
    );

    let paste_x = (glyph.x - center) as i32;
    let paste_y = (glyph.y - center) as i32;
    canvas.draw_pixmap(
        paste_x,
        paste_y,
        rotated.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
    Ok(())
}

/// Side of the square an arc glyph is drawn into: its larger ink extent plus
/// padding, grown by the stroke on both sides.
fn glyph_buffer_side(glyph: &GlyphSpec, padding: f32, stroke_width: f32) -> u32 {
    (glyph.width.max(glyph.height) + padding + stroke_width * 2.0)
        .ceil()
        .max(1.0) as u32
}

/// Source-over blend of the text layer onto `image`. Pixels the layer does not
/// cover keep their exact values.
fn composite(image: &mut RgbaImage, layer: &Pixmap) {
    for (pixel, covered) in image.pixels_mut().zip(layer.pixels()) {
        let src_alpha = covered.alpha();
        if src_alpha == 0 {
            continue;
        }
        let src = covered.demultiply();
        if src_alpha == u8::MAX {
            pixel.0 = [src.red(), src.green(), src.blue(), u8::MAX];
            continue;
        }
        let [r, g, b, a] = pixel.0;
        let sa = src_alpha as f32 / 255.0;
        let da = a as f32 / 255.0 * (1.0 - sa);
        let out_alpha = sa + da;
        let blend = |s: u8, d: u8| {
            ((s as f32 * sa + d as f32 * da) / out_alpha)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        pixel.0 = [
            blend(src.red(), r),
            blend(src.green(), g),
            blend(src.blue(), b),
            (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
        ];
    }
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .with_context(|| "failed to encode badge PNG")?;
    Ok(bytes)
}

/// Escapes markup and replaces characters XML 1.0 cannot carry with U+FFFD.
fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\t' | '\n' | '\r'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}' => escaped.push(ch),
            _ => escaped.push(char::REPLACEMENT_CHARACTER),
        }
    }
    escaped
}
