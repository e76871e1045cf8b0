//! Fixed-size 5x7 bitmap font used when no font file can be loaded.
//!
//! Captions are upper-cased before layout, so the table only covers upper-case
//! Latin letters, digits and common punctuation. Anything else is drawn as a box.

use tiny_skia::{Paint, Pixmap, Rect, Transform};

use super::Color;

pub(crate) const CELL: f32 = 3.0;
const COLUMNS: usize = 5;
const ROWS: usize = 7;
pub(crate) const GLYPH_WIDTH: f32 = CELL * COLUMNS as f32;
pub(crate) const GLYPH_HEIGHT: f32 = CELL * ROWS as f32;
/// Glyph width plus one empty column.
pub(crate) const ADVANCE: f32 = GLYPH_WIDTH + CELL;

const UNKNOWN: [u8; ROWS] = [0x1f, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1f];

fn glyph_rows(ch: char) -> [u8; ROWS] {
    match ch {
        'A' => [0x0e, 0x11, 0x11, 0x1f, 0x11, 0x11, 0x11],
        'B' => [0x1e, 0x11, 0x11, 0x1e, 0x11, 0x11, 0x1e],
        'C' => [0x0e, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0e],
        'D' => [0x1e, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1e],
        'E' => [0x1f, 0x10, 0x10, 0x1e, 0x10, 0x10, 0x1f],
        'F' => [0x1f, 0x10, 0x10, 0x1e, 0x10, 0x10, 0x10],
        'G' => [0x0e, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0f],
        'H' => [0x11, 0x11, 0x11, 0x1f, 0x11, 0x11, 0x11],
        'I' => [0x0e, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0e],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0c],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1f],
        'M' => [0x11, 0x1b, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0e, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0e],
        'P' => [0x1e, 0x11, 0x11, 0x1e, 0x10, 0x10, 0x10],
        'Q' => [0x0e, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0d],
        'R' => [0x1e, 0x11, 0x11, 0x1e, 0x14, 0x12, 0x11],
        'S' => [0x0f, 0x10, 0x10, 0x0e, 0x01, 0x01, 0x1e],
        'T' => [0x1f, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0e],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0a, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0a],
        'X' => [0x11, 0x11, 0x0a, 0x04, 0x0a, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x0a, 0x04, 0x04, 0x04, 0x04],
        'Z' => [0x1f, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1f],
        '0' => [0x0e, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0e],
        '1' => [0x04, 0x0c, 0x04, 0x04, 0x04, 0x04, 0x0e],
        '2' => [0x0e, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1f],
        '3' => [0x1f, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0e],
        '4' => [0x02, 0x06, 0x0a, 0x12, 0x1f, 0x02, 0x02],
        '5' => [0x1f, 0x10, 0x1e, 0x01, 0x01, 0x11, 0x0e],
        '6' => [0x06, 0x08, 0x10, 0x1e, 0x11, 0x11, 0x0e],
        '7' => [0x1f, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0e, 0x11, 0x11, 0x0e, 0x11, 0x11, 0x0e],
        '9' => [0x0e, 0x11, 0x11, 0x0f, 0x01, 0x02, 0x0c],
        ' ' => [0x00; ROWS],
        '!' => [0x04, 0x04, 0x04, 0x04, 0x04, 0x00, 0x04],
        '?' => [0x0e, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0c, 0x0c],
        ',' => [0x00, 0x00, 0x00, 0x00, 0x0c, 0x04, 0x08],
        '-' => [0x00, 0x00, 0x00, 0x1f, 0x00, 0x00, 0x00],
        '\'' => [0x04, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00],
        '"' => [0x0a, 0x0a, 0x00, 0x00, 0x00, 0x00, 0x00],
        ':' => [0x00, 0x0c, 0x0c, 0x00, 0x0c, 0x0c, 0x00],
        '&' => [0x0c, 0x12, 0x14, 0x08, 0x15, 0x12, 0x0d],
        '+' => [0x00, 0x04, 0x04, 0x1f, 0x04, 0x04, 0x00],
        '/' => [0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x00],
        '(' => [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02],
        ')' => [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08],
        '#' => [0x0a, 0x0a, 0x1f, 0x0a, 0x1f, 0x0a, 0x0a],
        _ => UNKNOWN,
    }
}

pub(crate) fn text_width(text: &str) -> f32 {
    let count = text.chars().count();
    if count == 0 {
        return 0.0;
    }
    count as f32 * ADVANCE - CELL
}

/// Draws `text` centered on (`center_x`, `center_y`), outline first.
pub(crate) fn draw_text(
    target: &mut Pixmap,
    text: &str,
    center_x: f32,
    center_y: f32,
    fill: Color,
    stroke: Color,
    stroke_width: f32,
) {
    let left = center_x - text_width(text) * 0.5;
    let top = center_y - GLYPH_HEIGHT * 0.5;
    if stroke_width > 0.0 {
        paint_cells(target, text, left, top, stroke, stroke_width);
    }
    paint_cells(target, text, left, top, fill, 0.0);
}

fn paint_cells(target: &mut Pixmap, text: &str, left: f32, top: f32, color: Color, grow: f32) {
    let [r, g, b] = color.0;
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, 255);
    paint.anti_alias = false;

    let size = CELL + grow * 2.0;
    for (idx, ch) in text.chars().enumerate() {
        let origin_x = left + idx as f32 * ADVANCE;
        for (row, bits) in glyph_rows(ch).iter().enumerate() {
            for col in 0..COLUMNS {
                if bits & (0x10 >> col) == 0 {
                    continue;
                }
                let x = origin_x + col as f32 * CELL - grow;
                let y = top + row as f32 * CELL - grow;
                if let Some(rect) = Rect::from_xywh(x, y, size, size) {
                    target.fill_rect(rect, &paint, Transform::identity(), None);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(pixmap: &Pixmap, x: u32, y: u32) -> [u8; 4] {
        let color = pixmap.pixel(x, y).expect("pixel in bounds").demultiply();
        [color.red(), color.green(), color.blue(), color.alpha()]
    }

    #[test]
    fn width_excludes_trailing_gap() {
        assert_eq!(text_width(""), 0.0);
        assert_eq!(text_width("A"), GLYPH_WIDTH);
        assert_eq!(text_width("AB"), ADVANCE + GLYPH_WIDTH);
    }

    #[test]
    fn unknown_characters_render_as_box() {
        assert_eq!(glyph_rows('Ж'), UNKNOWN);
        assert_ne!(glyph_rows('A'), UNKNOWN);
    }

    #[test]
    fn draws_fill_over_stroke() {
        let mut pixmap = Pixmap::new(40, 40).expect("pixmap");
        draw_text(
            &mut pixmap,
            "I",
            20.0,
            20.0,
            Color([255, 0, 0]),
            Color([0, 0, 255]),
            2.0,
        );
        // 'I' top row spans columns 1..4; its center cell is filled.
        let left = 20.0 - GLYPH_WIDTH * 0.5;
        let top = 20.0 - GLYPH_HEIGHT * 0.5;
        let cx = (left + 2.0 * CELL + 1.0) as u32;
        let cy = (top + 3.0 * CELL + 1.0) as u32;
        assert_eq!(pixel(&pixmap, cx, cy), [255, 0, 0, 255]);
        // Just outside the stem the outline shows through.
        let sx = (left + 2.0 * CELL - 1.0) as u32;
        assert_eq!(pixel(&pixmap, sx, cy), [0, 0, 255, 255]);
        assert_eq!(pixel(&pixmap, 0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn spaces_draw_nothing() {
        let mut pixmap = Pixmap::new(30, 30).expect("pixmap");
        draw_text(
            &mut pixmap,
            " ",
            15.0,
            15.0,
            Color([255, 255, 255]),
            Color([0, 0, 0]),
            3.0,
        );
        assert!(pixmap.pixels().iter().all(|p| p.alpha() == 0));
    }
}
