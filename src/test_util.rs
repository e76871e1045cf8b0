#![cfg(test)]

use image::{Rgba, RgbaImage};

use crate::badge::StyleConfig;

/// Style that always resolves to the built-in font, so renders do not depend on
/// the fonts installed on the machine.
pub(crate) fn builtin_style() -> StyleConfig {
    StyleConfig {
        font_path: None,
        fallback_font_paths: Some(Vec::new()),
        system_fonts: false,
        ..StyleConfig::default()
    }
}

/// Dark image with a yellow banner across the lower part.
pub(crate) fn banner_image(width: u32, height: u32) -> RgbaImage {
    let mut image = RgbaImage::from_pixel(width, height, Rgba([40, 60, 90, 255]));
    for y in height * 8 / 10..height * 92 / 100 {
        for x in width / 4..width * 3 / 4 {
            image.put_pixel(x, y, Rgba([244, 197, 66, 255]));
        }
    }
    image
}

/// Family name stored in [`box_font_bytes`].
pub(crate) const BOX_FONT_FAMILY: &str = "Caption Box";

/// A tiny TrueType font with 1000 units per em: glyph 1 is an empty space,
/// glyph 2 a filled box (x 50..550, y 0..700) that every other printable ASCII
/// character maps to. Ascender 800, descender -200, every advance 600.
///
/// Lets the SVG text path run without depending on installed fonts.
pub(crate) fn box_font_bytes() -> Vec<u8> {
    let tables: [(&[u8; 4], Vec<u8>); 8] = [
        (b"cmap", box_font_cmap()),
        (b"glyf", box_font_glyf()),
        (b"head", box_font_head()),
        (b"hhea", box_font_hhea()),
        (b"hmtx", box_font_hmtx()),
        (b"loca", box_font_loca()),
        (b"maxp", box_font_maxp()),
        (b"name", box_font_name()),
    ];
    let directory_len = 12 + 16 * tables.len();
    let mut font = Vec::new();
    push_u32(&mut font, 0x0001_0000);
    push_u16(&mut font, tables.len() as u16);
    push_u16(&mut font, 128);
    push_u16(&mut font, 3);
    push_u16(&mut font, 0);
    let mut body = Vec::new();
    for (tag, data) in &tables {
        font.extend_from_slice(*tag);
        push_u32(&mut font, table_checksum(data));
        push_u32(&mut font, (directory_len + body.len()) as u32);
        push_u32(&mut font, data.len() as u32);
        body.extend_from_slice(data);
        while body.len() % 4 != 0 {
            body.push(0);
        }
    }
    font.extend_from_slice(&body);
    font
}

/// Writes [`box_font_bytes`] to a temporary `.ttf` file.
pub(crate) fn box_font_file() -> tempfile::NamedTempFile {
    use std::io::Write;

    let mut file = tempfile::Builder::new()
        .suffix(".ttf")
        .tempfile()
        .expect("font tempfile");
    file.write_all(&box_font_bytes()).expect("write font");
    file.flush().expect("flush font");
    file
}

fn push_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_be_bytes());
}

fn push_i16(buf: &mut Vec<u8>, value: i16) {
    buf.extend_from_slice(&value.to_be_bytes());
}

fn push_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

fn table_checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}

fn box_font_head() -> Vec<u8> {
    let mut head = Vec::new();
    push_u16(&mut head, 1);
    push_u16(&mut head, 0);
    push_u32(&mut head, 0x0001_0000);
    push_u32(&mut head, 0);
    push_u32(&mut head, 0x5F0F_3CF5);
    push_u16(&mut head, 0);
    push_u16(&mut head, 1000);
    head.extend_from_slice(&[0; 16]);
    for bound in [50, 0, 550, 700] {
        push_i16(&mut head, bound);
    }
    push_u16(&mut head, 0);
    push_u16(&mut head, 8);
    push_i16(&mut head, 2);
    // Short loca offsets.
    push_i16(&mut head, 0);
    push_i16(&mut head, 0);
    head
}

fn box_font_hhea() -> Vec<u8> {
    let mut hhea = Vec::new();
    push_u32(&mut hhea, 0x0001_0000);
    push_i16(&mut hhea, 800);
    push_i16(&mut hhea, -200);
    push_i16(&mut hhea, 0);
    push_u16(&mut hhea, 600);
    push_i16(&mut hhea, 0);
    push_i16(&mut hhea, 50);
    push_i16(&mut hhea, 550);
    push_i16(&mut hhea, 1);
    push_i16(&mut hhea, 0);
    push_i16(&mut hhea, 0);
    hhea.extend_from_slice(&[0; 8]);
    push_i16(&mut hhea, 0);
    push_u16(&mut hhea, 3);
    hhea
}

fn box_font_maxp() -> Vec<u8> {
    let mut maxp = Vec::new();
    push_u32(&mut maxp, 0x0000_5000);
    push_u16(&mut maxp, 3);
    maxp
}

fn box_font_hmtx() -> Vec<u8> {
    let mut hmtx = Vec::new();
    for lsb in [0, 0, 50] {
        push_u16(&mut hmtx, 600);
        push_i16(&mut hmtx, lsb);
    }
    hmtx
}

fn box_font_glyf() -> Vec<u8> {
    let mut glyf = Vec::new();
    push_i16(&mut glyf, 1);
    for bound in [50, 0, 550, 700] {
        push_i16(&mut glyf, bound);
    }
    push_u16(&mut glyf, 3);
    push_u16(&mut glyf, 0);
    // Four on-curve points with 16-bit deltas: (50,0) (550,0) (550,700) (50,700).
    glyf.extend_from_slice(&[0x01; 4]);
    for dx in [50, 500, 0, -500] {
        push_i16(&mut glyf, dx);
    }
    for dy in [0, 0, 700, 0] {
        push_i16(&mut glyf, dy);
    }
    glyf
}

fn box_font_loca() -> Vec<u8> {
    let mut loca = Vec::new();
    // Halved offsets: .notdef and space are empty, the box spans 34 bytes.
    for offset in [0, 0, 0, 17] {
        push_u16(&mut loca, offset);
    }
    loca
}

fn box_font_cmap() -> Vec<u8> {
    const SEGMENTS: [(u16, u16, u16, u16); 3] = [
        // (start, end, id delta, id range offset)
        (0x20, 0x20, 1u16.wrapping_sub(0x20), 0),
        (0x21, 0x7E, 0, 4),
        (0xFFFF, 0xFFFF, 1, 0),
    ];
    let box_glyphs = 0x7E - 0x21 + 1;
    let mut subtable = Vec::new();
    push_u16(&mut subtable, 4);
    push_u16(&mut subtable, (16 + 8 * SEGMENTS.len() + 2 * box_glyphs) as u16);
    push_u16(&mut subtable, 0);
    push_u16(&mut subtable, (SEGMENTS.len() * 2) as u16);
    push_u16(&mut subtable, 4);
    push_u16(&mut subtable, 1);
    push_u16(&mut subtable, 2);
    for (_, end, _, _) in SEGMENTS {
        push_u16(&mut subtable, end);
    }
    push_u16(&mut subtable, 0);
    for (start, _, _, _) in SEGMENTS {
        push_u16(&mut subtable, start);
    }
    for (_, _, delta, _) in SEGMENTS {
        push_u16(&mut subtable, delta);
    }
    for (_, _, _, range_offset) in SEGMENTS {
        push_u16(&mut subtable, range_offset);
    }
    for _ in 0..box_glyphs {
        push_u16(&mut subtable, 2);
    }

    let mut cmap = Vec::new();
    push_u16(&mut cmap, 0);
    push_u16(&mut cmap, 1);
    push_u16(&mut cmap, 3);
    push_u16(&mut cmap, 1);
    push_u32(&mut cmap, 12);
    cmap.extend_from_slice(&subtable);
    cmap
}

fn box_font_name() -> Vec<u8> {
    let records = [
        (1, BOX_FONT_FAMILY),
        (2, "Regular"),
        (4, BOX_FONT_FAMILY),
        (6, "CaptionBox-Regular"),
    ];
    let mut name = Vec::new();
    let mut strings = Vec::new();
    push_u16(&mut name, 0);
    push_u16(&mut name, records.len() as u16);
    push_u16(&mut name, (6 + 12 * records.len()) as u16);
    for (name_id, value) in records {
        let encoded: Vec<u8> = value.encode_utf16().flat_map(u16::to_be_bytes).collect();
        push_u16(&mut name, 3);
        push_u16(&mut name, 1);
        push_u16(&mut name, 0x0409);
        push_u16(&mut name, name_id);
        push_u16(&mut name, encoded.len() as u16);
        push_u16(&mut name, strings.len() as u16);
        strings.extend_from_slice(&encoded);
    }
    name.extend_from_slice(&strings);
    name
}
