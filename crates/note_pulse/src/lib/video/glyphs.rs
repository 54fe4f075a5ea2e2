//! A tiny 5x7 bitmap font covering the characters of an `MM:SS` label.

use image::{Rgb, RgbImage};

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;

pub const LABEL_FILL: Rgb<u8> = Rgb([255, 255, 0]);
pub const LABEL_STROKE: Rgb<u8> = Rgb([0, 0, 0]);

/// Each row is the low 5 bits, most significant bit leftmost
fn glyph(c: char) -> Option<[u8; 7]> {
    let rows = match c {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        _ => return None,
    };
    Some(rows)
}

/// Pixel scale that keeps the label readable relative to the cell height
pub fn scale_for_height(cell_height: u32) -> u32 {
    (cell_height / 100).max(1)
}

fn put_block(img: &mut RgbImage, x: i64, y: i64, scale: u32, color: Rgb<u8>) {
    let (width, height) = img.dimensions();
    for dy in 0..scale as i64 {
        for dx in 0..scale as i64 {
            let (px, py) = (x + dx, y + dy);
            if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                img.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

fn draw_text(img: &mut RgbImage, text: &str, x: i64, y: i64, scale: u32, color: Rgb<u8>) {
    let advance = ((GLYPH_WIDTH + 1) * scale) as i64;
    for (i, c) in text.chars().enumerate() {
        let Some(rows) = glyph(c) else { continue };
        let origin_x = x + i as i64 * advance;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
                    put_block(
                        img,
                        origin_x + (col * scale) as i64,
                        y + (row as u32 * scale) as i64,
                        scale,
                        color,
                    );
                }
            }
        }
    }
}

/// Stamps `text` at `(x, y)` in yellow with a one-block dark outline.
/// Pixels falling outside the image are clipped.
pub fn stamp_label(img: &mut RgbImage, text: &str, x: u32, y: u32, scale: u32) {
    let (x, y, s) = (x as i64, y as i64, scale as i64);
    for (dx, dy) in [(-s, 0), (s, 0), (0, -s), (0, s)] {
        draw_text(img, text, x + dx, y + dy, scale, LABEL_STROKE);
    }
    draw_text(img, text, x, y, scale, LABEL_FILL);
}

/// Size in pixels of `text` rendered at `scale`, outline excluded
pub fn label_size(text: &str, scale: u32) -> (u32, u32) {
    let n = text.chars().count() as u32;
    if n == 0 {
        return (0, 0);
    }
    (
        (n * (GLYPH_WIDTH + 1) - 1) * scale,
        GLYPH_HEIGHT * scale,
    )
}
