//! Minimal text drawing on an RGB canvas using the 8×8 bitmap font.

use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{Rgb, RgbImage};

pub const GLYPH_PX: u32 = 8;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
pub const GRAY: Rgb<u8> = Rgb([128, 128, 128]);

fn glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

/// Draw `text` with its top-left corner at `(x, y)`, each font pixel scaled to
/// a `scale`×`scale` block. Anything past the canvas edge is clipped.
pub fn draw_text(img: &mut RgbImage, x: u32, y: u32, text: &str, scale: u32, color: Rgb<u8>) {
    let (w, h) = img.dimensions();
    let advance = GLYPH_PX * scale;

    for (i, c) in text.chars().enumerate() {
        let ox = x + i as u32 * advance;
        if ox >= w {
            break;
        }
        // Row bytes are LSB-first: bit 0 is the leftmost pixel.
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..GLYPH_PX {
                if bits & (1u8 << col) == 0 {
                    continue;
                }
                let px = ox + col * scale;
                let py = y + row as u32 * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        let (tx, ty) = (px + dx, py + dy);
                        if tx < w && ty < h {
                            img.put_pixel(tx, ty, color);
                        }
                    }
                }
            }
        }
    }
}
