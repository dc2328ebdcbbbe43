//! Placeholder avatars: the person's initials drawn on a background color
//! derived from their email.

use std::io::Cursor;

use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};

use crate::gravatar::email_digest;
use crate::Result;

/// Bumping this makes every previously generated placeholder unreferenced.
pub const GENERATOR_VERSION: u32 = 1;

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const GLYPH_SPACING: u32 = 1;
/// Glyph cell size is the image side divided by this.
const CELLS_PER_SIDE: u32 = 16;

const FOREGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

const PALETTE: [[u8; 3]; 12] = [
    [0x1a, 0xbc, 0x9c],
    [0x2e, 0xcc, 0x71],
    [0x34, 0x98, 0xdb],
    [0x9b, 0x59, 0xb6],
    [0x34, 0x49, 0x5e],
    [0x16, 0xa0, 0x85],
    [0x27, 0xae, 0x60],
    [0x29, 0x80, 0xb9],
    [0x8e, 0x44, 0xad],
    [0xe6, 0x7e, 0x22],
    [0xe7, 0x4c, 0x3c],
    [0x7f, 0x8c, 0x8d],
];

// 5x7 bitmaps, one byte per row, bit 4 is the leftmost column.
static LETTERS: [[u8; 7]; 26] = [
    [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11], // A
    [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E], // B
    [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E], // C
    [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C], // D
    [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F], // E
    [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10], // F
    [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F], // G
    [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11], // H
    [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E], // I
    [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C], // J
    [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11], // K
    [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F], // L
    [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11], // M
    [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11], // N
    [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E], // O
    [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10], // P
    [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D], // Q
    [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11], // R
    [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E], // S
    [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04], // T
    [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E], // U
    [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04], // V
    [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A], // W
    [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11], // X
    [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04], // Y
    [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F], // Z
];

// Letters without a bitmap are drawn as a hollow box.
static UNKNOWN: [u8; 7] = [0x1F, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1F];

/// Up to two upper-cased initials: the first character of each of the
/// first two whitespace separated tokens, kept only if it is a letter.
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .take(2)
        .filter_map(|token| token.chars().next())
        .filter(|c| c.is_alphabetic())
        // One glyph per token even when upper-casing expands (`ß` -> `SS`).
        .filter_map(|c| c.to_uppercase().next())
        .collect()
}

/// Background color of everyone sharing this email.
pub fn background(email: &str) -> Rgba<u8> {
    let digest = email_digest(email);
    let [r, g, b] = PALETTE[digest[0] as usize % PALETTE.len()];
    Rgba([r, g, b, 255])
}

fn glyph(c: char) -> &'static [u8; 7] {
    if c.is_ascii_uppercase() {
        &LETTERS[(c as u8 - b'A') as usize]
    } else {
        &UNKNOWN
    }
}

/// Draw `letters` centered on a `size` x `size` square.
pub fn render(letters: &str, email: &str, size: u32) -> RgbaImage {
    let mut image = RgbaImage::from_pixel(size, size, background(email));

    let glyphs: Vec<&[u8; 7]> = letters.chars().map(glyph).collect();
    if glyphs.is_empty() {
        return image;
    }

    let cell = (size / CELLS_PER_SIDE).max(1);
    let count = glyphs.len() as u32;
    let text_width =
        (count * GLYPH_WIDTH + (count - 1) * GLYPH_SPACING) * cell;
    let text_height = GLYPH_HEIGHT * cell;
    let left = size.saturating_sub(text_width) / 2;
    let top = size.saturating_sub(text_height) / 2;

    for (index, rows) in glyphs.into_iter().enumerate() {
        let glyph_left =
            left + index as u32 * (GLYPH_WIDTH + GLYPH_SPACING) * cell;
        for (row, bits) in rows.iter().enumerate() {
            for column in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - column)) == 0 {
                    continue;
                }
                let x0 = glyph_left + column * cell;
                let y0 = top + row as u32 * cell;
                for y in y0..(y0 + cell).min(size) {
                    for x in x0..(x0 + cell).min(size) {
                        image.put_pixel(x, y, FOREGROUND);
                    }
                }
            }
        }
    }
    image
}

/// Render the placeholder of `name`/`email` as PNG bytes.
pub fn generate(name: &str, email: &str, size: u32) -> Result<Vec<u8>> {
    let letters = initials(name);
    log::debug!(
        "avatars: rendering placeholder with initials {:?} ({}px)",
        letters,
        size
    );
    let image = render(&letters, email, size);
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;
    use rstest::rstest;

    #[rstest]
    #[case("Ada Lovelace", "AL")]
    #[case("Madonna", "M")]
    #[case("123 Go", "G")]
    #[case("Go 123", "G")]
    #[case("1 2", "")]
    #[case("", "")]
    #[case("   ", "")]
    #[case("ada  lovelace", "AL")]
    #[case("Jean Claude Van Damme", "JC")]
    #[case("émile zola", "ÉZ")]
    #[case("\tLinus\nTorvalds", "LT")]
    #[case("ßtraße Zola", "SZ")]
    #[case("ﬀoo ßar", "FS")]
    fn initials_policy(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(initials(name), expected);
    }

    #[test]
    fn background_depends_only_on_normalized_email() {
        assert_eq!(
            background("ada@example.com"),
            background("  ADA@example.com ")
        );
        assert_eq!(background("ada@example.com").0[3], 255);
    }

    #[test]
    fn empty_initials_render_a_plain_square() {
        let image = render("", "nobody@example.com", 32);
        let bg = background("nobody@example.com");
        assert_eq!(image.dimensions(), (32, 32));
        assert!(image.pixels().all(|p| *p == bg));
    }

    #[test]
    fn letters_are_drawn_in_the_foreground_color() {
        let image = render("AL", "ada@example.com", 128);
        let lit = image
            .pixels()
            .filter(|p| **p == FOREGROUND)
            .count();
        // A has 18 lit cells and L has 11, each cell is 8x8 pixels.
        assert_eq!(lit, (18 + 11) * 64);
        // Corners stay background.
        assert_eq!(*image.get_pixel(0, 0), background("ada@example.com"));
        assert_eq!(*image.get_pixel(127, 127), background("ada@example.com"));
    }

    #[test]
    fn unknown_letters_use_the_box_glyph() {
        let image = render("Ж", "x@example.com", 16);
        let lit = image
            .pixels()
            .filter(|p| **p == FOREGROUND)
            .count();
        assert_eq!(lit, 5 + 5 + 2 * 5);
    }

    #[test]
    fn generate_produces_a_decodable_png() {
        let bytes = generate("Ada Lovelace", "ada@example.com", 64).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 64));
    }

    #[test]
    fn generate_is_deterministic() {
        let first = generate("Ada Lovelace", "ada@example.com", 64).unwrap();
        let second = generate("Ada Lovelace", "ada@example.com", 64).unwrap();
        assert_eq!(first, second);
    }
}
