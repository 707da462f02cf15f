/// Numbered grid addressing over a captured frame.
///
/// The frame is tiled with square cells of `cell_size` pixels; any partial
/// trailing row or column is truncated so every addressable cell is fully
/// inside the image. Cells are numbered 1-based, row-major, left to right,
/// top to bottom. The same numbering is drawn onto the frame sent to the
/// vision model, so the model can answer with a bare cell index.
use image::RgbaImage;

// ── Minimal 5×5 bitmap font ───────────────────────────────────────────────────
// Each glyph: 5 rows, each row is a u8 where bit4=leftmost pixel, bit0=rightmost.
const FONT_5X5: [[u8; 5]; 10] = [
    [0b01110, 0b10001, 0b10001, 0b10001, 0b01110], // 0
    [0b00100, 0b01100, 0b00100, 0b00100, 0b01110], // 1
    [0b01110, 0b10001, 0b00110, 0b01000, 0b11111], // 2
    [0b11110, 0b00001, 0b00110, 0b00001, 0b11110], // 3
    [0b00110, 0b01010, 0b10010, 0b11111, 0b00010], // 4
    [0b11111, 0b10000, 0b11110, 0b00001, 0b11110], // 5
    [0b01110, 0b10000, 0b11110, 0b10001, 0b01110], // 6
    [0b11111, 0b00001, 0b00010, 0b00100, 0b00100], // 7
    [0b01110, 0b10001, 0b01110, 0b10001, 0b01110], // 8
    [0b01110, 0b10001, 0b01111, 0b00001, 0b01110], // 9
];

// ── Cell ↔ pixel conversion ───────────────────────────────────────────────────

/// Number of (columns, rows) the image tiles into. Partial cells don't count.
pub fn grid_dimensions(image_w: u32, image_h: u32, cell_size: u32) -> (u32, u32) {
    if cell_size == 0 {
        return (0, 0);
    }
    (image_w / cell_size, image_h / cell_size)
}

/// Center of a 1-based cell in image pixel coordinates.
///
/// Returns `None` for cell 0 or any index past the fully-tiled region; an
/// out-of-range index is rejected rather than wrapped.
pub fn cell_to_pixel_center(
    cell: u32,
    image_w: u32,
    image_h: u32,
    cell_size: u32,
) -> Option<(u32, u32)> {
    if cell < 1 {
        return None;
    }
    let (columns, rows) = grid_dimensions(image_w, image_h, cell_size);
    if columns == 0 || rows == 0 {
        return None;
    }
    let idx = cell - 1;
    let row = idx / columns;
    let col = idx % columns;
    if row >= rows {
        return None;
    }
    Some((col * cell_size + cell_size / 2, row * cell_size + cell_size / 2))
}

/// Cell number under an image pixel, or `None` if the pixel is outside the
/// image or falls in a truncated partial row/column.
pub fn pixel_to_cell(x: u32, y: u32, image_w: u32, image_h: u32, cell_size: u32) -> Option<u32> {
    if x >= image_w || y >= image_h {
        return None;
    }
    let (columns, rows) = grid_dimensions(image_w, image_h, cell_size);
    if columns == 0 || rows == 0 {
        return None;
    }
    let col = x / cell_size;
    let row = y / cell_size;
    // A pixel in a truncated partial row/column belongs to no cell.
    if col >= columns || row >= rows {
        return None;
    }
    Some(row * columns + col + 1)
}

// ── Overlay drawing ───────────────────────────────────────────────────────────

/// Composite a numbered grid over `src` and return the annotated copy.
///
/// Grid lines are drawn semi-transparent at every `cell_size` boundary and
/// each cell gets its number centered inside it, with a dark drop shadow so
/// the digits stay readable over arbitrary scene art. The input image is not
/// mutated. If the image is smaller than one cell the copy is returned
/// without annotation.
pub fn draw_numbered_grid(src: &RgbaImage, cell_size: u32) -> RgbaImage {
    let mut canvas = src.clone();
    let (w, h) = canvas.dimensions();
    let (columns, rows) = grid_dimensions(w, h, cell_size);
    if columns == 0 || rows == 0 {
        return canvas;
    }

    // Semi-transparent white lines, 1 px wide.
    let (lr, lg, lb, la) = (255u8, 255u8, 255u8, 40u8);
    for col in 0..=columns {
        let x = col * cell_size;
        if x >= w {
            break;
        }
        for y in 0..h {
            blend_pixel(canvas.get_pixel_mut(x, y), lr, lg, lb, la);
        }
    }
    for row in 0..=rows {
        let y = row * cell_size;
        if y >= h {
            break;
        }
        for x in 0..w {
            blend_pixel(canvas.get_pixel_mut(x, y), lr, lg, lb, la);
        }
    }

    // scale=2 when cells are large enough for 10×10 px glyphs.
    let scale: u32 = if cell_size >= 80 { 2 } else { 1 };

    let mut cell = 1u32;
    for row in 0..rows {
        for col in 0..columns {
            let label = cell.to_string();
            let text_w = label.len() as u32 * (5 * scale + 1) - 1;
            let text_h = 5 * scale;
            let lx = col * cell_size + cell_size.saturating_sub(text_w) / 2;
            let ly = row * cell_size + cell_size.saturating_sub(text_h) / 2;
            // Shadow first, offset down-right.
            draw_label_str(&mut canvas, &label, lx + 1, ly + 1, scale, [0, 0, 0, 100]);
            draw_label_str(&mut canvas, &label, lx, ly, scale, [255, 255, 255, 180]);
            cell += 1;
        }
    }

    canvas
}

/// Draw a digit string starting at (px, py).
fn draw_label_str(canvas: &mut RgbaImage, label: &str, px: u32, py: u32, scale: u32, col: [u8; 4]) {
    let char_step = 5 * scale + 1; // 1px gap between chars
    for (i, c) in label.chars().enumerate() {
        draw_glyph(canvas, c, px + i as u32 * char_step, py, scale, col);
    }
}

fn draw_glyph(canvas: &mut RgbaImage, c: char, px: u32, py: u32, scale: u32, col: [u8; 4]) {
    let glyph = match c {
        '0'..='9' => &FONT_5X5[(c as u8 - b'0') as usize],
        _ => return,
    };
    let (w, h) = canvas.dimensions();
    for (row, &bits) in glyph.iter().enumerate() {
        for bit in 0..5u32 {
            if (bits >> (4 - bit)) & 1 == 0 {
                continue;
            }
            for sy in 0..scale {
                for sx in 0..scale {
                    let x = px + bit * scale + sx;
                    let y = py + row as u32 * scale + sy;
                    if x < w && y < h {
                        blend_pixel(canvas.get_pixel_mut(x, y), col[0], col[1], col[2], col[3]);
                    }
                }
            }
        }
    }
}

fn blend_pixel(pixel: &mut image::Rgba<u8>, r: u8, g: u8, b: u8, a: u8) {
    let alpha = a as f32 / 255.0;
    pixel[0] = (pixel[0] as f32 * (1.0 - alpha) + r as f32 * alpha).round() as u8;
    pixel[1] = (pixel[1] as f32 * (1.0 - alpha) + g as f32 * alpha).round() as u8;
    pixel[2] = (pixel[2] as f32 * (1.0 - alpha) + b as f32 * alpha).round() as u8;
    // alpha channel intentionally preserved
}

#[cfg(test)]
mod tests {
    use super::*;

    // 640×480 with 40 px cells → the classic 16×12 grid, 192 cells.
    const W: u32 = 640;
    const H: u32 = 480;
    const S: u32 = 40;

    #[test]
    fn cell_one_is_top_left_center() {
        assert_eq!(cell_to_pixel_center(1, W, H, S), Some((20, 20)));
    }

    #[test]
    fn last_cell_is_bottom_right_center() {
        assert_eq!(cell_to_pixel_center(192, W, H, S), Some((620, 460)));
    }

    #[test]
    fn rejects_cell_zero_and_beyond_grid() {
        assert_eq!(cell_to_pixel_center(0, W, H, S), None);
        assert_eq!(cell_to_pixel_center(193, W, H, S), None);
        assert_eq!(cell_to_pixel_center(10_000, W, H, S), None);
    }

    #[test]
    fn partial_trailing_row_is_truncated() {
        // 650×470 still tiles as 16×11; cell 177 would start the 12th row.
        assert_eq!(grid_dimensions(650, 470, S), (16, 11));
        assert!(cell_to_pixel_center(176, 650, 470, S).is_some());
        assert_eq!(cell_to_pixel_center(177, 650, 470, S), None);
    }

    #[test]
    fn pixel_to_cell_maps_corners() {
        assert_eq!(pixel_to_cell(0, 0, W, H, S), Some(1));
        assert_eq!(pixel_to_cell(639, 479, W, H, S), Some(192));
        assert_eq!(pixel_to_cell(640, 100, W, H, S), None);
        assert_eq!(pixel_to_cell(100, 480, W, H, S), None);
    }

    #[test]
    fn pixel_in_partial_column_has_no_cell() {
        // 650 px wide: x in 640..650 lies past the 16th full column.
        assert_eq!(pixel_to_cell(645, 10, 650, H, S), None);
        assert_eq!(pixel_to_cell(639, 10, 650, H, S), Some(16));
    }

    #[test]
    fn round_trip_every_cell() {
        let (columns, rows) = grid_dimensions(W, H, S);
        for cell in 1..=columns * rows {
            let (x, y) = cell_to_pixel_center(cell, W, H, S).unwrap();
            assert_eq!(pixel_to_cell(x, y, W, H, S), Some(cell));
        }
    }

    #[test]
    fn overlay_does_not_mutate_source() {
        let src = RgbaImage::from_pixel(120, 80, image::Rgba([10, 20, 30, 255]));
        let annotated = draw_numbered_grid(&src, 40);
        assert_eq!(src.get_pixel(0, 0), &image::Rgba([10, 20, 30, 255]));
        // Grid line at x=40 must differ from the untouched source.
        assert_ne!(annotated.get_pixel(40, 5), src.get_pixel(40, 5));
    }

    #[test]
    fn image_smaller_than_one_cell_is_returned_unannotated() {
        let src = RgbaImage::from_pixel(30, 30, image::Rgba([1, 2, 3, 255]));
        let annotated = draw_numbered_grid(&src, 40);
        assert_eq!(annotated.as_raw(), src.as_raw());
    }
}
