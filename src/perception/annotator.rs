/// Set-of-Mark overlay: draw a numbered, colour-coded box over every
/// candidate so a vision model can answer with an id instead of coordinates.
///
/// Labels use a built-in bitmap font, so rendering never depends on fonts
/// installed on the host.
use std::path::Path;

use crate::errors::{SeeDroidError, SeeDroidResult};
use crate::perception::coords::CoordinateMapper;
use crate::perception::types::{CandidateElement, ScreenSize};

/// red, blue, green, orange, purple
const PALETTE: [[u8; 4]; 5] = [
    [230, 40, 40, 255],
    [40, 90, 230, 255],
    [30, 170, 60, 255],
    [245, 150, 20, 255],
    [150, 50, 200, 255],
];

const LABEL_FG: [u8; 4] = [255, 255, 255, 255];

fn mark_colour(id: u32) -> [u8; 4] {
    PALETTE[id as usize % PALETTE.len()]
}

/// Annotate `src_bytes` (PNG/JPEG) with one mark per candidate.
/// Candidate bounds are in UI-tree space; `screen` is that space's size and
/// is mapped onto the decoded image. Returns PNG-encoded bytes.
pub fn annotate_image(
    src_bytes: &[u8],
    candidates: &[CandidateElement],
    screen: ScreenSize,
) -> SeeDroidResult<Vec<u8>> {
    let img = image::load_from_memory(src_bytes)
        .map_err(|e| SeeDroidError::Perception(format!("annotate load: {e}")))?;
    let mut canvas = img.to_rgba8();
    let (w, h) = canvas.dimensions();
    let mapper = CoordinateMapper::new(screen, ScreenSize::new(w, h));

    // Phone captures are ~1080 px wide; keep labels legible to the model.
    let label_scale: u32 = (w / 360).clamp(1, 6);
    let box_thickness: i32 = (label_scale as i32).max(2);

    for candidate in candidates {
        let b = mapper.map_bounds(&candidate.bounds);
        let col = mark_colour(candidate.id);

        draw_rect(&mut canvas, b.x1, b.y1, b.x2, b.y2, col, box_thickness);

        let label = candidate.id.to_string();
        let (_, label_h) = label_size(&label, label_scale);
        // Sit on top of the box, but never above the image's top edge.
        let label_y = b.y1.saturating_sub(label_h as i32).max(0);
        draw_label(&mut canvas, b.x1.max(0), label_y, &label, col, label_scale);
    }

    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(canvas)
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .map_err(|e| SeeDroidError::Perception(format!("PNG encode: {e}")))?;

    Ok(out)
}

/// Best-effort copy of the last annotated screen for post-mortem inspection.
pub fn persist_debug_image(bytes: &[u8], path: &Path) {
    if path.as_os_str().is_empty() {
        return;
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!(path = %path.display(), error = %e, "debug image dir not created");
            return;
        }
    }
    match std::fs::write(path, bytes) {
        Ok(()) => tracing::debug!(path = %path.display(), "annotated screenshot saved"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "debug image not saved"),
    }
}

// ── Drawing primitives ──────────────────────────────────────────────────────

fn draw_rect(
    canvas: &mut image::RgbaImage,
    x1: i32, y1: i32, x2: i32, y2: i32,
    col: [u8; 4],
    thickness: i32,
) {
    let (w, h) = canvas.dimensions();
    let (iw, ih) = (w as i32, h as i32);

    // Top & bottom edges
    for t in 0..thickness {
        let ty = y1 + t;
        let by = y2 - 1 - t;
        for x in x1.max(0)..x2.min(iw) {
            if ty >= 0 && ty < ih { set_pixel(canvas, x as u32, ty as u32, col); }
            if by >= 0 && by < ih { set_pixel(canvas, x as u32, by as u32, col); }
        }
    }
    // Left & right edges
    for t in 0..thickness {
        let lx = x1 + t;
        let rx = x2 - 1 - t;
        for y in y1.max(0)..y2.min(ih) {
            if lx >= 0 && lx < iw { set_pixel(canvas, lx as u32, y as u32, col); }
            if rx >= 0 && rx < iw { set_pixel(canvas, rx as u32, y as u32, col); }
        }
    }
}

fn label_size(text: &str, scale: u32) -> (u32, u32) {
    let char_w = 5 * scale + scale; // glyph + gap
    let pad = 2 * scale;
    (text.len() as u32 * char_w + pad * 2, 5 * scale + pad * 2)
}

/// Filled badge in the mark colour with white digits.
fn draw_label(
    canvas: &mut image::RgbaImage,
    x: i32, y: i32,
    text: &str,
    col: [u8; 4],
    scale: u32,
) {
    let (w, h) = canvas.dimensions();
    let (label_w, label_h) = label_size(text, scale);
    let (x, y) = (x.max(0) as u32, y.max(0) as u32);

    for dy in 0..label_h {
        for dx in 0..label_w {
            let (px, py) = (x + dx, y + dy);
            if px < w && py < h {
                set_pixel(canvas, px, py, col);
            }
        }
    }

    let pad = 2 * scale;
    let step = 5 * scale + scale;
    for (i, c) in text.chars().enumerate() {
        draw_glyph(canvas, c, x + pad + i as u32 * step, y + pad, LABEL_FG, scale);
    }
}

fn draw_glyph(canvas: &mut image::RgbaImage, c: char, px: u32, py: u32, col: [u8; 4], scale: u32) {
    let glyph = match c {
        '0'..='9' => DIGITS[(c as u8 - b'0') as usize],
        '-' => [0b00000, 0b00000, 0b11111, 0b00000, 0b00000],
        _ => return,
    };
    let (w, h) = canvas.dimensions();
    for (row, &bits) in glyph.iter().enumerate() {
        for bit in 0..5u32 {
            if (bits >> (4 - bit)) & 1 == 0 { continue; }
            for sy in 0..scale {
                for sx in 0..scale {
                    let x = px + bit * scale + sx;
                    let y = py + row as u32 * scale + sy;
                    if x < w && y < h {
                        set_pixel(canvas, x, y, col);
                    }
                }
            }
        }
    }
}

fn set_pixel(canvas: &mut image::RgbaImage, x: u32, y: u32, col: [u8; 4]) {
    let p = canvas.get_pixel_mut(x, y);
    let a = col[3] as f32 / 255.0;
    p[0] = (p[0] as f32 * (1.0 - a) + col[0] as f32 * a).round() as u8;
    p[1] = (p[1] as f32 * (1.0 - a) + col[1] as f32 * a).round() as u8;
    p[2] = (p[2] as f32 * (1.0 - a) + col[2] as f32 * a).round() as u8;
    p[3] = 255;
}

/// 5×5 bitmap digits, bit4 = leftmost pixel.
const DIGITS: [[u8; 5]; 10] = [
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::types::{Bounds, ElementFlags};

    fn blank_png(w: u32, h: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba([0, 0, 0, 255]));
        let mut out = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    fn candidate(id: u32, bounds: Bounds) -> CandidateElement {
        CandidateElement {
            id,
            bounds,
            text: Some("x".into()),
            accessibility_label: None,
            identifier: None,
            class_name: None,
            flags: ElementFlags::default(),
        }
    }

    #[test]
    fn annotation_is_deterministic() {
        let src = blank_png(200, 200);
        let marks = [candidate(1, Bounds::new(0, 0, 50, 50))];
        let screen = ScreenSize::new(200, 200);
        let a = annotate_image(&src, &marks, screen).unwrap();
        let b = annotate_image(&src, &marks, screen).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, src);
    }

    #[test]
    fn box_uses_palette_colour_and_label_stays_on_image() {
        let src = blank_png(400, 400);
        let screen = ScreenSize::new(400, 400);
        let marks = [candidate(1, Bounds::new(100, 0, 200, 100))];
        let out = image::load_from_memory(&annotate_image(&src, &marks, screen).unwrap())
            .unwrap()
            .to_rgba8();

        // Bottom edge of the box.
        assert_eq!(out.get_pixel(150, 99).0, PALETTE[1]);
        // The badge was clamped to y = 0 and painted in the mark colour.
        assert_eq!(out.get_pixel(100, 0).0, PALETTE[1]);
        // Inside the box, away from the badge, stays untouched.
        assert_eq!(out.get_pixel(150, 60).0, [0, 0, 0, 255]);
    }

    #[test]
    fn extreme_bounds_are_clipped_to_image() {
        let src = blank_png(200, 200);
        let screen = ScreenSize::new(200, 200);
        let marks = [candidate(3, Bounds::new(i32::MIN, i32::MIN, i32::MAX, 100))];
        let out = image::load_from_memory(&annotate_image(&src, &marks, screen).unwrap())
            .unwrap()
            .to_rgba8();
        assert_eq!(out.get_pixel(150, 99).0, PALETTE[3]);
    }

    #[test]
    fn colours_cycle_through_palette() {
        assert_eq!(mark_colour(0), mark_colour(5));
        assert_ne!(mark_colour(1), mark_colour(2));
    }

    #[test]
    fn bounds_are_scaled_onto_smaller_capture() {
        let src = blank_png(540, 960);
        let screen = ScreenSize::new(1080, 1920);
        let marks = [candidate(2, Bounds::new(200, 400, 600, 800))];
        let out = image::load_from_memory(&annotate_image(&src, &marks, screen).unwrap())
            .unwrap()
            .to_rgba8();
        // Right edge of the box lands at x = 299 in image space.
        assert_eq!(out.get_pixel(299, 300).0, PALETTE[2]);
        assert_eq!(out.get_pixel(305, 300).0, [0, 0, 0, 255]);
    }

    #[test]
    fn undecodable_screenshot_is_an_error() {
        let err = annotate_image(b"not an image", &[], ScreenSize::new(10, 10)).unwrap_err();
        assert!(matches!(err, SeeDroidError::Perception(_)));
    }

    #[test]
    fn debug_persistence_never_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("marked.png");
        persist_debug_image(b"png", &path);
        assert_eq!(std::fs::read(&path).unwrap(), b"png");

        // A directory in the way of the file is logged, not raised.
        persist_debug_image(b"png", dir.path());
        persist_debug_image(b"png", Path::new(""));
    }
}
