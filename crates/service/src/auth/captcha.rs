use std::fmt::Write;

use rand::Rng;

pub const CAPTCHA_MIME_TYPE: &str = "image/svg+xml";

const GLYPH_WIDTH: u32 = 28;
const PADDING: u32 = 12;
const HEIGHT: u32 = 50;
const NOISE_LINES: usize = 5;

// stroke font cell is 4 units wide and 6 tall
const UNIT_X: f32 = 4.5;
const UNIT_Y: f32 = 5.0;
const TOP: f32 = 10.0;
const JITTER: f32 = 1.2;

type Stroke = &'static [(u8, u8)];

/// Polylines for one glyph; unknown characters draw as an empty box
fn strokes(ch: char) -> &'static [Stroke] {
    match ch {
        'A' => &[&[(0, 6), (0, 2), (2, 0), (4, 2), (4, 6)], &[(0, 3), (4, 3)]],
        'B' => &[
            &[(0, 0), (0, 6), (3, 6), (4, 5), (4, 4), (3, 3), (0, 3)],
            &[(0, 0), (3, 0), (4, 1), (4, 2), (3, 3)],
        ],
        'C' => &[&[(4, 1), (3, 0), (1, 0), (0, 1), (0, 5), (1, 6), (3, 6), (4, 5)]],
        'D' => &[&[(0, 0), (0, 6), (2, 6), (4, 4), (4, 2), (2, 0), (0, 0)]],
        'E' => &[&[(4, 0), (0, 0), (0, 6), (4, 6)], &[(0, 3), (3, 3)]],
        'F' => &[&[(4, 0), (0, 0), (0, 6)], &[(0, 3), (3, 3)]],
        'G' => &[&[
            (4, 1),
            (3, 0),
            (1, 0),
            (0, 1),
            (0, 5),
            (1, 6),
            (3, 6),
            (4, 5),
            (4, 3),
            (2, 3),
        ]],
        'H' => &[&[(0, 0), (0, 6)], &[(4, 0), (4, 6)], &[(0, 3), (4, 3)]],
        'J' => &[&[(1, 0), (4, 0)], &[(3, 0), (3, 5), (2, 6), (1, 6), (0, 5)]],
        'K' => &[&[(0, 0), (0, 6)], &[(4, 0), (0, 3), (4, 6)]],
        'L' => &[&[(0, 0), (0, 6), (4, 6)]],
        'M' => &[&[(0, 6), (0, 0), (2, 3), (4, 0), (4, 6)]],
        'N' => &[&[(0, 6), (0, 0), (4, 6), (4, 0)]],
        'P' => &[&[(0, 6), (0, 0), (3, 0), (4, 1), (4, 2), (3, 3), (0, 3)]],
        'Q' => &[
            &[(1, 0), (3, 0), (4, 1), (4, 5), (3, 6), (1, 6), (0, 5), (0, 1), (1, 0)],
            &[(2, 4), (4, 6)],
        ],
        'R' => &[
            &[(0, 6), (0, 0), (3, 0), (4, 1), (4, 2), (3, 3), (0, 3)],
            &[(2, 3), (4, 6)],
        ],
        'S' => &[&[
            (4, 1),
            (3, 0),
            (1, 0),
            (0, 1),
            (0, 2),
            (1, 3),
            (3, 3),
            (4, 4),
            (4, 5),
            (3, 6),
            (1, 6),
            (0, 5),
        ]],
        'T' => &[&[(0, 0), (4, 0)], &[(2, 0), (2, 6)]],
        'U' => &[&[(0, 0), (0, 5), (1, 6), (3, 6), (4, 5), (4, 0)]],
        'V' => &[&[(0, 0), (2, 6), (4, 0)]],
        'W' => &[&[(0, 0), (1, 6), (2, 3), (3, 6), (4, 0)]],
        'X' => &[&[(0, 0), (4, 6)], &[(4, 0), (0, 6)]],
        'Y' => &[&[(0, 0), (2, 3), (4, 0)], &[(2, 3), (2, 6)]],
        'Z' => &[&[(0, 0), (4, 0), (0, 6), (4, 6)]],
        '2' => &[&[(0, 1), (1, 0), (3, 0), (4, 1), (4, 2), (0, 6), (4, 6)]],
        '3' => &[
            &[(0, 1), (1, 0), (3, 0), (4, 1), (4, 2), (3, 3), (1, 3)],
            &[(3, 3), (4, 4), (4, 5), (3, 6), (1, 6), (0, 5)],
        ],
        '4' => &[&[(3, 6), (3, 0), (0, 4), (4, 4)]],
        '5' => &[&[(4, 0), (0, 0), (0, 3), (3, 3), (4, 4), (4, 5), (3, 6), (0, 6)]],
        '6' => &[&[
            (4, 1),
            (3, 0),
            (1, 0),
            (0, 1),
            (0, 5),
            (1, 6),
            (3, 6),
            (4, 5),
            (4, 4),
            (3, 3),
            (0, 3),
        ]],
        '7' => &[&[(0, 0), (4, 0), (1, 6)]],
        '8' => &[
            &[(1, 3), (0, 2), (0, 1), (1, 0), (3, 0), (4, 1), (4, 2), (3, 3), (1, 3)],
            &[(1, 3), (0, 4), (0, 5), (1, 6), (3, 6), (4, 5), (4, 4), (3, 3)],
        ],
        '9' => &[&[
            (4, 3),
            (1, 3),
            (0, 2),
            (0, 1),
            (1, 0),
            (3, 0),
            (4, 1),
            (4, 5),
            (3, 6),
            (1, 6),
            (0, 5),
        ]],
        _ => &[&[(0, 0), (4, 0), (4, 6), (0, 6), (0, 0)]],
    }
}

/// Render captcha text as a small, noisy SVG document
///
/// Glyphs are drawn as jittered stroke outlines, never as `<text>`, so the
/// answer cannot be read back out of the document. Each glyph gets its own
/// rotation and colour, and a few random strokes are drawn over the top.
pub fn render_svg(text: &str) -> Vec<u8> {
    let mut rng = rand::rng();
    let glyphs = text.chars().count() as u32;
    let width = glyphs * GLYPH_WIDTH + PADDING * 2;

    let mut svg = String::new();
    // writing into a String cannot fail
    let _ = write!(
        svg,
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><rect width="100%" height="100%" fill="#f4f1ea"/>"##,
        w = width,
        h = HEIGHT
    );

    for (i, ch) in text.chars().enumerate() {
        let origin_x = (PADDING + i as u32 * GLYPH_WIDTH + rng.random_range(0..6)) as f32;
        let origin_y = TOP + rng.random_range(-3.0..3.0);
        let rotate: i32 = rng.random_range(-25..=25);

        let mut d = String::new();
        for stroke in strokes(ch) {
            for (n, &(gx, gy)) in stroke.iter().enumerate() {
                let x = origin_x + gx as f32 * UNIT_X + rng.random_range(-JITTER..JITTER);
                let y = origin_y + gy as f32 * UNIT_Y + rng.random_range(-JITTER..JITTER);
                let op = if n == 0 { 'M' } else { 'L' };
                let _ = write!(d, "{}{:.1} {:.1} ", op, x, y);
            }
        }

        let _ = write!(
            svg,
            r#"<path d="{d}" fill="none" stroke="rgb({r},{g},{b})" stroke-width="3" stroke-linecap="round" stroke-linejoin="round" transform="rotate({rotate} {cx:.1} {cy:.1})"/>"#,
            d = d.trim_end(),
            r = rng.random_range(20..120),
            g = rng.random_range(20..120),
            b = rng.random_range(20..120),
            cx = origin_x + 2.0 * UNIT_X,
            cy = origin_y + 3.0 * UNIT_Y,
        );
    }

    for _ in 0..NOISE_LINES {
        let _ = write!(
            svg,
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="rgb({},{},{})" stroke-width="{}"/>"#,
            rng.random_range(0..width),
            rng.random_range(0..HEIGHT),
            rng.random_range(0..width),
            rng.random_range(0..HEIGHT),
            rng.random_range(80..200),
            rng.random_range(80..200),
            rng.random_range(80..200),
            rng.random_range(1..3),
        );
    }

    svg.push_str("</svg>");
    svg.into_bytes()
}
