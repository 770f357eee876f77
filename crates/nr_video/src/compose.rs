use std::path::Path;

use ab_glyph::{point, Font, FontVec, GlyphId, PxScale, ScaleFont};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use nr_core::{Error, Result};
use rustybuzz::{Face, UnicodeBuffer};

pub const FRAME_WIDTH: u32 = 1080;
pub const FRAME_HEIGHT: u32 = 1920;
pub const HERO_HEIGHT: u32 = 820;

const TEXT_LEFT: u32 = 80;
const TEXT_TOP: u32 = 1000;
const TEXT_RIGHT_MARGIN: u32 = 180;
const TITLE_SIZE: f32 = 48.0;
const BODY_SIZE: f32 = 40.0;
const LINE_SPACING: f32 = 1.3;
const TEXT_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// A glyph placed by the shaper, in pixels relative to the line origin on
/// the baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PlacedGlyph {
    id: GlyphId,
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct ShapedLine {
    glyphs: Vec<PlacedGlyph>,
    width: f32,
}

/// Draws the still frame every video is built from: background, the
/// article's hero image across the top, title and summary below it.
///
/// Text goes through the shaper first so Devanagari vowel signs are
/// reordered and conjuncts formed before the glyphs are rasterized.
pub struct FrameComposer {
    background: RgbaImage,
    font_data: Vec<u8>,
    font: FontVec,
}

impl FrameComposer {
    pub fn load(background: &Path, font: &Path) -> Result<Self> {
        let background = image::open(background)
            .map_err(|e| Error::Render(format!("Failed to open background {}: {}", background.display(), e)))?;
        let font_bytes = std::fs::read(font)
            .map_err(|e| Error::Render(format!("Failed to read font {}: {}", font.display(), e)))?;
        Self::from_parts(&background, font_bytes)
            .map_err(|e| Error::Render(format!("Invalid font {}: {}", font.display(), e)))
    }

    pub fn from_parts(background: &DynamicImage, font_data: Vec<u8>) -> Result<Self> {
        if Face::from_slice(&font_data, 0).is_none() {
            return Err(Error::Render("font has no usable face".to_string()));
        }
        let font = FontVec::try_from_vec(font_data.clone()).map_err(|e| Error::Render(e.to_string()))?;
        Ok(Self {
            background: cover(background, FRAME_WIDTH, FRAME_HEIGHT),
            font_data,
            font,
        })
    }

    pub fn compose(&self, title: &str, content: &str, hero: Option<&DynamicImage>) -> Result<RgbaImage> {
        let face = Face::from_slice(&self.font_data, 0)
            .ok_or_else(|| Error::Render("font has no usable face".to_string()))?;
        let mut canvas = self.background.clone();

        if let Some(hero) = hero {
            imageops::overlay(&mut canvas, &cover(hero, FRAME_WIDTH, HERO_HEIGHT), 0, 0);
        }

        let max_width = FRAME_WIDTH - TEXT_LEFT - TEXT_RIGHT_MARGIN;
        let mut y = TEXT_TOP as f32;
        y = self.draw_block(&mut canvas, &face, title, TITLE_SIZE, max_width, y);
        y += BODY_SIZE * 0.5;
        self.draw_block(&mut canvas, &face, content, BODY_SIZE, max_width, y);

        Ok(canvas)
    }

    /// Draw wrapped text starting at `y`; returns the y below the last line.
    fn draw_block(&self, canvas: &mut RgbaImage, face: &Face<'_>, text: &str, size: f32, max_width: u32, mut y: f32) -> f32 {
        let scale = PxScale::from(size);
        let line_height = size * LINE_SPACING;
        let ascent = self.font.as_scaled(scale).ascent();

        let measure = |s: &str| self.shape(face, s, scale).width.ceil() as u32;
        for line in wrap_text(text, max_width, measure) {
            if y + line_height > FRAME_HEIGHT as f32 {
                break;
            }
            let shaped = self.shape(face, &line, scale);
            self.draw_line(canvas, &shaped, scale, TEXT_LEFT as f32, y + ascent);
            y += line_height;
        }
        y
    }

    fn shape(&self, face: &Face<'_>, text: &str, scale: PxScale) -> ShapedLine {
        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(text);
        buffer.guess_segment_properties();
        let output = rustybuzz::shape(face, &[], buffer);

        // Shaper positions are in font units, the same units ab_glyph scales.
        let factor = self.font.as_scaled(scale).h_scale_factor();
        let mut pen = 0.0;
        let glyphs = output
            .glyph_infos()
            .iter()
            .zip(output.glyph_positions())
            .map(|(info, pos)| {
                let placed = PlacedGlyph {
                    id: GlyphId(info.glyph_id as u16),
                    x: pen + pos.x_offset as f32 * factor,
                    y: -(pos.y_offset as f32) * factor,
                };
                pen += pos.x_advance as f32 * factor;
                placed
            })
            .collect();

        ShapedLine { glyphs, width: pen }
    }

    fn draw_line(&self, canvas: &mut RgbaImage, line: &ShapedLine, scale: PxScale, left: f32, baseline: f32) {
        let (width, height) = canvas.dimensions();
        for placed in &line.glyphs {
            let glyph = placed
                .id
                .with_scale_and_position(scale, point(left + placed.x, baseline + placed.y));
            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let x = bounds.min.x as i32 + gx as i32;
                let y = bounds.min.y as i32 + gy as i32;
                if x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height {
                    blend(canvas.get_pixel_mut(x as u32, y as u32), TEXT_COLOR, coverage);
                }
            });
        }
    }
}

/// Source-over blend of `color` at `coverage` onto `pixel`.
fn blend(pixel: &mut Rgba<u8>, color: Rgba<u8>, coverage: f32) {
    let alpha = coverage.clamp(0.0, 1.0) * color[3] as f32 / 255.0;
    for c in 0..3 {
        pixel[c] = (color[c] as f32 * alpha + pixel[c] as f32 * (1.0 - alpha)).round() as u8;
    }
    pixel[3] = pixel[3].max((alpha * 255.0).round() as u8);
}

/// Scale and crop so the image fills `width`×`height` exactly.
pub fn cover(image: &DynamicImage, width: u32, height: u32) -> RgbaImage {
    image.resize_to_fill(width, height, FilterType::Lanczos3).to_rgba8()
}

/// Greedy word wrap. Explicit newlines are kept; a word wider than the line
/// gets a line of its own.
pub fn wrap_text<F>(text: &str, max_width: u32, measure: F) -> Vec<String>
where
    F: Fn(&str) -> u32,
{
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            if line.is_empty() {
                line.push_str(word);
                continue;
            }
            let candidate = format!("{} {}", line, word);
            if measure(&candidate) <= max_width {
                line = candidate;
            } else {
                lines.push(std::mem::take(&mut line));
                line.push_str(word);
            }
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn by_chars(s: &str) -> u32 {
        s.chars().count() as u32 * 10
    }

    #[test]
    fn test_wrap_text() {
        let lines = wrap_text("one two three four five", 100, by_chars);
        assert_eq!(lines, vec!["one two", "three four", "five"]);
    }

    #[test]
    fn test_wrap_keeps_newlines_and_long_words() {
        let lines = wrap_text("short\naveryveryverylongword tail", 100, by_chars);
        assert_eq!(lines, vec!["short", "averyveryverylongword", "tail"]);
        assert!(wrap_text("   \n  ", 100, by_chars).is_empty());
    }

    #[test]
    fn test_cover_fills_target() {
        let wide = DynamicImage::ImageRgba8(RgbaImage::new(400, 100));
        let covered = cover(&wide, FRAME_WIDTH, HERO_HEIGHT);
        assert_eq!(covered.dimensions(), (FRAME_WIDTH, HERO_HEIGHT));
    }

    #[test]
    fn test_blend() {
        let mut pixel = Rgba([255, 255, 255, 255]);
        blend(&mut pixel, TEXT_COLOR, 0.0);
        assert_eq!(pixel, Rgba([255, 255, 255, 255]));
        blend(&mut pixel, TEXT_COLOR, 0.5);
        assert_eq!(pixel, Rgba([128, 128, 128, 255]));
        blend(&mut pixel, TEXT_COLOR, 1.0);
        assert_eq!(pixel, Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_rejects_invalid_font() {
        let background = DynamicImage::ImageRgba8(RgbaImage::new(10, 10));
        assert!(matches!(
            FrameComposer::from_parts(&background, b"not a font".to_vec()),
            Err(Error::Render(_))
        ));
    }

    /// Any system TTF will do; skipped when none is installed.
    fn system_font() -> Option<Vec<u8>> {
        [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
        ]
        .iter()
        .find_map(|p| std::fs::read(p).ok())
    }

    #[test]
    fn test_shaped_text_is_drawn_inside_margins() {
        let Some(font) = system_font() else {
            eprintln!("no system font, skipping");
            return;
        };
        let white = DynamicImage::ImageRgba8(RgbaImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, Rgba([255, 255, 255, 255])));
        let composer = FrameComposer::from_parts(&white, font).unwrap();

        let face = Face::from_slice(&composer.font_data, 0).unwrap();
        let scale = PxScale::from(BODY_SIZE);
        let short = composer.shape(&face, "news", scale);
        let long = composer.shape(&face, "news of the day", scale);
        assert_eq!(short.glyphs.len(), 4);
        assert!(short.width > 0.0 && long.width > short.width);

        let body = "word ".repeat(60);
        let frame = composer.compose("Headline", &body, None).unwrap();
        assert_eq!(frame.dimensions(), (FRAME_WIDTH, FRAME_HEIGHT));

        let dark = |x: u32, y: u32| frame.get_pixel(x, y)[0] < 128;
        let inked = (TEXT_TOP..TEXT_TOP + 200).any(|y| (TEXT_LEFT..FRAME_WIDTH / 2).any(|x| dark(x, y)));
        assert!(inked);
        // Wrapping keeps the right margin clear.
        let margin_start = FRAME_WIDTH - TEXT_RIGHT_MARGIN + 10;
        assert!(!(TEXT_TOP..FRAME_HEIGHT).any(|y| (margin_start..FRAME_WIDTH).any(|x| dark(x, y))));
    }

    #[test]
    fn test_load_reports_missing_assets() {
        let dir = tempfile::tempdir().unwrap();
        let result = FrameComposer::load(&dir.path().join("bg.png"), &dir.path().join("font.ttf"));
        match result {
            Err(Error::Render(msg)) => assert!(msg.contains("bg.png")),
            _ => panic!("expected a render error"),
        }
    }
}
