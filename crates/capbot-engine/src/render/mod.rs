use capbot_contracts::config::ModuleConfig;
use capbot_contracts::error::CommandError;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb};

mod builtin;
mod font;
mod layout;

const SIDE_MARGIN: u32 = 20;
const BOTTOM_MARGIN: f32 = 20.0;
const LINE_SPACING: f32 = 5.0;
const MIN_FONT_SIZE: u32 = 20;
const OUTLINE_WIDTH: f32 = 2.0;
const FILL: Rgb<u8> = Rgb([255, 255, 255]);
const OUTLINE: Rgb<u8> = Rgb([0, 0, 0]);

/// Draws the caption centered near the bottom of the image, white with a
/// black outline, wrapped so no line is wider than the image minus its
/// side margins, and returns the result as JPEG bytes.
///
/// A caption block taller than the image simply starts above the canvas
/// and is clipped pixel by pixel.
pub fn render_caption(
    bytes: &[u8],
    caption: &str,
    config: &ModuleConfig,
) -> Result<Vec<u8>, CommandError> {
    let decoded =
        image::load_from_memory(bytes).map_err(|err| CommandError::Decode(err.to_string()))?;
    let mut img = decoded.to_rgb8();
    let (width, height) = (img.width(), img.height());

    let size = (width / 18).max(MIN_FONT_SIZE) as f32;
    let font = font::resolve(&config.font_path, size);

    let max_line_width = width.saturating_sub(2 * SIDE_MARGIN) as f32;
    let lines = layout::wrap_caption(caption, &font, max_line_width);

    let line_height = font.line_height() + LINE_SPACING;
    let block_height = line_height * lines.len() as f32;

    let mut y = height as f32 - block_height - BOTTOM_MARGIN;
    for line in &lines {
        let line_width = font.measure(line);
        let x = ((width as f32 - line_width) / 2.0).max(0.0);
        let baseline = y + font.ascent();
        font.draw_line(
            &mut img,
            x as i32,
            baseline as i32,
            line,
            FILL,
            OUTLINE,
            OUTLINE_WIDTH,
        );
        y += line_height;
    }

    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, config.jpeg_quality);
    encoder
        .encode_image(&DynamicImage::ImageRgb8(img))
        .map_err(|err| CommandError::Encode(err.to_string()))?;
    Ok(out)
}
