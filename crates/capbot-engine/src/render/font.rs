use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use skrifa::instance::{LocationRef, Size};
use skrifa::outline::{DrawSettings, OutlinePen};
use skrifa::{FontRef, GlyphId, MetadataProvider};
use zeno::{Command, Mask, Placement, Stroke, Vector};

use super::builtin::BuiltinFont;

/// The caption face for one render: a TrueType outline font when any
/// candidate path loads, otherwise the built-in bitmap fallback. Resolution
/// never fails; a broken font configuration degrades silently.
pub(crate) enum LineFont {
    Outline(OutlineFont),
    Builtin(BuiltinFont),
}

pub(crate) fn resolve(configured: &Path, size: f32) -> LineFont {
    for candidate in std::iter::once(configured.to_path_buf()).chain(fallback_paths()) {
        if let Some(font) = OutlineFont::load(&candidate, size) {
            return LineFont::Outline(font);
        }
    }
    LineFont::Builtin(BuiltinFont::new(size))
}

#[cfg(target_os = "macos")]
fn fallback_paths() -> Vec<PathBuf> {
    [
        "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "/Library/Fonts/Arial.ttf",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}

#[cfg(windows)]
fn fallback_paths() -> Vec<PathBuf> {
    ["C:\\Windows\\Fonts\\arialbd.ttf", "C:\\Windows\\Fonts\\arial.ttf"]
        .iter()
        .map(PathBuf::from)
        .collect()
}

#[cfg(not(any(target_os = "macos", windows)))]
fn fallback_paths() -> Vec<PathBuf> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
        "/usr/share/fonts/truetype/noto/NotoSans-Bold.ttf",
        "/usr/share/fonts/truetype/freefont/FreeSansBold.ttf",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}

impl LineFont {
    pub fn line_height(&self) -> f32 {
        match self {
            LineFont::Outline(font) => font.line_height(),
            LineFont::Builtin(font) => font.line_height(),
        }
    }

    pub fn ascent(&self) -> f32 {
        match self {
            LineFont::Outline(font) => font.ascent(),
            LineFont::Builtin(font) => font.ascent(),
        }
    }

    pub fn measure(&self, text: &str) -> f32 {
        match self {
            LineFont::Outline(font) => font.measure(text),
            LineFont::Builtin(font) => font.measure(text),
        }
    }

    pub fn draw_line(
        &self,
        img: &mut RgbImage,
        x: i32,
        baseline: i32,
        text: &str,
        fill: Rgb<u8>,
        outline: Rgb<u8>,
        outline_width: f32,
    ) {
        match self {
            LineFont::Outline(font) => {
                font.draw_line(img, x, baseline, text, fill, outline, outline_width)
            }
            LineFont::Builtin(font) => {
                font.draw_line(img, x, baseline, text, fill, outline, outline_width)
            }
        }
    }
}

pub(crate) struct OutlineFont {
    data: Vec<u8>,
    size: f32,
}

impl OutlineFont {
    fn load(path: &Path, size: f32) -> Option<Self> {
        let data = std::fs::read(path).ok()?;
        {
            // Gate on a parseable font that can outline a plain letter.
            let font = FontRef::new(&data).ok()?;
            let glyph_id = font.charmap().map('A')?;
            font.outline_glyphs().get(glyph_id)?;
        }
        Some(Self { data, size })
    }

    fn font(&self) -> Option<FontRef<'_>> {
        FontRef::new(&self.data).ok()
    }

    fn metrics(&self) -> Option<skrifa::metrics::Metrics> {
        self.font()
            .map(|font| font.metrics(Size::new(self.size), LocationRef::default()))
    }

    fn line_height(&self) -> f32 {
        // Font metrics are y-up; descent is typically negative.
        self.metrics()
            .map(|m| m.ascent - m.descent)
            .unwrap_or(self.size)
    }

    fn ascent(&self) -> f32 {
        self.metrics().map(|m| m.ascent).unwrap_or(self.size * 0.8)
    }

    fn measure(&self, text: &str) -> f32 {
        let Some(font) = self.font() else {
            return 0.0;
        };
        let charmap = font.charmap();
        let metrics = font.glyph_metrics(Size::new(self.size), LocationRef::default());
        text.chars()
            .map(|ch| {
                let glyph_id = charmap.map(ch).unwrap_or(GlyphId::new(0));
                metrics.advance_width(glyph_id).unwrap_or(0.0)
            })
            .sum()
    }

    fn draw_line(
        &self,
        img: &mut RgbImage,
        x: i32,
        baseline: i32,
        text: &str,
        fill: Rgb<u8>,
        outline: Rgb<u8>,
        outline_width: f32,
    ) {
        let Some(font) = self.font() else { return };
        let charmap = font.charmap();
        let glyph_metrics = font.glyph_metrics(Size::new(self.size), LocationRef::default());
        let outlines = font.outline_glyphs();

        let mut pen = MaskPen::default();
        let mut advance = 0.0f32;
        for ch in text.chars() {
            let glyph_id = charmap.map(ch).unwrap_or(GlyphId::new(0));
            if let Some(glyph) = outlines.get(glyph_id) {
                pen.origin = advance;
                let settings =
                    DrawSettings::unhinted(Size::new(self.size), LocationRef::default());
                let _ = glyph.draw(settings, &mut pen);
            }
            advance += glyph_metrics.advance_width(glyph_id).unwrap_or(0.0);
        }
        if pen.commands.is_empty() {
            return;
        }

        // Stroke first, fill on top, so the outline never covers the face.
        // Stroke width is centered on the contour; doubling it leaves the
        // requested thickness outside the glyph.
        let (mask, placement) = Mask::new(pen.commands.as_slice())
            .style(Stroke::new(outline_width * 2.0))
            .render();
        blend_mask(img, &mask, placement, x, baseline, outline);

        let (mask, placement) = Mask::new(pen.commands.as_slice()).render();
        blend_mask(img, &mask, placement, x, baseline, fill);
    }
}

/// Collects skrifa outlines into zeno path commands, translated from the
/// font's y-up coordinates into y-down raster space relative to the line
/// origin (x = pen position, y = baseline).
#[derive(Default)]
struct MaskPen {
    commands: Vec<Command>,
    origin: f32,
}

impl MaskPen {
    fn point(&self, x: f32, y: f32) -> Vector {
        Vector::new(self.origin + x, -y)
    }
}

impl OutlinePen for MaskPen {
    fn move_to(&mut self, x: f32, y: f32) {
        let point = self.point(x, y);
        self.commands.push(Command::MoveTo(point));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let point = self.point(x, y);
        self.commands.push(Command::LineTo(point));
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        let control = self.point(cx0, cy0);
        let point = self.point(x, y);
        self.commands.push(Command::QuadTo(control, point));
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        let control0 = self.point(cx0, cy0);
        let control1 = self.point(cx1, cy1);
        let point = self.point(x, y);
        self.commands.push(Command::CurveTo(control0, control1, point));
    }

    fn close(&mut self) {
        self.commands.push(Command::Close);
    }
}

/// Alpha-blends a coverage mask onto the image at the line origin, clipping
/// anything that falls outside the canvas.
fn blend_mask(
    img: &mut RgbImage,
    mask: &[u8],
    placement: Placement,
    x: i32,
    baseline: i32,
    color: Rgb<u8>,
) {
    let (width, height) = (img.width() as i32, img.height() as i32);
    for row in 0..placement.height as i32 {
        let py = baseline + placement.top + row;
        if py < 0 || py >= height {
            continue;
        }
        for col in 0..placement.width as i32 {
            let px = x + placement.left + col;
            if px < 0 || px >= width {
                continue;
            }
            let alpha = u16::from(mask[(row * placement.width as i32 + col) as usize]);
            if alpha == 0 {
                continue;
            }
            let pixel = img.get_pixel_mut(px as u32, py as u32);
            for channel in 0..3 {
                let src = u16::from(color[channel]);
                let dst = u16::from(pixel[channel]);
                pixel[channel] = ((src * alpha + dst * (255 - alpha)) / 255) as u8;
            }
        }
    }
}
