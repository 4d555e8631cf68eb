// src/render/mod.rs
pub mod barplot;
pub mod choropleth;
pub mod heatmap;
pub mod palette;
pub mod report;

use anyhow::{anyhow, Context, Result};
use resvg::{tiny_skia, usvg};
use std::{
    fmt::Write as _,
    fs::File,
    io::BufWriter,
    path::Path,
};
use tracing::{debug, info};

use palette::{Rgb, BLACK};

/// Raster output resolution.
pub const DPI: f32 = 300.0;
/// SVG user units are typographic points.
pub const PT_PER_INCH: f32 = 72.0;

const FONT_FAMILY: &str = "DejaVu Sans, Arial, Helvetica, sans-serif";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

impl Anchor {
    fn as_svg(self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        }
    }
}

/// Font settings for one text element.
#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    pub size: f32,
    pub anchor: Anchor,
    /// Degrees, counter-clockwise about the text origin.
    pub rotate: f32,
    pub color: Rgb,
    /// Vertically centre the text on `y` instead of sitting on its baseline.
    pub centered: bool,
}

impl TextStyle {
    pub fn new(size: f32) -> Self {
        TextStyle {
            size,
            anchor: Anchor::Start,
            rotate: 0.0,
            color: BLACK,
            centered: false,
        }
    }

    pub fn anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn rotate(mut self, degrees: f32) -> Self {
        self.rotate = degrees;
        self
    }

    pub fn color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    pub fn centered(mut self) -> Self {
        self.centered = true;
        self
    }
}

/// An SVG figure sized in points, on a white background.
pub struct SvgDoc {
    width: f32,
    height: f32,
    body: String,
}

impl SvgDoc {
    pub fn new(width: f32, height: f32) -> Self {
        let mut doc = SvgDoc {
            width,
            height,
            body: String::new(),
        };
        doc.rect(0.0, 0.0, width, height, palette::WHITE);
        doc
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, fill: Rgb) {
        let _ = writeln!(
            self.body,
            "  <rect x='{:.2}' y='{:.2}' width='{:.2}' height='{:.2}' fill='{}'/>",
            x,
            y,
            w.max(0.0),
            h.max(0.0),
            fill.hex()
        );
    }

    pub fn outline(&mut self, x: f32, y: f32, w: f32, h: f32, stroke: Rgb, stroke_width: f32) {
        let _ = writeln!(
            self.body,
            "  <rect x='{:.2}' y='{:.2}' width='{:.2}' height='{:.2}' fill='none' stroke='{}' stroke-width='{:.2}'/>",
            x,
            y,
            w.max(0.0),
            h.max(0.0),
            stroke.hex(),
            stroke_width
        );
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, stroke: Rgb, stroke_width: f32) {
        let _ = writeln!(
            self.body,
            "  <line x1='{:.2}' y1='{:.2}' x2='{:.2}' y2='{:.2}' stroke='{}' stroke-width='{:.2}'/>",
            x1,
            y1,
            x2,
            y2,
            stroke.hex(),
            stroke_width
        );
    }

    pub fn text(&mut self, x: f32, y: f32, style: TextStyle, content: &str) {
        let mut attrs = format!(
            "x='{:.2}' y='{:.2}' font-family='{}' font-size='{:.1}' fill='{}' text-anchor='{}'",
            x,
            y,
            FONT_FAMILY,
            style.size,
            style.color.hex(),
            style.anchor.as_svg()
        );
        if style.centered {
            attrs.push_str(" dominant-baseline='central'");
        }
        if style.rotate != 0.0 {
            let _ = write!(
                attrs,
                " transform='rotate({:.1} {:.2} {:.2})'",
                -style.rotate,
                x,
                y
            );
        }
        let _ = writeln!(self.body, "  <text {}>{}</text>", attrs, escape_text(content));
    }

    pub fn to_svg(&self) -> String {
        format!(
            "<svg xmlns='http://www.w3.org/2000/svg' width='{w:.2}' height='{h:.2}' viewBox='0 0 {w:.2} {h:.2}'>\n{body}</svg>\n",
            w = self.width,
            h = self.height,
            body = self.body
        )
    }

    /// Rasterize at [`DPI`] and write a PNG carrying the matching physical size.
    pub fn write_png(&self, path: &Path) -> Result<()> {
        let mut options = usvg::Options::default();
        options.fontdb_mut().load_system_fonts();

        let svg = self.to_svg();
        let tree = usvg::Tree::from_str(&svg, &options)
            .map_err(|err| anyhow!("SVG parse failed: {:?}", err))?;

        let scale = DPI / PT_PER_INCH;
        let width = (self.width * scale).ceil() as u32;
        let height = (self.height * scale).ceil() as u32;
        let mut pixmap = tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| anyhow!("pixmap allocation failed ({}x{})", width, height))?;
        resvg::render(
            &tree,
            tiny_skia::Transform::from_scale(scale, scale),
            &mut pixmap.as_mut(),
        );
        debug!(width, height, "rasterized figure");

        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let pixels_per_metre = (DPI / 0.0254).round() as u32;
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: pixels_per_metre,
            yppu: pixels_per_metre,
            unit: png::Unit::Meter,
        }));
        let mut writer = encoder
            .write_header()
            .with_context(|| format!("writing PNG header to {}", path.display()))?;
        writer
            .write_image_data(pixmap.data())
            .with_context(|| format!("writing PNG data to {}", path.display()))?;
        writer.finish()?;

        info!(path = %path.display(), width, height, "wrote image");
        Ok(())
    }
}

/// Escape text for an SVG/HTML text node or attribute.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Rough rendered width of `s` at `size` points.
pub fn approx_text_width(s: &str, size: f32) -> f32 {
    s.chars().count() as f32 * size * 0.6
}

/// Evenly spaced round tick values from 0 up to at least `max`.
pub fn nice_ticks(max: f64, target: usize) -> Vec<f64> {
    if max <= 0.0 || !max.is_finite() {
        return vec![0.0, 1.0];
    }
    let raw = max / target.max(1) as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw)
        .unwrap_or(10.0 * magnitude)
        .max(1.0);

    let mut ticks = Vec::new();
    let mut v = 0.0;
    while v < max + step {
        ticks.push(v);
        if v >= max {
            break;
        }
        v += step;
    }
    ticks
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("Eau d'alimentation <b> & co"), "Eau d&#39;alimentation &lt;b&gt; &amp; co");
    }

    #[test]
    fn test_nice_ticks() {
        assert_eq!(nice_ticks(10.0, 5), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(nice_ticks(3.0, 6), vec![0.0, 1.0, 2.0, 3.0]);
        let t = nice_ticks(437.0, 6);
        assert_eq!(t.first(), Some(&0.0));
        assert!(*t.last().unwrap() >= 437.0);
        assert_eq!(nice_ticks(0.0, 6), vec![0.0, 1.0]);
    }

    #[test]
    fn test_svg_document() {
        let mut doc = SvgDoc::new(100.0, 50.0);
        doc.text(10.0, 20.0, TextStyle::new(12.0).rotate(45.0), "Déc");
        let svg = doc.to_svg();
        assert!(svg.contains("viewBox='0 0 100.00 50.00'"));
        assert!(svg.contains("rotate(-45.0 10.00 20.00)"));
        assert!(svg.contains(">Déc</text>"));
    }

    #[test]
    fn test_write_png_sets_dpi() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("tiny.png");
        let mut doc = SvgDoc::new(72.0, 36.0);
        doc.rect(0.0, 0.0, 36.0, 36.0, palette::RED);
        doc.write_png(&path)?;

        let decoder = png::Decoder::new(File::open(&path)?);
        let reader = decoder.read_info()?;
        let info = reader.info();
        assert_eq!((info.width, info.height), (300, 150));
        let dims = info.pixel_dims.as_ref().expect("pHYs chunk");
        assert_eq!(dims.unit, png::Unit::Meter);
        assert_eq!(dims.xppu, 11811);
        Ok(())
    }
}
