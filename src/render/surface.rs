use image::RgbaImage;
use kurbo::{BezPath, Point, Rect};

use super::pixels::PixelBuffer;

/// Straight (non-premultiplied) color with a fractional alpha, as a 2D canvas takes it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Alpha is clamped to [0, 1].
    pub fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self {
            r,
            g,
            b,
            a: a.clamp(0.0, 1.0),
        }
    }

    /// `hue` in degrees, saturation and lightness in [0, 1].
    pub fn hsla(hue: f32, saturation: f32, lightness: f32, alpha: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let (r1, g1, b1) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = lightness - c / 2.0;
        let to_byte = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Self::rgba(to_byte(r1), to_byte(g1), to_byte(b1), alpha)
    }

    /// Parses `#rrggbb`, `#rgb` or one of a handful of CSS color names.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return match hex.len() {
                6 => {
                    let v = u32::from_str_radix(hex, 16).ok()?;
                    Some(Self::rgb((v >> 16) as u8, (v >> 8) as u8, v as u8))
                }
                3 => {
                    let v = u16::from_str_radix(hex, 16).ok()?;
                    let expand = |n: u16| ((n & 0xf) as u8) * 17;
                    Some(Self::rgb(expand(v >> 8), expand(v >> 4), expand(v)))
                }
                _ => None,
            };
        }
        let named = match s.to_ascii_lowercase().as_str() {
            "black" => Self::rgb(0, 0, 0),
            "white" => Self::rgb(255, 255, 255),
            "red" => Self::rgb(255, 0, 0),
            "green" => Self::rgb(0, 128, 0),
            "blue" => Self::rgb(0, 0, 255),
            "yellow" => Self::rgb(255, 255, 0),
            "magenta" => Self::rgb(255, 0, 255),
            "pink" => Self::rgb(255, 192, 203),
            "purple" => Self::rgb(128, 0, 128),
            _ => return None,
        };
        Some(named)
    }
}

/// Linear gradient between two points with sorted color stops.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearGradient {
    pub start: Point,
    pub end: Point,
    pub stops: Vec<(f32, Color)>,
}

impl LinearGradient {
    pub fn new(start: Point, end: Point, mut stops: Vec<(f32, Color)>) -> Self {
        stops.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { start, end, stops }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Fill {
    Solid(Color),
    Linear(LinearGradient),
}

/// A 2D drawing target with canvas-like semantics.
///
/// Every drawing call blends source-over, scaled by the current global alpha.
pub trait Surface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    fn global_alpha(&self) -> f32;
    fn set_global_alpha(&mut self, alpha: f32);

    fn fill_rect(&mut self, rect: Rect, fill: &Fill);
    /// One-pixel outline centered on the rectangle edges.
    fn stroke_rect(&mut self, rect: Rect, color: Color);
    /// Nonzero-winding fill of a closed path.
    fn fill_path(&mut self, path: &BezPath, color: Color);
    /// Draws `image` scaled into `rect`.
    fn draw_image(&mut self, image: &RgbaImage, rect: Rect);

    /// The finished frame as straight RGBA bytes, borrowed without copying.
    fn frame_data(&self) -> &[u8];

    /// Fresh copy of the current contents.
    fn read_pixels(&self) -> PixelBuffer;
    /// Replaces the contents wholesale, ignoring global alpha.
    fn write_pixels(&mut self, pixels: &PixelBuffer);

    fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width() as f64, self.height() as f64)
    }
}
