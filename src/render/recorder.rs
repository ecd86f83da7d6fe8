use image::RgbaImage;
use kurbo::{BezPath, Rect, Shape};

use super::pixels::PixelBuffer;
use super::surface::{Color, Fill, Surface};

/// One recorded drawing call, with the global alpha in effect at the time.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    FillRect { rect: Rect, fill: Fill, alpha: f32 },
    StrokeRect { rect: Rect, color: Color, alpha: f32 },
    FillPath { bounds: Rect, color: Color, alpha: f32 },
    DrawImage { rect: Rect, size: (u32, u32), alpha: f32 },
    WritePixels,
}

/// Test surface that records calls instead of rasterizing them.
///
/// Pixel reads return whatever was last written (initially transparent black).
pub struct DisplayList {
    pixels: PixelBuffer,
    global_alpha: f32,
    pub ops: Vec<DrawOp>,
}

impl DisplayList {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: PixelBuffer::new(width, height),
            global_alpha: 1.0,
            ops: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }

    pub fn fill_rects(&self) -> impl Iterator<Item = (&Rect, &Fill)> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::FillRect { rect, fill, .. } => Some((rect, fill)),
            _ => None,
        })
    }
}

impl Surface for DisplayList {
    fn width(&self) -> u32 {
        self.pixels.width
    }

    fn height(&self) -> u32 {
        self.pixels.height
    }

    fn global_alpha(&self) -> f32 {
        self.global_alpha
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.global_alpha = alpha.clamp(0.0, 1.0);
    }

    fn fill_rect(&mut self, rect: Rect, fill: &Fill) {
        self.ops.push(DrawOp::FillRect {
            rect,
            fill: fill.clone(),
            alpha: self.global_alpha,
        });
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color) {
        self.ops.push(DrawOp::StrokeRect {
            rect,
            color,
            alpha: self.global_alpha,
        });
    }

    fn fill_path(&mut self, path: &BezPath, color: Color) {
        self.ops.push(DrawOp::FillPath {
            bounds: path.bounding_box(),
            color,
            alpha: self.global_alpha,
        });
    }

    fn draw_image(&mut self, image: &RgbaImage, rect: Rect) {
        self.ops.push(DrawOp::DrawImage {
            rect,
            size: image.dimensions(),
            alpha: self.global_alpha,
        });
    }

    fn frame_data(&self) -> &[u8] {
        &self.pixels.data
    }

    fn read_pixels(&self) -> PixelBuffer {
        self.pixels.clone()
    }

    fn write_pixels(&mut self, pixels: &PixelBuffer) {
        self.pixels = pixels.clone();
        self.ops.push(DrawOp::WritePixels);
    }
}
