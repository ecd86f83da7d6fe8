use anyhow::{Context, Result};
use image::RgbaImage;
use kurbo::{BezPath, PathEl, Rect};
use tiny_skia::{
    BlendMode, ColorU8, FillRule, FilterQuality, GradientStop, Paint, PathBuilder, Pixmap,
    PixmapPaint, Shader, SpreadMode, Stroke, Transform,
};

use super::pixels::PixelBuffer;
use super::surface::{Color, Fill, LinearGradient, Surface};

/// Raster surface backed by a `tiny_skia` pixmap.
///
/// The pixmap starts opaque black and every draw blends source-over onto it, so it stays
/// opaque and its premultiplied bytes are also straight RGBA.
pub struct Canvas {
    pixmap: Pixmap,
    global_alpha: f32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let mut pixmap = Pixmap::new(width, height)
            .with_context(|| format!("Invalid canvas size {}x{}", width, height))?;
        pixmap.fill(tiny_skia::Color::BLACK);
        Ok(Self {
            pixmap,
            global_alpha: 1.0,
        })
    }

    fn paint(&self, fill: &Fill) -> Option<Paint<'static>> {
        let shader = match fill {
            Fill::Solid(color) => Shader::SolidColor(skia_color(*color, self.global_alpha)),
            Fill::Linear(gradient) => linear_shader(gradient, self.global_alpha)?,
        };
        Some(Paint {
            shader,
            anti_alias: true,
            ..Paint::default()
        })
    }
}

fn skia_color(color: Color, opacity: f32) -> tiny_skia::Color {
    let mut c = tiny_skia::Color::from_rgba8(color.r, color.g, color.b, 255);
    c.apply_opacity(color.a * opacity);
    c
}

fn linear_shader(gradient: &LinearGradient, opacity: f32) -> Option<Shader<'static>> {
    let stops = gradient
        .stops
        .iter()
        .map(|&(t, c)| GradientStop::new(t, skia_color(c, opacity)))
        .collect();
    tiny_skia::LinearGradient::new(
        tiny_skia::Point::from_xy(gradient.start.x as f32, gradient.start.y as f32),
        tiny_skia::Point::from_xy(gradient.end.x as f32, gradient.end.y as f32),
        stops,
        SpreadMode::Pad,
        Transform::identity(),
    )
}

fn skia_rect(rect: Rect) -> Option<tiny_skia::Rect> {
    let r = rect.abs();
    tiny_skia::Rect::from_ltrb(r.x0 as f32, r.y0 as f32, r.x1 as f32, r.y1 as f32)
}

fn skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(c, p) => pb.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32),
            PathEl::CurveTo(c1, c2, p) => pb.cubic_to(
                c1.x as f32,
                c1.y as f32,
                c2.x as f32,
                c2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

fn image_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

impl Surface for Canvas {
    fn width(&self) -> u32 {
        self.pixmap.width()
    }

    fn height(&self) -> u32 {
        self.pixmap.height()
    }

    fn global_alpha(&self) -> f32 {
        self.global_alpha
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.global_alpha = alpha.clamp(0.0, 1.0);
    }

    fn fill_rect(&mut self, rect: Rect, fill: &Fill) {
        let (Some(rect), Some(paint)) = (skia_rect(rect), self.paint(fill)) else {
            return;
        };
        self.pixmap.fill_rect(rect, &paint, Transform::identity(), None);
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color) {
        let (Some(rect), Some(paint)) = (skia_rect(rect), self.paint(&Fill::Solid(color))) else {
            return;
        };
        let path = PathBuilder::from_rect(rect);
        let stroke = Stroke {
            width: 1.0,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    fn fill_path(&mut self, path: &BezPath, color: Color) {
        let (Some(path), Some(paint)) = (skia_path(path), self.paint(&Fill::Solid(color))) else {
            return;
        };
        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }

    fn draw_image(&mut self, image: &RgbaImage, rect: Rect) {
        let rect = rect.abs();
        if rect.width() <= 0.0 || rect.height() <= 0.0 {
            return;
        }
        let Some(src) = image_pixmap(image) else {
            return;
        };
        let transform = Transform::from_row(
            (rect.width() / image.width() as f64) as f32,
            0.0,
            0.0,
            (rect.height() / image.height() as f64) as f32,
            rect.x0 as f32,
            rect.y0 as f32,
        );
        let paint = PixmapPaint {
            opacity: self.global_alpha,
            blend_mode: BlendMode::SourceOver,
            quality: FilterQuality::Nearest,
        };
        self.pixmap
            .draw_pixmap(0, 0, src.as_ref(), &paint, transform, None);
    }

    fn frame_data(&self) -> &[u8] {
        self.pixmap.data()
    }

    fn read_pixels(&self) -> PixelBuffer {
        let data = self
            .pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();
        PixelBuffer {
            width: self.width(),
            height: self.height(),
            data,
        }
    }

    fn write_pixels(&mut self, pixels: &PixelBuffer) {
        if pixels.width != self.width() || pixels.height != self.height() {
            log::warn!(
                "Ignoring {}x{} pixel write onto {}x{} canvas",
                pixels.width,
                pixels.height,
                self.width(),
                self.height()
            );
            return;
        }
        for (dst, src) in self
            .pixmap
            .pixels_mut()
            .iter_mut()
            .zip(pixels.data.chunks_exact(4))
        {
            *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    fn canvas(width: u32, height: u32) -> Canvas {
        Canvas::new(width, height).unwrap()
    }

    #[test]
    fn starts_opaque_black() {
        let c = canvas(3, 2);
        assert!(c.frame_data().chunks(4).all(|px| px == [0, 0, 0, 255]));
        assert!(Canvas::new(0, 10).is_err());
    }

    #[test]
    fn translucent_black_dims_previous_frame() {
        let mut c = canvas(4, 4);
        c.fill_rect(c.bounds(), &Fill::Solid(Color::rgb(200, 200, 200)));
        c.set_global_alpha(0.1);
        c.fill_rect(c.bounds(), &Fill::Solid(Color::BLACK));
        let [r, g, b, a] = c.read_pixels().pixel(2, 2);
        assert!((178..=182).contains(&r), "r = {}", r);
        assert_eq!((r, g), (g, b));
        assert_eq!(a, 255);
    }

    #[test]
    fn frame_stays_opaque_under_translucent_draws() {
        let mut c = canvas(8, 8);
        c.set_global_alpha(0.4);
        c.fill_rect(Rect::new(1.0, 1.0, 6.0, 6.0), &Fill::Solid(Color::rgba(255, 0, 0, 0.3)));
        assert!(c.frame_data().chunks(4).all(|px| px[3] == 255));
        assert_eq!(c.frame_data(), c.read_pixels().data.as_slice());
    }

    #[test]
    fn aligned_rect_fills_exact_pixels() {
        let mut c = canvas(10, 10);
        c.fill_rect(Rect::new(2.0, 3.0, 5.0, 4.0), &Fill::Solid(Color::rgb(255, 0, 0)));
        let px = c.read_pixels();
        assert_eq!(px.pixel(2, 3), [255, 0, 0, 255]);
        assert_eq!(px.pixel(4, 3), [255, 0, 0, 255]);
        assert_eq!(px.pixel(5, 3), [0, 0, 0, 255]);
        assert_eq!(px.pixel(2, 4), [0, 0, 0, 255]);
    }

    #[test]
    fn off_surface_and_empty_rects_are_ignored() {
        let mut c = canvas(4, 4);
        c.fill_rect(Rect::new(-10.0, -10.0, 2.0, 100.0), &Fill::Solid(Color::rgb(9, 9, 9)));
        c.fill_rect(Rect::new(3.0, 3.0, 3.0, 3.0), &Fill::Solid(Color::rgb(255, 255, 255)));
        let px = c.read_pixels();
        assert_eq!(px.pixel(1, 3), [9, 9, 9, 255]);
        assert_eq!(px.pixel(2, 0), [0, 0, 0, 255]);
        assert_eq!(px.pixel(3, 3), [0, 0, 0, 255]);
    }

    #[test]
    fn gradient_runs_along_its_axis() {
        let mut c = canvas(2, 100);
        let gradient = LinearGradient::new(
            Point::new(0.0, 0.0),
            Point::new(0.0, 100.0),
            vec![(0.0, Color::rgb(0, 0, 0)), (1.0, Color::rgb(0, 0, 250))],
        );
        c.fill_rect(c.bounds(), &Fill::Linear(gradient));
        let px = c.read_pixels();
        let top = px.pixel(0, 0)[2];
        let middle = px.pixel(0, 50)[2];
        let bottom = px.pixel(1, 99)[2];
        assert!(top < 10, "top = {}", top);
        assert!((110..=140).contains(&middle), "middle = {}", middle);
        assert!(bottom > 240, "bottom = {}", bottom);
    }

    #[test]
    fn fill_path_square() {
        let mut c = canvas(8, 8);
        let mut path = BezPath::new();
        path.move_to((1.0, 1.0));
        path.line_to((5.0, 1.0));
        path.line_to((5.0, 5.0));
        path.line_to((1.0, 5.0));
        path.close_path();
        c.fill_path(&path, Color::rgb(0, 255, 0));
        let px = c.read_pixels();
        assert_eq!(px.pixel(1, 1), [0, 255, 0, 255]);
        assert_eq!(px.pixel(4, 4), [0, 255, 0, 255]);
        assert_eq!(px.pixel(5, 4), [0, 0, 0, 255]);
        assert_eq!(px.pixel(0, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn draw_image_scales_nearest() {
        let mut c = canvas(4, 2);
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([10, 20, 30, 255]));
        img.put_pixel(1, 0, image::Rgba([40, 50, 60, 255]));
        c.draw_image(&img, Rect::new(0.0, 0.0, 4.0, 2.0));
        let px = c.read_pixels();
        assert_eq!(px.pixel(0, 1), [10, 20, 30, 255]);
        assert_eq!(px.pixel(3, 0), [40, 50, 60, 255]);
    }

    #[test]
    fn global_alpha_scales_image_draws() {
        let mut c = canvas(2, 2);
        c.set_global_alpha(0.0);
        c.draw_image(&RgbaImage::from_pixel(2, 2, image::Rgba([255; 4])), c.bounds());
        assert!(c.frame_data().chunks(4).all(|px| px == [0, 0, 0, 255]));
    }

    #[test]
    fn stroke_leaves_interior_untouched() {
        let mut c = canvas(10, 10);
        c.stroke_rect(Rect::new(2.0, 2.0, 8.0, 8.0), Color::rgb(255, 255, 255));
        let px = c.read_pixels();
        assert!(px.pixel(2, 5)[0] > 0);
        assert!(px.pixel(5, 2)[0] > 0);
        assert!(px.pixel(7, 5)[0] > 0);
        assert_eq!(px.pixel(5, 5), [0, 0, 0, 255]);
    }

    #[test]
    fn write_then_read_round_trips_opaque_pixels() {
        let mut c = canvas(2, 1);
        let frame = PixelBuffer {
            width: 2,
            height: 1,
            data: vec![1, 2, 3, 255, 200, 100, 50, 255],
        };
        c.write_pixels(&frame);
        assert_eq!(c.read_pixels(), frame);

        c.write_pixels(&PixelBuffer::new(1, 1));
        assert_eq!(c.read_pixels(), frame);
    }
}
