use kurbo::Rect;

use super::assets::ImageHandle;
use super::surface::{Color, Fill, Surface};

/// A small image that breathes with the first two sample buckets.
pub struct AnimatedSprite {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: Color,
    pub alpha: f32,
    image: ImageHandle,
}

impl AnimatedSprite {
    pub fn new(x: f64, y: f64, width: f64, height: f64, color: Color, image: ImageHandle) -> Self {
        Self {
            x,
            y,
            width,
            height,
            color,
            alpha: 1.0,
            image,
        }
    }

    /// Width tracks `samples[0]`, height `samples[1]`, both on a 0-100 scale.
    /// `now_ms` is the playhead in milliseconds.
    pub fn update(&mut self, samples: &[u8], now_ms: f64) {
        let scaled = |i: usize| samples.get(i).map_or(0.0, |&s| s as f64 / 255.0 * 100.0);
        self.width = scaled(0);
        self.height = scaled(1);
        self.alpha = ((now_ms * 0.001).sin().abs() * 0.5 + 0.5) as f32;
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn draw<S: Surface>(&self, surface: &mut S) {
        let restore = surface.global_alpha();
        surface.set_global_alpha(self.alpha);
        match self.image.get() {
            Some(img) => surface.draw_image(img, self.bounds()),
            None => surface.fill_rect(self.bounds(), &Fill::Solid(self.color)),
        }
        surface.set_global_alpha(restore);
    }
}
