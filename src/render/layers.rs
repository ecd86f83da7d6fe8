//! The stacked drawing passes that make up one frame.
//!
//! Order matters: every layer blends over the previous one, and the surface is
//! never cleared, so the fade at the top of the stack is what leaves trails.

use image::RgbaImage;
use kurbo::{BezPath, Point, Rect};

use super::sprite::AnimatedSprite;
use super::surface::{Color, Fill, LinearGradient, Surface};
use crate::config::BarLayout;
use crate::params::DrawParams;

pub const FADE_ALPHA: f32 = 0.1;
pub const HEART_ALPHA: f32 = 0.4;

const GRADIENT_STOPS: [(f32, &str); 3] = [(0.0, "#6e21fc"), (0.5, "#181e4a"), (1.0, "#381a70")];

/// One bar of the rainbow chart.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bar {
    pub rect: Rect,
    pub hue: f32,
}

impl Bar {
    pub fn fill(&self) -> Color {
        Color::hsla(self.hue, 1.0, 0.5, 0.5)
    }

    pub fn stroke(&self) -> Color {
        Color::hsla(self.hue, 1.0, 0.5, 0.7)
    }
}

pub fn bar_width(count: usize, surface_width: f64, layout: &BarLayout) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let n = count as f64;
    (surface_width - n * layout.spacing - 2.0 * layout.margin) / n
}

/// Louder samples sit higher: `y = top_offset + 256 - sample`.
pub fn layout_bars(samples: &[u8], surface_width: f64, layout: &BarLayout) -> Vec<Bar> {
    let n = samples.len();
    let width = bar_width(n, surface_width, layout);
    samples
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let x = layout.margin + i as f64 * (width + layout.spacing);
            let y = layout.top_offset + 256.0 - s as f64;
            Bar {
                rect: Rect::new(x, y, x + width, y + layout.height),
                hue: (i as f32 / n as f32) * 360.0,
            }
        })
        .collect()
}

/// One of the three nested hearts drawn per sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeartLayer {
    pub rgb: (u8, u8, u8),
    /// Raw formula value; the surface clamps it when drawing
    pub alpha: f32,
    pub y_offset: f64,
    pub size_scale: f64,
}

impl HeartLayer {
    pub fn color(&self) -> Color {
        Color::rgba(self.rgb.0, self.rgb.1, self.rgb.2, self.alpha)
    }
}

/// Louder samples give fainter hearts.
pub fn heart_layers(percent: f32) -> [HeartLayer; 3] {
    [
        HeartLayer {
            rgb: (240, 0, 73),
            alpha: 0.34 - percent / 3.0,
            y_offset: 20.0,
            size_scale: 1.0,
        },
        HeartLayer {
            rgb: (255, 0, 212),
            alpha: 0.10 - percent / 10.0,
            y_offset: 10.0,
            size_scale: 1.5,
        },
        HeartLayer {
            rgb: (255, 100, 100),
            alpha: 0.5 - percent / 5.0,
            y_offset: 30.0,
            size_scale: 0.5,
        },
    ]
}

pub fn heart_scale(percent: f64) -> f64 {
    0.5 + percent * 1.3
}

/// Two mirrored cubic lobes meeting at the bottom point `(x, y + size)`.
pub fn heart_path(x: f64, y: f64, size: f64) -> BezPath {
    let mut path = BezPath::new();
    path.move_to((x, y + size / 8.0));
    path.curve_to(
        (x - size / 2.0, y - size / 2.0),
        (x - size, y + size / 2.0),
        (x, y + size),
    );
    path.curve_to(
        (x + size, y + size / 2.0),
        (x + size / 2.0, y - size / 2.0),
        (x, y + size / 6.0),
    );
    path.close_path();
    path
}

pub fn background_gradient(height: f64) -> Fill {
    let stops = GRADIENT_STOPS
        .iter()
        .filter_map(|&(t, hex)| Color::parse(hex).map(|c| (t, c)))
        .collect();
    Fill::Linear(LinearGradient::new(
        Point::new(0.0, 0.0),
        Point::new(0.0, height),
        stops,
    ))
}

/// Everything a frame's layers read besides the surface.
pub struct FrameInputs<'a> {
    pub samples: &'a [u8],
    pub params: &'a DrawParams,
    pub background: Option<&'a RgbaImage>,
    pub now_ms: f64,
}

pub struct LayerCompositor {
    bars: BarLayout,
}

impl LayerCompositor {
    pub fn new(bars: BarLayout) -> Self {
        Self { bars }
    }

    pub fn compose<S: Surface>(
        &self,
        surface: &mut S,
        inputs: &FrameInputs<'_>,
        sprites: &mut [AnimatedSprite],
    ) {
        self.draw_fade(surface);
        if inputs.params.show_gradient {
            self.draw_gradient(surface);
        }
        if inputs.params.show_bars {
            self.draw_bars(surface, inputs.samples);
        }
        if let Some(img) = inputs.background {
            self.draw_background(surface, img);
        }
        if inputs.params.show_circles {
            self.draw_hearts(surface, inputs.samples);
        }
        for sprite in sprites.iter_mut() {
            sprite.update(inputs.samples, inputs.now_ms);
            sprite.draw(surface);
        }
    }

    fn draw_fade<S: Surface>(&self, surface: &mut S) {
        surface.set_global_alpha(FADE_ALPHA);
        surface.fill_rect(surface.bounds(), &Fill::Solid(Color::BLACK));
        surface.set_global_alpha(1.0);
    }

    fn draw_gradient<S: Surface>(&self, surface: &mut S) {
        let fill = background_gradient(surface.height() as f64);
        surface.fill_rect(surface.bounds(), &fill);
    }

    fn draw_bars<S: Surface>(&self, surface: &mut S, samples: &[u8]) {
        for bar in layout_bars(samples, surface.width() as f64, &self.bars) {
            surface.fill_rect(bar.rect, &Fill::Solid(bar.fill()));
            surface.stroke_rect(bar.rect, bar.stroke());
        }
    }

    fn draw_background<S: Surface>(&self, surface: &mut S, img: &RgbaImage) {
        let (w, h) = img.dimensions();
        surface.draw_image(img, Rect::new(0.0, 0.0, w as f64, h as f64));
    }

    fn draw_hearts<S: Surface>(&self, surface: &mut S, samples: &[u8]) {
        let width = surface.width() as f64;
        let height = surface.height() as f64;
        let max_radius = height / 6.0;
        let anchor_x = width / 3.0 * 2.0;
        let anchor_y = height / 4.0;

        surface.set_global_alpha(HEART_ALPHA);
        for &sample in samples {
            let percent = sample as f32 / 255.0;
            let size = max_radius * heart_scale(percent as f64);
            for layer in heart_layers(percent) {
                let path = heart_path(anchor_x, anchor_y + layer.y_offset, size * layer.size_scale);
                surface.fill_path(&path, layer.color());
            }
        }
        surface.set_global_alpha(1.0);
    }
}
