use std::time::Duration;

use super::assets::{ImageHandle, RefreshingImage};
use super::layers::{FrameInputs, LayerCompositor};
use super::postprocess::FrameFilter;
use super::sprite::AnimatedSprite;
use super::surface::{Color, Surface};
use crate::audio::source::SampleSource;
use crate::config::{AssetConfig, BarLayout, Config, SpriteConfig};
use crate::params::DrawParams;

/// Owns everything one visualizer instance needs to produce frames.
pub struct Renderer<S: Surface> {
    surface: S,
    source: Box<dyn SampleSource>,
    samples: Vec<u8>,
    sprites: Vec<AnimatedSprite>,
    background: Option<RefreshingImage>,
    compositor: LayerCompositor,
    filter: FrameFilter,
}

impl<S: Surface> Renderer<S> {
    /// Bare renderer: no sprites and no background image.
    pub fn new(surface: S, source: Box<dyn SampleSource>, bars: BarLayout) -> Self {
        let samples = vec![0; source.fft_size() / 2];
        Self {
            surface,
            source,
            samples,
            sprites: Vec::new(),
            background: None,
            compositor: LayerCompositor::new(bars),
            filter: FrameFilter::new(),
        }
    }

    /// Full setup from configuration: sprite images and the background start loading in the
    /// background and show up once they are ready.
    pub fn setup(surface: S, source: Box<dyn SampleSource>, cfg: &Config) -> Self {
        let assets = &cfg.assets;
        let background = RefreshingImage::spawn(
            assets.resolve(&assets.background),
            Duration::from_millis(assets.refresh_ms),
            Duration::from_millis(assets.retry_ms),
        );
        Self::new(surface, source, cfg.bars)
            .with_sprites(build_sprites(&cfg.sprites, assets))
            .with_background(background)
    }

    pub fn with_sprites(mut self, sprites: Vec<AnimatedSprite>) -> Self {
        self.sprites = sprites;
        self
    }

    pub fn with_background(mut self, background: RefreshingImage) -> Self {
        self.background = Some(background);
        self
    }

    /// Renders exactly one frame for the track position `playhead_secs`.
    pub fn draw(&mut self, params: &DrawParams, playhead_secs: f64) {
        if let Some(bg) = self.background.as_mut() {
            bg.poll();
        }
        self.source
            .refresh(playhead_secs, params.sample_mode, &mut self.samples);

        let inputs = FrameInputs {
            samples: &self.samples,
            params,
            background: self.background.as_ref().and_then(|bg| bg.current()),
            now_ms: playhead_secs * 1000.0,
        };
        self.compositor
            .compose(&mut self.surface, &inputs, &mut self.sprites);
        self.filter.apply(&mut self.surface, params);
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[cfg(test)]
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

pub fn build_sprites(configs: &[SpriteConfig], assets: &AssetConfig) -> Vec<AnimatedSprite> {
    configs
        .iter()
        .map(|c| {
            let color = Color::parse(&c.color).unwrap_or_else(|| {
                log::warn!("Unknown sprite color '{}', using white", c.color);
                Color::rgb(255, 255, 255)
            });
            let image = ImageHandle::load_in_background(assets.resolve(&c.image));
            AnimatedSprite::new(c.x, c.y, c.width, c.height, color, image)
        })
        .collect()
}
