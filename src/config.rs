use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub bars: BarLayout,
    #[serde(default)]
    pub assets: AssetConfig,
    #[serde(default = "default_sprites")]
    pub sprites: Vec<SpriteConfig>,
    /// Layers enabled at startup when no show data says otherwise
    #[serde(default)]
    pub layers: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Analysis window; the sample buffer holds half of it
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
    #[serde(default = "default_min_decibels")]
    pub min_decibels: f32,
    #[serde(default = "default_max_decibels")]
    pub max_decibels: f32,
}

/// Geometry of the bar chart layer.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BarLayout {
    #[serde(default = "default_bar_spacing")]
    pub spacing: f64,
    #[serde(default = "default_bar_margin")]
    pub margin: f64,
    #[serde(default = "default_bar_height")]
    pub height: f64,
    #[serde(default = "default_bar_top")]
    pub top_offset: f64,
}

#[derive(Debug, Deserialize)]
pub struct AssetConfig {
    /// Directory that relative image paths resolve against
    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,
    #[serde(default = "default_background")]
    pub background: PathBuf,
    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,
    #[serde(default = "default_retry_ms")]
    pub retry_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpriteConfig {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: String,
    pub image: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: OutputConfig::default(),
            audio: AudioConfig::default(),
            bars: BarLayout::default(),
            assets: AssetConfig::default(),
            sprites: default_sprites(),
            layers: Vec::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
            smoothing: default_smoothing(),
            min_decibels: default_min_decibels(),
            max_decibels: default_max_decibels(),
        }
    }
}

impl Default for BarLayout {
    fn default() -> Self {
        Self {
            spacing: default_bar_spacing(),
            margin: default_bar_margin(),
            height: default_bar_height(),
            top_offset: default_bar_top(),
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            media_dir: default_media_dir(),
            background: default_background(),
            refresh_ms: default_refresh_ms(),
            retry_ms: default_retry_ms(),
        }
    }
}

impl AssetConfig {
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.media_dir.join(path)
        }
    }
}

fn default_width() -> u32 { 640 }
fn default_height() -> u32 { 400 }
fn default_fps() -> u32 { 60 }
fn default_fft_size() -> usize { 256 }
fn default_smoothing() -> f32 { 0.8 }
fn default_min_decibels() -> f32 { -100.0 }
fn default_max_decibels() -> f32 { -30.0 }
fn default_bar_spacing() -> f64 { 4.0 }
fn default_bar_margin() -> f64 { 5.0 }
fn default_bar_height() -> f64 { 100.0 }
fn default_bar_top() -> f64 { 100.0 }
fn default_media_dir() -> PathBuf { PathBuf::from("media") }
fn default_background() -> PathBuf { PathBuf::from("sticker.png") }
fn default_refresh_ms() -> u64 { 2000 }
fn default_retry_ms() -> u64 { 50 }

fn default_sprites() -> Vec<SpriteConfig> {
    let sprite = |x, y, size, color: &str, image: &str| SpriteConfig {
        x,
        y,
        width: size,
        height: size,
        color: color.into(),
        image: image.into(),
    };
    vec![
        sprite(50.0, 50.0, 50.0, "white", "sparkles.png"),
        sprite(350.0, 30.0, 60.0, "blue", "rabbit.png"),
        sprite(550.0, 75.0, 30.0, "pink", "wand.png"),
    ]
}

impl Config {
    /// Clamp values the renderer cannot work with.
    pub fn sanitize(&mut self) {
        self.output.width = self.output.width.max(1);
        self.output.height = self.output.height.max(1);
        self.output.fps = self.output.fps.clamp(1, 240);

        if !self.audio.fft_size.is_power_of_two() || !(32..=32_768).contains(&self.audio.fft_size) {
            log::warn!(
                "fft_size {} is not a power of two in 32..=32768, using {}",
                self.audio.fft_size,
                default_fft_size()
            );
            self.audio.fft_size = default_fft_size();
        }
        self.audio.smoothing = self.audio.smoothing.clamp(0.0, 1.0);
        if self.audio.min_decibels >= self.audio.max_decibels {
            self.audio.min_decibels = default_min_decibels();
            self.audio.max_decibels = default_max_decibels();
        }
    }
}

/// Explicit path first, then `./pulsecanvas.toml`, then the per-user config directory.
pub fn locate_config(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }
    let local = PathBuf::from("pulsecanvas.toml");
    if local.exists() {
        return Some(local);
    }
    let user = dirs::config_dir()?.join("pulsecanvas").join("config.toml");
    user.exists().then_some(user)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid TOML in {}", path.display()))
}

pub fn parse_config(content: &str) -> Result<Config> {
    let mut cfg: Config = toml::from_str(content)?;
    cfg.sanitize();
    Ok(cfg)
}
