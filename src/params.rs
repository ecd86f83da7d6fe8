use parking_lot::RwLock;
use serde::Deserialize;
use std::sync::Arc;

/// How the analyser fills the sample buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SampleMode {
    /// Per-bucket magnitudes, low to high frequency
    #[default]
    Frequency,
    /// Raw waveform centered at 128
    TimeDomain,
}

/// Per-frame switches for the optional layers and filters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DrawParams {
    pub show_gradient: bool,
    pub show_bars: bool,
    pub show_circles: bool,
    pub show_noise: bool,
    pub show_invert: bool,
    pub show_emboss: bool,
    pub sample_mode: SampleMode,
}

impl DrawParams {
    /// Flips the flag named by a layer or filter name. Returns false for unknown names.
    pub fn toggle(&mut self, name: &str) -> bool {
        let flag = match name {
            "gradient" => &mut self.show_gradient,
            "bars" => &mut self.show_bars,
            "hearts" | "circles" => &mut self.show_circles,
            "noise" => &mut self.show_noise,
            "invert" => &mut self.show_invert,
            "emboss" => &mut self.show_emboss,
            _ => return false,
        };
        *flag = !*flag;
        true
    }

    /// Enables only the named layers; unknown names are logged and skipped.
    pub fn with_layers<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.show_gradient = false;
        self.show_bars = false;
        self.show_circles = false;
        self.show_noise = false;
        self.show_invert = false;
        self.show_emboss = false;
        for name in names {
            let name = name.as_ref();
            if name == "none" {
                continue;
            }
            if !self.toggle(name) {
                log::warn!("Unknown layer: {}", name);
            }
        }
        self
    }
}

/// DrawParams shared between the control side and the render thread.
#[derive(Clone, Default)]
pub struct SharedParams {
    inner: Arc<RwLock<DrawParams>>,
}

impl SharedParams {
    pub fn new(params: DrawParams) -> Self {
        Self {
            inner: Arc::new(RwLock::new(params)),
        }
    }

    /// Copy taken once at the start of each frame.
    pub fn snapshot(&self) -> DrawParams {
        *self.inner.read()
    }

    pub fn update(&self, f: impl FnOnce(&mut DrawParams)) {
        f(&mut self.inner.write());
    }
}
