use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use crate::config::AudioConfig;

/// Converts a window of PCM samples into the byte buffers a browser analyser node exposes.
pub struct Analyser {
    fft_size: usize,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl Analyser {
    pub fn new(cfg: &AudioConfig) -> Self {
        let fft_size = cfg.fft_size;
        let fft = FftPlanner::<f32>::new().plan_fft_forward(fft_size);
        Self {
            fft_size,
            smoothing: cfg.smoothing.clamp(0.0, 1.0),
            min_db: cfg.min_decibels,
            max_db: cfg.max_decibels,
            fft,
            window: blackman_window(fft_size),
            smoothed: vec![0.0; fft_size / 2],
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// `block` holds the most recent `fft_size` samples, oldest first.
    /// Smoothing state advances on every call.
    pub fn byte_frequency_data(&mut self, block: &[f32], out: &mut [u8]) {
        for (i, slot) in self.scratch.iter_mut().enumerate() {
            let s = block.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(s * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        let norm = 1.0 / self.fft_size as f32;
        let tau = self.smoothing;
        for (s, bin) in self.smoothed.iter_mut().zip(&self.scratch) {
            let magnitude = bin.norm() * norm;
            *s = tau * *s + (1.0 - tau) * magnitude;
            if !s.is_finite() {
                *s = 0.0;
            }
        }

        let range = self.max_db - self.min_db;
        for (byte, &s) in out.iter_mut().zip(&self.smoothed) {
            let db = 20.0 * s.log10();
            let scaled = 255.0 / range * (db - self.min_db);
            // -inf dB (silence) lands on 0 through the clamp.
            *byte = if scaled.is_nan() {
                0
            } else {
                scaled.floor().clamp(0.0, 255.0) as u8
            };
        }
    }

    pub fn byte_time_domain_data(&self, block: &[f32], out: &mut [u8]) {
        for (i, byte) in out.iter_mut().enumerate() {
            let s = block.get(i).copied().unwrap_or(0.0);
            *byte = (128.0 * (1.0 + s)).floor().clamp(0.0, 255.0) as u8;
        }
    }
}

fn blackman_window(size: usize) -> Vec<f32> {
    let n = size as f32;
    (0..size)
        .map(|i| {
            let x = i as f32 / n;
            0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
        })
        .collect()
}
