use rand::Rng;
use rayon::prelude::*;

use super::pixels::PixelBuffer;
use super::surface::Surface;
use crate::params::DrawParams;

/// Whole-frame pixel filters, applied after all layers are drawn.
#[derive(Default)]
pub struct FrameFilter;

impl FrameFilter {
    pub fn new() -> Self {
        Self
    }

    pub fn has_effects(params: &DrawParams) -> bool {
        params.show_noise || params.show_invert || params.show_emboss
    }

    /// Reads the frame back, filters it and writes it over the surface.
    /// Does nothing when no filter is enabled.
    pub fn apply<S: Surface>(&self, surface: &mut S, params: &DrawParams) {
        if !Self::has_effects(params) {
            return;
        }
        let mut frame = surface.read_pixels();
        self.run(&mut frame, params);
        surface.write_pixels(&frame);
    }

    /// Noise and invert share one per-pixel pass; emboss runs after it over the whole buffer.
    pub fn run(&self, frame: &mut PixelBuffer, params: &DrawParams) {
        if params.show_noise || params.show_invert {
            let (noise, invert) = (params.show_noise, params.show_invert);
            frame
                .data
                .par_chunks_mut(4)
                .for_each_init(rand::thread_rng, |rng, px| {
                    if noise {
                        speckle(px, rng);
                    }
                    if invert {
                        invert_pixel(px);
                    }
                });
        }
        if params.show_emboss {
            emboss(&mut frame.data, frame.width);
        }
    }
}

/// Half the pixels become opaque random blues.
fn speckle<R: Rng>(px: &mut [u8], rng: &mut R) {
    if rng.gen_bool(0.5) {
        px[0] = 0;
        px[1] = 0;
        px[2] = rng.gen_range(0..255);
        px[3] = 255;
    }
}

fn invert_pixel(px: &mut [u8]) {
    px[0] = 255 - px[0];
    px[1] = 255 - px[1];
    px[2] = 255 - px[2];
}

/// `127 + 2*here - right - below` on every color byte, in place and in ascending order.
///
/// Results saturate to 0..=255. A byte whose right or lower neighbour lies past the end
/// of the buffer has no defined result and becomes 0.
pub fn emboss(data: &mut [u8], width: u32) {
    let len = data.len();
    let stride = width as usize * 4;
    for i in 0..len {
        if i % 4 == 3 {
            continue;
        }
        let (right, below) = (i + 4, i + stride);
        data[i] = if right < len && below < len {
            let v = 127 + 2 * data[i] as i32 - data[right] as i32 - data[below] as i32;
            v.clamp(0, 255) as u8
        } else {
            0
        };
    }
}
