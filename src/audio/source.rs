use super::analyser::Analyser;
use super::decode::Track;
use crate::params::SampleMode;

/// Producer of the per-frame sample buffer.
///
/// The buffer the renderer passes in is always `fft_size() / 2` bytes long.
pub trait SampleSource: Send {
    fn fft_size(&self) -> usize;

    /// Overwrites `buffer` in place with the analysis at `playhead_secs` into the track.
    fn refresh(&mut self, playhead_secs: f64, mode: SampleMode, buffer: &mut [u8]);
}

/// Analyses a decoded track at whatever playhead the render loop asks for.
pub struct TrackSource {
    track: Track,
    analyser: Analyser,
    block: Vec<f32>,
}

impl TrackSource {
    pub fn new(track: Track, analyser: Analyser) -> Self {
        let block = vec![0.0; analyser.fft_size()];
        Self {
            track,
            analyser,
            block,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.track.duration_secs()
    }

    /// Copies the `fft_size` samples ending at `end`, zero-filled outside the track.
    fn load_block(&mut self, end: usize) {
        let size = self.block.len();
        let start = end as i64 - size as i64;
        for (i, slot) in self.block.iter_mut().enumerate() {
            let idx = start + i as i64;
            *slot = if idx >= 0 {
                self.track.samples.get(idx as usize).copied().unwrap_or(0.0)
            } else {
                0.0
            };
        }
    }
}

impl SampleSource for TrackSource {
    fn fft_size(&self) -> usize {
        self.analyser.fft_size()
    }

    fn refresh(&mut self, playhead_secs: f64, mode: SampleMode, buffer: &mut [u8]) {
        let end = (playhead_secs.max(0.0) * self.track.sample_rate as f64) as usize;
        self.load_block(end);
        match mode {
            SampleMode::Frequency => self.analyser.byte_frequency_data(&self.block, buffer),
            SampleMode::TimeDomain => self.analyser.byte_time_domain_data(&self.block, buffer),
        }
    }
}

/// Source that hands out a fixed buffer and remembers the playheads it was asked for.
#[cfg(test)]
pub struct FixedSource {
    pub bytes: Vec<u8>,
    pub playheads: std::sync::Arc<parking_lot::Mutex<Vec<f64>>>,
}

#[cfg(test)]
impl FixedSource {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            playheads: Default::default(),
        }
    }
}

#[cfg(test)]
impl SampleSource for FixedSource {
    fn fft_size(&self) -> usize {
        self.bytes.len() * 2
    }

    fn refresh(&mut self, playhead_secs: f64, _mode: SampleMode, buffer: &mut [u8]) {
        self.playheads.lock().push(playhead_secs);
        buffer.copy_from_slice(&self.bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioConfig;

    fn source(samples: Vec<f32>) -> TrackSource {
        let cfg = AudioConfig {
            fft_size: 8,
            ..AudioConfig::default()
        };
        TrackSource::new(
            Track {
                samples,
                sample_rate: 8,
            },
            Analyser::new(&cfg),
        )
    }

    #[test]
    fn time_domain_reads_window_ending_at_position() {
        let samples: Vec<f32> = (0..16).map(|i| if i < 8 { 0.5 } else { -0.5 }).collect();
        let mut src = source(samples);
        let mut buf = [0u8; 4];

        src.refresh(1.0, SampleMode::TimeDomain, &mut buf);
        assert_eq!(buf, [192; 4]);

        src.refresh(2.0, SampleMode::TimeDomain, &mut buf);
        assert_eq!(buf, [64; 4]);
    }

    #[test]
    fn before_start_and_after_end_is_silence() {
        let mut src = source(vec![0.9; 16]);
        let mut buf = [7u8; 4];
        src.refresh(0.0, SampleMode::TimeDomain, &mut buf);
        assert_eq!(buf, [128; 4]);
        src.refresh(60.0, SampleMode::TimeDomain, &mut buf);
        assert_eq!(buf, [128; 4]);
        src.refresh(60.0, SampleMode::Frequency, &mut buf);
        assert_eq!(buf, [0; 4]);
    }

    #[test]
    fn same_playhead_gives_the_same_window() {
        let samples: Vec<f32> = (0..64).map(|i| (i as f32 * 0.3).sin()).collect();
        let mut src = source(samples);
        let (mut a, mut b) = ([0u8; 4], [0u8; 4]);
        src.refresh(3.25, SampleMode::TimeDomain, &mut a);
        src.refresh(1.0, SampleMode::TimeDomain, &mut b);
        src.refresh(3.25, SampleMode::TimeDomain, &mut b);
        assert_eq!(a, b);
    }
}
