pub mod ffmpeg;
pub mod png;

use anyhow::Result;

/// Destination for finished RGBA frames.
pub trait FrameSink: Send {
    fn write_frame(&mut self, rgba: &[u8]) -> Result<()>;

    /// Flushes and closes the output.
    fn finish(self: Box<Self>) -> Result<()>;
}

/// Discards frames; used for live runs with nothing to record.
#[derive(Default)]
pub struct NullSink {
    frames: u64,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for NullSink {
    fn write_frame(&mut self, _rgba: &[u8]) -> Result<()> {
        self.frames += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        log::debug!("Discarded {} frames", self.frames);
        Ok(())
    }
}
