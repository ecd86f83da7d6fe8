use anyhow::{Context, Result};
use image::ExtendedColorType;
use std::path::PathBuf;

use super::FrameSink;

/// Writes each frame as `frame_000000.png`, `frame_000001.png`, ... into a directory.
pub struct PngSequence {
    dir: PathBuf,
    width: u32,
    height: u32,
    next: u64,
}

impl PngSequence {
    pub fn new(dir: PathBuf, width: u32, height: u32) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create frame directory: {}", dir.display()))?;
        log::info!("Writing PNG frames to {}", dir.display());
        Ok(Self {
            dir,
            width,
            height,
            next: 0,
        })
    }

    fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame_{:06}.png", index))
    }
}

impl FrameSink for PngSequence {
    fn write_frame(&mut self, rgba: &[u8]) -> Result<()> {
        let expected = self.width as usize * self.height as usize * 4;
        if rgba.len() != expected {
            anyhow::bail!("Frame has {} bytes, expected {}", rgba.len(), expected);
        }
        let path = self.frame_path(self.next);
        image::save_buffer(&path, rgba, self.width, self.height, ExtendedColorType::Rgba8)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        self.next += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        log::info!("Wrote {} frames to {}", self.next, self.dir.display());
        Ok(())
    }
}
