use anyhow::{Context, Result};
use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use super::FrameSink;

pub struct EncoderSettings<'a> {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub codec: &'a str,
    pub pix_fmt: &'a str,
    pub crf: u32,
}

/// Pipes raw RGBA frames into ffmpeg, muxing the source audio when there is one.
pub struct FfmpegEncoder {
    child: Child,
}

impl FfmpegEncoder {
    pub fn new(output_path: &Path, audio: Option<&Path>, settings: &EncoderSettings) -> Result<Self> {
        let args = ffmpeg_args(output_path, audio, settings);
        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn ffmpeg. Is ffmpeg installed?")?;

        log::info!(
            "FFmpeg encoder started: {}x{} @ {}fps, codec={}",
            settings.width,
            settings.height,
            settings.fps,
            settings.codec
        );

        Ok(Self { child })
    }
}

fn ffmpeg_args(output_path: &Path, audio: Option<&Path>, s: &EncoderSettings) -> Vec<OsString> {
    let size = format!("{}x{}", s.width, s.height);
    let fps = s.fps.to_string();
    let crf = s.crf.to_string();
    let mut args: Vec<OsString> = [
        "-y",
        "-f",
        "rawvideo",
        "-pixel_format",
        "rgba",
        "-video_size",
        size.as_str(),
        "-framerate",
        fps.as_str(),
        "-i",
        "pipe:0",
    ]
    .iter()
    .map(OsString::from)
    .collect();

    if let Some(audio) = audio {
        args.push("-i".into());
        args.push(audio.as_os_str().to_owned());
    }

    for arg in [
        "-c:v",
        s.codec,
        "-pix_fmt",
        s.pix_fmt,
        "-crf",
        crf.as_str(),
        "-preset",
        "medium",
    ] {
        args.push(arg.into());
    }

    if audio.is_some() {
        for arg in ["-c:a", "aac", "-b:a", "192k", "-shortest"] {
            args.push(arg.into());
        }
    }
    args.push(output_path.as_os_str().to_owned());
    args
}

impl FrameSink for FfmpegEncoder {
    fn write_frame(&mut self, rgba: &[u8]) -> Result<()> {
        let stdin = self.child.stdin.as_mut().context("FFmpeg stdin not available")?;
        stdin.write_all(rgba).context("Failed to write frame to ffmpeg")?;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        // EOF on stdin ends the stream
        drop(self.child.stdin.take());

        let output = self.child.wait_with_output().context("Failed to wait for ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("FFmpeg exited with error:\n{}", stderr);
        }

        log::info!("FFmpeg encoding complete");
        Ok(())
    }
}
