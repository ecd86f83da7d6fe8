use clap::Parser;
use std::path::PathBuf;

use crate::params::SampleMode;

#[derive(Parser, Debug)]
#[command(name = "pulsecanvas", about = "Audio-reactive 2D visualizer")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG). Falls back to the show data playlist.
    pub input: Option<PathBuf>,

    /// Encode frames into a video file with ffmpeg
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write frames as numbered PNG files into this directory
    #[arg(long, conflicts_with = "output")]
    pub frames_dir: Option<PathBuf>,

    /// Config file (default: ./pulsecanvas.toml, then the user config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Show data JSON: path or http(s) URL
    #[arg(short, long)]
    pub data: Option<String>,

    /// Playlist entry to play from the show data
    #[arg(long, default_value_t = 0)]
    pub track: usize,

    /// Canvas width in pixels
    #[arg(long, default_value_t = 640)]
    pub width: u32,

    /// Canvas height in pixels
    #[arg(long, default_value_t = 400)]
    pub height: u32,

    /// Frames per second
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Stop after this many seconds (default: track length)
    #[arg(long)]
    pub seconds: Option<f64>,

    /// Sample buffer contents
    #[arg(long, value_enum, default_value_t = SampleMode::Frequency)]
    pub mode: SampleMode,

    /// Layers and filters to enable (comma-separated: gradient,bars,hearts,noise,invert,emboss or none)
    #[arg(long, value_delimiter = ',')]
    pub layers: Vec<String>,

    /// Read toggle commands from stdin while rendering
    #[arg(short, long)]
    pub interactive: bool,

    /// FFmpeg video codec
    #[arg(long, default_value = "libx264")]
    pub codec: String,

    /// FFmpeg pixel format
    #[arg(long, default_value = "yuv420p")]
    pub pix_fmt: String,

    /// H.264 CRF quality (0-51, lower = better)
    #[arg(long, default_value_t = 18)]
    pub crf: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["pulsecanvas", "song.mp3"]);
        assert_eq!(cli.input, Some(PathBuf::from("song.mp3")));
        assert_eq!((cli.width, cli.height, cli.fps), (640, 400, 60));
        assert_eq!(cli.mode, SampleMode::Frequency);
        assert!(cli.layers.is_empty());
        assert!(cli.output.is_none());
    }

    #[test]
    fn layers_are_comma_separated() {
        let cli = Cli::parse_from([
            "pulsecanvas",
            "--layers",
            "bars,hearts,emboss",
            "--mode",
            "time-domain",
        ]);
        assert_eq!(cli.layers, vec!["bars", "hearts", "emboss"]);
        assert_eq!(cli.mode, SampleMode::TimeDomain);
    }

    #[test]
    fn output_and_frames_dir_conflict() {
        let res = Cli::try_parse_from(["pulsecanvas", "-o", "a.mp4", "--frames-dir", "out"]);
        assert!(res.is_err());
    }
}
