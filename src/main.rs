mod audio;
mod cli;
mod config;
mod controls;
mod encode;
mod params;
mod render;
mod show;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use audio::analyser::Analyser;
use audio::source::TrackSource;
use cli::Cli;
use config::Config;
use encode::ffmpeg::{EncoderSettings, FfmpegEncoder};
use encode::png::PngSequence;
use encode::{FrameSink, NullSink};
use params::{DrawParams, SharedParams};
use render::canvas::Canvas;
use render::frame::Renderer;
use render::scheduler::{LoopOptions, Pacing, RenderLoop};
use show::ShowData;

/// Layers shown when neither the command line, show data nor config choose any.
const STARTUP_LAYERS: [&str; 4] = ["gradient", "bars", "hearts", "noise"];

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let cfg = resolve_config(&cli)?;

    let show = cli
        .data
        .as_deref()
        .map(show::load_show_data)
        .transpose()
        .context("Failed to load show data")?;
    if let Some(ref data) = show {
        log::info!("{}", data.app_title);
    }

    let input = resolve_input(&cli, show.as_ref())?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    log::info!("pulsecanvas - audio-reactive visualizer");
    log::info!("Input: {}", input.display());
    log::info!(
        "Canvas: {}x{} @ {}fps, fft {}",
        cfg.output.width,
        cfg.output.height,
        cfg.output.fps,
        cfg.audio.fft_size
    );

    log::info!("Decoding audio...");
    let track = audio::decode::decode_track(&input)?;
    let source = TrackSource::new(track, Analyser::new(&cfg.audio));

    let seconds = cli.seconds.unwrap_or_else(|| source.duration_secs());
    let total_frames = (seconds.max(0.0) * cfg.output.fps as f64).ceil() as u64;
    log::info!("Duration: {:.1}s, {} frames", seconds, total_frames);

    let (sink, pacing) = open_sink(&cli, &cfg, &input)?;

    let params = SharedParams::new(startup_params(&cli, &cfg, show.as_ref()));
    log::info!("Layers: {:?}", params.snapshot());

    let quit = Arc::new(AtomicBool::new(false));
    if cli.interactive {
        controls::spawn_stdin_controls(params.clone(), Arc::clone(&quit));
    }

    let canvas = Canvas::new(cfg.output.width, cfg.output.height)?;
    let renderer = Renderer::setup(canvas, Box::new(source), &cfg);
    let render = RenderLoop::start(
        renderer,
        params,
        sink,
        LoopOptions {
            fps: cfg.output.fps,
            max_frames: Some(total_frames),
            pacing,
        },
    )?;

    let pb = ProgressBar::new(total_frames);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
            .context("Invalid progress template")?
            .progress_chars("=>-"),
    );
    while !render.is_finished() && !quit.load(Ordering::Relaxed) {
        pb.set_position(render.frames());
        std::thread::sleep(Duration::from_millis(100));
    }
    quit.store(true, Ordering::Relaxed);

    let report = render.stop()?;
    pb.set_position(report.frames);
    pb.finish();

    if let Some(err) = report.error {
        return Err(err.context("Rendering stopped early"));
    }
    report.sink.finish()?;

    log::info!(
        "Done: {} frames in {:.1}s",
        report.frames,
        report.elapsed.as_secs_f64()
    );
    Ok(())
}

/// Config values apply only where the command line is still at its default.
fn resolve_config(cli: &Cli) -> Result<Config> {
    let explicit = cli.config.is_some();
    let mut cfg = match config::locate_config(cli.config.clone()) {
        Some(path) => match config::load_config(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            Err(err) if !explicit => {
                log::warn!("Ignoring config {}: {:#}", path.display(), err);
                Config::default()
            }
            Err(err) => return Err(err),
        },
        None => Config::default(),
    };

    if cli.width != 640 { cfg.output.width = cli.width; }
    if cli.height != 400 { cfg.output.height = cli.height; }
    if cli.fps != 60 { cfg.output.fps = cli.fps; }
    cfg.sanitize();
    Ok(cfg)
}

fn resolve_input(cli: &Cli, show: Option<&ShowData>) -> Result<PathBuf> {
    if let Some(ref input) = cli.input {
        return Ok(input.clone());
    }
    let show = show.context("Input audio file is required (or --data with a playlist)")?;
    let track = show.track(cli.track)?;
    log::info!("Track: {}", track.label());

    // Local show data resolves relative tracks next to itself
    let base = cli
        .data
        .as_deref()
        .filter(|d| !d.starts_with("http://") && !d.starts_with("https://"))
        .and_then(|d| Path::new(d).parent());
    Ok(show.resolve_track(track, base))
}

/// File outputs advance the playhead one frame at a time; a live run follows the clock.
fn open_sink(cli: &Cli, cfg: &Config, input: &Path) -> Result<(Box<dyn FrameSink>, Pacing)> {
    if let Some(ref output) = cli.output {
        log::info!("Output: {}", output.display());
        let settings = EncoderSettings {
            width: cfg.output.width,
            height: cfg.output.height,
            fps: cfg.output.fps,
            codec: &cli.codec,
            pix_fmt: &cli.pix_fmt,
            crf: cli.crf,
        };
        let encoder = FfmpegEncoder::new(output, Some(input), &settings)?;
        return Ok((Box::new(encoder), Pacing::FrameLocked));
    }
    if let Some(ref dir) = cli.frames_dir {
        let frames = PngSequence::new(dir.clone(), cfg.output.width, cfg.output.height)?;
        return Ok((Box::new(frames), Pacing::FrameLocked));
    }
    Ok((Box::new(NullSink::new()), Pacing::RealTime))
}

/// `--layers` wins, then the show's starting state, then the config, then the built-in set.
fn startup_params(cli: &Cli, cfg: &Config, show: Option<&ShowData>) -> DrawParams {
    let mut params = if !cli.layers.is_empty() {
        DrawParams::default().with_layers(&cli.layers)
    } else if let Some(show) = show {
        show.starting_state.params
    } else if !cfg.layers.is_empty() {
        DrawParams::default().with_layers(&cfg.layers)
    } else {
        DrawParams::default().with_layers(&STARTUP_LAYERS)
    };
    params.sample_mode = cli.mode;
    params
}
