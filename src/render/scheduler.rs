use anyhow::{anyhow, Context, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::frame::Renderer;
use super::surface::Surface;
use crate::encode::FrameSink;
use crate::params::SharedParams;

/// Fraction of the target rate below which the loop warns about falling behind.
const SLOW_FRAME_RATIO: f64 = 0.9;

/// Where the playhead comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pacing {
    /// Playhead follows the wall clock; ticks sleep to hold the frame rate.
    RealTime,
    /// Playhead is `frame / fps`; frames are produced as fast as the sink takes them.
    FrameLocked,
}

pub struct LoopOptions {
    pub fps: u32,
    /// Stop by itself after this many frames
    pub max_frames: Option<u64>,
    pub pacing: Pacing,
}

/// What the render thread hands back when it ends.
pub struct LoopReport {
    pub sink: Box<dyn FrameSink>,
    pub frames: u64,
    pub elapsed: Duration,
    /// Set when the sink failed and ended the loop early
    pub error: Option<anyhow::Error>,
}

impl LoopReport {
    pub fn effective_fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames as f64 / secs
        } else {
            0.0
        }
    }
}

/// Drives `Renderer::draw` on its own thread.
///
/// Each tick reads a snapshot of the shared params, so writes from other threads show up
/// on the next frame. In real time, ticks that run long are not made up for.
pub struct RenderLoop {
    handle: JoinHandle<LoopReport>,
    stop: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
}

impl RenderLoop {
    pub fn start<S: Surface + Send + 'static>(
        renderer: Renderer<S>,
        params: SharedParams,
        sink: Box<dyn FrameSink>,
        options: LoopOptions,
    ) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let frames = Arc::new(AtomicU64::new(0));
        let worker = Worker {
            renderer,
            params,
            sink,
            interval: Duration::from_secs_f64(1.0 / options.fps.max(1) as f64),
            fps: options.fps.max(1),
            max_frames: options.max_frames,
            pacing: options.pacing,
            stop: Arc::clone(&stop),
            frames: Arc::clone(&frames),
        };

        let handle = thread::Builder::new()
            .name("render".into())
            .spawn(move || worker.run())
            .context("Failed to spawn render thread")?;

        log::info!(
            "Render loop started at {} fps ({:?})",
            options.fps.max(1),
            options.pacing
        );
        Ok(Self {
            handle,
            stop,
            frames,
        })
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancels future ticks and waits for the current one to finish.
    pub fn stop(self) -> Result<LoopReport> {
        self.stop.store(true, Ordering::Relaxed);
        let report = self
            .handle
            .join()
            .map_err(|_| anyhow!("Render thread panicked"))?;
        log::info!(
            "Render loop stopped after {} frames ({:.1} fps)",
            report.frames,
            report.effective_fps()
        );
        Ok(report)
    }
}

struct Worker<S: Surface> {
    renderer: Renderer<S>,
    params: SharedParams,
    sink: Box<dyn FrameSink>,
    interval: Duration,
    fps: u32,
    max_frames: Option<u64>,
    pacing: Pacing,
    stop: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
}

impl<S: Surface> Worker<S> {
    fn run(mut self) -> LoopReport {
        let started = Instant::now();
        let mut count = 0u64;
        let mut warned = false;
        let mut error = None;

        while !self.stop.load(Ordering::Relaxed) {
            if self.max_frames.is_some_and(|max| count >= max) {
                break;
            }
            let tick = Instant::now();
            let playhead = match self.pacing {
                Pacing::RealTime => started.elapsed().as_secs_f64(),
                Pacing::FrameLocked => count as f64 / self.fps as f64,
            };

            let params = self.params.snapshot();
            self.renderer.draw(&params, playhead);
            if let Err(err) = self.sink.write_frame(self.renderer.surface().frame_data()) {
                log::error!("Frame output failed, stopping: {:#}", err);
                error = Some(err);
                break;
            }
            count += 1;
            self.frames.store(count, Ordering::Relaxed);

            if self.pacing == Pacing::FrameLocked {
                continue;
            }
            if !warned && count % self.fps as u64 == 0 {
                let effective = count as f64 / started.elapsed().as_secs_f64();
                if effective < self.fps as f64 * SLOW_FRAME_RATIO {
                    log::warn!(
                        "Rendering at {:.1} fps, below the {} fps target",
                        effective,
                        self.fps
                    );
                    warned = true;
                }
            }

            thread::sleep(self.interval.saturating_sub(tick.elapsed()));
        }

        LoopReport {
            sink: self.sink,
            frames: count,
            elapsed: started.elapsed(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::FixedSource;
    use crate::config::BarLayout;
    use crate::encode::NullSink;
    use crate::params::DrawParams;
    use crate::render::recorder::DisplayList;
    use parking_lot::Mutex;

    /// Keeps every frame it receives, optionally taking its time about it.
    struct Collect {
        frames: Arc<Mutex<Vec<Vec<u8>>>>,
        delay: Duration,
    }

    impl FrameSink for Collect {
        fn write_frame(&mut self, rgba: &[u8]) -> Result<()> {
            thread::sleep(self.delay);
            self.frames.lock().push(rgba.to_vec());
            Ok(())
        }

        fn finish(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    struct Broken;

    impl FrameSink for Broken {
        fn write_frame(&mut self, _rgba: &[u8]) -> Result<()> {
            anyhow::bail!("disk full")
        }

        fn finish(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    fn renderer(source: FixedSource) -> Renderer<DisplayList> {
        Renderer::new(DisplayList::new(8, 4), Box::new(source), BarLayout::default())
    }

    fn options(fps: u32, max_frames: Option<u64>, pacing: Pacing) -> LoopOptions {
        LoopOptions {
            fps,
            max_frames,
            pacing,
        }
    }

    fn wait_for(render: &RenderLoop) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !render.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn stops_after_max_frames() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Collect {
            frames: Arc::clone(&seen),
            delay: Duration::ZERO,
        };
        let render = RenderLoop::start(
            renderer(FixedSource::new(vec![0; 4])),
            SharedParams::default(),
            Box::new(sink),
            options(500, Some(5), Pacing::RealTime),
        )
        .unwrap();
        wait_for(&render);
        let report = render.stop().unwrap();

        assert_eq!(report.frames, 5);
        let seen = seen.lock();
        assert_eq!(seen.len(), 5);
        assert!(seen.iter().all(|f| f.len() == 8 * 4 * 4));
        assert!(report.error.is_none());
    }

    #[test]
    fn frame_locked_playhead_ignores_a_slow_sink() {
        let source = FixedSource::new(vec![0; 4]);
        let playheads = Arc::clone(&source.playheads);
        let sink = Collect {
            frames: Arc::new(Mutex::new(Vec::new())),
            delay: Duration::from_millis(30),
        };
        let render = RenderLoop::start(
            renderer(source),
            SharedParams::default(),
            Box::new(sink),
            options(50, Some(4), Pacing::FrameLocked),
        )
        .unwrap();
        wait_for(&render);
        let report = render.stop().unwrap();

        assert_eq!(report.frames, 4);
        let expected: Vec<f64> = (0..4).map(|i| i as f64 / 50.0).collect();
        assert_eq!(*playheads.lock(), expected);
    }

    #[test]
    fn real_time_playhead_follows_the_clock() {
        let source = FixedSource::new(vec![0; 4]);
        let playheads = Arc::clone(&source.playheads);
        let sink = Collect {
            frames: Arc::new(Mutex::new(Vec::new())),
            delay: Duration::from_millis(30),
        };
        let render = RenderLoop::start(
            renderer(source),
            SharedParams::default(),
            Box::new(sink),
            options(50, Some(3), Pacing::RealTime),
        )
        .unwrap();
        wait_for(&render);
        render.stop().unwrap();

        let playheads = playheads.lock();
        assert_eq!(playheads.len(), 3);
        assert!(playheads[0] < 0.03);
        // Each frame waited at least 30ms on the sink
        assert!(playheads[2] >= 0.06);
    }

    #[test]
    fn stop_ends_an_open_ended_loop() {
        let render = RenderLoop::start(
            renderer(FixedSource::new(vec![0; 4])),
            SharedParams::default(),
            Box::new(NullSink::new()),
            options(200, None, Pacing::RealTime),
        )
        .unwrap();
        thread::sleep(Duration::from_millis(50));
        let report = render.stop().unwrap();
        assert!(report.frames > 0);
        report.sink.finish().unwrap();
    }

    #[test]
    fn param_changes_reach_the_next_frame() {
        let params = SharedParams::new(DrawParams::default());
        params.update(|p| p.show_invert = true);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Collect {
            frames: Arc::clone(&seen),
            delay: Duration::ZERO,
        };
        let render = RenderLoop::start(
            renderer(FixedSource::new(vec![0; 4])),
            params.clone(),
            Box::new(sink),
            options(500, Some(1), Pacing::FrameLocked),
        )
        .unwrap();
        wait_for(&render);
        render.stop().unwrap();

        let seen = seen.lock();
        assert_eq!(&seen[0][..4], &[255, 255, 255, 0]);
    }

    #[test]
    fn sink_failure_ends_the_loop() {
        let render = RenderLoop::start(
            renderer(FixedSource::new(vec![0; 4])),
            SharedParams::default(),
            Box::new(Broken),
            options(500, None, Pacing::RealTime),
        )
        .unwrap();
        wait_for(&render);
        let report = render.stop().unwrap();
        assert_eq!(report.frames, 0);
        assert!(report.error.unwrap().to_string().contains("disk full"));
    }
}
