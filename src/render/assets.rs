use anyhow::{Context, Result};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

pub fn load_rgba(path: &Path) -> Result<RgbaImage> {
    let img = image::open(path)
        .with_context(|| format!("Failed to load image: {}", path.display()))?;
    Ok(img.to_rgba8())
}

/// Image that becomes ready at most once and never reverts.
#[derive(Clone, Default)]
pub struct ImageHandle {
    cell: Arc<OnceLock<RgbaImage>>,
}

impl ImageHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&RgbaImage> {
        self.cell.get()
    }

    /// Marks the handle ready. Later calls are ignored.
    pub fn set(&self, image: RgbaImage) {
        if self.cell.set(image).is_err() {
            log::debug!("Image already loaded, keeping the first one");
        }
    }

    /// Decodes `path` on a background thread. A failed load leaves the handle unready for good.
    pub fn load_in_background(path: PathBuf) -> Self {
        let handle = Self::new();
        let target = handle.clone();
        thread::spawn(move || match load_rgba(&path) {
            Ok(img) => {
                log::debug!("Loaded sprite image {}", path.display());
                target.set(img);
            }
            Err(err) => log::warn!("{:#}", err),
        });
        handle
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed,
}

pub enum LoadEvent {
    Started,
    Loaded(Arc<RgbaImage>),
    Failed(String),
}

/// Periodically reloaded image; the displayed copy changes only on a successful load.
pub struct RefreshingImage {
    events: Receiver<LoadEvent>,
    state: LoadState,
    current: Option<Arc<RgbaImage>>,
    swaps: u64,
}

impl RefreshingImage {
    pub fn from_channel(events: Receiver<LoadEvent>) -> Self {
        Self {
            events,
            state: LoadState::Loading,
            current: None,
            swaps: 0,
        }
    }

    /// Reloads `path` from disk every `refresh` after a success, `retry` after a failure.
    pub fn spawn(path: PathBuf, refresh: Duration, retry: Duration) -> Self {
        Self::spawn_with(move || load_rgba(&path), refresh, retry)
    }

    pub fn spawn_with<F>(loader: F, refresh: Duration, retry: Duration) -> Self
    where
        F: FnMut() -> Result<RgbaImage> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || reload_loop(loader, tx, refresh, retry));
        Self::from_channel(rx)
    }

    /// Applies every event the loader has sent since the last poll.
    pub fn poll(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                LoadEvent::Started => self.state = LoadState::Loading,
                LoadEvent::Loaded(img) => {
                    if self.state == LoadState::Failed && self.current.is_some() {
                        log::info!("Background image reloaded after a failure");
                    }
                    self.current = Some(img);
                    self.state = LoadState::Ready;
                    self.swaps += 1;
                    log::debug!("Background image swapped ({} so far)", self.swaps);
                }
                LoadEvent::Failed(reason) => {
                    log::warn!("Background image load failed: {}", reason);
                    self.state = LoadState::Failed;
                }
            }
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn current(&self) -> Option<&RgbaImage> {
        self.current.as_deref()
    }

    #[cfg(test)]
    pub fn swaps(&self) -> u64 {
        self.swaps
    }
}

fn reload_loop<F>(mut loader: F, tx: Sender<LoadEvent>, refresh: Duration, retry: Duration)
where
    F: FnMut() -> Result<RgbaImage>,
{
    loop {
        if tx.send(LoadEvent::Started).is_err() {
            return;
        }
        let (event, delay) = match loader() {
            Ok(img) => (LoadEvent::Loaded(Arc::new(img)), refresh),
            Err(err) => (LoadEvent::Failed(format!("{:#}", err)), retry),
        };
        // Receiver gone: the renderer was dropped.
        if tx.send(event).is_err() {
            return;
        }
        thread::sleep(delay);
    }
}
