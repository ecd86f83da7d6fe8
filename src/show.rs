use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::params::DrawParams;

#[derive(Debug, Error)]
pub enum ShowDataError {
    #[error("failed to read show data {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch show data from {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid show data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("show data lists no audio tracks")]
    NoTracks,

    #[error("track {index} requested but only {count} available")]
    TrackOutOfRange { index: usize, count: usize },
}

/// Title, playlist and initial layer state for a show.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowData {
    #[serde(default = "default_title")]
    pub app_title: String,
    pub audio_tracks: Vec<AudioTrack>,
    #[serde(default)]
    pub starting_state: StartingState,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioTrack {
    pub file: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
}

/// Initial layer flags. Mixer keys (`volume`, `bass`, `treble`) are accepted and ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartingState {
    #[serde(flatten)]
    pub params: DrawParams,
}

fn default_title() -> String {
    "pulsecanvas".into()
}

impl AudioTrack {
    pub fn label(&self) -> String {
        match (self.title.is_empty(), self.artist.is_empty()) {
            (true, _) => self.file.clone(),
            (false, true) => self.title.clone(),
            (false, false) => format!("{} by {}", self.title, self.artist),
        }
    }
}

impl ShowData {
    pub fn track(&self, index: usize) -> Result<&AudioTrack, ShowDataError> {
        self.audio_tracks
            .get(index)
            .ok_or(ShowDataError::TrackOutOfRange {
                index,
                count: self.audio_tracks.len(),
            })
    }

    /// Track files are relative to the document they were listed in.
    pub fn resolve_track(&self, track: &AudioTrack, base: Option<&Path>) -> PathBuf {
        let file = Path::new(&track.file);
        match base {
            Some(base) if file.is_relative() => base.join(file),
            _ => file.to_path_buf(),
        }
    }
}

pub fn parse_show_data(json: &str) -> Result<ShowData, ShowDataError> {
    let data: ShowData = serde_json::from_str(json)?;
    if data.audio_tracks.is_empty() {
        return Err(ShowDataError::NoTracks);
    }
    Ok(data)
}

/// Loads from an `http(s)://` URL or a local path.
pub fn load_show_data(location: &str) -> Result<ShowData, ShowDataError> {
    let body = if location.starts_with("http://") || location.starts_with("https://") {
        log::info!("Fetching show data from {}", location);
        fetch(location).map_err(|source| ShowDataError::Http {
            url: location.to_string(),
            source,
        })?
    } else {
        std::fs::read_to_string(location).map_err(|source| ShowDataError::Io {
            path: PathBuf::from(location),
            source,
        })?
    };
    parse_show_data(&body)
}

fn fetch(url: &str) -> Result<String, reqwest::Error> {
    reqwest::blocking::get(url)?.error_for_status()?.text()
}
