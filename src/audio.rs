//! Background music: a single looping track with a play/pause toggle.
//!
//! Game rules never look at this; the app starts it with a round and stops it
//! when the round is abandoned.

use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_VOLUME: f32 = 0.3;

#[derive(Debug, Error)]
#[cfg_attr(not(feature = "audio"), allow(dead_code))]
pub enum AudioError {
    #[cfg_attr(feature = "audio", allow(dead_code))]
    #[error("built without audio support (enable the `audio` feature)")]
    Unsupported,
    #[error("no audio output device: {0}")]
    Device(String),
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot decode {}: {message}", .path.display())]
    Decode { path: PathBuf, message: String },
}

pub struct Music {
    player: Option<backend::Player>,
    playing: bool,
    /// Set by the player's toggle; a muted track stays silent across rounds.
    muted: bool,
}

impl Music {
    /// No track: the toggle still flips state so the UI can show it.
    pub fn silent(muted: bool) -> Self {
        Self {
            player: None,
            playing: false,
            muted,
        }
    }

    /// Open `path` for looping playback. Failure is logged and yields a silent player.
    pub fn open(path: Option<&Path>, volume: f32, muted: bool) -> Self {
        let Some(path) = path else {
            return Self::silent(muted);
        };
        match backend::Player::open(path, volume.clamp(0.0, 1.0)) {
            Ok(player) => {
                tracing::info!(path = %path.display(), volume, "music loaded");
                Self {
                    player: Some(player),
                    playing: false,
                    muted,
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "music disabled");
                Self::silent(muted)
            }
        }
    }

    pub fn has_track(&self) -> bool {
        self.player.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// A round started: play unless the player muted the music.
    pub fn start_round(&mut self) {
        if !self.muted {
            self.play();
        }
    }

    /// The round was abandoned.
    pub fn stop(&mut self) {
        self.pause();
    }

    /// Play/pause toggle; pausing mutes for later rounds too.
    pub fn toggle(&mut self) {
        if self.playing {
            self.pause();
            self.muted = true;
        } else {
            self.muted = false;
            self.play();
        }
        tracing::debug!(playing = self.playing, "music toggled");
    }

    fn play(&mut self) {
        if let Some(player) = &self.player {
            player.play();
        }
        self.playing = true;
    }

    fn pause(&mut self) {
        if let Some(player) = &self.player {
            player.pause();
        }
        self.playing = false;
    }
}

#[cfg(feature = "audio")]
mod backend {
    use super::AudioError;
    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
    use std::fs::File;
    use std::io::BufReader;
    use std::path::Path;

    pub struct Player {
        _stream: OutputStream,
        _handle: OutputStreamHandle,
        sink: Sink,
    }

    impl Player {
        pub fn open(path: &Path, volume: f32) -> Result<Self, AudioError> {
            let (stream, handle) =
                OutputStream::try_default().map_err(|e| AudioError::Device(e.to_string()))?;
            let sink = Sink::try_new(&handle).map_err(|e| AudioError::Device(e.to_string()))?;
            let file = File::open(path).map_err(|source| AudioError::Open {
                path: path.to_path_buf(),
                source,
            })?;
            let source = Decoder::new(BufReader::new(file)).map_err(|e| AudioError::Decode {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            sink.pause();
            sink.set_volume(volume);
            sink.append(source.repeat_infinite());
            Ok(Self {
                _stream: stream,
                _handle: handle,
                sink,
            })
        }

        pub fn play(&self) {
            self.sink.play();
        }

        pub fn pause(&self) {
            self.sink.pause();
        }
    }
}

#[cfg(not(feature = "audio"))]
mod backend {
    use super::AudioError;
    use std::path::Path;

    pub struct Player;

    impl Player {
        pub fn open(_path: &Path, _volume: f32) -> Result<Self, AudioError> {
            Err(AudioError::Unsupported)
        }

        pub fn play(&self) {}

        pub fn pause(&self) {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_start_plays_unless_muted() {
        let mut m = Music::silent(false);
        m.start_round();
        assert!(m.is_playing());
        m.stop();
        assert!(!m.is_playing());

        let mut m = Music::silent(true);
        m.start_round();
        assert!(!m.is_playing());
    }

    #[test]
    fn toggle_mutes_later_rounds() {
        let mut m = Music::silent(false);
        m.start_round();
        m.toggle();
        assert!(!m.is_playing());
        assert!(m.is_muted());
        m.start_round();
        assert!(!m.is_playing());
        m.toggle();
        assert!(m.is_playing());
        assert!(!m.is_muted());
    }

    #[test]
    fn no_path_means_no_track() {
        let m = Music::open(None, DEFAULT_VOLUME, false);
        assert!(!m.has_track());
    }

    #[cfg(not(feature = "audio"))]
    #[test]
    fn without_feature_open_falls_back_to_silent() {
        let m = Music::open(Some(Path::new("theme.mp3")), 0.5, false);
        assert!(!m.has_track());
    }
}
