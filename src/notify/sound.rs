//! Alert sound playback using rodio.
//!
//! A system sound is preferred; when none is installed, or it cannot be
//! decoded, a short generated tone is played instead.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rodio::source::SineWave;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tracing::{debug, warn};

use super::error::NotifyError;
use crate::types::SessionType;

/// Candidate files for the end-of-work sound, in priority order.
const WORK_DONE_SOUNDS: &[&str] = &[
    "/System/Library/Sounds/Glass.aiff",
    "/usr/share/sounds/freedesktop/stereo/complete.oga",
];

/// Candidate files for the end-of-break sound, in priority order.
const BREAK_DONE_SOUNDS: &[&str] = &[
    "/System/Library/Sounds/Ping.aiff",
    "/usr/share/sounds/freedesktop/stereo/bell.oga",
];

/// Length of the generated tone.
const TONE_MILLIS: u64 = 400;

/// Tone pitch per finished session type (higher after work).
pub fn tone_frequency(finished: SessionType) -> f32 {
    if finished.is_work() {
        880.0
    } else {
        660.0
    }
}

// ============================================================================
// SoundSource
// ============================================================================

/// What to play for an alert.
#[derive(Debug, Clone, PartialEq)]
pub enum SoundSource {
    /// A sound file installed on the host.
    File { path: PathBuf },
    /// A generated sine tone.
    Tone { frequency_hz: f32, millis: u64 },
}

impl SoundSource {
    /// Picks the sound for a finished session type.
    pub fn for_session(finished: SessionType) -> Self {
        let candidates = if finished.is_work() {
            WORK_DONE_SOUNDS
        } else {
            BREAK_DONE_SOUNDS
        };
        Self::first_existing(candidates).unwrap_or_else(|| Self::tone_for(finished))
    }

    /// Generated tone for a session type.
    pub fn tone_for(finished: SessionType) -> Self {
        Self::Tone {
            frequency_hz: tone_frequency(finished),
            millis: TONE_MILLIS,
        }
    }

    fn first_existing(candidates: &[&str]) -> Option<Self> {
        candidates
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(|path| Self::File {
                path: path.to_path_buf(),
            })
    }
}

// ============================================================================
// RodioSoundPlayer
// ============================================================================

/// Plays alert sounds on the default output device.
///
/// The output stream is not `Send`; the player is created and used on the
/// alert thread only.
pub struct RodioSoundPlayer {
    /// The audio output stream (must be kept alive for playback).
    _stream: OutputStream,
    /// Handle to the output stream for creating sinks.
    stream_handle: OutputStreamHandle,
}

impl RodioSoundPlayer {
    /// Opens the default output device.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::DeviceNotAvailable` if no device is available.
    pub fn new() -> Result<Self, NotifyError> {
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| NotifyError::DeviceNotAvailable(e.to_string()))?;

        debug!("Audio output stream initialized");

        Ok(Self {
            _stream: stream,
            stream_handle,
        })
    }

    /// Plays a sound without blocking; file failures fall back to a tone.
    pub fn play(&self, source: &SoundSource, fallback_tone: f32) -> Result<(), NotifyError> {
        match source {
            SoundSource::File { path } => match self.play_file(path) {
                Ok(()) => Ok(()),
                Err(e) if e.should_fallback_to_tone() => {
                    warn!("サウンド再生に失敗したためトーンで代替します: {}", e);
                    self.play_tone(fallback_tone, TONE_MILLIS)
                }
                Err(e) => Err(e),
            },
            SoundSource::Tone {
                frequency_hz,
                millis,
            } => self.play_tone(*frequency_hz, *millis),
        }
    }

    fn play_tone(&self, frequency_hz: f32, millis: u64) -> Result<(), NotifyError> {
        let tone = SineWave::new(frequency_hz)
            .take_duration(Duration::from_millis(millis))
            .amplify(0.2);
        let sink = self.sink()?;
        sink.append(tone);
        sink.detach(); // Non-blocking: sound continues after return
        Ok(())
    }

    fn play_file(&self, path: &Path) -> Result<(), NotifyError> {
        let file = File::open(path)
            .map_err(|e| NotifyError::FileNotFound(format!("{}: {}", path.display(), e)))?;
        let decoder = Decoder::new(BufReader::new(file))
            .map_err(|e| NotifyError::DecodeError(e.to_string()))?;

        let sink = self.sink()?;
        sink.append(decoder);
        sink.detach();
        Ok(())
    }

    fn sink(&self) -> Result<Sink, NotifyError> {
        Sink::try_new(&self.stream_handle).map_err(|e| NotifyError::StreamError(e.to_string()))
    }
}
