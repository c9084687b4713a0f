use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sound {
    Flap,
    Quack,
    Score,
    Crash,
}

/// Host audio output
pub trait SoundSink: Send {
    fn play(&mut self, sound: Sound);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSink;

impl SoundSink for SilentSink {
    fn play(&mut self, sound: Sound) {
        trace!("Sound {:?}", sound);
    }
}

/// Keeps every played sound; clones share one buffer
#[derive(Debug, Clone, Default)]
pub struct RecordingSound {
    played: Arc<Mutex<Vec<Sound>>>,
}

impl RecordingSound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<Sound> {
        self.played.lock().clone()
    }
}

impl SoundSink for RecordingSound {
    fn play(&mut self, sound: Sound) {
        self.played.lock().push(sound);
    }
}

/// Mute toggle in front of a sink
pub struct MuteState {
    sink: Box<dyn SoundSink>,
    muted: bool,
}

impl MuteState {
    pub fn new(sink: Box<dyn SoundSink>) -> Self {
        Self { sink, muted: false }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Flip the mute flag; returns the new value
    pub fn toggle(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }

    pub fn play(&mut self, sound: Sound) {
        if !self.muted {
            self.sink.play(sound);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mute_suppresses_playback() {
        let recorder = RecordingSound::new();
        let mut sound = MuteState::new(Box::new(recorder.clone()));

        sound.play(Sound::Flap);
        assert!(sound.toggle());
        sound.play(Sound::Crash);
        assert!(!sound.toggle());
        sound.play(Sound::Score);

        assert_eq!(recorder.played(), vec![Sound::Flap, Sound::Score]);
    }
}
