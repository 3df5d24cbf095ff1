//! Song definitions
//!
//! Songs are stored on the robot with [`Opcode::Song`] and played back by
//! track number with [`Opcode::PlaySong`].

use std::time::Duration;

use super::codec::CommandBuilder;
use super::{Opcode, ProtocolError};

/// Highest track number the robot stores
pub const MAX_TRACK: u8 = 4;
/// Longest song a single track can hold
pub const MAX_NOTES: usize = 16;

/// A single note: MIDI pitch and duration in 1/64ths of a second
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub pitch: u8,
    pub duration: u8,
}

impl Note {
    pub const fn new(pitch: u8, duration: u8) -> Self {
        Self { pitch, duration }
    }
}

/// A validated song; only [`Song::new`] and the built-in tunes construct one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    track: u8,
    notes: Vec<Note>,
}

impl Song {
    pub fn new(track: u8, notes: Vec<Note>) -> Result<Self, ProtocolError> {
        if track > MAX_TRACK {
            return Err(ProtocolError::InvalidArgument(format!(
                "song track {} out of range 0-{}",
                track, MAX_TRACK
            )));
        }
        if notes.is_empty() || notes.len() > MAX_NOTES {
            return Err(ProtocolError::InvalidArgument(format!(
                "song must have 1-{} notes, got {}",
                MAX_NOTES,
                notes.len()
            )));
        }
        Ok(Self { track, notes })
    }

    pub fn track(&self) -> u8 {
        self.track
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// `[140, track, length, pitch, duration, ...]`
    pub fn encode(&self) -> Vec<u8> {
        let mut builder = CommandBuilder::new(Opcode::Song)
            .byte(self.track)
            .byte(self.notes.len() as u8);
        for note in &self.notes {
            builder = builder.bytes(&[note.pitch, note.duration]);
        }
        builder.build()
    }

    /// Total playback time
    pub fn play_time(&self) -> Duration {
        let sixty_fourths: u64 = self.notes.iter().map(|n| n.duration as u64).sum();
        Duration::from_micros(sixty_fourths * 1_000_000 / 64)
    }

    /// Short fanfare played after finishing a lap
    pub fn lap_complete() -> Self {
        Self {
            track: 0,
            notes: vec![
                Note::new(91, 8),
                Note::new(90, 8),
                Note::new(99, 8),
                Note::new(69, 8),
                Note::new(80, 8),
                Note::new(88, 8),
                Note::new(92, 8),
                Note::new(96, 25),
            ],
        }
    }

    /// Low march played when a search pattern ends
    pub fn search_complete() -> Self {
        Self {
            track: 0,
            notes: vec![
                Note::new(43, 35),
                Note::new(43, 35),
                Note::new(43, 35),
                Note::new(39, 25),
                Note::new(46, 15),
                Note::new(43, 35),
                Note::new(39, 25),
                Note::new(46, 15),
                Note::new(43, 75),
                Note::new(50, 35),
                Note::new(50, 35),
                Note::new(50, 35),
                Note::new(39, 155),
                Note::new(46, 15),
                Note::new(43, 75),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_song() {
        let song = Song::new(2, vec![Note::new(60, 32), Note::new(64, 16)]).unwrap();
        assert_eq!(song.encode(), vec![140, 2, 2, 60, 32, 64, 16]);
    }

    #[test]
    fn test_builtin_songs_fit_a_track() {
        let lap = Song::lap_complete();
        assert_eq!(lap.notes().len(), 8);
        assert_eq!(&lap.encode()[..5], &[140, 0, 8, 91, 8]);

        let search = Song::search_complete();
        assert_eq!(search.notes().len(), 15);
        assert!(Song::new(search.track(), search.notes().to_vec()).is_ok());
    }

    #[test]
    fn test_play_time() {
        let song = Song::new(0, vec![Note::new(60, 64), Note::new(62, 32)]).unwrap();
        assert_eq!(song.play_time(), Duration::from_millis(1500));
    }

    #[test]
    fn test_rejects_bad_track_and_length() {
        assert!(Song::new(5, vec![Note::new(60, 8)]).is_err());
        assert!(Song::new(0, vec![]).is_err());
        assert!(Song::new(0, vec![Note::new(60, 8); 17]).is_err());
        assert!(Song::new(0, vec![Note::new(60, 8); 16]).is_ok());
    }
}
