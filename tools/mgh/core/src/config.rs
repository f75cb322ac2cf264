use crate::audio::{BLOCK_SAMPLES, UNITY_VOLUME};
use crate::reference::REFERENCES;
use crate::{FRAME_MS, LANES};

/// When a press is judged.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum JudgePolicy {
    /// Once per 25 ms frame, right after the chart advances.
    #[default]
    EveryFrame,
    /// Only when the input line changed since the last pass.
    OnInputEdge,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameConfig {
    pub num_songs: u8,
    pub frame_ms: u64,
    /// Samples moved per audio drain.
    pub audio_block: usize,
    /// Playback gain, 1024 = unity.
    pub volume: u16,
    pub judge: JudgePolicy,
    /// Per-lane weights of the comparator reference output.
    pub references: [u8; LANES],
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            num_songs: 7,
            frame_ms: FRAME_MS,
            audio_block: BLOCK_SAMPLES,
            volume: UNITY_VOLUME,
            judge: JudgePolicy::default(),
            references: REFERENCES,
        }
    }
}
