//! Configuration for generation runs.

use std::time::Duration;

/// Settings for one document-generation run.
///
/// Pacing fields exist purely so a consumer can watch content arrive at a
/// readable rate; they can be zeroed without changing final-state
/// correctness.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Model identifier passed to the generation backend.
    pub model: String,

    /// Maximum tokens per model response.
    pub max_tokens: u32,

    /// Hard ceiling on tool-loop steps. Guarantees termination even when
    /// the model never signals a natural stop.
    pub max_steps: usize,

    /// Accumulated characters between broadcasts while bulk-streaming
    /// multiple files.
    pub stream_chunk_chars: usize,

    /// Characters between broadcasts while replaying an edited file.
    pub replay_chunk_chars: usize,

    /// Delay after each throttled broadcast during bulk streaming.
    pub stream_pacing: Duration,

    /// Delay after each throttled broadcast during edit replay.
    pub replay_pacing: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 8192,
            max_steps: 15,
            stream_chunk_chars: 50,
            replay_chunk_chars: 50,
            stream_pacing: Duration::from_millis(20),
            replay_pacing: Duration::ZERO,
        }
    }
}

impl GenerationConfig {
    /// Returns a copy with all pacing delays removed. Used in tests and
    /// headless runs where animation is pointless.
    #[must_use]
    pub fn without_pacing(mut self) -> Self {
        self.stream_pacing = Duration::ZERO;
        self.replay_pacing = Duration::ZERO;
        self
    }
}
