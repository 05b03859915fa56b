//! Transcript data model: segments with absolute timestamps.

/// One transcribed span with timestamps absolute across the whole item.
///
/// Produced by offsetting a chunk-relative segment by that chunk's start.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub text: String,
}

/// The full transcript of one media item, stitched from all its chunks.
#[derive(Debug, Clone, Default)]
pub struct CombinedTranscript {
    /// Concatenated text, fragments joined with single spaces.
    pub text: String,
    /// Segments in non-decreasing start-time order.
    pub segments: Vec<TranscriptSegment>,
    /// Detected or assumed language code.
    pub language: String,
}

impl CombinedTranscript {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    pub fn character_count(&self) -> usize {
        self.text.chars().count()
    }

    /// True if segment start times never decrease.
    pub fn is_monotonic(&self) -> bool {
        self.segments
            .windows(2)
            .all(|pair| pair[0].start_seconds <= pair[1].start_seconds)
    }
}
