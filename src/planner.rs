//! Chunk planning: how to split an oversized item into legal-size spans.

use crate::error::{MediascribeError, Result};
use crate::media::estimate_bytes_per_second;

/// A plan for splitting one media item into bounded-size chunks.
///
/// Derived, never persisted. `chunks()` yields spans that exactly cover
/// `[0, total_duration)` with no gaps and no overlap.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPlan {
    /// Planned duration of each chunk except possibly the last, in seconds.
    pub chunk_duration_seconds: f64,
    /// Number of chunks: `ceil(total / chunk_duration)`.
    pub chunk_count: u32,
    /// Total duration of the item, in seconds.
    pub total_duration_seconds: f64,
}

/// One chunk's place on the item's timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkSpan {
    /// 0-based chunk index; chunks are always processed in index order.
    pub index: u32,
    /// Absolute start offset within the item, in seconds.
    pub start_seconds: f64,
    /// Span duration; the final chunk carries the shorter remainder.
    pub span_seconds: f64,
}

impl ChunkPlan {
    /// A plan with a single chunk spanning the whole item.
    pub fn single(total_duration_seconds: f64) -> Self {
        Self {
            chunk_duration_seconds: total_duration_seconds,
            chunk_count: 1,
            total_duration_seconds,
        }
    }

    /// True when the item is not split.
    pub fn is_single(&self) -> bool {
        self.chunk_count == 1
    }

    /// Iterate the chunk spans in index order.
    pub fn chunks(&self) -> impl Iterator<Item = ChunkSpan> + '_ {
        (0..self.chunk_count).map(move |index| {
            let start_seconds = index as f64 * self.chunk_duration_seconds;
            let span_seconds =
                self.chunk_duration_seconds.min(self.total_duration_seconds - start_seconds);
            ChunkSpan {
                index,
                start_seconds,
                span_seconds,
            }
        })
    }
}

/// Compute a chunk plan that keeps every chunk under the ceiling with margin.
///
/// Splitting is only triggered when the whole item exceeds the ceiling.
/// The planned duration is rounded down to whole minutes and clamped to a
/// 5-minute floor. The floor wins over the ceiling: a pathologically dense
/// item gets a floored plan anyway, and the mandatory post-extraction size
/// check fails it if the chunks come out oversized.
pub fn plan_chunks(
    total_size_bytes: u64,
    total_duration_seconds: f64,
    size_ceiling_bytes: u64,
    safety_margin: f64,
    min_chunk_seconds: u32,
) -> Result<ChunkPlan> {
    let rate = estimate_bytes_per_second(total_size_bytes, total_duration_seconds)?;

    // Under the ceiling, or too short to split: one chunk, whole item.
    if total_size_bytes <= size_ceiling_bytes
        || total_duration_seconds < min_chunk_seconds as f64
    {
        return Ok(ChunkPlan::single(total_duration_seconds));
    }

    let target_bytes = size_ceiling_bytes as f64 * safety_margin;
    let raw_chunk_seconds = target_bytes / rate;

    // Round down to whole minutes, then clamp to the floor.
    let granularity = crate::defaults::CHUNK_GRANULARITY_SECONDS as f64;
    let mut chunk_duration = (raw_chunk_seconds / granularity).floor() * granularity;
    chunk_duration = chunk_duration.max(min_chunk_seconds as f64);

    let chunk_count = (total_duration_seconds / chunk_duration).ceil() as u32;

    Ok(ChunkPlan {
        chunk_duration_seconds: chunk_duration,
        chunk_count,
        total_duration_seconds,
    })
}
