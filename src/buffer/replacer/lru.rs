//! LRU (Least Recently Used) replacement policy.

use tracing::trace;

use super::Replacer;
use crate::buffer::Frame;
use crate::common::FrameId;

/// Evicts the unpinned frame whose last pin is oldest.
///
/// Empty frames are always taken first. Among resident frames, ties on the
/// recency tick go to the lowest index. Keeps no state of its own: every
/// call scans the whole array.
#[derive(Debug, Default)]
pub struct LruReplacer;

impl LruReplacer {
    pub fn new() -> Self {
        Self
    }
}

impl Replacer for LruReplacer {
    fn pick_victim(&mut self, frames: &[Frame]) -> Option<FrameId> {
        let mut oldest: Option<(usize, u64)> = None;

        for (index, frame) in frames.iter().enumerate() {
            if frame.is_empty() {
                trace!(victim = index, "lru picked empty frame");
                return Some(FrameId::new(index));
            }
            if frame.is_pinned() {
                continue;
            }
            match oldest {
                Some((_, tick)) if frame.last_touch() >= tick => {}
                _ => oldest = Some((index, frame.last_touch())),
            }
        }

        oldest.map(|(index, tick)| {
            trace!(victim = index, tick, "lru picked victim");
            FrameId::new(index)
        })
    }

    fn name(&self) -> &'static str {
        "lru"
    }
}
