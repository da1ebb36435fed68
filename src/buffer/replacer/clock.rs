//! Clock replacement policy.

use tracing::trace;

use super::Replacer;
use crate::buffer::Frame;
use crate::common::FrameId;

/// Sweeps a hand around the frame array and takes the first unpinned frame.
///
/// Recency is ignored: any unpinned frame is fair game. After a pick the
/// hand rests just past the victim, so consecutive calls walk the array
/// instead of returning the same frame. Parking past the victim, rather
/// than on it, is deliberate: with `[pinned, unpinned, pinned, unpinned]`
/// successive picks are 1, 3, 1.
pub struct ClockReplacer {
    /// Next frame to examine.
    hand: usize,
    size: usize,
}

impl ClockReplacer {
    pub fn new(size: usize) -> Self {
        Self { hand: 0, size }
    }

    /// Frame the next sweep starts from.
    pub fn hand(&self) -> usize {
        self.hand
    }
}

impl Replacer for ClockReplacer {
    fn pick_victim(&mut self, frames: &[Frame]) -> Option<FrameId> {
        debug_assert_eq!(frames.len(), self.size);
        if self.size == 0 {
            return None;
        }

        for step in 0..self.size {
            let index = (self.hand + step) % self.size;
            if !frames[index].is_pinned() {
                self.hand = (index + 1) % self.size;
                trace!(victim = index, "clock picked victim");
                return Some(FrameId::new(index));
            }
        }
        None
    }

    fn name(&self) -> &'static str {
        "clock"
    }
}
