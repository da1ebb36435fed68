//! Eviction policy implementations (replacers).
//!
//! A replacer only *chooses* a victim; the buffer pool applies every state
//! change to the chosen frame. Replacers receive the frame array as a
//! shared slice and never hold on to it.
//!
//! Currently implements:
//! - [`ClockReplacer`] - rotating hand, first unpinned frame wins
//! - [`LruReplacer`] - empty frames first, then the least recently pinned

mod clock;
mod lru;

use std::fmt;
use std::str::FromStr;

use crate::buffer::Frame;
use crate::common::FrameId;

pub use clock::ClockReplacer;
pub use lru::LruReplacer;

/// Victim selection strategy.
pub trait Replacer {
    /// Pick a frame with pin count 0, or `None` if every frame is pinned.
    ///
    /// Must never return a pinned frame and must not change frame state.
    fn pick_victim(&mut self, frames: &[Frame]) -> Option<FrameId>;

    /// Short policy name for logs and reports.
    fn name(&self) -> &'static str;
}

/// The policies a pool can be configured with.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplacerKind {
    #[default]
    Clock,
    Lru,
}

impl ReplacerKind {
    /// Build a fresh replacer for a pool of `pool_size` frames.
    pub fn build(self, pool_size: usize) -> Box<dyn Replacer> {
        match self {
            ReplacerKind::Clock => Box::new(ClockReplacer::new(pool_size)),
            ReplacerKind::Lru => Box::new(LruReplacer::new()),
        }
    }
}

impl fmt::Display for ReplacerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplacerKind::Clock => write!(f, "clock"),
            ReplacerKind::Lru => write!(f, "lru"),
        }
    }
}

/// Error returned when parsing an unknown policy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown replacement policy: {0:?}")]
pub struct UnknownReplacer(pub String);

impl FromStr for ReplacerKind {
    type Err = UnknownReplacer;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clock" => Ok(ReplacerKind::Clock),
            "lru" => Ok(ReplacerKind::Lru),
            _ => Err(UnknownReplacer(s.to_string())),
        }
    }
}
