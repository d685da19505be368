//! Aggregated call tree
//!
//! Every sampled stack is folded into a tree of [`Frame`]s. A frame's time is
//! the total time of all samples whose stack passes through it, so a parent's
//! time is always at least the sum of its children.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One entry of a sampled stack, outermost first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEntry {
    pub function: String,
    pub location: Option<String>,
}

impl StackEntry {
    pub fn new(function: impl Into<String>, location: Option<String>) -> Self {
        Self {
            function: function.into(),
            location,
        }
    }
}

/// A node of the aggregated call tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Function-like label (program, thread name, scheduler state, wait channel)
    pub function: String,
    /// Secondary label shown next to the function
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Total time attributed to this frame, in microseconds
    pub time_us: u64,
    /// Callees, sorted by descending time
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Frame>,
}

impl Frame {
    pub fn new(function: impl Into<String>, location: Option<String>) -> Self {
        Self {
            function: function.into(),
            location,
            time_us: 0,
            children: Vec::new(),
        }
    }

    /// Fold one sampled stack into this frame
    ///
    /// `self` is the root of the stack; `stack` holds the entries below it.
    pub fn add_stack(&mut self, stack: &[StackEntry], time_us: u64) {
        self.time_us += time_us;

        let Some((head, rest)) = stack.split_first() else {
            return;
        };

        let position = self
            .children
            .iter()
            .position(|child| child.function == head.function && child.location == head.location);

        let index = match position {
            Some(index) => index,
            None => {
                self.children
                    .push(Frame::new(head.function.clone(), head.location.clone()));
                self.children.len() - 1
            }
        };

        self.children[index].add_stack(rest, time_us);
    }

    /// Sort children recursively: descending time, then function, then location
    pub fn sort(&mut self) {
        self.children.sort_by(compare_frames);
        for child in &mut self.children {
            child.sort();
        }
    }

    /// Time spent in this frame and not in any child
    pub fn self_time_us(&self) -> u64 {
        let children: u64 = self.children.iter().map(|c| c.time_us).sum();
        self.time_us.saturating_sub(children)
    }

    /// Number of frames in this subtree, including `self`
    pub fn frame_count(&self) -> usize {
        1 + self.children.iter().map(Frame::frame_count).sum::<usize>()
    }

    /// Time in seconds, for display
    pub fn time_secs(&self) -> f64 {
        self.time_us as f64 / 1_000_000.0
    }
}

fn compare_frames(a: &Frame, b: &Frame) -> Ordering {
    b.time_us
        .cmp(&a.time_us)
        .then_with(|| a.function.cmp(&b.function))
        .then_with(|| a.location.cmp(&b.location))
}
