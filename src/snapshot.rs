// src/snapshot.rs

use serde::{Deserialize, Serialize};

/// Which animation frames are also written out as PNG files.
///
/// Every frame below `dense_prefix` is kept, then every `stride`-th frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotPolicy {
    pub dense_prefix: usize,
    /// 0 disables the stride rule.
    pub stride: usize,
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        Self {
            dense_prefix: 30,
            stride: 10,
        }
    }
}

impl SnapshotPolicy {
    pub fn should_save(&self, frame: usize) -> bool {
        frame < self.dense_prefix || (self.stride != 0 && frame % self.stride == 0)
    }

    pub fn file_name(frame: usize) -> String {
        format!("frame_{:04}.png", frame)
    }
}
