//! Scratch pool (§5 ambient stack): the Rust rendering of the reference's
//! per-frame bump arena.
//!
//! `Pose` and `SkinningMatrices` are fixed-capacity `Copy` values (see
//! `skeleton.rs`) — they carry no heap allocation of their own, so the pool
//! below doesn't actually need to hand out borrowed storage to avoid heap
//! traffic. What it still does, faithfully, is enforce the reference's
//! *capacity* discipline: a bounded number of poses/matrix-sets may be
//! acquired per frame, `reset()` brings that count back to zero, and
//! exceeding the budget returns `None` rather than growing — exactly the
//! "fixed-capacity, push-only, reset between frames, never grows" contract
//! described in the spec, with `Option::None` standing in for the bump
//! allocator's out-of-memory signal.

use crate::skeleton::{Pose, SkinningMatrices};

#[derive(Debug)]
pub struct ScratchPool {
    pose_capacity: usize,
    poses_used: usize,
    matrix_capacity: usize,
    matrices_used: usize,
}

impl ScratchPool {
    pub fn new(pose_capacity: usize, matrix_capacity: usize) -> Self {
        Self {
            pose_capacity,
            poses_used: 0,
            matrix_capacity,
            matrices_used: 0,
        }
    }

    /// A reasonable default sized for up to four layers, each transiently
    /// needing a handful of poses per frame (§9 design notes' "four to six
    /// poses plus two matrix arrays").
    pub fn for_layer_count(layer_count: usize) -> Self {
        Self::new(layer_count.max(1) * 6 + 4, 2)
    }

    pub fn reset(&mut self) {
        self.poses_used = 0;
        self.matrices_used = 0;
    }

    /// Returns `None` once the per-frame pose budget is exhausted; callers
    /// fall back to the skeleton's rest pose (§4.5, §4.6, §7).
    pub fn acquire_pose(&mut self, joint_count: usize) -> Option<Pose> {
        if self.poses_used >= self.pose_capacity {
            return None;
        }
        self.poses_used += 1;
        Some(Pose::new(joint_count))
    }

    pub fn acquire_matrices(&mut self, joint_count: usize) -> Option<SkinningMatrices> {
        if self.matrices_used >= self.matrix_capacity {
            return None;
        }
        self.matrices_used += 1;
        Some(SkinningMatrices::identity(joint_count))
    }

    pub fn poses_used(&self) -> usize {
        self.poses_used
    }
}
