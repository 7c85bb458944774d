//! Bone masks (§3.5): per-joint weights in `[0, 1]` selecting which joints a
//! layer influences, built from a skeleton by naming a sub-tree root.

use crate::skeleton::Skeleton;

/// A per-joint weight table. Built once from a skeleton and attached to a
/// layer by reference — masks are owned independently of any one layer and
/// may be shared or released separately from the graph that references them.
#[derive(Debug, Clone)]
pub struct BoneMask {
    weights: Vec<f32>,
}

impl BoneMask {
    /// All joints at the given weight (used as a quick test/default fixture).
    pub fn from_weights(weights: Vec<f32>) -> Self {
        Self { weights }
    }

    /// Include `root_joint` and every descendant at weight 1, everything else at 0.
    pub fn subtree(skeleton: &Skeleton, root_joint: usize) -> Self {
        let mut weights = vec![0.0; skeleton.joint_count()];
        mark_subtree(skeleton, root_joint, &mut weights, 1.0);
        Self { weights }
    }

    /// Include everything except `root_joint` and its descendants.
    pub fn excluding_subtree(skeleton: &Skeleton, root_joint: usize) -> Self {
        let mut weights = vec![1.0; skeleton.joint_count()];
        mark_subtree(skeleton, root_joint, &mut weights, 0.0);
        Self { weights }
    }

    pub fn weight(&self, joint: usize) -> f32 {
        self.weights.get(joint).copied().unwrap_or(0.0)
    }
}

fn mark_subtree(skeleton: &Skeleton, root_joint: usize, weights: &mut [f32], value: f32) {
    if root_joint >= weights.len() {
        return;
    }
    weights[root_joint] = value;
    // Joints are topologically ordered (parent < child), so one forward
    // sweep correctly marks every descendant regardless of where it sits
    // relative to `root_joint`.
    for j in (root_joint + 1)..skeleton.joint_count() {
        if let Some(p) = skeleton.joints[j].parent {
            if weights[p] == value {
                weights[j] = value;
            }
        }
    }
}
