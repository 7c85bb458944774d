//! Skeleton (input data) and local-space `Pose` (intermediate data).
//!
//! A skeleton is capped at [`MAX_JOINTS`] joints. `Pose` mirrors that cap with
//! fixed-size arrays rather than per-joint `Vec`s: at 128 joints a pose is the
//! ~4 KB the reference implementation budgets for one, and because the arrays
//! live inline (no heap allocation), a `Pose` is plain `Copy` data. That is
//! what lets the state machine and compositor hold several poses at once
//! without fighting the borrow checker over a shared scratch buffer — see
//! `pool.rs` for how the per-frame budget is still enforced.

use crate::math::{trs_to_mat4, IDENTITY_MAT4, IDENTITY_QUAT, Mat4, Quat, Vec3};

/// Hard cap on joints per skeleton (§3.1).
pub const MAX_JOINTS: usize = 128;

/// One joint in a [`Skeleton`].
#[derive(Debug, Clone)]
pub struct Joint {
    pub name: String,
    /// Index of the parent joint, or `None` for a root. Topological
    /// invariant: `parent < self_index` whenever `Some`.
    pub parent: Option<usize>,
    pub inverse_bind: Mat4,
    pub rest_translation: Vec3,
    pub rest_rotation: Quat,
    pub rest_scale: Vec3,
}

/// An ordered, topologically-sorted joint hierarchy plus rest pose and the
/// root transform applied above joints with no parent.
#[derive(Debug, Clone)]
pub struct Skeleton {
    pub joints: Vec<Joint>,
    pub root_transform: Mat4,
}

impl Skeleton {
    /// Build a skeleton, validating the topological-order invariant
    /// (`parent[j] < j`) and the joint-count cap.
    ///
    /// Returns `None` if either invariant is violated — this crate treats
    /// skeleton construction as import-time validation (the glTF pipeline's
    /// job, out of scope here), not a runtime concern the graph has to guard
    /// against on every frame.
    pub fn new(joints: Vec<Joint>, root_transform: Mat4) -> Option<Self> {
        if joints.len() > MAX_JOINTS {
            return None;
        }
        for (j, joint) in joints.iter().enumerate() {
            if let Some(p) = joint.parent {
                if p >= j {
                    return None;
                }
            }
        }
        Some(Self {
            joints,
            root_transform,
        })
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn rest_pose(&self) -> Pose {
        let mut pose = Pose::new(self.joint_count());
        for (j, joint) in self.joints.iter().enumerate() {
            pose.translation[j] = joint.rest_translation;
            pose.rotation[j] = joint.rest_rotation;
            pose.scale[j] = joint.rest_scale;
        }
        pose
    }
}

/// A local-space pose: one translation, rotation, and scale per joint.
///
/// Fixed-capacity and `Copy` — see the module doc for why. `joint_count` is
/// the number of *active* entries; slots beyond it hold stale or default
/// data and must not be read.
#[derive(Debug, Clone, Copy)]
pub struct Pose {
    pub joint_count: usize,
    pub translation: [Vec3; MAX_JOINTS],
    pub rotation: [Quat; MAX_JOINTS],
    pub scale: [Vec3; MAX_JOINTS],
}

impl Pose {
    /// A pose of `joint_count` joints, all at the identity transform.
    pub fn new(joint_count: usize) -> Self {
        Self {
            joint_count: joint_count.min(MAX_JOINTS),
            translation: [[0.0; 3]; MAX_JOINTS],
            rotation: [IDENTITY_QUAT; MAX_JOINTS],
            scale: [[1.0; 3]; MAX_JOINTS],
        }
    }

    pub fn from_rest(skeleton: &Skeleton) -> Self {
        skeleton.rest_pose()
    }

    pub fn copy_from(&mut self, src: &Pose) {
        *self = *src;
    }

    pub fn joints(&self) -> std::ops::Range<usize> {
        0..self.joint_count
    }

    pub fn local_matrix(&self, j: usize) -> Mat4 {
        trs_to_mat4(self.translation[j], self.rotation[j], self.scale[j])
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(0)
    }
}

/// A flat array of skinning matrices (`world_joint * inverse_bind`) for every
/// joint, ready to upload for GPU skinning. Also fixed-capacity/`Copy` for
/// the same reasons as [`Pose`].
#[derive(Debug, Clone, Copy)]
pub struct SkinningMatrices {
    pub joint_count: usize,
    pub matrices: [Mat4; MAX_JOINTS],
}

impl SkinningMatrices {
    pub fn identity(joint_count: usize) -> Self {
        Self {
            joint_count: joint_count.min(MAX_JOINTS),
            matrices: [IDENTITY_MAT4; MAX_JOINTS],
        }
    }

    pub fn as_slice(&self) -> &[Mat4] {
        &self.matrices[..self.joint_count]
    }
}

/// Forward sweep: local pose -> world transforms -> skinning matrices.
///
/// Relies on §3.1's topological invariant (`parent[j] < j`) to compute each
/// joint's world transform in a single linear pass with no recursion.
pub fn skin(skeleton: &Skeleton, pose: &Pose) -> SkinningMatrices {
    let count = skeleton.joint_count().min(pose.joint_count);
    let mut world = [IDENTITY_MAT4; MAX_JOINTS];
    let mut out = SkinningMatrices::identity(count);

    for j in 0..count {
        let local = pose.local_matrix(j);
        world[j] = match skeleton.joints[j].parent {
            Some(p) => mat4_mul_ref(&world[p], &local),
            None => mat4_mul_ref(&skeleton.root_transform, &local),
        };
        out.matrices[j] = mat4_mul_ref(&world[j], &skeleton.joints[j].inverse_bind);
    }
    out
}

fn mat4_mul_ref(a: &Mat4, b: &Mat4) -> Mat4 {
    crate::math::mat4_mul(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joint(parent: Option<usize>) -> Joint {
        Joint {
            name: String::new(),
            parent,
            inverse_bind: IDENTITY_MAT4,
            rest_translation: [0.0; 3],
            rest_rotation: IDENTITY_QUAT,
            rest_scale: [1.0; 3],
        }
    }

    #[test]
    fn rejects_non_topological_parent() {
        let joints = vec![joint(Some(1)), joint(None)];
        assert!(Skeleton::new(joints, IDENTITY_MAT4).is_none());
    }

    #[test]
    fn rejects_oversized_skeleton() {
        let joints = vec![joint(None); MAX_JOINTS + 1];
        assert!(Skeleton::new(joints, IDENTITY_MAT4).is_none());
    }

    #[test]
    fn identity_skeleton_skins_to_identity() {
        let joints = vec![joint(None), joint(Some(0))];
        let skel = Skeleton::new(joints, IDENTITY_MAT4).unwrap();
        let pose = skel.rest_pose();
        let skinned = skin(&skel, &pose);
        for m in skinned.as_slice() {
            assert_eq!(*m, IDENTITY_MAT4);
        }
    }

    #[test]
    fn translation_accumulates_down_the_chain() {
        let mut root = joint(None);
        root.rest_translation = [1.0, 0.0, 0.0];
        let mut child = joint(Some(0));
        child.rest_translation = [0.0, 2.0, 0.0];
        let skel = Skeleton::new(vec![root, child], IDENTITY_MAT4).unwrap();
        let pose = skel.rest_pose();
        let skinned = skin(&skel, &pose);
        assert!((skinned.matrices[1][3][0] - 1.0).abs() < 1e-6);
        assert!((skinned.matrices[1][3][1] - 2.0).abs() < 1e-6);
    }
}
