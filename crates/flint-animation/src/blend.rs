//! Pose algebra (A): lerp/slerp blending, masked blending, additive deltas.
//!
//! All four operations are joint-wise and operate over `pose.joint_count`
//! (callers are expected to pass poses that share the skeleton's joint
//! count — the compositor and state machine always do).

use crate::mask::BoneMask;
use crate::math::{quat_conjugate, quat_dot, quat_mul, quat_normalize, quat_slerp, vec3_lerp, IDENTITY_QUAT};
use crate::skeleton::Pose;

/// Joints with an effective blend weight below this are left untouched
/// rather than blended — avoids both wasted work and NaN from a degenerate
/// slerp between near-identical quaternions at `w ~ 0`.
pub const MASK_EPSILON: f32 = 1e-6;

/// `out = lerp/slerp(a, b, f)`, joint-wise. `f = 0` yields `a`, `f = 1` yields `b`.
pub fn blend(a: &Pose, b: &Pose, f: f32) -> Pose {
    let count = a.joint_count.min(b.joint_count);
    let mut out = Pose::new(count);
    for j in 0..count {
        out.translation[j] = vec3_lerp(a.translation[j], b.translation[j], f);
        out.rotation[j] = blend_rotation(a.rotation[j], b.rotation[j], f);
        out.scale[j] = vec3_lerp(a.scale[j], b.scale[j], f);
    }
    out
}

fn blend_rotation(a: crate::math::Quat, b: crate::math::Quat, f: f32) -> crate::math::Quat {
    let corrected = if quat_dot(a, b) < 0.0 {
        [-b[0], -b[1], -b[2], -b[3]]
    } else {
        b
    };
    quat_slerp(a, corrected, f)
}

/// Per-joint masked blend: joint `j` blends with factor `mask[j] * f`; joints
/// whose effective weight falls below [`MASK_EPSILON`] copy `base` verbatim.
pub fn blend_masked(base: &Pose, overlay: &Pose, mask: &BoneMask, f: f32) -> Pose {
    let count = base.joint_count.min(overlay.joint_count);
    let mut out = Pose::new(count);
    for j in 0..count {
        let w = mask.weight(j) * f;
        if w < MASK_EPSILON {
            out.translation[j] = base.translation[j];
            out.rotation[j] = base.rotation[j];
            out.scale[j] = base.scale[j];
        } else {
            out.translation[j] = vec3_lerp(base.translation[j], overlay.translation[j], w);
            out.rotation[j] = blend_rotation(base.rotation[j], overlay.rotation[j], w);
            out.scale[j] = vec3_lerp(base.scale[j], overlay.scale[j], w);
        }
    }
    out
}

/// Apply the delta of `additive` relative to `reference` onto `base`, scaled
/// by `w` and optionally masked per joint.
pub fn blend_additive(base: &Pose, additive: &Pose, reference: &Pose, mask: Option<&BoneMask>, w: f32) -> Pose {
    let count = base.joint_count.min(additive.joint_count).min(reference.joint_count);
    let mut out = Pose::new(count);
    for j in 0..count {
        let jw = mask.map_or(w, |m| m.weight(j) * w);
        if jw < MASK_EPSILON {
            out.translation[j] = base.translation[j];
            out.rotation[j] = base.rotation[j];
            out.scale[j] = base.scale[j];
            continue;
        }

        let dt = [
            (additive.translation[j][0] - reference.translation[j][0]) * jw,
            (additive.translation[j][1] - reference.translation[j][1]) * jw,
            (additive.translation[j][2] - reference.translation[j][2]) * jw,
        ];
        out.translation[j] = [
            base.translation[j][0] + dt[0],
            base.translation[j][1] + dt[1],
            base.translation[j][2] + dt[2],
        ];

        let ds = [
            (additive.scale[j][0] - reference.scale[j][0]) * jw,
            (additive.scale[j][1] - reference.scale[j][1]) * jw,
            (additive.scale[j][2] - reference.scale[j][2]) * jw,
        ];
        out.scale[j] = [
            base.scale[j][0] + ds[0],
            base.scale[j][1] + ds[1],
            base.scale[j][2] + ds[2],
        ];

        let ref_inv = quat_conjugate(reference.rotation[j]);
        let mut delta = quat_mul(ref_inv, additive.rotation[j]);
        if quat_dot(IDENTITY_QUAT, delta) < 0.0 {
            delta = [-delta[0], -delta[1], -delta[2], -delta[3]];
        }
        let weighted = quat_slerp(IDENTITY_QUAT, delta, jw);
        out.rotation[j] = quat_normalize(quat_mul(base.rotation[j], weighted));
    }
    out
}
