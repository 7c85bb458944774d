//! Clip (input, §3.2) and the clip sampler (B, §4.2): evaluating one clip at
//! time `t` into a local-space pose.

use crate::math::{quat_dot, quat_normalize, quat_slerp, vec3_lerp};
use crate::skeleton::{Pose, Skeleton};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelTarget {
    Translation,
    Rotation,
    Scale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Interpolation {
    Step,
    #[default]
    Linear,
    CubicSpline,
}

/// One keyframe's value. `CubicSpline` channels carry tangents; other modes
/// only ever populate `value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f32,
    pub in_tangent: Option<Vec<f32>>,
    pub value: Vec<f32>,
    pub out_tangent: Option<Vec<f32>>,
}

/// Keyframes for one joint's one property. `timestamps` are monotonically
/// increasing (an input invariant — the sampler assumes, never re-checks, it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub joint: usize,
    pub target: ChannelTarget,
    pub interpolation: Interpolation,
    pub keyframes: Vec<Keyframe>,
}

impl Channel {
    fn component_count(&self) -> usize {
        match self.target {
            ChannelTarget::Rotation => 4,
            _ => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimClip {
    pub name: String,
    /// Duration in seconds; the max channel timestamp.
    pub duration: f32,
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub events: Vec<ClipEvent>,
}

/// An authoring-time event attached to a state, fired when playback crosses
/// its `time` (§4.5.4). Events attached to a state are kept sorted by time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipEvent {
    pub time: f32,
    pub event_id: u32,
    pub name: String,
}

/// Evaluate `clip` at `time` into a pose sized for `skeleton`, starting from
/// rest and overriding per-joint components for every channel present.
///
/// Empty clip -> rest pose. Channels targeting an out-of-range joint are
/// skipped (§4.2 edge cases).
pub fn sample_clip(skeleton: &Skeleton, clip: &AnimClip, time: f32) -> Pose {
    let mut pose = skeleton.rest_pose();
    for channel in &clip.channels {
        if channel.joint >= pose.joint_count {
            continue;
        }
        sample_channel_into(channel, time, &mut pose);
    }
    pose
}

fn sample_channel_into(channel: &Channel, time: f32, pose: &mut Pose) {
    let keys = &channel.keyframes;
    if keys.is_empty() {
        return;
    }

    let value = if keys.len() == 1 || time <= keys[0].time {
        sample_slot(&keys[0])
    } else if time >= keys[keys.len() - 1].time {
        sample_slot(&keys[keys.len() - 1])
    } else {
        let k0 = lower_bracket(keys, time);
        let k1 = k0 + 1;
        let span = keys[k1].time - keys[k0].time;
        let f = if span > 0.0 { (time - keys[k0].time) / span } else { 0.0 };
        match channel.interpolation {
            Interpolation::Step => sample_slot(&keys[k0]),
            Interpolation::Linear => interpolate_linear(channel, &keys[k0], &keys[k1], f),
            Interpolation::CubicSpline => interpolate_cubic(channel, &keys[k0], &keys[k1], span, f),
        }
    };

    write_component(pose, channel, &value);
}

/// Binary-search for the lower bracketing keyframe index `k0` such that
/// `timestamps[k0] <= time < timestamps[k0 + 1]`.
fn lower_bracket(keys: &[Keyframe], time: f32) -> usize {
    match keys.binary_search_by(|k| k.time.partial_cmp(&time).unwrap()) {
        Ok(i) => i.min(keys.len() - 2),
        Err(i) => (i - 1).min(keys.len() - 2),
    }
}

fn sample_slot(key: &Keyframe) -> Vec<f32> {
    key.value.clone()
}

fn interpolate_linear(channel: &Channel, k0: &Keyframe, k1: &Keyframe, f: f32) -> Vec<f32> {
    if channel.target == ChannelTarget::Rotation {
        let a = to_quat(&k0.value);
        let b = to_quat(&k1.value);
        quat_slerp(a, b, f).to_vec()
    } else {
        let a = to_vec3(&k0.value);
        let b = to_vec3(&k1.value);
        vec3_lerp(a, b, f).to_vec()
    }
}

fn interpolate_cubic(channel: &Channel, k0: &Keyframe, k1: &Keyframe, dt: f32, f: f32) -> Vec<f32> {
    let n = channel.component_count();
    let p0 = &k0.value;
    let p1 = &k1.value;
    let m0 = k0.out_tangent.as_deref().unwrap_or(&[]);
    let m1 = k1.in_tangent.as_deref().unwrap_or(&[]);

    let f2 = f * f;
    let f3 = f2 * f;
    let h00 = 2.0 * f3 - 3.0 * f2 + 1.0;
    let h10 = f3 - 2.0 * f2 + f;
    let h01 = -2.0 * f3 + 3.0 * f2;
    let h11 = f3 - f2;

    let mut out = vec![0.0f32; n];
    for i in 0..n {
        let p0v = p0.get(i).copied().unwrap_or(0.0);
        let p1v = p1.get(i).copied().unwrap_or(0.0);
        let m0v = m0.get(i).copied().unwrap_or(0.0) * dt;
        let m1v = m1.get(i).copied().unwrap_or(0.0) * dt;
        out[i] = h00 * p0v + h10 * m0v + h01 * p1v + h11 * m1v;
    }

    if channel.target == ChannelTarget::Rotation && out.len() == 4 {
        let q = quat_normalize([out[0], out[1], out[2], out[3]]);
        return q.to_vec();
    }
    out
}

fn write_component(pose: &mut Pose, channel: &Channel, value: &[f32]) {
    let j = channel.joint;
    match channel.target {
        ChannelTarget::Translation => pose.translation[j] = to_vec3(value),
        ChannelTarget::Scale => pose.scale[j] = to_vec3(value),
        ChannelTarget::Rotation => pose.rotation[j] = to_quat(value),
    }
}

fn to_vec3(v: &[f32]) -> [f32; 3] {
    [v.first().copied().unwrap_or(0.0), v.get(1).copied().unwrap_or(0.0), v.get(2).copied().unwrap_or(0.0)]
}

fn to_quat(v: &[f32]) -> [f32; 4] {
    if v.len() >= 4 {
        let q = [v[0], v[1], v[2], v[3]];
        // Guard against malformed/unnormalized fixture data; mirrors the
        // normalization the cubic-spline path always performs.
        if quat_dot(q, q) > 1e-10 {
            q
        } else {
            crate::math::IDENTITY_QUAT
        }
    } else {
        crate::math::IDENTITY_QUAT
    }
}
