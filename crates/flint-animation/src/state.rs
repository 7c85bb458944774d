//! State evaluator (D, §4.4): dispatches a layer state (clip / 1-D blend /
//! 2-D blend) to the clip sampler or a blend space.

use crate::blendspace::{BlendSpace1D, BlendSpace2D};
use crate::clip::{sample_clip, AnimClip, ClipEvent};
use crate::params::ParamTable;
use crate::skeleton::{Pose, Skeleton};

pub const MAX_STATES_PER_LAYER: usize = 16;

/// Substituted for any non-positive effective duration to avoid division by
/// zero when computing normalized time (§4.4).
const MIN_DURATION: f32 = 1.0;

#[derive(Debug, Clone)]
pub struct ClipState {
    pub clip_index: usize,
    pub speed: f32,
    pub looping: bool,
}

#[derive(Debug, Clone)]
pub struct Blend1DState {
    pub space: BlendSpace1D,
    pub param_index: usize,
    pub speed: f32,
    pub looping: bool,
}

#[derive(Debug, Clone)]
pub struct Blend2DState {
    pub space: BlendSpace2D,
    pub param_x_index: usize,
    pub param_y_index: usize,
    pub speed: f32,
    pub looping: bool,
}

/// A state is a tagged union over its three shapes (§9: sum type, not
/// inheritance — the variant count is closed and each carries different data).
#[derive(Debug, Clone)]
pub enum StateKind {
    Clip(ClipState),
    Blend1D(Blend1DState),
    Blend2D(Blend2DState),
}

#[derive(Debug, Clone)]
pub struct State {
    pub kind: StateKind,
    /// Sorted by time (§3.6 invariant) — the builder sorts on insertion.
    pub events: Vec<ClipEvent>,
}

impl State {
    pub fn speed(&self) -> f32 {
        match &self.kind {
            StateKind::Clip(c) => c.speed,
            StateKind::Blend1D(b) => b.speed,
            StateKind::Blend2D(b) => b.speed,
        }
    }

    pub fn looping(&self) -> bool {
        match &self.kind {
            StateKind::Clip(c) => c.looping,
            StateKind::Blend1D(b) => b.looping,
            StateKind::Blend2D(b) => b.looping,
        }
    }

    /// Effective duration per §4.4, with the zero-duration guard applied.
    pub fn effective_duration(&self, clips: &[AnimClip], params: &ParamTable) -> f32 {
        let raw = match &self.kind {
            StateKind::Clip(c) => clips.get(c.clip_index).map_or(0.0, |clip| clip.duration),
            StateKind::Blend1D(b) => {
                let p = params.get_float(b.param_index);
                b.space.effective_duration(clips, p)
            }
            StateKind::Blend2D(b) => b.space.effective_duration(clips),
        };
        if raw > 0.0 {
            raw
        } else {
            MIN_DURATION
        }
    }

    pub fn normalized_time(&self, state_time: f32, duration: f32) -> f32 {
        if duration > 0.0 {
            (state_time / duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Evaluate this state at `state_time` into a pose. Falls back to rest
    /// if a clip index is out of range of the model's clip table (§4.4, §7).
    pub fn evaluate(&self, skeleton: &Skeleton, clips: &[AnimClip], params: &ParamTable, state_time: f32) -> Pose {
        match &self.kind {
            StateKind::Clip(c) => match clips.get(c.clip_index) {
                Some(clip) => sample_clip(skeleton, clip, state_time),
                None => skeleton.rest_pose(),
            },
            StateKind::Blend1D(b) => {
                let duration = self.effective_duration(clips, params);
                let normalized = state_time / duration;
                let p = params.get_float(b.param_index);
                b.space.sample(skeleton, clips, p, normalized)
            }
            StateKind::Blend2D(b) => {
                let duration = self.effective_duration(clips, params);
                let normalized = state_time / duration;
                let x = params.get_float(b.param_x_index);
                let y = params.get_float(b.param_y_index);
                b.space.sample(skeleton, clips, x, y, normalized)
            }
        }
    }
}
