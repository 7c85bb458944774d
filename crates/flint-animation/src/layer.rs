//! Layer state machine (E, §4.5): transitions, exit time, condition
//! evaluation, crossfade blending, and event firing, advanced independently
//! per layer each frame.

use std::fmt;
use std::sync::Arc;

use crate::blend::blend;
use crate::clip::AnimClip;
use crate::events::{advance_clamped_clock, advance_looping_clock};
use crate::mask::BoneMask;
use crate::params::ParamTable;
use crate::pool::ScratchPool;
use crate::skeleton::{Pose, Skeleton};
use crate::state::State;

pub const MAX_TRANSITIONS_PER_LAYER: usize = 32;
pub const MAX_CONDITIONS_PER_TRANSITION: usize = 4;
pub const MAX_LAYERS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Override,
    Additive,
}

/// A float comparison, bool check, or opaque callback (§3.6). Six closed
/// variants — matched exhaustively rather than modeled with inheritance, per
/// §9's design note.
#[derive(Clone)]
pub enum Condition {
    FloatGreater(usize, f32),
    FloatLess(usize, f32),
    FloatGreaterEqual(usize, f32),
    FloatLessEqual(usize, f32),
    BoolTrue(usize),
    BoolFalse(usize),
    Callback(Arc<dyn Fn(&ParamTable) -> bool + Send + Sync>),
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::FloatGreater(i, v) => write!(f, "FloatGreater({i}, {v})"),
            Condition::FloatLess(i, v) => write!(f, "FloatLess({i}, {v})"),
            Condition::FloatGreaterEqual(i, v) => write!(f, "FloatGreaterEqual({i}, {v})"),
            Condition::FloatLessEqual(i, v) => write!(f, "FloatLessEqual({i}, {v})"),
            Condition::BoolTrue(i) => write!(f, "BoolTrue({i})"),
            Condition::BoolFalse(i) => write!(f, "BoolFalse({i})"),
            Condition::Callback(_) => write!(f, "Callback(..)"),
        }
    }
}

impl Condition {
    fn evaluate(&self, params: &ParamTable) -> bool {
        match self {
            Condition::FloatGreater(i, v) => params.get_float(*i) > *v,
            Condition::FloatLess(i, v) => params.get_float(*i) < *v,
            Condition::FloatGreaterEqual(i, v) => params.get_float(*i) >= *v,
            Condition::FloatLessEqual(i, v) => params.get_float(*i) <= *v,
            Condition::BoolTrue(i) => params.get_bool(*i),
            Condition::BoolFalse(i) => !params.get_bool(*i),
            Condition::Callback(f) => f(params),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub source: usize,
    pub target: usize,
    pub duration: f32,
    pub exit_time: Option<f32>,
    pub conditions: Vec<Condition>,
}

impl Transition {
    /// A transition with zero conditions never fires (§3.6, invariant 10 —
    /// deliberate, prevents accidentally-spontaneous edges).
    fn is_satisfied(&self, source_normalized_time: f32, params: &ParamTable) -> bool {
        if self.conditions.is_empty() {
            return false;
        }
        if let Some(exit_time) = self.exit_time {
            if source_normalized_time < exit_time {
                return false;
            }
        }
        self.conditions.iter().all(|c| c.evaluate(params))
    }
}

/// Shared, immutable layer shape (§3.6).
#[derive(Debug, Clone)]
pub struct LayerDef {
    pub blend_mode: BlendMode,
    pub weight: f32,
    pub bone_mask: Option<BoneMask>,
    pub states: Vec<State>,
    pub default_state_index: usize,
    pub transitions: Vec<Transition>,
}

/// Per-instance, mutable layer state (§3.7).
#[derive(Debug, Clone)]
pub struct LayerRuntime {
    pub current_state: usize,
    pub state_time: f32,
    pub transitioning: Option<TransitionRuntime>,
}

#[derive(Debug, Clone)]
pub struct TransitionRuntime {
    pub prev_state: usize,
    pub prev_state_time: f32,
    pub transition_elapsed: f32,
    pub transition_duration: f32,
}

impl LayerRuntime {
    pub fn new(default_state_index: usize) -> Self {
        Self {
            current_state: default_state_index,
            state_time: 0.0,
            transitioning: None,
        }
    }

    /// Run one frame of the layer's cycle: transition selection, time
    /// advance, pose evaluation, event firing (§4.5 steps 1-4). Returns the
    /// layer's contribution for this frame.
    #[allow(clippy::too_many_arguments)]
    pub fn advance(
        &mut self,
        def: &LayerDef,
        skeleton: &Skeleton,
        clips: &[AnimClip],
        params: &ParamTable,
        dt: f32,
        pool: &mut ScratchPool,
        mut on_event: impl FnMut(u32, &str),
    ) -> Pose {
        if def.states.is_empty() {
            return skeleton.rest_pose();
        }

        // 1. Transition selection.
        if self.transitioning.is_none() {
            if let Some(state) = def.states.get(self.current_state) {
                let duration = state.effective_duration(clips, params);
                let normalized = state.normalized_time(self.state_time, duration);
                for t in &def.transitions {
                    if t.source != self.current_state {
                        continue;
                    }
                    if t.is_satisfied(normalized, params) {
                        self.transitioning = Some(TransitionRuntime {
                            prev_state: self.current_state,
                            prev_state_time: self.state_time,
                            transition_elapsed: 0.0,
                            transition_duration: t.duration,
                        });
                        self.current_state = t.target;
                        self.state_time = 0.0;
                        break;
                    }
                }
            }
        }

        // 2. Time advance + event firing for the current state.
        let cur_pose = advance_state(def, self.current_state, &mut self.state_time, dt, skeleton, clips, params, &mut on_event);

        let layer_pose = if let Some(tr) = &mut self.transitioning {
            // The outgoing clip keeps playing through the crossfade, advanced
            // with its own speed and loop flag.
            let prev_pose = advance_state(def, tr.prev_state, &mut tr.prev_state_time, dt, skeleton, clips, params, &mut on_event);

            // `f` reflects elapsed time *before* this frame's dt so the frame
            // a transition fires yields factor 0, not a frame-early jump.
            let f = if tr.transition_duration > 0.0 {
                (tr.transition_elapsed / tr.transition_duration).clamp(0.0, 1.0)
            } else {
                1.0
            };
            let blended = blend_or_fallback(pool, &prev_pose, &cur_pose, f);
            tr.transition_elapsed += dt;
            if f >= 1.0 {
                self.transitioning = None;
            }
            blended
        } else {
            cur_pose
        };

        layer_pose
    }
}

fn blend_or_fallback(pool: &mut ScratchPool, a: &Pose, b: &Pose, f: f32) -> Pose {
    match pool.acquire_pose(a.joint_count.max(b.joint_count)) {
        Some(_) => blend(a, b, f),
        None => {
            eprintln!("flint-animation: scratch pool exhausted during crossfade blend, falling back to target pose");
            *b
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn advance_state(
    def: &LayerDef,
    state_index: usize,
    state_time: &mut f32,
    dt: f32,
    skeleton: &Skeleton,
    clips: &[AnimClip],
    params: &ParamTable,
    on_event: &mut impl FnMut(u32, &str),
) -> Pose {
    let Some(state) = def.states.get(state_index) else {
        eprintln!("flint-animation: layer references out-of-range state {state_index}, falling back to rest pose");
        return skeleton.rest_pose();
    };

    let duration = state.effective_duration(clips, params);
    let delta = dt * state.speed();
    let prev_time = *state_time;

    *state_time = if state.looping() {
        advance_looping_clock(&state.events, prev_time, delta, duration, |e| on_event(e.event_id, &e.name))
    } else {
        advance_clamped_clock(&state.events, prev_time, delta, duration, |e| on_event(e.event_id, &e.name))
    };

    state.evaluate(skeleton, clips, params, *state_time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::{Channel, ChannelTarget, Interpolation, Keyframe};
    use crate::math::{IDENTITY_MAT4, IDENTITY_QUAT};
    use crate::params::{ParamDef, ParamKind, ParamValue};
    use crate::skeleton::{Joint, Skeleton};
    use crate::state::{ClipState, StateKind};

    fn skeleton() -> Skeleton {
        let joint = Joint {
            name: "root".into(),
            parent: None,
            inverse_bind: IDENTITY_MAT4,
            rest_translation: [0.0; 3],
            rest_rotation: IDENTITY_QUAT,
            rest_scale: [1.0; 3],
        };
        Skeleton::new(vec![joint], IDENTITY_MAT4).unwrap()
    }

    fn static_clip(t: [f32; 3]) -> AnimClip {
        AnimClip {
            name: "c".into(),
            duration: 1.0,
            channels: vec![Channel {
                joint: 0,
                target: ChannelTarget::Translation,
                interpolation: Interpolation::Step,
                keyframes: vec![Keyframe { time: 0.0, in_tangent: None, value: t.to_vec(), out_tangent: None }],
            }],
            events: vec![],
        }
    }

    #[test]
    fn transition_with_zero_conditions_never_fires() {
        let skel = skeleton();
        let clips = vec![static_clip([1.0, 0.0, 0.0]), static_clip([-1.0, 0.0, 0.0])];
        let def = LayerDef {
            blend_mode: BlendMode::Override,
            weight: 1.0,
            bone_mask: None,
            states: vec![
                State { kind: StateKind::Clip(ClipState { clip_index: 0, speed: 1.0, looping: true }), events: vec![] },
                State { kind: StateKind::Clip(ClipState { clip_index: 1, speed: 1.0, looping: true }), events: vec![] },
            ],
            default_state_index: 0,
            transitions: vec![Transition { source: 0, target: 1, duration: 0.1, exit_time: None, conditions: vec![] }],
        };
        let params = ParamTable::from_defaults(&[]);
        let mut pool = ScratchPool::for_layer_count(1);
        let mut runtime = LayerRuntime::new(0);
        let pose = runtime.advance(&def, &skel, &clips, &params, 10.0, &mut pool, |_, _| {});
        assert!((pose.translation[0][0] - 1.0).abs() < 1e-5);
        assert!(runtime.transitioning.is_none());
    }

    #[test]
    fn crossfade_reaches_target_and_clears_flag() {
        let skel = skeleton();
        let clips = vec![static_clip([1.0, 0.0, 0.0]), static_clip([-1.0, 0.0, 0.0])];
        let defs = vec![ParamDef { name: "go".into(), kind: ParamKind::Bool, default: ParamValue::Bool(false) }];
        let mut params = ParamTable::from_defaults(&defs);
        let def = LayerDef {
            blend_mode: BlendMode::Override,
            weight: 1.0,
            bone_mask: None,
            states: vec![
                State { kind: StateKind::Clip(ClipState { clip_index: 0, speed: 1.0, looping: true }), events: vec![] },
                State { kind: StateKind::Clip(ClipState { clip_index: 1, speed: 1.0, looping: true }), events: vec![] },
            ],
            default_state_index: 0,
            transitions: vec![Transition {
                source: 0,
                target: 1,
                duration: 0.4,
                exit_time: None,
                conditions: vec![Condition::BoolTrue(0)],
            }],
        };
        let mut pool = ScratchPool::for_layer_count(1);
        let mut runtime = LayerRuntime::new(0);

        let p1 = runtime.advance(&def, &skel, &clips, &params, 0.0, &mut pool, |_, _| {});
        assert!((p1.translation[0][0] - 1.0).abs() < 1e-5);

        params.set_bool_by_name("go", true);
        let p2 = runtime.advance(&def, &skel, &clips, &params, 0.2, &mut pool, |_, _| {});
        assert!((p2.translation[0][0] - 1.0).abs() < 1e-4); // factor ~0 right after firing

        let p3 = runtime.advance(&def, &skel, &clips, &params, 0.2, &mut pool, |_, _| {});
        assert!((p3.translation[0][0] - 0.0).abs() < 1e-4); // factor ~0.5

        let p4 = runtime.advance(&def, &skel, &clips, &params, 0.2, &mut pool, |_, _| {});
        assert!((p4.translation[0][0] - (-1.0)).abs() < 1e-4);
        assert!(runtime.transitioning.is_none());
    }
}
