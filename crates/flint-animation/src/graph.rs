//! Graph compositor (F, §4.6) and the definition/instance/builder types that
//! tie every other module together into the public API (§6).

use std::sync::Arc;

use crate::blend::{blend, blend_additive, blend_masked};
use crate::blendspace::{BlendSpace1D, BlendSpace1DEntry, BlendSpace2D, BlendSpace2DEntry};
use crate::clip::{AnimClip, ClipEvent};
use crate::layer::{BlendMode, Condition, LayerDef, LayerRuntime, Transition, MAX_CONDITIONS_PER_TRANSITION, MAX_LAYERS, MAX_TRANSITIONS_PER_LAYER};
use crate::mask::BoneMask;
use crate::params::{ParamDef, ParamKind, ParamTable, ParamValue};
use crate::pool::ScratchPool;
use crate::skeleton::{self, Skeleton, SkinningMatrices};
use crate::state::{Blend1DState, Blend2DState, ClipState, State, StateKind, MAX_STATES_PER_LAYER};

/// A skinned mesh's animation-relevant data: the skeleton it's rigged to and
/// the clip table a graph definition's states index into (§3.2, §6).
#[derive(Debug, Clone)]
pub struct SkinnedModel {
    pub mesh_handle: u64,
    pub skeleton: Skeleton,
    pub clips: Vec<AnimClip>,
}

/// The shared, immutable shape of an animation graph: parameters and layers
/// (§3.6). Built once via [`GraphBuilder`] and shared across every instance
/// that plays it through an `Arc`.
#[derive(Debug, Clone)]
pub struct GraphDefinition {
    pub params: Vec<ParamDef>,
    pub layers: Vec<LayerDef>,
}

/// Write-once construction of a [`GraphDefinition`], enforcing the fixed
/// capacities from §3 (layers, states, transitions, conditions, params,
/// blend-space entries) by returning `None` instead of growing past them.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    params: Vec<ParamDef>,
    layers: Vec<LayerDef>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_param(&mut self, name: impl Into<String>, kind: ParamKind, default: ParamValue) -> Option<usize> {
        if self.params.len() >= crate::params::MAX_PARAMS {
            return None;
        }
        self.params.push(ParamDef { name: name.into(), kind, default });
        Some(self.params.len() - 1)
    }

    pub fn add_layer(&mut self, blend_mode: BlendMode, weight: f32, bone_mask: Option<BoneMask>) -> Option<usize> {
        if self.layers.len() >= MAX_LAYERS {
            return None;
        }
        self.layers.push(LayerDef {
            blend_mode,
            weight,
            bone_mask,
            states: Vec::new(),
            default_state_index: 0,
            transitions: Vec::new(),
        });
        Some(self.layers.len() - 1)
    }

    pub fn add_clip_state(&mut self, layer: usize, clip_index: usize, speed: f32, looping: bool) -> Option<usize> {
        let layer = self.layers.get_mut(layer)?;
        if layer.states.len() >= MAX_STATES_PER_LAYER {
            return None;
        }
        layer.states.push(State {
            kind: StateKind::Clip(ClipState { clip_index, speed, looping }),
            events: Vec::new(),
        });
        Some(layer.states.len() - 1)
    }

    pub fn add_blend1d_state(&mut self, layer: usize, entries: Vec<BlendSpace1DEntry>, param_index: usize, speed: f32, looping: bool) -> Option<usize> {
        let layer = self.layers.get_mut(layer)?;
        if layer.states.len() >= MAX_STATES_PER_LAYER || entries.len() > crate::blendspace::MAX_BLEND1D_ENTRIES {
            return None;
        }
        let mut entries = entries;
        entries.sort_by(|a, b| a.position.partial_cmp(&b.position).unwrap());
        layer.states.push(State {
            kind: StateKind::Blend1D(Blend1DState { space: BlendSpace1D { entries }, param_index, speed, looping }),
            events: Vec::new(),
        });
        Some(layer.states.len() - 1)
    }

    pub fn add_blend2d_state(&mut self, layer: usize, entries: Vec<BlendSpace2DEntry>, param_x_index: usize, param_y_index: usize, speed: f32, looping: bool) -> Option<usize> {
        let layer = self.layers.get_mut(layer)?;
        if layer.states.len() >= MAX_STATES_PER_LAYER || entries.len() > crate::blendspace::MAX_BLEND2D_ENTRIES {
            return None;
        }
        layer.states.push(State {
            kind: StateKind::Blend2D(Blend2DState { space: BlendSpace2D { entries }, param_x_index, param_y_index, speed, looping }),
            events: Vec::new(),
        });
        Some(layer.states.len() - 1)
    }

    pub fn add_event(&mut self, layer: usize, state: usize, time: f32, event_id: u32, name: impl Into<String>) -> Option<()> {
        let layer = self.layers.get_mut(layer)?;
        let state = layer.states.get_mut(state)?;
        state.events.push(ClipEvent { time, event_id, name: name.into() });
        state.events.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap());
        Some(())
    }

    pub fn set_default_state(&mut self, layer: usize, state: usize) -> Option<()> {
        let layer = self.layers.get_mut(layer)?;
        if state >= layer.states.len() {
            return None;
        }
        layer.default_state_index = state;
        Some(())
    }

    pub fn add_transition(&mut self, layer: usize, source: usize, target: usize, duration: f32, exit_time: Option<f32>, conditions: Vec<Condition>) -> Option<usize> {
        let layer = self.layers.get_mut(layer)?;
        if layer.transitions.len() >= MAX_TRANSITIONS_PER_LAYER || conditions.len() > MAX_CONDITIONS_PER_TRANSITION {
            return None;
        }
        layer.transitions.push(Transition { source, target, duration, exit_time, conditions });
        Some(layer.transitions.len() - 1)
    }

    pub fn build(self) -> GraphDefinition {
        GraphDefinition { params: self.params, layers: self.layers }
    }
}

/// A playable instance of a [`GraphDefinition`]: per-instance parameters,
/// per-layer runtime state, and the last computed skinning matrices (§3.7).
pub struct GraphInstance {
    definition: Arc<GraphDefinition>,
    params: ParamTable,
    layers: Vec<LayerRuntime>,
    matrices: SkinningMatrices,
    on_event: Option<Box<dyn FnMut(u32, &str)>>,
}

impl GraphInstance {
    pub fn new(definition: Arc<GraphDefinition>) -> Self {
        let params = ParamTable::from_defaults(&definition.params);
        let layers = definition
            .layers
            .iter()
            .map(|l| LayerRuntime::new(l.default_state_index))
            .collect();
        Self {
            definition,
            params,
            layers,
            matrices: SkinningMatrices::identity(0),
            on_event: None,
        }
    }

    pub fn params(&self) -> &ParamTable {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ParamTable {
        &mut self.params
    }

    /// Events fired this frame are delivered through this callback, in the
    /// order they were crossed (§4.5.4). Re-entrant parameter changes from
    /// inside the callback are not supported — queue them for next frame.
    pub fn set_event_callback(&mut self, callback: impl FnMut(u32, &str) + 'static) {
        self.on_event = Some(Box::new(callback));
    }

    pub fn skinning_matrices(&self) -> &SkinningMatrices {
        &self.matrices
    }

    /// Advance every layer by `dt`, composite their poses, and skin the
    /// result (§4.6's four steps). Falls back to the rest pose's skinning
    /// matrices if the scratch pool is exhausted mid-composite (§7).
    pub fn update(&mut self, model: &SkinnedModel, dt: f32, pool: &mut ScratchPool) {
        pool.reset();

        if self.definition.layers.is_empty() {
            self.matrices = skeleton::skin(&model.skeleton, &model.skeleton.rest_pose());
            return;
        }

        let mut accumulator: Option<crate::skeleton::Pose> = None;
        let callback = &mut self.on_event;

        for (layer_def, runtime) in self.definition.layers.iter().zip(self.layers.iter_mut()) {
            let pose = runtime.advance(layer_def, &model.skeleton, &model.clips, &self.params, dt, pool, |id, name| {
                if let Some(cb) = callback.as_mut() {
                    cb(id, name);
                }
            });

            accumulator = Some(match accumulator {
                None => pose,
                Some(base) => composite_layer(&base, &pose, layer_def, &model.skeleton, pool),
            });
        }

        let final_pose = accumulator.unwrap_or_else(|| model.skeleton.rest_pose());
        self.matrices = match pool.acquire_matrices(model.skeleton.joint_count()) {
            Some(_) => skeleton::skin(&model.skeleton, &final_pose),
            None => {
                eprintln!("flint-animation: scratch pool exhausted computing skinning matrices, falling back to rest pose");
                skeleton::skin(&model.skeleton, &model.skeleton.rest_pose())
            }
        };
    }
}

fn composite_layer(base: &crate::skeleton::Pose, layer_pose: &crate::skeleton::Pose, layer_def: &LayerDef, skeleton: &Skeleton, pool: &mut ScratchPool) -> crate::skeleton::Pose {
    if pool.acquire_pose(skeleton.joint_count()).is_none() {
        eprintln!("flint-animation: scratch pool exhausted compositing layer, layer contribution dropped");
        return *base;
    }
    match layer_def.blend_mode {
        BlendMode::Override => match &layer_def.bone_mask {
            Some(mask) => blend_masked(base, layer_pose, mask, layer_def.weight),
            None => blend(base, layer_pose, layer_def.weight),
        },
        BlendMode::Additive => {
            let reference = skeleton.rest_pose();
            blend_additive(base, layer_pose, &reference, layer_def.bone_mask.as_ref(), layer_def.weight)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::{Channel, ChannelTarget, Interpolation, Keyframe};
    use crate::math::{IDENTITY_MAT4, IDENTITY_QUAT};
    use crate::skeleton::Joint;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn one_joint_skeleton() -> Skeleton {
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

    fn static_translation_clip(t: [f32; 3], duration: f32) -> AnimClip {
        AnimClip {
            name: "clip".into(),
            duration,
            channels: vec![Channel {
                joint: 0,
                target: ChannelTarget::Translation,
                interpolation: Interpolation::Step,
                keyframes: vec![Keyframe { time: 0.0, in_tangent: None, value: t.to_vec(), out_tangent: None }],
            }],
            events: vec![],
        }
    }

    /// S1: Rest passthrough — a graph with no layers skins straight to rest.
    #[test]
    fn s1_rest_passthrough_with_no_layers() {
        let skeleton = one_joint_skeleton();
        let model = SkinnedModel { mesh_handle: 1, skeleton, clips: vec![] };
        let def = Arc::new(GraphDefinition { params: vec![], layers: vec![] });
        let mut instance = GraphInstance::new(def);
        let mut pool = ScratchPool::for_layer_count(1);
        instance.update(&model, 1.0 / 60.0, &mut pool);
        for m in instance.skinning_matrices().as_slice() {
            assert_eq!(*m, IDENTITY_MAT4);
        }
    }

    /// S2: a single looping clip wraps and keeps evaluating past its duration.
    #[test]
    fn s2_single_looping_clip_wraps() {
        let skeleton = one_joint_skeleton();
        let clips = vec![static_translation_clip([1.0, 0.0, 0.0], 1.0)];
        let model = SkinnedModel { mesh_handle: 1, skeleton, clips };
        let mut builder = GraphBuilder::new();
        let layer = builder.add_layer(BlendMode::Override, 1.0, None).unwrap();
        builder.add_clip_state(layer, 0, 1.0, true).unwrap();
        let def = Arc::new(builder.build());
        let mut instance = GraphInstance::new(def);
        let mut pool = ScratchPool::for_layer_count(1);
        instance.update(&model, 1.5, &mut pool);
        instance.update(&model, 1.5, &mut pool);
        // purely a liveness check: multiple wraps across calls must not panic
        // or degrade, and must still resolve to the clip's one constant pose.
        assert_eq!(instance.skinning_matrices().as_slice().len(), 1);
    }

    /// S3: crossfade between two states blends toward the target and then
    /// locks onto it once the transition duration elapses.
    #[test]
    fn s3_crossfade_locks_onto_target() {
        let skeleton = one_joint_skeleton();
        let clips = vec![
            static_translation_clip([0.0, 0.0, 0.0], 1.0),
            static_translation_clip([4.0, 0.0, 0.0], 1.0),
        ];
        let model = SkinnedModel { mesh_handle: 1, skeleton, clips };
        let mut builder = GraphBuilder::new();
        let go = builder.add_param("go", ParamKind::Bool, ParamValue::Bool(false)).unwrap();
        let layer = builder.add_layer(BlendMode::Override, 1.0, None).unwrap();
        builder.add_clip_state(layer, 0, 1.0, true).unwrap();
        builder.add_clip_state(layer, 1, 1.0, true).unwrap();
        builder.add_transition(layer, 0, 1, 0.5, None, vec![Condition::BoolTrue(go)]).unwrap();
        let def = Arc::new(builder.build());
        let mut instance = GraphInstance::new(def);
        let mut pool = ScratchPool::for_layer_count(1);

        instance.update(&model, 0.0, &mut pool);
        instance.params_mut().set_bool(go, true);
        instance.update(&model, 0.5, &mut pool);
        instance.update(&model, 0.5, &mut pool);

        let m = &instance.skinning_matrices().as_slice()[0];
        assert!((m[3][0] - 4.0).abs() < 1e-3);
    }

    /// S5: an additive upper-body layer composes on top of a looping base
    /// layer without perturbing joints the bone mask excludes.
    #[test]
    fn s5_bone_mask_excludes_base_joint() {
        let joints = vec![
            Joint { name: "root".into(), parent: None, inverse_bind: IDENTITY_MAT4, rest_translation: [0.0; 3], rest_rotation: IDENTITY_QUAT, rest_scale: [1.0; 3] },
            Joint { name: "arm".into(), parent: Some(0), inverse_bind: IDENTITY_MAT4, rest_translation: [0.0; 3], rest_rotation: IDENTITY_QUAT, rest_scale: [1.0; 3] },
        ];
        let skeleton = Skeleton::new(joints, IDENTITY_MAT4).unwrap();
        let base_clip = AnimClip {
            name: "base".into(),
            duration: 1.0,
            channels: vec![Channel {
                joint: 0,
                target: ChannelTarget::Translation,
                interpolation: Interpolation::Step,
                keyframes: vec![Keyframe { time: 0.0, in_tangent: None, value: vec![1.0, 0.0, 0.0], out_tangent: None }],
            }],
            events: vec![],
        };
        let wave_clip = AnimClip {
            name: "wave".into(),
            duration: 1.0,
            channels: vec![Channel {
                joint: 1,
                target: ChannelTarget::Translation,
                interpolation: Interpolation::Step,
                keyframes: vec![Keyframe { time: 0.0, in_tangent: None, value: vec![0.0, 5.0, 0.0], out_tangent: None }],
            }],
            events: vec![],
        };
        let model = SkinnedModel { mesh_handle: 1, skeleton: skeleton.clone(), clips: vec![base_clip, wave_clip] };

        let mut builder = GraphBuilder::new();
        let base_layer = builder.add_layer(BlendMode::Override, 1.0, None).unwrap();
        builder.add_clip_state(base_layer, 0, 1.0, true).unwrap();
        let mask = BoneMask::subtree(&skeleton, 1);
        let arm_layer = builder.add_layer(BlendMode::Override, 1.0, Some(mask)).unwrap();
        builder.add_clip_state(arm_layer, 1, 1.0, true).unwrap();
        let def = Arc::new(builder.build());
        let mut instance = GraphInstance::new(def);
        let mut pool = ScratchPool::for_layer_count(2);

        instance.update(&model, 0.0, &mut pool);

        let m = instance.skinning_matrices().as_slice();
        assert!((m[0][3][0] - 1.0).abs() < 1e-4); // root keeps the base layer's motion
        assert!((m[1][3][1] - 5.0).abs() < 1e-4); // arm gets the masked layer's motion
    }

    /// S6: an event attached to a looping state fires once per wrap.
    #[test]
    fn s6_event_fires_across_wrap() {
        let skeleton = one_joint_skeleton();
        let clips = vec![static_translation_clip([0.0; 3], 1.0)];
        let model = SkinnedModel { mesh_handle: 1, skeleton, clips };
        let mut builder = GraphBuilder::new();
        let layer = builder.add_layer(BlendMode::Override, 1.0, None).unwrap();
        let state = builder.add_clip_state(layer, 0, 1.0, true).unwrap();
        builder.add_event(layer, state, 0.1, 42, "footstep").unwrap();
        let def = Arc::new(builder.build());
        let mut instance = GraphInstance::new(def);
        let fired = Rc::new(RefCell::new(0));
        let fired_clone = fired.clone();
        instance.set_event_callback(move |_, _| *fired_clone.borrow_mut() += 1);
        let mut pool = ScratchPool::for_layer_count(1);

        instance.update(&model, 0.6, &mut pool);
        instance.update(&model, 0.6, &mut pool);
        assert_eq!(*fired.borrow(), 2);
    }

    /// S7: an additive layer at weight 0 round-trips the base pose exactly.
    #[test]
    fn s7_additive_zero_weight_round_trips_base() {
        let skeleton = one_joint_skeleton();
        let base_clip = static_translation_clip([3.0, 0.0, 0.0], 1.0);
        let additive_clip = static_translation_clip([9.0, 9.0, 9.0], 1.0);
        let model = SkinnedModel { mesh_handle: 1, skeleton, clips: vec![base_clip, additive_clip] };
        let mut builder = GraphBuilder::new();
        let base_layer = builder.add_layer(BlendMode::Override, 1.0, None).unwrap();
        builder.add_clip_state(base_layer, 0, 1.0, true).unwrap();
        let additive_layer = builder.add_layer(BlendMode::Additive, 0.0, None).unwrap();
        builder.add_clip_state(additive_layer, 1, 1.0, true).unwrap();
        let def = Arc::new(builder.build());
        let mut instance = GraphInstance::new(def);
        let mut pool = ScratchPool::for_layer_count(2);
        instance.update(&model, 0.0, &mut pool);
        let m = &instance.skinning_matrices().as_slice()[0];
        assert!((m[3][0] - 3.0).abs() < 1e-4);
    }
}
