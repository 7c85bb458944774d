//! Data-driven animation graph runtime for Flint engine.
//!
//! A graph is a fixed set of layers (`graph::GraphDefinition`), each a state
//! machine (`layer::LayerDef`) over clips (`clip::AnimClip`) and blend spaces
//! (`blendspace`), transitioning on parameter-driven conditions
//! (`layer::Condition`). A `graph::GraphInstance` plays a shared
//! `GraphDefinition` against a `graph::SkinnedModel`, producing skinning
//! matrices each frame via `skeleton::skin`.
//!
//! Per-frame scratch usage is bounded by `pool::ScratchPool` rather than
//! growing unbounded heap allocations; joints, states, transitions, layers,
//! and blend-space entries are all capped (see each module) so a graph's
//! memory footprint is knowable ahead of time.

pub mod blend;
pub mod blendspace;
pub mod clip;
pub mod events;
pub mod graph;
pub mod layer;
pub mod loader;
pub mod mask;
pub mod math;
pub mod params;
pub mod pool;
pub mod skeleton;
pub mod state;

pub use blend::{blend, blend_additive, blend_masked};
pub use blendspace::{BlendSpace1D, BlendSpace1DEntry, BlendSpace2D, BlendSpace2DEntry};
pub use clip::{AnimClip, Channel, ChannelTarget, ClipEvent, Interpolation, Keyframe};
pub use graph::{GraphBuilder, GraphDefinition, GraphInstance, SkinnedModel};
pub use layer::{BlendMode, Condition, LayerDef, Transition};
pub use mask::BoneMask;
pub use params::{ParamDef, ParamKind, ParamTable, ParamValue};
pub use pool::ScratchPool;
pub use skeleton::{Joint, Pose, Skeleton, SkinningMatrices};
pub use state::State;
