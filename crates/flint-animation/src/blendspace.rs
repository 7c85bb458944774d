//! Blend spaces (C, §4.3): sampling a 1-D or 2-D collection of clips at a
//! point, with every clip time-synchronized to the same normalized time so
//! cycles stay phase-locked (see the rationale in §4.3).

use crate::blend::blend;
use crate::clip::{sample_clip, AnimClip};
use crate::skeleton::{Pose, Skeleton};

pub const MAX_BLEND1D_ENTRIES: usize = 8;
pub const MAX_BLEND2D_ENTRIES: usize = 16;

/// Degenerate-triangle / zero-range guard, shared with the state evaluator's
/// zero-duration guard (§9 float epsilons).
const EPSILON: f32 = 1e-6;

#[derive(Debug, Clone)]
pub struct BlendSpace1DEntry {
    pub position: f32,
    pub clip_index: usize,
}

/// Entries must be sorted by `position` ascending (§3.6 invariant) — the
/// builder is responsible for sorting on insertion; this type assumes it.
#[derive(Debug, Clone, Default)]
pub struct BlendSpace1D {
    pub entries: Vec<BlendSpace1DEntry>,
}

impl BlendSpace1D {
    /// Weighted average of the clip durations bracketing `param`, used by
    /// the state evaluator (D) as the blend state's effective duration.
    pub fn effective_duration(&self, clips: &[AnimClip], param: f32) -> f32 {
        match self.entries.len() {
            0 => 0.0,
            1 => clip_duration(clips, self.entries[0].clip_index),
            _ => {
                let (lo, hi, f) = self.bracket(param);
                let d_lo = clip_duration(clips, self.entries[lo].clip_index);
                let d_hi = clip_duration(clips, self.entries[hi].clip_index);
                d_lo + (d_hi - d_lo) * f
            }
        }
    }

    pub fn sample(&self, skeleton: &Skeleton, clips: &[AnimClip], param: f32, normalized_time: f32) -> Pose {
        if self.entries.is_empty() {
            return skeleton.rest_pose();
        }
        if self.entries.len() == 1 {
            return sample_entry(skeleton, clips, self.entries[0].clip_index, normalized_time);
        }

        let (lo, hi, f) = self.bracket(param);
        let pose_lo = sample_entry(skeleton, clips, self.entries[lo].clip_index, normalized_time);
        let pose_hi = sample_entry(skeleton, clips, self.entries[hi].clip_index, normalized_time);
        blend(&pose_lo, &pose_hi, f)
    }

    /// Clamp `param` into range, then find the bracketing pair and the lerp
    /// factor between them (§4.3 steps 1-3).
    fn bracket(&self, param: f32) -> (usize, usize, f32) {
        let n = self.entries.len();
        let clamped = param.clamp(self.entries[0].position, self.entries[n - 1].position);
        for w in 0..n - 1 {
            let (p_lo, p_hi) = (self.entries[w].position, self.entries[w + 1].position);
            if clamped <= p_hi {
                let span = p_hi - p_lo;
                let f = if span > 0.0 { (clamped - p_lo) / span } else { 0.0 };
                return (w, w + 1, f);
            }
        }
        (n - 2, n - 1, 1.0)
    }
}

#[derive(Debug, Clone)]
pub struct BlendSpace2DEntry {
    pub x: f32,
    pub y: f32,
    pub clip_index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct BlendSpace2D {
    pub entries: Vec<BlendSpace2DEntry>,
}

impl BlendSpace2D {
    /// Approximation per §4.4: the first entry's clip duration.
    pub fn effective_duration(&self, clips: &[AnimClip]) -> f32 {
        self.entries.first().map_or(0.0, |e| clip_duration(clips, e.clip_index))
    }

    pub fn sample(&self, skeleton: &Skeleton, clips: &[AnimClip], x: f32, y: f32, normalized_time: f32) -> Pose {
        match self.entries.len() {
            0 => skeleton.rest_pose(),
            1 => sample_entry(skeleton, clips, self.entries[0].clip_index, normalized_time),
            2 => self.sample_two(skeleton, clips, x, y, normalized_time),
            _ => self.sample_triangle(skeleton, clips, x, y, normalized_time),
        }
    }

    fn sample_two(&self, skeleton: &Skeleton, clips: &[AnimClip], x: f32, y: f32, t: f32) -> Pose {
        let a = &self.entries[0];
        let b = &self.entries[1];
        let ax = [a.x, a.y];
        let bx = [b.x, b.y];
        let seg = [bx[0] - ax[0], bx[1] - ax[1]];
        let len_sq = seg[0] * seg[0] + seg[1] * seg[1];
        let f = if len_sq > EPSILON {
            let to_point = [x - ax[0], y - ax[1]];
            ((to_point[0] * seg[0] + to_point[1] * seg[1]) / len_sq).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let pose_a = sample_entry(skeleton, clips, a.clip_index, t);
        let pose_b = sample_entry(skeleton, clips, b.clip_index, t);
        blend(&pose_a, &pose_b, f)
    }

    fn sample_triangle(&self, skeleton: &Skeleton, clips: &[AnimClip], x: f32, y: f32, t: f32) -> Pose {
        let tri = self.nearest_three(x, y);
        let (i0, i1, i2) = tri;
        let p0 = (self.entries[i0].x, self.entries[i0].y);
        let p1 = (self.entries[i1].x, self.entries[i1].y);
        let p2 = (self.entries[i2].x, self.entries[i2].y);

        let det = (p1.0 - p0.0) * (p2.1 - p0.1) - (p2.0 - p0.0) * (p1.1 - p0.1);
        let (w0, w1, w2) = if det.abs() < EPSILON {
            inverse_distance_weights(x, y, p0, p1, p2)
        } else {
            let w1 = ((p2.1 - p0.1) * (x - p0.0) + (p0.0 - p2.0) * (y - p0.1)) / det;
            let w2 = ((p0.1 - p1.1) * (x - p0.0) + (p1.0 - p0.0) * (y - p0.1)) / det;
            let w0 = 1.0 - w1 - w2;
            let (w0, w1, w2) = (w0.max(0.0), w1.max(0.0), w2.max(0.0));
            if w0 + w1 + w2 < EPSILON {
                inverse_distance_weights(x, y, p0, p1, p2)
            } else {
                let sum = w0 + w1 + w2;
                (w0 / sum, w1 / sum, w2 / sum)
            }
        };

        let pose0 = sample_entry(skeleton, clips, self.entries[i0].clip_index, t);
        let pose1 = sample_entry(skeleton, clips, self.entries[i1].clip_index, t);
        let pose2 = sample_entry(skeleton, clips, self.entries[i2].clip_index, t);

        if w0 + w1 < EPSILON {
            return pose2;
        }
        let tmp = blend(&pose0, &pose1, w1 / (w0 + w1));
        blend(&tmp, &pose2, w2)
    }

    /// Hand-rolled partial selection of the three nearest entries by squared
    /// distance — deliberately not a stable full sort (§9 open question:
    /// ties are not guaranteed to resolve deterministically).
    fn nearest_three(&self, x: f32, y: f32) -> (usize, usize, usize) {
        let mut best: [(f32, usize); 3] = [(f32::MAX, 0), (f32::MAX, 0), (f32::MAX, 0)];
        for (i, e) in self.entries.iter().enumerate() {
            let dx = e.x - x;
            let dy = e.y - y;
            let dist = dx * dx + dy * dy;
            if dist < best[0].0 {
                best[2] = best[1];
                best[1] = best[0];
                best[0] = (dist, i);
            } else if dist < best[1].0 {
                best[2] = best[1];
                best[1] = (dist, i);
            } else if dist < best[2].0 {
                best[2] = (dist, i);
            }
        }
        (best[0].1, best[1].1, best[2].1)
    }
}

fn inverse_distance_weights(x: f32, y: f32, p0: (f32, f32), p1: (f32, f32), p2: (f32, f32)) -> (f32, f32, f32) {
    let inv = |p: (f32, f32)| -> f32 {
        let d = ((p.0 - x).powi(2) + (p.1 - y).powi(2)).sqrt();
        1.0 / d.max(EPSILON)
    };
    let (w0, w1, w2) = (inv(p0), inv(p1), inv(p2));
    let sum = w0 + w1 + w2;
    (w0 / sum, w1 / sum, w2 / sum)
}

fn clip_duration(clips: &[AnimClip], clip_index: usize) -> f32 {
    clips.get(clip_index).map_or(1.0, |c| c.duration)
}

fn sample_entry(skeleton: &Skeleton, clips: &[AnimClip], clip_index: usize, normalized_time: f32) -> Pose {
    match clips.get(clip_index) {
        Some(clip) => sample_clip(skeleton, clip, normalized_time * clip.duration),
        None => skeleton.rest_pose(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::Channel;
    use crate::math::{IDENTITY_MAT4, IDENTITY_QUAT};
    use crate::skeleton::Joint;

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

    fn static_translation_clip(name: &str, t: [f32; 3], duration: f32) -> AnimClip {
        use crate::clip::{ChannelTarget, Interpolation, Keyframe};
        AnimClip {
            name: name.into(),
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

    #[test]
    fn one_d_blend_synchronizes_time_and_interpolates() {
        let skel = skeleton();
        let clips = vec![
            static_translation_clip("walk", [0.0, 0.0, 0.0], 1.0),
            static_translation_clip("run", [0.0, 1.0, 0.0], 1.0),
        ];
        let space = BlendSpace1D {
            entries: vec![
                BlendSpace1DEntry { position: 0.0, clip_index: 0 },
                BlendSpace1DEntry { position: 1.0, clip_index: 1 },
            ],
        };
        let pose = space.sample(&skel, &clips, 0.5, 0.25);
        assert!((pose.translation[0][1] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn two_d_with_two_entries_projects_onto_segment() {
        let skel = skeleton();
        let clips = vec![
            static_translation_clip("a", [0.0, 0.0, 0.0], 1.0),
            static_translation_clip("b", [10.0, 0.0, 0.0], 1.0),
        ];
        let space = BlendSpace2D {
            entries: vec![
                BlendSpace2DEntry { x: 0.0, y: 0.0, clip_index: 0 },
                BlendSpace2DEntry { x: 1.0, y: 0.0, clip_index: 1 },
            ],
        };
        let pose = space.sample(&skel, &clips, 0.5, 0.0, 0.0);
        assert!((pose.translation[0][0] - 5.0).abs() < 1e-4);
    }

    #[test]
    fn zero_entries_yields_rest() {
        let skel = skeleton();
        let space = BlendSpace2D::default();
        let pose = space.sample(&skel, &[], 0.0, 0.0, 0.0);
        assert_eq!(pose.translation[0], [0.0; 3]);
    }
}
