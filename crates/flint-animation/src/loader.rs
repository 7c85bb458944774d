//! TOML-based animation clip loading

use crate::clip::AnimClip;
use flint_core::{FlintError, Result};
use std::path::Path;

/// Load an animation clip from a `.anim.toml` file.
///
/// The file format mirrors the `AnimClip` struct:
/// ```toml
/// name = "walk"
/// duration = 1.0
///
/// [[channels]]
/// joint = 0
/// target = "Translation"
/// interpolation = "Linear"
///
/// [[channels.keyframes]]
/// time = 0.0
/// value = [0.0, 0.0, 0.0]
/// # ...more keyframes
/// ```
pub fn load_clip_from_file(path: &Path) -> Result<AnimClip> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        FlintError::AnimationError(format!("Failed to read {}: {}", path.display(), e))
    })?;
    load_clip_from_str(&content, path)
}

/// Parse an animation clip from a TOML string.
fn load_clip_from_str(content: &str, path: &Path) -> Result<AnimClip> {
    let clip: AnimClip = toml::from_str(content).map_err(|e| {
        FlintError::AnimationError(format!("Failed to parse {}: {}", path.display(), e))
    })?;

    if clip.duration <= 0.0 {
        return Err(FlintError::AnimationError(format!(
            "Clip '{}' has non-positive duration: {}",
            clip.name, clip.duration
        )));
    }

    for (i, channel) in clip.channels.iter().enumerate() {
        if channel.keyframes.is_empty() {
            return Err(FlintError::AnimationError(format!(
                "Clip '{}' channel {} has no keyframes",
                clip.name, i
            )));
        }
    }

    Ok(clip)
}
