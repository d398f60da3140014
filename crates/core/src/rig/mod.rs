use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Morph target key driven by the lip-sync level.
pub const MOUTH_OPEN_TARGET: &str = "mouthOpen";

/// One renderable part of the avatar mesh together with its morph target
/// dictionary and current influence values. Parts are produced by the external
/// asset loader; this crate only mutates influences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshPart {
    pub name: String,
    morph_targets: HashMap<String, usize>,
    influences: Vec<f32>,
}

impl MeshPart {
    /// Creates a part whose morph targets are assigned indices in iteration
    /// order, with all influences starting at zero.
    pub fn new<I, S>(name: impl Into<String>, morph_target_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let morph_targets: HashMap<String, usize> = morph_target_names
            .into_iter()
            .enumerate()
            .map(|(index, name)| (name.into(), index))
            .collect();
        let influences = vec![0.0; morph_targets.len()];
        Self {
            name: name.into(),
            morph_targets,
            influences,
        }
    }

    /// Returns the influence currently applied for a named morph target.
    pub fn influence(&self, target: &str) -> Option<f32> {
        let index = *self.morph_targets.get(target)?;
        self.influences.get(index).copied()
    }

    fn blend_toward(&mut self, target: &str, level: f32, rate: f32) {
        let Some(&index) = self.morph_targets.get(target) else {
            return;
        };
        let Some(slot) = self.influences.get_mut(index) else {
            return;
        };
        *slot = lerp(*slot, level, rate);
    }
}

/// The loaded avatar mesh viewed as a flat list of parts. Skeletal pose comes
/// from the mixer; this type owns only the morph side of the rig.
#[derive(Debug, Clone, Default)]
pub struct AvatarRig {
    parts: Vec<MeshPart>,
}

impl AvatarRig {
    pub fn new(parts: Vec<MeshPart>) -> Self {
        Self { parts }
    }

    pub fn parts(&self) -> &[MeshPart] {
        &self.parts
    }

    /// Moves every mouth-open influence `rate` of the way toward `level`.
    /// Smoothing here, rather than snapping to the raw level, hides
    /// frame-to-frame amplitude noise. Parts without the target are skipped.
    pub fn apply_mouth_level(&mut self, level: f32, rate: f32) {
        for part in &mut self.parts {
            part.blend_toward(MOUTH_OPEN_TARGET, level, rate);
        }
    }
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}
