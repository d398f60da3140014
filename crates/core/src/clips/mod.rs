use serde::{Deserialize, Serialize};

use crate::{AvatarError, Result};

/// Category a clip variation belongs to. Membership is fixed for the lifetime
/// of a loaded library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClipCategory {
    Idle,
    Talk,
}

/// Metadata for one loaded animation clip. The asset pipeline that decodes
/// model files lives outside this crate; it hands over name and authored
/// duration only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationClip {
    pub name: String,
    pub duration_seconds: f32,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, duration_seconds: f32) -> Self {
        Self {
            name: name.into(),
            duration_seconds,
        }
    }
}

/// Ordered idle/talk clip sets resolved once per session. Indices into each
/// set stay stable until the library is dropped.
#[derive(Debug, Clone)]
pub struct ClipLibrary {
    idle: Vec<AnimationClip>,
    talk: Vec<AnimationClip>,
}

impl ClipLibrary {
    /// Builds a library from decoded clip sets. Both categories must contain
    /// at least one clip with a positive duration; anything else is treated as
    /// a failed asset load and aborts session construction.
    pub fn new(idle: Vec<AnimationClip>, talk: Vec<AnimationClip>) -> Result<Self> {
        validate_set("idle", &idle)?;
        validate_set("talk", &talk)?;
        Ok(Self { idle, talk })
    }

    /// Returns the full clip set for a category.
    pub fn clips(&self, category: ClipCategory) -> &[AnimationClip] {
        match category {
            ClipCategory::Idle => &self.idle,
            ClipCategory::Talk => &self.talk,
        }
    }

    /// Looks up a single clip by category and index.
    pub fn clip(&self, category: ClipCategory, index: usize) -> Option<&AnimationClip> {
        self.clips(category).get(index)
    }

    /// Number of variations available in a category.
    pub fn variation_count(&self, category: ClipCategory) -> usize {
        self.clips(category).len()
    }
}

fn validate_set(label: &str, clips: &[AnimationClip]) -> Result<()> {
    if clips.is_empty() {
        return Err(AvatarError::msg(format!(
            "{label} clip set is empty; the avatar cannot animate without it"
        )));
    }

    for clip in clips {
        if clip.duration_seconds <= 0.0 {
            return Err(AvatarError::msg(format!(
                "clip `{}` in the {label} set has a non-positive duration",
                clip.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(name: &str, duration: f32) -> AnimationClip {
        AnimationClip::new(name, duration)
    }

    #[test]
    fn builds_library_with_both_categories() {
        let library = ClipLibrary::new(
            vec![clip("idle_a", 2.0), clip("idle_b", 3.0)],
            vec![clip("talk_a", 4.0)],
        )
        .unwrap();

        assert_eq!(library.variation_count(ClipCategory::Idle), 2);
        assert_eq!(library.variation_count(ClipCategory::Talk), 1);
        assert_eq!(library.clip(ClipCategory::Idle, 1).unwrap().name, "idle_b");
        assert!(library.clip(ClipCategory::Talk, 5).is_none());
    }

    #[test]
    fn rejects_empty_category() {
        let err = ClipLibrary::new(Vec::new(), vec![clip("talk_a", 4.0)]).unwrap_err();
        assert!(format!("{err}").contains("idle"));
    }

    #[test]
    fn rejects_zero_duration_clips() {
        let err = ClipLibrary::new(
            vec![clip("idle_a", 0.0)],
            vec![clip("talk_a", 4.0)],
        )
        .unwrap_err();
        assert!(format!("{err}").contains("idle_a"));
    }
}
