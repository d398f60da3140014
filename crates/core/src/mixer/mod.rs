use crate::{AnimationClip, AnimationConfig, ClipCategory};

/// One clip currently contributing to the blended pose. Playback loops until
/// the entry finishes fading out and is retired.
#[derive(Debug, Clone)]
struct Playback {
    id: u64,
    duration: f32,
    time: f32,
    weight: f32,
    fade_from: f32,
    fade_target: f32,
    fade_elapsed: f32,
    fade_duration: f32,
    retiring: bool,
}

impl Playback {
    fn advance(&mut self, scaled_delta: f32) {
        self.time = (self.time + scaled_delta) % self.duration;

        if self.fade_duration > 0.0 && self.fade_elapsed < self.fade_duration {
            self.fade_elapsed = (self.fade_elapsed + scaled_delta).min(self.fade_duration);
            let progress = self.fade_elapsed / self.fade_duration;
            self.weight = self.fade_from + (self.fade_target - self.fade_from) * progress;
        } else {
            self.weight = self.fade_target;
        }
    }

    fn begin_fade(&mut self, target: f32, duration: f32) {
        self.fade_from = self.weight;
        self.fade_target = target;
        self.fade_elapsed = 0.0;
        self.fade_duration = duration;
    }

    fn fade_finished(&self) -> bool {
        self.fade_duration <= 0.0 || self.fade_elapsed >= self.fade_duration
    }
}

/// Shared time-based animation mixer. Owns every in-flight playback, the
/// per-category active clip trackers, and the global speed scale.
///
/// `advance` must run exactly once per rendered frame regardless of how many
/// clips are active; the session enforces the call order against the morph
/// applier.
#[derive(Debug)]
pub struct AnimationMixer {
    speed_scale: f32,
    idle_fade: f32,
    talk_fade: f32,
    idle_weight: f32,
    talk_weight: f32,
    playbacks: Vec<Playback>,
    next_id: u64,
    active_idle: Option<ActiveClip>,
    active_talk: Option<ActiveClip>,
}

/// Per-category record of the clip currently considered active.
#[derive(Debug, Clone, Copy)]
struct ActiveClip {
    index: usize,
    playback: u64,
}

impl AnimationMixer {
    pub fn new(config: &AnimationConfig) -> Self {
        Self {
            speed_scale: config.speed_scale,
            idle_fade: config.idle_fade_seconds,
            talk_fade: config.talk_fade_seconds,
            idle_weight: config.idle_weight,
            talk_weight: config.talk_weight,
            playbacks: Vec::new(),
            next_id: 0,
            active_idle: None,
            active_talk: None,
        }
    }

    /// Index of the clip currently active for a category, if any. The record
    /// persists while the clip fades out, matching how re-triggering the same
    /// variation stays a no-op until a different one plays.
    pub fn active_index(&self, category: ClipCategory) -> Option<usize> {
        self.active(category).map(|active| active.index)
    }

    /// Starts the given clip with a crossfade and marks it active for its
    /// category. Returns false when the clip is already active (no-op).
    pub fn play(&mut self, category: ClipCategory, index: usize, clip: &AnimationClip) -> bool {
        if self.active_index(category) == Some(index) {
            return false;
        }
        if clip.duration_seconds <= 0.0 {
            return false;
        }

        let (weight, fade) = match category {
            ClipCategory::Idle => (self.idle_weight, self.idle_fade),
            ClipCategory::Talk => (self.talk_weight, self.talk_fade),
        };

        // The outgoing side of the crossfade is whichever clip currently
        // fronts the pose: the talk playback when one exists, the idle
        // playback otherwise. With no previous playback this is a plain
        // fade-in.
        let previous = self
            .active(ClipCategory::Talk)
            .or_else(|| self.active(ClipCategory::Idle))
            .map(|active| active.playback);
        if let Some(id) = previous {
            if let Some(playback) = self.playbacks.iter_mut().find(|p| p.id == id) {
                playback.begin_fade(0.0, fade);
                playback.retiring = true;
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        let mut playback = Playback {
            id,
            duration: clip.duration_seconds,
            time: 0.0,
            weight: 0.0,
            fade_from: 0.0,
            fade_target: weight,
            fade_elapsed: 0.0,
            fade_duration: fade,
            retiring: false,
        };
        if fade <= 0.0 {
            playback.weight = weight;
        }
        self.playbacks.push(playback);

        let record = ActiveClip {
            index,
            playback: id,
        };
        match category {
            ClipCategory::Idle => self.active_idle = Some(record),
            ClipCategory::Talk => self.active_talk = Some(record),
        }
        true
    }

    /// Advances every playback and fade by the elapsed frame time, with the
    /// global speed scale applied to the shared clock.
    pub fn advance(&mut self, delta_seconds: f32) {
        let scaled = delta_seconds * self.speed_scale;
        for playback in &mut self.playbacks {
            playback.advance(scaled);
        }
        self.playbacks
            .retain(|playback| !(playback.retiring && playback.fade_finished()));
    }

    /// Current blend weight contributed by a category's active playback.
    pub fn weight(&self, category: ClipCategory) -> f32 {
        self.active(category)
            .and_then(|active| self.playbacks.iter().find(|p| p.id == active.playback))
            .map(|playback| playback.weight)
            .unwrap_or(0.0)
    }

    /// Number of playbacks still contributing to the pose, fading ones
    /// included.
    pub fn playback_count(&self) -> usize {
        self.playbacks.len()
    }

    fn active(&self, category: ClipCategory) -> Option<ActiveClip> {
        match category {
            ClipCategory::Idle => self.active_idle,
            ClipCategory::Talk => self.active_talk,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixer() -> AnimationMixer {
        AnimationMixer::new(&AnimationConfig::default())
    }

    fn clip(duration: f32) -> AnimationClip {
        AnimationClip::new("clip", duration)
    }

    #[test]
    fn first_play_fades_in_without_a_previous_handle() {
        let mut mixer = mixer();
        assert!(mixer.play(ClipCategory::Idle, 0, &clip(2.0)));
        assert_eq!(mixer.playback_count(), 1);
        assert_eq!(mixer.weight(ClipCategory::Idle), 0.0);

        // 0.8s idle fade at 0.4x mixer speed: 1 wall second = 0.4 fade seconds.
        mixer.advance(1.0);
        assert!((mixer.weight(ClipCategory::Idle) - 0.5).abs() < 1e-6);

        mixer.advance(1.0);
        assert!((mixer.weight(ClipCategory::Idle) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn replaying_the_active_index_is_a_no_op() {
        let mut mixer = mixer();
        assert!(mixer.play(ClipCategory::Idle, 3, &clip(2.0)));
        assert!(!mixer.play(ClipCategory::Idle, 3, &clip(2.0)));
        assert_eq!(mixer.playback_count(), 1);
    }

    #[test]
    fn switching_clips_crossfades_and_retires_the_old_one() {
        let mut mixer = mixer();
        mixer.play(ClipCategory::Idle, 0, &clip(2.0));
        mixer.advance(2.0);

        mixer.play(ClipCategory::Idle, 1, &clip(3.0));
        assert_eq!(mixer.playback_count(), 2);
        assert_eq!(mixer.active_index(ClipCategory::Idle), Some(1));

        // Run past the 0.8s fade (2s wall time at 0.4x) and confirm the old
        // playback is gone while the new one carries full weight.
        mixer.advance(2.5);
        assert_eq!(mixer.playback_count(), 1);
        assert!((mixer.weight(ClipCategory::Idle) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn talk_clips_are_under_weighted() {
        let mut mixer = mixer();
        mixer.play(ClipCategory::Talk, 0, &clip(2.0));
        mixer.advance(10.0);
        assert!((mixer.weight(ClipCategory::Talk) - 0.9).abs() < 1e-6);
    }

    #[test]
    fn talk_playback_wins_the_crossfade_source() {
        let mut mixer = mixer();
        mixer.play(ClipCategory::Idle, 0, &clip(2.0));
        mixer.play(ClipCategory::Talk, 0, &clip(2.0));
        mixer.advance(10.0);
        // Idle faded out when talk started even though its active record
        // survives for the no-op check.
        assert_eq!(mixer.playback_count(), 1);
        assert_eq!(mixer.weight(ClipCategory::Idle), 0.0);
        assert_eq!(mixer.active_index(ClipCategory::Idle), Some(0));
    }
}
