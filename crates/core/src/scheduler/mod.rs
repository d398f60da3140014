use rand::Rng;

use crate::{AnimationConfig, AnimationMixer, ClipCategory, ClipLibrary};

/// Attempts spent rejecting the excluded index before falling back to the
/// deterministic neighbour. Keeps a misconfigured set from stalling the
/// re-arm path.
const MAX_PICK_ATTEMPTS: usize = 8;

/// Monotonic clock advanced once per rendered frame. Timers compare against
/// it instead of wall time so scheduling stays deterministic under test.
#[derive(Debug, Default, Clone)]
pub struct FrameClock {
    time_seconds: f64,
}

impl FrameClock {
    pub fn reset(&mut self) {
        self.time_seconds = 0.0;
    }

    pub fn advance(&mut self, delta_seconds: f32) {
        self.time_seconds += f64::from(delta_seconds.max(0.0));
    }

    pub fn now(&self) -> f64 {
        self.time_seconds
    }
}

/// Owned handle to at most one pending deadline. Arming replaces whatever was
/// pending, so two in-flight callbacks can never exist for one scheduler.
#[derive(Debug, Default, Clone)]
pub struct VariationTimer {
    deadline: Option<f64>,
}

impl VariationTimer {
    pub fn arm(&mut self, deadline_seconds: f64) {
        self.deadline = Some(deadline_seconds);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Clears the deadline and reports true when it has elapsed.
    pub fn fire_if_due(&mut self, now_seconds: f64) -> bool {
        match self.deadline {
            Some(deadline) if now_seconds >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Draws a uniformly random index in `[0, len)` that differs from `exclude`.
/// Single-entry sets return index 0 straight away; the bounded rejection loop
/// falls back to the next index over rather than spinning.
pub fn pick_variation<R: Rng>(rng: &mut R, len: usize, exclude: Option<usize>) -> Option<usize> {
    if len == 0 {
        return None;
    }
    if len == 1 {
        return Some(0);
    }

    let Some(exclude) = exclude else {
        return Some(rng.gen_range(0..len));
    };

    for _ in 0..MAX_PICK_ATTEMPTS {
        let candidate = rng.gen_range(0..len);
        if candidate != exclude {
            return Some(candidate);
        }
    }

    Some((exclude + 1) % len)
}

/// Keeps one clip category perpetually varied: every trigger plays a fresh
/// random variation and re-arms for half the clip's scaled duration, minus a
/// lead so the next crossfade completes before the clip runs out.
///
/// Both the idle and the talk machine are instances of this one type; only
/// the category differs.
#[derive(Debug)]
pub struct VariationScheduler {
    category: ClipCategory,
    speed_scale: f32,
    lead_ms: f32,
    timer: VariationTimer,
}

impl VariationScheduler {
    pub fn new(category: ClipCategory, config: &AnimationConfig) -> Self {
        Self {
            category,
            speed_scale: config.speed_scale,
            lead_ms: config.reschedule_lead_ms,
            timer: VariationTimer::default(),
        }
    }

    pub fn category(&self) -> ClipCategory {
        self.category
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_armed()
    }

    /// Cancels the pending re-arm, if any. Mode switches and teardown call
    /// this on every exit path.
    pub fn cancel(&mut self) {
        self.timer.cancel();
    }

    /// Milliseconds until the next variation swap for a clip of the given
    /// authored duration. Clamped at zero for very short clips.
    pub fn rearm_delay_ms(&self, clip_duration_seconds: f32) -> f32 {
        let half_playback = clip_duration_seconds / self.speed_scale / 2.0;
        (half_playback * 1000.0 - self.lead_ms).max(0.0)
    }

    /// Plays a fresh variation immediately and re-arms the timer.
    pub fn trigger<R: Rng>(
        &mut self,
        now_seconds: f64,
        library: &ClipLibrary,
        mixer: &mut AnimationMixer,
        rng: &mut R,
    ) {
        let clips = library.clips(self.category);
        let Some(index) = pick_variation(rng, clips.len(), mixer.active_index(self.category))
        else {
            self.timer.cancel();
            return;
        };

        let clip = &clips[index];
        mixer.play(self.category, index, clip);

        let delay = self.rearm_delay_ms(clip.duration_seconds);
        self.timer.arm(now_seconds + f64::from(delay) / 1000.0);
    }

    /// Fires the pending trigger when its deadline has passed.
    pub fn tick<R: Rng>(
        &mut self,
        now_seconds: f64,
        library: &ClipLibrary,
        mixer: &mut AnimationMixer,
        rng: &mut R,
    ) {
        if self.timer.fire_if_due(now_seconds) {
            self.trigger(now_seconds, library, mixer, rng);
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::AnimationClip;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn library(durations: &[f32]) -> ClipLibrary {
        let idle = durations
            .iter()
            .enumerate()
            .map(|(i, d)| AnimationClip::new(format!("idle_{i}"), *d))
            .collect();
        ClipLibrary::new(idle, vec![AnimationClip::new("talk_0", 4.0)]).unwrap()
    }

    #[test]
    fn never_returns_the_excluded_index() {
        let mut rng = rng();
        for exclude in 0..8 {
            for _ in 0..200 {
                let picked = pick_variation(&mut rng, 8, Some(exclude)).unwrap();
                assert_ne!(picked, exclude);
                assert!(picked < 8);
            }
        }
    }

    #[test]
    fn single_variation_sets_terminate_immediately() {
        let mut rng = rng();
        assert_eq!(pick_variation(&mut rng, 1, Some(0)), Some(0));
        assert_eq!(pick_variation(&mut rng, 0, None), None);
    }

    #[test]
    fn rearm_delay_matches_half_scaled_duration_minus_lead() {
        let scheduler =
            VariationScheduler::new(ClipCategory::Idle, &AnimationConfig::default());
        // 2.0s clip at 0.4x: half of 5s playback is 2500ms, minus 400ms lead.
        assert!((scheduler.rearm_delay_ms(2.0) - 2100.0).abs() < 1e-3);
    }

    #[test]
    fn rearm_delay_clamps_at_zero_for_short_clips() {
        let scheduler =
            VariationScheduler::new(ClipCategory::Idle, &AnimationConfig::default());
        assert_eq!(scheduler.rearm_delay_ms(0.1), 0.0);
    }

    #[test]
    fn arming_twice_keeps_a_single_pending_deadline() {
        let mut timer = VariationTimer::default();
        timer.arm(1.0);
        timer.arm(5.0);
        assert!(timer.is_armed());
        // The first deadline was replaced, so nothing fires at t=2.
        assert!(!timer.fire_if_due(2.0));
        assert!(timer.fire_if_due(5.0));
        assert!(!timer.is_armed());
    }

    #[test]
    fn trigger_plays_a_clip_and_rearms() {
        let config = AnimationConfig::default();
        let library = library(&[2.0, 2.0, 2.0]);
        let mut mixer = AnimationMixer::new(&config);
        let mut scheduler = VariationScheduler::new(ClipCategory::Idle, &config);
        let mut rng = rng();

        scheduler.trigger(0.0, &library, &mut mixer, &mut rng);
        assert!(scheduler.is_armed());
        assert!(mixer.active_index(ClipCategory::Idle).is_some());

        // Not due yet at 2.0s, due at 2.1s (2100ms re-arm for a 2.0s clip).
        let first = mixer.active_index(ClipCategory::Idle);
        scheduler.tick(2.0, &library, &mut mixer, &mut rng);
        assert_eq!(mixer.active_index(ClipCategory::Idle), first);
        scheduler.tick(2.11, &library, &mut mixer, &mut rng);
        assert_ne!(mixer.active_index(ClipCategory::Idle), first);
    }

    #[test]
    fn consecutive_triggers_avoid_repeating_the_active_variation() {
        let config = AnimationConfig::default();
        let library = library(&[2.0, 2.0, 2.0, 2.0]);
        let mut mixer = AnimationMixer::new(&config);
        let mut scheduler = VariationScheduler::new(ClipCategory::Idle, &config);
        let mut rng = rng();

        let mut previous = None;
        for step in 0..40 {
            scheduler.trigger(step as f64 * 10.0, &library, &mut mixer, &mut rng);
            let active = mixer.active_index(ClipCategory::Idle);
            assert_ne!(active, previous);
            previous = active;
        }
    }
}
