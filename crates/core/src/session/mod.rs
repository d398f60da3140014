use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::{
    AnimationMixer, AppConfig, AvatarRig, ClipCategory, ClipLibrary, FrameClock, LipSyncConfig,
    MouthLevel, Result, SpeechAnalyzer, VariationScheduler,
};

/// Whether the avatar is idling or speaking a synthesized reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakingMode {
    Idle,
    Talking,
}

/// Audio-graph resources alive for one synthesized utterance: the analyzer
/// node plus the playing flag that gates its refresh. Dropping the playback
/// releases the graph.
#[derive(Debug)]
pub struct SpeechPlayback {
    analyzer: SpeechAnalyzer,
    level: MouthLevel,
    playing: bool,
}

impl SpeechPlayback {
    fn new(config: &LipSyncConfig, level: MouthLevel) -> Self {
        Self {
            analyzer: SpeechAnalyzer::new(config),
            level,
            playing: true,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Feeds decoded speech samples through the analyzer and refreshes the
    /// shared mouth level. Once the playing flag clears this is a no-op, so a
    /// stale feed cannot reopen the mouth.
    pub fn push_samples(&mut self, samples: &[f32]) -> Result<()> {
        if !self.playing {
            return Ok(());
        }
        self.analyzer.push_block(samples)?;
        self.level.set(self.analyzer.mouth_weight());
        Ok(())
    }

    fn stop(&mut self) {
        self.playing = false;
    }
}

/// Per-session engine state: the mixer, both variation schedulers, the rig,
/// the frame clock, and the speech playback lifecycle. One instance exists
/// per mounted avatar panel; nothing here is global.
#[derive(Debug)]
pub struct AvatarSession {
    lipsync: LipSyncConfig,
    library: ClipLibrary,
    rig: AvatarRig,
    mixer: AnimationMixer,
    idle: VariationScheduler,
    talk: VariationScheduler,
    clock: FrameClock,
    mode: SpeakingMode,
    mouth: MouthLevel,
    speech: Option<SpeechPlayback>,
    rng: StdRng,
}

impl AvatarSession {
    /// Builds a session and starts the idle schedule immediately, mirroring
    /// the panel mount.
    pub fn new(config: &AppConfig, library: ClipLibrary, rig: AvatarRig) -> Self {
        Self::with_rng(config, library, rig, StdRng::from_entropy())
    }

    /// Like [`AvatarSession::new`] but with a caller-provided RNG so variation
    /// picking is reproducible.
    pub fn with_rng(
        config: &AppConfig,
        library: ClipLibrary,
        rig: AvatarRig,
        rng: StdRng,
    ) -> Self {
        let mut session = Self {
            lipsync: config.lipsync.clone(),
            mixer: AnimationMixer::new(&config.animation),
            idle: VariationScheduler::new(ClipCategory::Idle, &config.animation),
            talk: VariationScheduler::new(ClipCategory::Talk, &config.animation),
            clock: FrameClock::default(),
            mode: SpeakingMode::Idle,
            mouth: MouthLevel::new(),
            speech: None,
            library,
            rig,
            rng,
        };
        session
            .idle
            .trigger(0.0, &session.library, &mut session.mixer, &mut session.rng);
        session
    }

    pub fn mode(&self) -> SpeakingMode {
        self.mode
    }

    pub fn rig(&self) -> &AvatarRig {
        &self.rig
    }

    pub fn mixer(&self) -> &AnimationMixer {
        &self.mixer
    }

    /// Handle to the shared mouth level, for embedders that drive the
    /// analyzer from their own audio callback.
    pub fn mouth_level(&self) -> MouthLevel {
        self.mouth.clone()
    }

    /// Advances one rendered frame: fire the armed scheduler when due,
    /// advance the mixer clock, then smooth the morph influences toward the
    /// shared level. The mixer must move before the morph write, so both see
    /// a consistent mesh state within the frame.
    pub fn update(&mut self, delta_seconds: f32) {
        self.clock.advance(delta_seconds);
        let now = self.clock.now();

        match self.mode {
            SpeakingMode::Idle => {
                self.idle
                    .tick(now, &self.library, &mut self.mixer, &mut self.rng);
            }
            SpeakingMode::Talking => {
                self.talk
                    .tick(now, &self.library, &mut self.mixer, &mut self.rng);
            }
        }

        self.mixer.advance(delta_seconds);
        self.rig
            .apply_mouth_level(self.mouth.get(), self.lipsync.mouth_lerp_rate);
    }

    /// Enters the talking state: the idle timer is cancelled, the talk
    /// schedule starts straight away, and a fresh playback (analyzer graph)
    /// is constructed. Speech samples go through [`AvatarSession::push_speech_samples`].
    pub fn start_speaking(&mut self) {
        self.idle.cancel();
        if self.mode != SpeakingMode::Talking {
            self.mode = SpeakingMode::Talking;
            self.talk.trigger(
                self.clock.now(),
                &self.library,
                &mut self.mixer,
                &mut self.rng,
            );
        }
        self.speech = Some(SpeechPlayback::new(&self.lipsync, self.mouth.clone()));
    }

    /// Routes decoded speech audio into the active playback. Silently ignored
    /// when no speech is playing.
    pub fn push_speech_samples(&mut self, samples: &[f32]) -> Result<()> {
        match self.speech.as_mut() {
            Some(speech) => speech.push_samples(samples),
            None => Ok(()),
        }
    }

    /// Handles the end of speech playback: stops the analyzer refresh, resets
    /// the mouth to closed, releases the audio graph, and swings the schedule
    /// back to idle, all within this call.
    pub fn finish_speaking(&mut self) {
        if let Some(speech) = self.speech.as_mut() {
            speech.stop();
        }
        self.speech = None;
        self.mouth.set(0.0);
        self.talk.cancel();
        if self.mode != SpeakingMode::Idle {
            self.mode = SpeakingMode::Idle;
            self.idle.trigger(
                self.clock.now(),
                &self.library,
                &mut self.mixer,
                &mut self.rng,
            );
        }
    }

    /// Unmount path: both pending timers are cancelled unconditionally,
    /// whatever the current mode, and any live playback is released.
    pub fn shutdown(&mut self) {
        self.idle.cancel();
        self.talk.cancel();
        if let Some(speech) = self.speech.as_mut() {
            speech.stop();
        }
        self.speech = None;
    }

    /// Number of schedulers with a pending re-arm.
    pub fn pending_timer_count(&self) -> usize {
        usize::from(self.idle.is_armed()) + usize::from(self.talk.is_armed())
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::{AnimationClip, MeshPart, MOUTH_OPEN_TARGET};

    fn session() -> AvatarSession {
        let clips = |prefix: &str| {
            (0..8)
                .map(|i| AnimationClip::new(format!("{prefix}_{i}"), 2.0 + i as f32 * 0.25))
                .collect::<Vec<_>>()
        };
        let library = ClipLibrary::new(clips("idle"), clips("talk")).unwrap();
        let rig = AvatarRig::new(vec![MeshPart::new("head", [MOUTH_OPEN_TARGET])]);
        AvatarSession::with_rng(
            &AppConfig::default(),
            library,
            rig,
            StdRng::seed_from_u64(11),
        )
    }

    #[test]
    fn mounts_into_idle_with_one_pending_timer() {
        let session = session();
        assert_eq!(session.mode(), SpeakingMode::Idle);
        assert_eq!(session.pending_timer_count(), 1);
        assert!(session.mixer().active_index(ClipCategory::Idle).is_some());
    }

    #[test]
    fn start_speaking_swaps_the_armed_scheduler() {
        let mut session = session();
        session.start_speaking();
        assert_eq!(session.mode(), SpeakingMode::Talking);
        assert_eq!(session.pending_timer_count(), 1);
        assert!(session.mixer().active_index(ClipCategory::Talk).is_some());
    }

    #[test]
    fn speech_samples_drive_the_mouth_and_frames_smooth_it() {
        let mut session = session();
        session.start_speaking();
        session.push_speech_samples(&vec![0.5; 1024]).unwrap();

        let level = session.mouth_level().get();
        assert_eq!(level, 1.0);

        session.update(1.0 / 60.0);
        let influence = session.rig().parts()[0]
            .influence(MOUTH_OPEN_TARGET)
            .unwrap();
        assert!((influence - 0.4).abs() < 1e-6);
    }

    #[test]
    fn finish_speaking_resets_mouth_and_returns_to_idle_in_one_call() {
        let mut session = session();
        session.start_speaking();
        session.push_speech_samples(&vec![0.5; 1024]).unwrap();

        session.finish_speaking();
        assert_eq!(session.mode(), SpeakingMode::Idle);
        assert_eq!(session.mouth_level().get(), 0.0);
        assert_eq!(session.pending_timer_count(), 1);
        // The released playback no longer accepts samples.
        session.push_speech_samples(&vec![0.5; 1024]).unwrap();
        assert_eq!(session.mouth_level().get(), 0.0);
    }

    #[test]
    fn shutdown_cancels_both_timers_regardless_of_mode() {
        let mut session = session();
        session.start_speaking();
        session.shutdown();
        assert_eq!(session.pending_timer_count(), 0);

        let mut idle_session = self::session();
        idle_session.shutdown();
        assert_eq!(idle_session.pending_timer_count(), 0);
    }

    #[test]
    fn update_fires_due_variation_swaps() {
        let mut session = session();
        let first = session.mixer().active_index(ClipCategory::Idle);
        // Longest possible idle re-arm for these clips is well under 5s.
        let mut changed = false;
        for _ in 0..300 {
            session.update(1.0 / 60.0);
            changed |= session.mixer().active_index(ClipCategory::Idle) != first;
        }
        assert!(changed);
    }
}
