use serde::{Deserialize, Serialize};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub animation: AnimationConfig,
    pub lipsync: LipSyncConfig,
    pub api: ApiConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            animation: AnimationConfig::default(),
            lipsync: LipSyncConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

/// Configuration for the animation mixer and the variation schedulers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Global playback speed multiplier applied to the shared mixer clock.
    pub speed_scale: f32,
    /// Crossfade length when switching to an idle variation, in seconds.
    pub idle_fade_seconds: f32,
    /// Crossfade length when switching to a talk variation, in seconds.
    pub talk_fade_seconds: f32,
    /// Blend weight for idle clips.
    pub idle_weight: f32,
    /// Blend weight for talk clips. Kept below 1.0 so the mouth morph target
    /// stays visible over the talk gestures.
    pub talk_weight: f32,
    /// Milliseconds subtracted from each re-arm delay so the next crossfade
    /// completes before the running clip ends.
    pub reschedule_lead_ms: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            speed_scale: 0.4,
            idle_fade_seconds: 0.8,
            talk_fade_seconds: 0.6,
            idle_weight: 1.0,
            talk_weight: 0.9,
            reschedule_lead_ms: 400.0,
        }
    }
}

/// Tuning values for the speech analyzer and the mouth morph smoothing.
///
/// The floor/gain/smoothing numbers are empirical; they are configuration
/// rather than constants so embedders can re-tune them per voice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LipSyncConfig {
    /// Number of time-domain samples retained per analysis frame.
    pub frame_size: usize,
    /// Per-bin exponential smoothing constant for the magnitude spectrum.
    pub spectrum_smoothing: f32,
    /// RMS values at or below this floor map to a closed mouth.
    pub rms_floor: f32,
    /// Gain applied above the floor before clamping into [0, 1].
    pub rms_gain: f32,
    /// Fraction of the distance to the target level applied to the morph
    /// influence each frame.
    pub mouth_lerp_rate: f32,
}

impl Default for LipSyncConfig {
    fn default() -> Self {
        Self {
            frame_size: 1024,
            spectrum_smoothing: 0.6,
            rms_floor: 0.002,
            rms_gain: 8.0,
            mouth_lerp_rate: 0.4,
        }
    }
}

/// Configuration for the backend REST client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the assistant backend.
    pub base_url: String,
    /// Request timeout applied to every call, in seconds.
    pub timeout_seconds: u64,
    /// Voice passed to the speech synthesis endpoint.
    pub voice: String,
    /// Playback speed requested from the speech synthesis endpoint.
    pub speech_speed: f32,
    /// Model passed to the transcription endpoint.
    pub stt_model: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_seconds: 60,
            voice: "nova".to_string(),
            speech_speed: 1.0,
            stt_model: "default".to_string(),
        }
    }
}
