use std::{
    f32::consts::PI,
    fmt,
    sync::{Arc, Mutex},
};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::{AvatarError, LipSyncConfig, Result};

/// Shared mouth-openness scalar in [0, 1]. The analyzer refresh writes it,
/// the per-frame morph applier reads it; the handle clones cheaply across
/// that seam. Values are clamped on write.
#[derive(Clone, Default)]
pub struct MouthLevel {
    shared: Arc<Mutex<f32>>,
}

impl MouthLevel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, level: f32) {
        if let Ok(mut slot) = self.shared.lock() {
            *slot = level.clamp(0.0, 1.0);
        }
    }

    pub fn get(&self) -> f32 {
        self.shared.lock().map(|slot| *slot).unwrap_or(0.0)
    }
}

impl fmt::Debug for MouthLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MouthLevel")
            .field("level", &self.get())
            .finish()
    }
}

/// Analysis node for synthesized speech. Retains the most recent time-domain
/// window and an exponentially smoothed magnitude spectrum of it, and maps
/// window loudness to a target mouth weight.
pub struct SpeechAnalyzer {
    frame_size: usize,
    smoothing: f32,
    rms_floor: f32,
    rms_gain: f32,
    window: Vec<f32>,
    smoothed_spectrum: Vec<f32>,
    fft: FftResources,
}

impl SpeechAnalyzer {
    pub fn new(config: &LipSyncConfig) -> Self {
        let frame_size = config.frame_size.max(2);
        let mut planner = RealFftPlanner::new();
        let plan = planner.plan_fft_forward(frame_size);
        let fft = FftResources {
            scratch: plan.make_scratch_vec(),
            spectrum: plan.make_output_vec(),
            input: plan.make_input_vec(),
            plan,
        };
        let spectrum_len = fft.spectrum.len();

        Self {
            frame_size,
            smoothing: config.spectrum_smoothing.clamp(0.0, 1.0),
            rms_floor: config.rms_floor,
            rms_gain: config.rms_gain,
            window: vec![0.0; frame_size],
            smoothed_spectrum: vec![0.0; spectrum_len],
            fft,
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Feeds decoded PCM samples (normalized to [-1, 1]) into the node. The
    /// retained window always holds the latest `frame_size` samples.
    pub fn push_block(&mut self, samples: &[f32]) -> Result<()> {
        if samples.is_empty() {
            return Err(AvatarError::msg("analysis requires at least one sample"));
        }

        if samples.len() >= self.frame_size {
            self.window
                .copy_from_slice(&samples[samples.len() - self.frame_size..]);
        } else {
            self.window.rotate_left(samples.len());
            let tail = self.frame_size - samples.len();
            self.window[tail..].copy_from_slice(samples);
        }

        self.refresh_spectrum()
    }

    /// Latest retained waveform window.
    pub fn time_domain(&self) -> &[f32] {
        &self.window
    }

    /// Smoothed magnitude spectrum of the retained window.
    pub fn frequency_data(&self) -> &[f32] {
        &self.smoothed_spectrum
    }

    /// Root-mean-square loudness of the retained window.
    pub fn rms(&self) -> f32 {
        compute_rms(&self.window)
    }

    /// Target mouth weight for the current window.
    pub fn mouth_weight(&self) -> f32 {
        mouth_weight(self.rms(), self.rms_floor, self.rms_gain)
    }

    fn refresh_spectrum(&mut self) -> Result<()> {
        let len = self.frame_size;
        for (index, value) in self.window.iter().enumerate() {
            self.fft.input[index] = *value * hann_value(index, len);
        }

        self.fft
            .plan
            .process_with_scratch(
                &mut self.fft.input,
                &mut self.fft.spectrum,
                &mut self.fft.scratch,
            )
            .map_err(|err| AvatarError::msg(format!("spectrum update failed: {err}")))?;

        let tau = self.smoothing;
        for (slot, bin) in self.smoothed_spectrum.iter_mut().zip(&self.fft.spectrum) {
            *slot = tau * *slot + (1.0 - tau) * bin.norm();
        }

        Ok(())
    }
}

struct FftResources {
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl fmt::Debug for SpeechAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechAnalyzer")
            .field("frame_size", &self.frame_size)
            .field("smoothing", &self.smoothing)
            .field("rms", &self.rms())
            .finish()
    }
}

/// Root-mean-square of a sample block normalized to [-1, 1].
pub fn compute_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|sample| sample * sample).sum();
    (sum / samples.len() as f32).sqrt()
}

/// Maps raw loudness to a mouth-open weight: the floor suppresses the
/// background-noise level, the gain amplifies speech-level signal, and the
/// result is clamped into [0, 1].
pub fn mouth_weight(rms: f32, floor: f32, gain: f32) -> f32 {
    ((rms - floor) * gain).clamp(0.0, 1.0)
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }

    0.5 - 0.5 * ((2.0 * PI * index as f32) / (len as f32 - 1.0)).cos()
}
