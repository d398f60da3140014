//! Core library for the Avatar Assistant application.
//!
//! The crate implements an embeddable chat assistant with an animated 3D
//! avatar. Each module owns a distinct subsystem (clip sets, the crossfading
//! mixer, variation scheduling, speech amplitude analysis, the speaking-state
//! session, the backend API client) so that an embedding front end only has
//! to drive a frame loop and feed decoded audio.

pub mod analysis;
pub mod api;
pub mod assistant;
pub mod chat;
pub mod clips;
pub mod config;
pub mod error;
pub mod mixer;
pub mod rig;
pub mod scheduler;
pub mod session;

pub use analysis::{compute_rms, mouth_weight, MouthLevel, SpeechAnalyzer};
pub use api::{ApiClient, ModelOption, SpeechAudio, CHAT_ERROR_REPLY};
pub use assistant::{Assistant, ChatTurn};
pub use chat::{AssistantStatus, ChatLog, ChatMessage, Direction};
pub use clips::{AnimationClip, ClipCategory, ClipLibrary};
pub use config::{AnimationConfig, ApiConfig, AppConfig, LipSyncConfig};
pub use error::{AvatarError, Result};
pub use mixer::AnimationMixer;
pub use rig::{AvatarRig, MeshPart, MOUTH_OPEN_TARGET};
pub use scheduler::{pick_variation, FrameClock, VariationScheduler, VariationTimer};
pub use session::{AvatarSession, SpeakingMode, SpeechPlayback};
