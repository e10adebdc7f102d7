//! Visage - Conversational voice pipeline for virtual human avatars
//!
//! Wires four external capability providers into a linear pipeline:
//! speech recognition, text generation, speech synthesis, and lip-sync
//! video rendering. Each stage delegates to an external model or service;
//! this crate is the orchestration glue.
//!
//! # Architecture
//!
//! ```text
//! capture ──► transcribe ──► generate ──► synthesize ──► play
//!                                             │
//!                                             ▼ (optional)
//!                              render ──► extract ──► HTTP push
//! ```
//!
//! Every turn is strictly sequential: one control task drives blocking
//! calls into isolated stage adapters, and the only state handed between
//! stages is the files and paths named in the stage contracts.

pub mod asr;
pub mod audio;
pub mod config;
pub mod error;
pub mod lipsync;
pub mod nlp;
pub mod pipeline;
pub mod tts;

pub use asr::{Transcriber, Transcript};
pub use audio::{AudioCapture, AudioClip, AudioPlayback};
pub use config::Config;
pub use error::{Error, Result};
pub use lipsync::{BlendshapeSet, BlendshapeSink, LipSyncRenderer, RenderOutcome};
pub use nlp::{FallbackReason, Reply, ReplyOrigin, ResponseGenerator};
pub use pipeline::{ConversationOrchestrator, TurnReport};
pub use tts::Synthesizer;
