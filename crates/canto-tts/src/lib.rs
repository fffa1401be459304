//! Text-to-speech generation for canto.
//!
//! Wraps the ElevenLabs HTTP API behind a credential-stateless protocol
//! client and drives multi-variant generation through an orchestrator that
//! owns rate-limit pacing, all-or-nothing batch semantics, and best-effort
//! quota bookkeeping against the key store.
//!
//! The client performs exactly one HTTP attempt per call; retries, if ever
//! introduced, belong to the orchestrator.

pub mod client;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod provider;

pub use client::{
    ElevenLabsClient, HistoryItem, HistoryPage, HistoryQuery, Subscription, SynthesisRequest,
    SynthesizedAudio, Voice,
};
pub use config::ElevenLabsConfig;
pub use error::TtsError;
pub use orchestrator::{GenerationRequest, Generator, DEFAULT_VARIANT_COUNT, NO_ACTIVE_KEY_MESSAGE};
pub use provider::TtsProvider;
