//! Shared types for the canto speech-generation pipeline.
//!
//! This crate provides the foundational types used across all canto crates:
//! the synthesized-audio value object, the provider-tagged generation
//! parameter bag, and the all-or-nothing generation result.
//!
//! No crate in the workspace depends on anything *except* `canto-types` for
//! cross-cutting type definitions. This keeps the dependency graph clean and
//! prevents circular dependencies.

pub mod audio;
pub mod params;

pub use audio::{AudioGenerationResult, GeneratedAudio, VoiceSettings};
pub use params::GenerationParams;
