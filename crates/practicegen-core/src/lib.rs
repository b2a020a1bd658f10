//! practicegen-core: item registry, practice item types, and the prefetch buffer.
//!
//! This crate defines the data model that generated exercises flow through:
//! raw candidates are validated into typed [`PracticeItem`]s by an
//! [`ItemRegistry`], scored by per-type evaluators, and kept ahead of the
//! learner by a [`PrefetchBuffer`] fed from a [`GenerationPort`].

pub mod error;
pub mod item;
pub mod items;
pub mod model;
pub mod prefetch;
pub mod registry;
pub mod traits;

pub use error::{BufferConfigError, ItemError};
pub use item::{ItemPayload, PracticeItem};
pub use model::{
    ConceptId, ConceptResult, EvaluationResult, ExerciseType, GenerationContext, PracticeMode,
    RawCandidate, Skill, Submission,
};
pub use prefetch::{PrefetchBuffer, PrefetchConfig, Prefetched, RefillOutcome, RoundStats};
pub use registry::ItemRegistry;
pub use traits::{GenerateOptions, GenerateOutcome, GenerationPort, LlmProvider};
