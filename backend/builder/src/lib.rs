//! Builder façade: propose → diff → validate → stage → (preview) →
//! approve/apply → (optional) rollback.

pub mod engine;
pub mod validator;

pub use engine::{AppliedPatch, Blueprint, BuilderConfig, BuilderEngine, PatchOutcome};
pub use validator::validate;
