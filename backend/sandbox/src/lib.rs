//! Sandbox renderer: turns untrusted HTML into an isolated, CSP-constrained
//! preview document. This neutralizes a fixed set of HTML/script vectors;
//! it is not a security boundary against a determined attacker.

pub mod renderer;

pub use renderer::{generate, MAX_PREVIEW_INPUT, MAX_TAGS};
