//! SQL text handling: extraction from model output and the safety gate.

pub mod extract;
pub mod safety;

pub use extract::extract;
pub use safety::{classify, is_read_only, Classification, SafetyGate, SafetyViolation};
