//! Error response model shared by the gateway crates.

pub mod problem;

pub use problem::{APPLICATION_PROBLEM_JSON, Problem, ValidationViolation, codes};
