//! # Stepwise Core
//!
//! Core library for the Stepwise tutoring service: request validation,
//! subject prompt composition, the Gemini completion client, the step
//! parser that structures free-form answers, the in-memory response
//! cache, and SQLite-backed solve history.

pub mod cache;
pub mod error;
pub mod gemini;
pub mod history;
pub mod models;
pub mod parser;
pub mod prompts;
pub mod solver;
pub mod validate;

pub use error::SolveError;
pub use models::{Solution, Solved, SolveRequest, Step, Subject};
pub use solver::Solver;
