//! HTTP handlers.

pub mod health;
pub mod jobs;

#[cfg(test)]
mod jobs_tests;

pub use health::*;
pub use jobs::*;
