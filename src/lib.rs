//! Core library for the candidate onboarding wizard.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
