//! CLI command implementations.

pub mod clear;
pub mod demo;
pub mod pending;
pub mod status;
