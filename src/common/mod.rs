//! Common types and error definitions for landmark_slam
//!
//! This module provides the foundational building blocks used across
//! the estimator: geometry types, angle helpers and the error type.

pub mod angle;
pub mod error;
pub mod types;

pub use angle::*;
pub use error::*;
pub use types::*;
