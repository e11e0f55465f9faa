//! # recs-core
//!
//! Core types, traits, and abstractions for recs embedding generation.
//!
//! This crate provides the data types shared by the scheduler, the database
//! layer and the inference backends, along with the collaborator traits the
//! scheduler is written against.

pub mod defaults;
pub mod error;
pub mod models;
pub mod retry;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use retry::linear_backoff;
pub use traits::*;
