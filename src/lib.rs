// src/lib.rs

pub mod animation;
pub mod condition;
pub mod config;
pub mod error;
pub mod field_series;
pub mod movie;
pub mod snapshot;
pub mod visualisation;

pub use error::{CompareError, Result};
