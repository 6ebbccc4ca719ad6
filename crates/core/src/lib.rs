//! Core business logic for threadline.

pub mod services;

pub use services::*;
