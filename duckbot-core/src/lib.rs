// src/lib.rs

pub mod error;
pub mod platforms;
pub mod services;

pub use error::Error;
