//! MVR Core - Foundation crate for the MVR document status client.
//!
//! This crate provides the configuration, shared types and error handling that
//! the CAPTCHA, client and CLI crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Shared newtypes and enums (`Egn`, `OcrEngineKind`)
//!
//! # Example
//!
//! ```rust
//! use mvr_core::{AppConfig, Egn};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! assert_eq!(config.client.max_retries, 5);
//!
//! let egn = Egn::new("7501010010")?;
//! println!("Querying for {egn}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, CaptchaConfig, ClientConfig};
pub use error::{ConfigError, ConfigResult, MvrError};
pub use types::{Egn, OcrEngineKind};
