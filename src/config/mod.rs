//! # Configuration Module
//!
//! This module handles application configuration loading and management.
//! Configuration can be loaded from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{environment}.toml)
//! - .env files (via dotenvy)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crud_core::config::Settings;
//!
//! let settings = Settings::load()?;
//! println!("Pages link to {}", settings.server.base_url()?);
//! ```

mod settings;

pub use settings::*;
