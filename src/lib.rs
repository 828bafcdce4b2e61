//! embedpy - embeddable Python environment provisioning
//!
//! Downloads an embeddable Python distribution, bootstraps pip into it and
//! installs a project's requirements.

pub mod commands;
pub mod config;
pub mod embed;
pub mod error;
pub mod pip;
pub mod requirements;

pub use config::{Endpoints, ProjectConfig};
pub use error::{ConfigErrorKind, EmbedError, Result};
