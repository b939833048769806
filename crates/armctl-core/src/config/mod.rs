//! Configuration and profile management for armctl
//!
//! - Named profiles in a TOML file with `${VAR}` expansion
//! - Credential source selection per profile
//! - Poll interval / timeout per profile
//! - [`RunConfig`]: the immutable bundle resolved once per run

#[allow(clippy::module_inception)]
pub mod config;
pub mod credential;
pub mod error;
pub mod polling;
pub mod run;

pub use config::{Config, Profile};
pub use credential::CredentialSource;
pub use error::{ConfigError, Result};
pub use polling::{PollConfig, PollSettings};
pub use run::{RunConfig, RunOverrides};
