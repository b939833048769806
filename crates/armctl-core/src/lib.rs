//! # armctl-core
//!
//! Provisioning workflows against the Azure Resource Manager API.
//!
//! Every sample has the same shape: resolve the run configuration, obtain a
//! credential, ensure a resource group, run a strictly ordered list of
//! create/get/action steps (waiting for each long-running operation to reach
//! a terminal state), then delete the group unless told to keep it.
//!
//! - [`config`]: profiles file and the immutable [`RunConfig`]
//! - [`provider`]: the [`ResourceProvider`] capability trait
//! - [`poller`]: [`wait_until_terminal`] with an injectable [`Clock`]
//! - [`sequencer`]: stage ordering, teardown policy, run reports
//! - [`samples`]: the individual workflows
//! - [`arm`] / [`auth`]: the live REST provider and bearer-token sources
//! - [`testing`]: in-memory provider and virtual clock
//!
//! ```rust,ignore
//! use armctl_core::{RunConfig, Sequencer, SampleKind, SampleSettings};
//! use armctl_core::arm::ArmProvider;
//! use armctl_core::auth::credential_for;
//! use std::sync::Arc;
//!
//! let config = RunConfig::from_env()?;
//! let credential = credential_for(&Default::default(), |v| std::env::var(v).ok())?;
//! let provider = ArmProvider::new(&config, Arc::from(credential))?;
//! let workflow = SampleKind::Mysql.build(&SampleSettings::default())?;
//! let report = Sequencer::new(&config, &provider).run(workflow.as_ref()).await?;
//! ```

pub mod arm;
pub mod auth;
pub mod config;
pub mod error;
pub mod operation;
pub mod poller;
pub mod provider;
pub mod resource;
pub mod samples;
pub mod search;
pub mod sequencer;
pub mod testing;

pub use config::{Config, ConfigError, CredentialSource, PollConfig, Profile, RunConfig, RunOverrides};
pub use error::{CoreError, ErrorCategory, Result};
pub use operation::{Operation, OperationPoll, OperationStatus, PollKind};
pub use poller::{Clock, ProgressCallback, ProgressEvent, TokioClock, wait_until_terminal};
pub use provider::ResourceProvider;
pub use resource::{Resource, ResourceGroup, ResourceRef, Scope};
pub use samples::{SampleKind, SampleSettings};
pub use sequencer::{RunReport, Sequencer, Stage, StepOutput, Steps, TeardownPolicy, Workflow};
