//! Command implementations

pub mod profile;
pub mod run;
pub mod samples;
