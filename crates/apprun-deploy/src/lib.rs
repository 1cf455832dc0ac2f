//! CI step that reconciles one AppRun application with the step inputs.
//!
//! The application is looked up by name and created or patched, its packet
//! filter is replaced, and the resulting public URL is published as the
//! `public_url` output.

pub mod block_map;
pub mod cli;
pub mod config;
pub mod error;
pub mod inputs;
pub mod observability;
pub mod output;
pub mod reconcile;

pub use config::{ApplicationRequest, Deployment, build_deployment, load_access_key};
pub use error::{ConfigError, DeployError, Result};
pub use inputs::{EnvInputs, InputSource, Inputs, Trim};
pub use reconcile::{Action, Outcome, reconcile};
