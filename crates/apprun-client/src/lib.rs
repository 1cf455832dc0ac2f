//! Client for the Sakura Cloud AppRun application API.
//!
//! Covers the endpoints a deployment touches: listing, creating, reading and
//! patching applications, and patching an application's packet filter.

pub mod api;
pub mod auth;
pub mod client;
pub mod directory;
pub mod error;
pub mod model;

pub use api::ApplicationApi;
pub use auth::AccessKey;
pub use client::{AppRunClient, DEFAULT_BASE_URL};
pub use directory::ApplicationDirectory;
pub use error::{ClientError, Result};
