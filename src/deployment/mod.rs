//! Deployments.
//!
//! A deployment binds an [`Application`] and its session cookie
//! configuration to a context path. The [`Registry`] owns deployments and
//! moves them through their lifecycle:
//!
//! ```text
//! Undeployed -> Deployed -> Started <-> Stopped
//!                   |                      |
//!                   +-----> Undeployed <---+
//! ```
//!
//! Only started deployments are registered with the [`PathRouter`].
//!
//! [`PathRouter`]: crate::handler::PathRouter

mod application;
mod counter;
mod registry;
mod state;

pub use application::{Application, Exchange};
pub use counter::{SessionCounter, COUNT_ATTRIBUTE};
pub use registry::{DeploymentConfig, DeploymentHandle, Registry};
pub use state::DeploymentState;
