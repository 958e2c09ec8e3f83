//! job-runner-stack - Declares GitLab docker-machine job runners
//!
//! Resolves a partially specified [`RunnerConfiguration`] into an immutable
//! [`ResolvedJobRunner`], declaring the IAM role and instance profile it
//! needs into a [`Stack`]. Nothing here talks to AWS during resolution: the
//! stack is an in-memory desired-state model that an external reconciler
//! applies later.
//!
//! ```ignore
//! let catalog = Arc::new(Ec2Client::from_context(&aws).snapshot(&[query]).await?);
//! let mut stack = Stack::new("ci-runners", "us-east-2", catalog)?;
//! let runner = resolve(
//!     &mut stack,
//!     &DefaultPolicy::default(),
//!     RunnerConfiguration::with_token("glrt-..."),
//! )?;
//! println!("{}", stack.synthesize());
//! ```

pub mod aws;
pub mod config;
pub mod error;
pub mod policy;
pub mod resolver;
pub mod stack;
pub mod supply;

pub use config::{AuthToken, ConfigBlock, RunnerConfiguration};
pub use error::{LookupFailure, ResolveError, ResolveResult};
pub use policy::DefaultPolicy;
pub use resolver::{ResolvedIdentity, ResolvedJobRunner, resolve};
pub use stack::{Declaration, DeclarationId, Stack, StackId};
pub use supply::Supply;
