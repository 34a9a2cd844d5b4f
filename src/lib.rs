//! Aggregate the health of a service's dependencies into one signal.
//!
//! A [`ServiceCheck`] owns a set of named dependencies, each with a
//! synchronous [`Probe`] and a [`Level`]. Evaluating the check re-probes
//! them in registration order; any unhealthy [`Level::Hard`] dependency
//! makes the whole service unhealthy, while [`Level::Soft`] failures are
//! only recorded. The result is served over HTTP with [`router`].
//!
//! ```no_run
//! # use std::{sync::Arc, time::Duration};
//! # use depwatch::{Level, ServiceCheck};
//! # async fn run() -> depwatch::Result<()> {
//! let check = Arc::new(ServiceCheck::new("orders", Duration::from_secs(10))?);
//! check.register("database", Level::Hard, || true)?;
//! check.register("cache", Level::Soft, || false)?;
//! check.start();
//! let app = depwatch::router(check, "/health");
//! # Ok(())
//! # }
//! ```

mod check;
mod config;
mod error;
mod http;
mod remote;
#[cfg(test)]
mod test_util;

pub use check::{DependencyView, Level, Probe, ServiceCheck, Snapshot};
pub use config::{Config, DependencyConfig, LevelName};
pub use error::{Error, Result, TransportError};
pub use http::{router, status_handler};
pub use remote::{
    fetch_remote_health, probe_endpoint, RemoteChecker, RemoteKind, RemoteProbe, DEFAULT_TIMEOUT,
};
