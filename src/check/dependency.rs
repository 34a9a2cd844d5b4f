use derivative::Derivative;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::Level;

/// A synchronous check telling whether one dependency is currently usable.
///
/// Probes run on a blocking thread while the service check is locked, so
/// they should return promptly. The core puts no timeout on them.
pub trait Probe: Send + Sync + 'static {
    fn probe(&self) -> bool;
}

impl<F> Probe for F
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    fn probe(&self) -> bool {
        self()
    }
}

#[derive(Derivative)]
#[derivative(Debug)]
pub(crate) struct Dependency {
    pub(crate) name: String,
    pub(crate) level: Level,
    pub(crate) healthy: bool,
    #[derivative(Debug = "ignore")]
    probe: Box<dyn Probe>,
}

impl Dependency {
    pub(crate) fn new(name: String, level: Level, healthy: bool, probe: Box<dyn Probe>) -> Self {
        Self {
            name,
            level,
            healthy,
            probe,
        }
    }

    /// Probe once and record the result.
    pub(crate) fn refresh(&mut self) -> bool {
        let healthy = self.probe.probe();
        match (self.healthy, healthy) {
            (true, false) => info!("Dependency [{}] ({}) goes unhealthy", self.name, self.level),
            (false, true) => info!("Dependency [{}] ({}) recovered", self.name, self.level),
            _ => (),
        };
        self.healthy = healthy;
        healthy
    }

    /// True if this dependency alone makes the service unhealthy.
    pub(crate) fn is_blocking(&self) -> bool {
        !self.healthy && self.level.is_hard()
    }

    pub(crate) fn view(&self) -> DependencyView {
        DependencyView {
            name: self.name.clone(),
            healthy: self.healthy,
            level: self.level,
        }
    }
}

/// Read-only copy of a dependency's state, also its wire form in snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyView {
    pub name: String,
    pub healthy: bool,
    pub level: Level,
}
