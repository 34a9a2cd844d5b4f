use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::{
    dependency::{Dependency, DependencyView},
    Level, Probe,
};
use crate::error::{Error, Result};

/// Aggregated health of one service and the dependencies it relies on.
///
/// All mutable state sits behind a single lock, so readers never observe
/// a cycle half applied. Share it as `Arc<ServiceCheck>` between the
/// scheduler and HTTP handlers.
#[derive(Debug)]
pub struct ServiceCheck {
    name: String,
    interval: Duration,
    pub(super) state: RwLock<State>,
}

#[derive(Debug)]
pub(super) struct State {
    pub(super) healthy: bool,
    pub(super) dependencies: Vec<Dependency>,
}

impl State {
    fn find(&self, name: &str) -> Option<&Dependency> {
        self.dependencies.iter().find(|dep| dep.name == name)
    }

    /// Re-probe in registration order, stopping at the first hard failure.
    fn evaluate(&mut self) -> bool {
        self.dependencies.iter_mut().all(|dep| {
            dep.refresh();
            !dep.is_blocking()
        })
    }
}

impl ServiceCheck {
    /// Create a check for service `name`, to be polled every `interval`
    /// once started. Starts out healthy.
    pub fn new(name: impl Into<String>, interval: Duration) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        if interval.is_zero() {
            return Err(Error::ZeroInterval);
        }
        Ok(Self {
            name,
            interval,
            state: RwLock::new(State {
                healthy: true,
                dependencies: Vec::new(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_healthy(&self) -> bool {
        self.state.read().healthy
    }

    /// Register a dependency and seed its health with one probe call.
    ///
    /// The seed probe runs on the caller's thread without holding the lock.
    /// The aggregate is left untouched until the next evaluation.
    pub fn register<P: Probe>(
        &self,
        name: impl Into<String>,
        level: Level,
        probe: P,
    ) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        if self.state.read().find(&name).is_some() {
            return Err(Error::DuplicateDependency(name));
        }

        let healthy = probe.probe();

        let mut state = self.state.write();
        // Someone may have registered the same name while we were probing
        if state.find(&name).is_some() {
            return Err(Error::DuplicateDependency(name));
        }
        debug!(
            "Register {} dependency [{}] on [{}], healthy: {}",
            level, name, self.name, healthy
        );
        state
            .dependencies
            .push(Dependency::new(name, level, healthy, Box::new(probe)));
        Ok(())
    }

    pub fn dependency(&self, name: &str) -> Result<DependencyView> {
        self.state
            .read()
            .find(name)
            .map(Dependency::view)
            .ok_or_else(|| Error::NotFound(name.to_owned()))
    }

    pub fn dependencies(&self) -> Vec<DependencyView> {
        self.state
            .read()
            .dependencies
            .iter()
            .map(Dependency::view)
            .collect()
    }

    /// Run one evaluation cycle and return the new aggregate.
    ///
    /// Blocks for as long as the probes take. Dependencies after the first
    /// failing hard one are not probed in this cycle.
    pub fn update_status(&self) -> bool {
        let mut state = self.state.write();
        let healthy = state.evaluate();
        match (state.healthy, healthy) {
            (true, false) => warn!("Service [{}] goes unhealthy", self.name),
            (false, true) => info!("Service [{}] recovered", self.name),
            _ => (),
        };
        state.healthy = healthy;
        healthy
    }
}
