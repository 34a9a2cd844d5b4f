mod dependency;
mod level;
mod scheduler;
mod service;
mod status;

pub use dependency::{DependencyView, Probe};
pub use level::Level;
pub use service::ServiceCheck;
pub use status::Snapshot;
