use std::io;

use axum::http::StatusCode;
use serde::{Deserialize, Deserializer, Serialize};

use super::{dependency::DependencyView, ServiceCheck};
use crate::error::{Error, Result};

/// Point-in-time status of a service check, as served over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub name: String,
    pub healthy: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dependencies: Vec<DependencyView>,
}

// Some peers encode an empty dependency list as `null`
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<DependencyView>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

impl Snapshot {
    pub fn status_code(&self) -> StatusCode {
        status_code(self.healthy)
    }
}

fn status_code(healthy: bool) -> StatusCode {
    if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

impl ServiceCheck {
    /// Take a consistent view of the aggregate and every dependency.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.read();
        Snapshot {
            name: self.name().to_owned(),
            healthy: state.healthy,
            dependencies: state.dependencies.iter().map(|dep| dep.view()).collect(),
        }
    }

    /// 200 when healthy, 503 otherwise.
    pub fn http_status_code(&self) -> u16 {
        status_code(self.is_healthy()).as_u16()
    }

    /// Write the snapshot as one line of JSON.
    pub fn write_status<W: io::Write>(&self, mut writer: W) -> Result<()> {
        serde_json::to_writer(&mut writer, &self.snapshot()).map_err(Error::Encode)?;
        writer
            .write_all(b"\n")
            .map_err(|err| Error::Encode(serde_json::Error::io(err)))
    }
}
