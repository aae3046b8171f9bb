use std::fmt;

use serde::{Deserialize, Serialize};

/// Fase de un job. Cada fase tiene su propio conjunto de tareas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobPhase {
    #[serde(rename = "mapPhase")]
    Map,
    #[serde(rename = "reducePhase")]
    Reduce,
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobPhase::Map => f.write_str("mapPhase"),
            JobPhase::Reduce => f.write_str("reducePhase"),
        }
    }
}
