//! Mesher configuration.
//!
//! Every field has a default, so a partial JSON/TOML document deserializes
//! into a complete configuration.

use crate::mesh_error::BoraError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// External tetrahedral mesher used for SOLID cells.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeMesher {
    #[default]
    TetGen,
    Netgen,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MesherConfig {
    /// Executable name or path of TetGen.
    pub tetgen: PathBuf,
    /// Executable name or path of Netgen.
    pub netgen: PathBuf,
    pub volume_mesher: VolumeMesher,
    /// Wall-clock limit of one external tool run, in milliseconds.
    pub tool_timeout: u64,
    /// Parent of the per-task scratch directories; the system temp dir if unset.
    pub temp_root: Option<PathBuf>,
    /// Mesh the units of one level in parallel (needs the `rayon` feature).
    pub parallel: bool,
    /// Face refinement stages, as multiples of the target length.
    /// Must be decreasing and end with 1.
    pub refine_stages: Vec<f64>,
    /// Cap on insertion rounds per stage.
    pub max_refine_rounds: usize,
    /// A candidate closer than this fraction of the stage length to an
    /// existing node is rejected.
    pub min_distance_ratio: f64,
    /// Boundary segments shorter than this fraction of the target length are
    /// merged into their neighbour when the polygon stays within the
    /// deflection tolerance. 0 disables the elision.
    pub short_segment_ratio: f64,
}

impl Default for MesherConfig {
    fn default() -> Self {
        Self {
            tetgen: PathBuf::from("tetgen"),
            netgen: PathBuf::from("netgen"),
            volume_mesher: VolumeMesher::TetGen,
            tool_timeout: 600_000,
            temp_root: None,
            parallel: false,
            refine_stages: vec![4.0, 2.0, 1.0],
            max_refine_rounds: 32,
            min_distance_ratio: std::f64::consts::FRAC_1_SQRT_2,
            short_segment_ratio: 0.0,
        }
    }
}

impl MesherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.tool_timeout)
    }

    /// Check value ranges.
    ///
    /// # Errors
    /// `Configuration` naming the first offending field.
    pub fn validate(&self) -> Result<(), BoraError> {
        let bad = |msg: String| Err(BoraError::Configuration(msg));
        if self.tool_timeout == 0 {
            return bad("tool_timeout must be positive".into());
        }
        if self.refine_stages.is_empty() {
            return bad("refine_stages must not be empty".into());
        }
        if self.refine_stages.iter().any(|f| !f.is_finite() || *f < 1.0) {
            return bad(format!("refine_stages must be >= 1: {:?}", self.refine_stages));
        }
        if self.refine_stages.windows(2).any(|w| w[1] > w[0]) {
            return bad(format!(
                "refine_stages must be non-increasing: {:?}",
                self.refine_stages
            ));
        }
        if self.refine_stages.last() != Some(&1.0) {
            return bad("the last refine stage must be 1".into());
        }
        if self.max_refine_rounds == 0 {
            return bad("max_refine_rounds must be positive".into());
        }
        if !(self.min_distance_ratio > 0.0 && self.min_distance_ratio < 1.0) {
            return bad(format!(
                "min_distance_ratio must be in (0, 1): {}",
                self.min_distance_ratio
            ));
        }
        if !(0.0..1.0).contains(&self.short_segment_ratio) {
            return bad(format!(
                "short_segment_ratio must be in [0, 1): {}",
                self.short_segment_ratio
            ));
        }
        #[cfg(not(feature = "rayon"))]
        if self.parallel {
            log::warn!("parallel meshing requested without the `rayon` feature; running serially");
        }
        Ok(())
    }
}
