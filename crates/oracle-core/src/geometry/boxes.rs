use super::{OUTSIDE_RANK, VolumeEngine};
use crate::domain::OracleError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Composition name marking a volume without assigned material.
pub const NO_COMPOSITION: &str = "No compo";

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("failed to read geometry '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid geometry description: {0}")]
    Json(#[from] serde_json::Error),
    #[error("volume '{name}' has min {min:?} above max {max:?}")]
    InvertedBox {
        name: String,
        min: [f64; 3],
        max: [f64; 3],
    },
}

impl From<GeometryError> for OracleError {
    fn from(error: GeometryError) -> Self {
        let placeholder = match &error {
            GeometryError::Io { .. } => "IO.GEOMETRY_OPEN",
            GeometryError::Json(_) => "INPUT.GEOMETRY_PARSE",
            GeometryError::InvertedBox { .. } => "INPUT.GEOMETRY_BOX",
        };
        match error {
            GeometryError::Io { .. } => OracleError::io_system(placeholder, error.to_string()),
            _ => OracleError::input_validation(placeholder, error.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxVolume {
    pub name: String,
    #[serde(default = "default_composition")]
    pub composition: String,
    pub min: [f64; 3],
    pub max: [f64; 3],
}

fn default_composition() -> String {
    NO_COMPOSITION.to_string()
}

impl BoxVolume {
    pub fn contains(&self, point: [f64; 3]) -> bool {
        (0..3).all(|axis| self.min[axis] <= point[axis] && point[axis] <= self.max[axis])
    }

    /// Distance along `direction` to the first face of this box hit from
    /// `point`, if any.
    fn face_distance(&self, point: [f64; 3], direction: [f64; 3]) -> Option<f64> {
        let mut closest: Option<f64> = None;
        for axis in 0..3 {
            if direction[axis] == 0.0 {
                continue;
            }
            for plane in [self.min[axis], self.max[axis]] {
                let t = (plane - point[axis]) / direction[axis];
                if t < 0.0 {
                    continue;
                }
                let on_face = (0..3).filter(|other| *other != axis).all(|other| {
                    let coordinate = point[other] + t * direction[other];
                    self.min[other] <= coordinate && coordinate <= self.max[other]
                });
                if on_face && closest.is_none_or(|best| t < best) {
                    closest = Some(t);
                }
            }
        }
        closest
    }
}

/// Axis-aligned boxes, ranked in declaration order. Overlaps resolve to the
/// first listed box.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxGeometry {
    pub volumes: Vec<BoxVolume>,
}

impl BoxGeometry {
    pub fn new(volumes: Vec<BoxVolume>) -> Result<Self, GeometryError> {
        let geometry = Self { volumes };
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn from_json_str(source: &str) -> Result<Self, GeometryError> {
        let geometry: Self = serde_json::from_str(source)?;
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn load(path: &Path) -> Result<Self, GeometryError> {
        let source = fs::read_to_string(path).map_err(|source| GeometryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let geometry = Self::from_json_str(&source)?;
        tracing::info!(
            path = %path.display(),
            volumes = geometry.volumes.len(),
            "loaded box geometry"
        );
        Ok(geometry)
    }

    fn validate(&self) -> Result<(), GeometryError> {
        match self
            .volumes
            .iter()
            .find(|volume| (0..3).any(|axis| volume.min[axis] > volume.max[axis]))
        {
            Some(volume) => Err(GeometryError::InvertedBox {
                name: volume.name.clone(),
                min: volume.min,
                max: volume.max,
            }),
            None => Ok(()),
        }
    }

    fn volume(&self, rank: i64) -> Option<&BoxVolume> {
        usize::try_from(rank)
            .ok()
            .and_then(|index| self.volumes.get(index))
    }
}

impl VolumeEngine for BoxGeometry {
    fn which_volume(&self, point: [f64; 3]) -> i64 {
        self.volumes
            .iter()
            .position(|volume| volume.contains(point))
            .and_then(|index| i64::try_from(index).ok())
            .unwrap_or(OUTSIDE_RANK)
    }

    fn nearest_surface_distance(&self, point: [f64; 3], _rank: i64, direction: [f64; 3]) -> f64 {
        self.volumes
            .iter()
            .filter_map(|volume| volume.face_distance(point, direction))
            .fold(f64::INFINITY, f64::min)
    }

    fn composition_name(&self, rank: i64) -> String {
        self.volume(rank)
            .map_or_else(default_composition, |volume| volume.composition.clone())
    }

    fn volume_count(&self) -> i64 {
        i64::try_from(self.volumes.len()).unwrap_or(i64::MAX)
    }

    fn composition_map(&self) -> BTreeMap<String, String> {
        self.volumes
            .iter()
            .map(|volume| (volume.name.clone(), volume.composition.clone()))
            .collect()
    }
}
