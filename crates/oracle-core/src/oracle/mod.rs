//! Weak-equivalence oracle: decides, point by point, whether the MCNP and the
//! Tripoli-4 geometries agree on the material found at a sampled position.

mod equivalence;

pub use equivalence::{EquivalenceMap, decode_composition_name};

use crate::common::OracleConfig;
use crate::domain::{OracleError, OracleResult, Outcome, PtracRecord};
use crate::geometry::{VolumeEngine, probe_surface_distance};

/// Result of classifying one sampled point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub outcome: Outcome,
    /// Volume rank containing the point, negative when outside.
    pub rank: i64,
    /// Probed surface distance, only measured on a composition mismatch.
    pub surface_distance: Option<f64>,
}

impl Classification {
    fn new(outcome: Outcome, rank: i64) -> Self {
        Self {
            outcome,
            rank,
            surface_distance: None,
        }
    }
}

pub struct EquivalenceOracle<'e, E: VolumeEngine + ?Sized> {
    engine: &'e E,
    associations: EquivalenceMap,
    delta: f64,
    guess_material_assocs: bool,
}

impl<'e, E: VolumeEngine + ?Sized> EquivalenceOracle<'e, E> {
    /// Without association guessing the map is seeded from the composition
    /// names declared by the engine.
    pub fn new(engine: &'e E, config: &OracleConfig) -> Self {
        let mut associations = EquivalenceMap::default();
        if !config.guess_material_assocs {
            let compositions = engine.composition_map();
            associations.seed_from_compositions(compositions.values().map(String::as_str));
        }
        Self {
            engine,
            associations,
            delta: config.delta,
            guess_material_assocs: config.guess_material_assocs,
        }
    }

    pub fn associations(&self) -> &EquivalenceMap {
        &self.associations
    }

    pub fn classify(
        &mut self,
        record: &PtracRecord,
        signature: &str,
    ) -> OracleResult<Classification> {
        let rank = self.engine.which_volume(record.position);
        if rank < 0 {
            return Ok(Classification::new(Outcome::Outside, rank));
        }

        let composition = self.engine.composition_name(rank);
        let Some(expected) = self.associations.composition_for(signature) else {
            if !self.guess_material_assocs {
                return Err(OracleError::computation(
                    "RUN.UNMAPPED_SIGNATURE",
                    format!(
                        "MCNP material signature '{}' (cell {}, point {}) \
                         has no seeded composition",
                        signature, record.cell_id, record.point_id
                    ),
                ));
            }
            self.associations.associate(signature, &composition);
            return Ok(Classification::new(Outcome::Success, rank));
        };

        if expected == composition {
            return Ok(Classification::new(Outcome::Success, rank));
        }

        let distance = probe_surface_distance(self.engine, record.position, rank);
        let outcome = if distance <= self.delta {
            Outcome::Ignored
        } else {
            Outcome::Failure
        };
        tracing::debug!(
            point = record.point_id,
            cell = record.cell_id,
            signature,
            expected,
            found = %composition,
            distance,
            %outcome,
            "composition mismatch"
        );
        Ok(Classification {
            outcome,
            rank,
            surface_distance: Some(distance),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::EquivalenceOracle;
    use crate::common::OracleConfig;
    use crate::domain::{OracleErrorCategory, Outcome, PtracRecord};
    use crate::geometry::{BoxGeometry, BoxVolume};

    fn slab_geometry() -> BoxGeometry {
        BoxGeometry::new(vec![
            BoxVolume {
                name: "left".to_string(),
                composition: "m1_-2.7".to_string(),
                min: [-10.0, -10.0, -10.0],
                max: [0.0, 10.0, 10.0],
            },
            BoxVolume {
                name: "right".to_string(),
                composition: "m2_-8.9".to_string(),
                min: [0.0, -10.0, -10.0],
                max: [10.0, 10.0, 10.0],
            },
        ])
        .unwrap()
    }

    fn record_at(position: [f64; 3]) -> PtracRecord {
        PtracRecord {
            point_id: 1,
            event_id: 1000,
            cell_id: 10,
            material_id: 1,
            position,
        }
    }

    fn guessing() -> OracleConfig {
        OracleConfig {
            guess_material_assocs: true,
            ..OracleConfig::default()
        }
    }

    #[test]
    fn first_sighting_defines_the_association() {
        let geometry = slab_geometry();
        let mut oracle = EquivalenceOracle::new(&geometry, &guessing());

        let first = oracle.classify(&record_at([-5.0, 0.0, 0.0]), "1_-2.7").unwrap();
        assert_eq!(first.outcome, Outcome::Success);
        assert_eq!(first.rank, 0);

        let changed = oracle.classify(&record_at([5.0, 0.0, 0.0]), "1_-2.7").unwrap();
        assert_eq!(changed.outcome, Outcome::Failure);
        assert_eq!(changed.surface_distance, Some(5.0));
        assert_eq!(oracle.associations().composition_for("1_-2.7"), Some("m1_-2.7"));
    }

    #[test]
    fn mismatch_on_a_boundary_is_ignored() {
        let geometry = slab_geometry();
        let mut oracle = EquivalenceOracle::new(&geometry, &guessing());
        oracle.classify(&record_at([5.0, 0.0, 0.0]), "1_-2.7").unwrap();

        let on_surface = oracle.classify(&record_at([0.0, 1.0, 1.0]), "1_-2.7").unwrap();
        assert_eq!(on_surface.outcome, Outcome::Ignored);
        assert_eq!(on_surface.surface_distance, Some(0.0));
    }

    #[test]
    fn points_outside_the_geometry_are_not_compared() {
        let geometry = slab_geometry();
        let mut oracle = EquivalenceOracle::new(&geometry, &guessing());

        let outside = oracle.classify(&record_at([50.0, 0.0, 0.0]), "1_-2.7").unwrap();
        assert_eq!(outside.outcome, Outcome::Outside);
        assert!(outside.rank < 0);
        assert!(oracle.associations().is_empty());
    }

    #[test]
    fn seeded_oracle_detects_mismatch_on_first_point() {
        let geometry = slab_geometry();
        let mut oracle = EquivalenceOracle::new(&geometry, &OracleConfig::default());
        assert_eq!(oracle.associations().len(), 2);

        let matching = oracle.classify(&record_at([-5.0, 0.0, 0.0]), "1_-2.7").unwrap();
        assert_eq!(matching.outcome, Outcome::Success);

        let swapped = oracle.classify(&record_at([-5.0, 0.0, 0.0]), "2_-8.9").unwrap();
        assert_eq!(swapped.outcome, Outcome::Failure);
    }

    #[test]
    fn seeded_oracle_rejects_unknown_signatures() {
        let geometry = slab_geometry();
        let mut oracle = EquivalenceOracle::new(&geometry, &OracleConfig::default());

        let error = oracle
            .classify(&record_at([-5.0, 0.0, 0.0]), "7_-1.0")
            .unwrap_err();
        assert_eq!(error.category(), OracleErrorCategory::ComputationError);
        assert_eq!(error.placeholder(), "RUN.UNMAPPED_SIGNATURE");
    }

    #[test]
    fn delta_widens_the_ignored_band() {
        let geometry = slab_geometry();
        let config = OracleConfig {
            delta: 0.5,
            ..guessing()
        };
        let mut oracle = EquivalenceOracle::new(&geometry, &config);
        oracle.classify(&record_at([5.0, 0.0, 0.0]), "1_-2.7").unwrap();

        let near = oracle.classify(&record_at([-0.4, 0.0, 0.0]), "1_-2.7").unwrap();
        assert_eq!(near.outcome, Outcome::Ignored);
        let far = oracle.classify(&record_at([-0.6, 0.0, 0.0]), "1_-2.7").unwrap();
        assert_eq!(far.outcome, Outcome::Failure);
    }
}
