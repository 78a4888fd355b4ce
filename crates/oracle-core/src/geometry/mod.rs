//! Contract of the volume/composition engine the oracle queries, plus a small
//! axis-aligned box engine usable without a Tripoli-4 installation.

mod boxes;

pub use boxes::{BoxGeometry, BoxVolume, GeometryError, NO_COMPOSITION};

use std::collections::BTreeMap;

/// Rank returned by [`VolumeEngine::which_volume`] for points outside every
/// volume. Any negative rank means outside.
pub const OUTSIDE_RANK: i64 = -1;

/// Probe directions used to estimate the distance to the closest surface.
pub const PROBE_DIRECTIONS: [[f64; 3]; 6] = [
    [1.0, 0.0, 0.0],
    [-1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, -1.0, 0.0],
    [0.0, 0.0, 1.0],
    [0.0, 0.0, -1.0],
];

pub trait VolumeEngine {
    /// Rank of the volume containing `point`, negative when outside.
    fn which_volume(&self, point: [f64; 3]) -> i64;

    /// Distance from `point` to the first surface met along `direction`.
    fn nearest_surface_distance(&self, point: [f64; 3], rank: i64, direction: [f64; 3]) -> f64;

    /// Composition assigned to the volume at `rank`.
    fn composition_name(&self, rank: i64) -> String;

    fn volume_count(&self) -> i64;

    /// Volume name to composition name, as declared by the model.
    fn composition_map(&self) -> BTreeMap<String, String>;
}

/// Minimum surface distance over the six axis-aligned probe directions.
///
/// This is an approximation of the true nearest-surface distance and can
/// overestimate it for boundaries that are not axis-aligned.
pub fn probe_surface_distance<E: VolumeEngine + ?Sized>(
    engine: &E,
    point: [f64; 3],
    rank: i64,
) -> f64 {
    PROBE_DIRECTIONS
        .iter()
        .map(|direction| engine.nearest_surface_distance(point, rank, *direction))
        .fold(f64::INFINITY, f64::min)
}
