use crate::domain::{CellSignature, OracleError, OracleResult};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// Cell number to resolved material signature. Each cell is registered at
/// most once; the first definition stays authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellDensityMap {
    cells: BTreeMap<u32, CellSignature>,
}

impl CellDensityMap {
    /// Returns `false`, leaving the map untouched, when the cell is already
    /// registered.
    pub fn insert(&mut self, cell_id: u32, signature: CellSignature) -> bool {
        match self.cells.entry(cell_id) {
            Entry::Vacant(slot) => {
                slot.insert(signature);
                true
            }
            Entry::Occupied(existing) => {
                tracing::warn!(
                    cell_id,
                    kept = %existing.get(),
                    ignored = %signature,
                    "duplicate MCNP cell definition ignored"
                );
                false
            }
        }
    }

    pub fn get(&self, cell_id: u32) -> Option<&CellSignature> {
        self.cells.get(&cell_id)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// What the comparison needs from an MCNP input deck.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct McnpInput {
    pub(super) cells: CellDensityMap,
    pub(super) nps: Option<u64>,
}

impl McnpInput {
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Declared number of histories (`NPS` card), if any.
    pub fn nps(&self) -> Option<u64> {
        self.nps
    }

    pub fn register_cell(&mut self, cell_id: u32, signature: CellSignature) -> bool {
        self.cells.insert(cell_id, signature)
    }

    pub fn signature(&self, cell_id: u32) -> Option<&CellSignature> {
        self.cells.get(cell_id)
    }

    /// `<materialID>_<density>` for a registered cell.
    pub fn density_signature(&self, cell_id: u32) -> OracleResult<String> {
        self.cells
            .get(cell_id)
            .map(CellSignature::key)
            .ok_or_else(|| {
                OracleError::computation(
                    "RUN.MCNP_UNKNOWN_CELL",
                    format!("cell {} is not defined in the MCNP input", cell_id),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::{CellDensityMap, McnpInput};
    use crate::domain::{CellSignature, OracleErrorCategory};

    #[test]
    fn duplicate_cells_keep_the_first_signature() {
        let mut map = CellDensityMap::default();
        assert!(map.insert(7, CellSignature::new(1, "-2.7")));
        assert!(!map.insert(7, CellSignature::new(2, "-8.9")));

        assert_eq!(map.len(), 1);
        assert_eq!(map.get(7), Some(&CellSignature::new(1, "-2.7")));
    }

    #[test]
    fn density_signature_formats_material_and_density() {
        let mut input = McnpInput::default();
        input.register_cell(3001, CellSignature::new(345, "-2.7"));
        input.register_cell(1000, CellSignature::void());

        assert_eq!(input.density_signature(3001).unwrap(), "345_-2.7");
        assert_eq!(input.density_signature(1000).unwrap(), "0_void");
    }

    #[test]
    fn unknown_cell_lookup_is_an_error() {
        let input = McnpInput::default();
        let error = input.density_signature(42).unwrap_err();
        assert_eq!(error.category(), OracleErrorCategory::ComputationError);
        assert_eq!(error.placeholder(), "RUN.MCNP_UNKNOWN_CELL");
    }
}
