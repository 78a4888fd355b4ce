use crate::domain::{CellSignature, VOID_DENSITY};
use crate::geometry::NO_COMPOSITION;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// MCNP signature (`<materialID>_<density>`) to Tripoli-4 composition name.
/// An association never changes once recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EquivalenceMap {
    associations: BTreeMap<String, String>,
}

impl EquivalenceMap {
    /// Records `signature -> composition` unless the signature is already
    /// associated. Returns whether the association was added.
    pub fn associate(&mut self, signature: &str, composition: &str) -> bool {
        match self.associations.entry(signature.to_string()) {
            Entry::Vacant(slot) => {
                tracing::debug!(signature, composition, "new material association");
                slot.insert(composition.to_string());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn composition_for(&self, signature: &str) -> Option<&str> {
        self.associations.get(signature).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.associations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.associations.is_empty()
    }

    /// Seeds associations from composition names that encode their MCNP
    /// signature. Returns the number of associations added.
    pub fn seed_from_compositions<'a, I>(&mut self, compositions: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut added = 0;
        for composition in compositions {
            if composition == NO_COMPOSITION {
                continue;
            }
            match decode_composition_name(composition) {
                Some(signature) => {
                    if self.associate(&signature.key(), composition) {
                        added += 1;
                    }
                }
                None => tracing::warn!(
                    composition,
                    "composition name does not encode an MCNP material signature"
                ),
            }
        }
        tracing::info!(associations = added, "seeded material associations");
        added
    }
}

/// Decodes `<prefix><index>_<density>` (for example `m12_-2.7`) into the MCNP
/// signature it names. Index `0` is the void material.
pub fn decode_composition_name(name: &str) -> Option<CellSignature> {
    let (head, density) = name.split_once('_')?;
    let index = match head.chars().next() {
        Some(first) if !first.is_ascii_digit() => &head[first.len_utf8()..],
        _ => head,
    };
    let material_id = index.parse::<u32>().ok()?;
    if material_id == 0 {
        return Some(CellSignature::void());
    }
    if density.is_empty() || density == VOID_DENSITY {
        return None;
    }
    Some(CellSignature::new(material_id, density))
}
