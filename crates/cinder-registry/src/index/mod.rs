//! Read-only snapshot of the installed packs.
//!
//! Built once after loading completes; every resolution context borrows
//! the same index and never mutates it.

use cinder_core::{PackId, PackRequirement};
use indexmap::IndexMap;

use crate::model::{Board, Component, Device, Pack};

/// Immutable installed-pack index, ordered by pack id
#[derive(Debug, Default)]
pub struct PackIndex {
    packs: Vec<Pack>,
}

impl PackIndex {
    pub fn new(mut packs: Vec<Pack>) -> Self {
        packs.sort_by(|a, b| a.id.cmp(&b.id));
        Self { packs }
    }

    pub fn len(&self) -> usize {
        self.packs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pack> {
        self.packs.iter()
    }

    pub fn find(&self, id: &PackId) -> Option<&Pack> {
        self.packs.iter().find(|pack| &pack.id == id)
    }

    /// Installed packs satisfying `requirement`, in id order
    pub fn match_requirement(&self, requirement: &PackRequirement) -> Vec<&Pack> {
        self.packs
            .iter()
            .filter(|pack| requirement.matches(&pack.id))
            .collect()
    }

    /// The highest installed version of every (vendor, name)
    pub fn latest(&self) -> Vec<&Pack> {
        Self::latest_per_key(self.iter())
    }

    /// Reduce `packs` to the highest version per (vendor, name), keeping
    /// first-appearance key order
    pub fn latest_per_key<'a>(packs: impl IntoIterator<Item = &'a Pack>) -> Vec<&'a Pack> {
        let mut best: IndexMap<String, &Pack> = IndexMap::new();
        for pack in packs {
            match best.get_mut(&pack.id.pack_key()) {
                Some(current) if current.id.version >= pack.id.version => {}
                Some(current) => *current = pack,
                None => {
                    best.insert(pack.id.pack_key(), pack);
                }
            }
        }
        best.into_values().collect()
    }

    /// Every component across the index with its owning pack
    pub fn components(&self) -> impl Iterator<Item = (&Pack, &Component)> {
        self.packs
            .iter()
            .flat_map(|pack| pack.components.iter().map(move |c| (pack, c)))
    }

    /// Every device definition with its owning pack
    pub fn devices(&self) -> impl Iterator<Item = (&Pack, &Device)> {
        self.packs
            .iter()
            .flat_map(|pack| pack.devices.iter().map(move |d| (pack, d)))
    }

    /// Every board definition with its owning pack
    pub fn boards(&self) -> impl Iterator<Item = (&Pack, &Board)> {
        self.packs
            .iter()
            .flat_map(|pack| pack.boards.iter().map(move |b| (pack, b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_core::Version;

    fn pack(vendor: &str, name: &str, version: &str) -> Pack {
        Pack {
            id: PackId::new(vendor, name, version.parse::<Version>().unwrap()),
            path: format!("packs/{vendor}/{name}/{version}/pack.toml").into(),
            description: String::new(),
            components: Vec::new(),
            apis: Vec::new(),
            devices: Vec::new(),
            boards: Vec::new(),
            conditions: IndexMap::new(),
        }
    }

    fn index() -> PackIndex {
        PackIndex::new(vec![
            pack("ARM", "RteTest_DFP", "0.2.0"),
            pack("ARM", "RteTest_DFP", "0.1.1"),
            pack("ARM", "RteTest", "0.1.0"),
            pack("ARM", "RteTestGenerator", "0.1.0"),
            pack("ARM", "RteTestBoard", "0.1.0"),
        ])
    }

    #[test]
    fn test_index_orders_by_id() {
        let index = index();
        let ids: Vec<String> = index.iter().map(|p| p.id.to_string()).collect();
        assert_eq!(
            ids,
            vec![
                "ARM::RteTest@0.1.0",
                "ARM::RteTestBoard@0.1.0",
                "ARM::RteTestGenerator@0.1.0",
                "ARM::RteTest_DFP@0.1.1",
                "ARM::RteTest_DFP@0.2.0",
            ]
        );
    }

    #[test]
    fn test_match_requirement_exact_version() {
        let index = index();
        let req = PackRequirement::parse("ARM::RteTest_DFP@0.1.1").unwrap();
        let matched = index.match_requirement(&req);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id.to_string(), "ARM::RteTest_DFP@0.1.1");
    }

    #[test]
    fn test_match_requirement_wildcard() {
        let index = index();
        let req = PackRequirement::parse("ARM::*Gen*").unwrap();
        let matched = index.match_requirement(&req);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id.to_string(), "ARM::RteTestGenerator@0.1.0");

        let req = PackRequirement::parse("keil::*").unwrap();
        assert!(index.match_requirement(&req).is_empty());
    }

    #[test]
    fn test_latest_keeps_highest_version_per_key() {
        let index = index();
        let latest: Vec<String> = index.latest().iter().map(|p| p.id.to_string()).collect();
        assert_eq!(latest.len(), 4);
        assert!(latest.contains(&"ARM::RteTest_DFP@0.2.0".to_string()));
        assert!(!latest.contains(&"ARM::RteTest_DFP@0.1.1".to_string()));
    }

    #[test]
    fn test_find_by_id() {
        let index = index();
        let id = PackId::new("ARM", "RteTest", Version::new(0, 1, 0));
        assert!(index.find(&id).is_some());
        let missing = PackId::new("ARM", "RteTest", Version::new(9, 9, 9));
        assert!(index.find(&missing).is_none());
    }
}
