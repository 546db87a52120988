// src/address/cache.rs
//
// Hierarchy cache: the most recently fetched option list per tier plus a
// per-tier loading flag. Lists are small bounded reference data and are
// simply overwritten on every fetch; no eviction.

use std::collections::HashMap;

use super::models::{Tier, TierListSnapshot, TierLoadingSnapshot, TierOption};

#[derive(Debug, Default)]
pub struct HierarchyCache {
    options: HashMap<Tier, Vec<TierOption>>,
    loading: HashMap<Tier, bool>,
}

impl HierarchyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the option list for a tier, sorted case-insensitively by
    /// display name. Post office options already carry the post office name
    /// as their display name, so the same ordering applies.
    pub fn set_options(&mut self, tier: Tier, mut units: Vec<TierOption>) {
        units.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        self.options.insert(tier, units);
    }

    pub fn clear_options(&mut self, tier: Tier) {
        self.options.remove(&tier);
    }

    pub fn options(&self, tier: Tier) -> &[TierOption] {
        self.options.get(&tier).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Look up an option by id within a tier's current list.
    pub fn find(&self, tier: Tier, id: &str) -> Option<&TierOption> {
        self.options(tier).iter().find(|u| u.id == id)
    }

    pub fn set_loading(&mut self, tier: Tier, loading: bool) {
        self.loading.insert(tier, loading);
    }

    pub fn is_loading(&self, tier: Tier) -> bool {
        self.loading.get(&tier).copied().unwrap_or(false)
    }

    pub fn options_snapshot(&self) -> TierListSnapshot {
        TierListSnapshot {
            divisions: self.options(Tier::Division).to_vec(),
            districts: self.options(Tier::District).to_vec(),
            upazila_city_corporations: self.options(Tier::UpazilaOrCityCorporation).to_vec(),
            union_municipalities: self.options(Tier::UnionOrMunicipality).to_vec(),
            police_stations: self.options(Tier::PoliceStation).to_vec(),
            post_offices: self.options(Tier::PostOffice).to_vec(),
        }
    }

    pub fn loading_snapshot(&self) -> TierLoadingSnapshot {
        TierLoadingSnapshot {
            divisions: self.is_loading(Tier::Division),
            districts: self.is_loading(Tier::District),
            upazila_city_corporations: self.is_loading(Tier::UpazilaOrCityCorporation),
            union_municipalities: self.is_loading(Tier::UnionOrMunicipality),
            police_stations: self.is_loading(Tier::PoliceStation),
            post_offices: self.is_loading(Tier::PostOffice),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::models::OptionKind;

    fn opt(id: &str, name: &str, kind: OptionKind) -> TierOption {
        TierOption {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            post_code: None,
        }
    }

    #[test]
    fn test_set_options_sorts_case_insensitively() {
        let mut cache = HierarchyCache::new();
        cache.set_options(
            Tier::District,
            vec![
                opt("2", "gazipur", OptionKind::District),
                opt("1", "Dhaka", OptionKind::District),
                opt("3", "COMILLA", OptionKind::District),
            ],
        );

        let names: Vec<&str> = cache
            .options(Tier::District)
            .iter()
            .map(|u| u.name.as_str())
            .collect();
        assert_eq!(names, vec!["COMILLA", "Dhaka", "gazipur"]);
    }

    #[test]
    fn test_overwrite_replaces_previous_list() {
        let mut cache = HierarchyCache::new();
        cache.set_options(
            Tier::Division,
            vec![opt("6", "DHAKA", OptionKind::Division)],
        );
        cache.set_options(
            Tier::Division,
            vec![opt("7", "KHULNA", OptionKind::Division)],
        );

        assert!(cache.find(Tier::Division, "6").is_none());
        assert!(cache.find(Tier::Division, "7").is_some());
    }

    #[test]
    fn test_loading_flags_default_false() {
        let mut cache = HierarchyCache::new();
        assert!(!cache.is_loading(Tier::PostOffice));

        cache.set_loading(Tier::PostOffice, true);
        assert!(cache.is_loading(Tier::PostOffice));

        cache.set_loading(Tier::PostOffice, false);
        assert!(!cache.is_loading(Tier::PostOffice));
    }
}
