// src/address/resolver.rs
//
// Dependency resolver: reacts to a selection change at one tier by clearing
// every dependent tier and fetching the children of the new selection. Child
// fetches carry the ancestor scope they were issued with; a completed fetch
// is applied only while that scope still matches the live selection, so a
// rapid re-selection of a parent tier silently drops the stale response.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::models::{AddressField, AddressSection, OptionKind, Tier};
use super::session::{FormSession, SectionState};
use crate::services::directory::{DirectoryApi, DirectoryBundle, DirectoryError, FetchScope};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unknown option '{id}' for tier {tier:?}")]
    UnknownOption { tier: Tier, id: String },

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// A child lookup triggered by a tier selection. District fans out into two
/// independent fetches: the combined tier-3 list (which also carries police
/// stations) and the post office list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChildFetch {
    Districts,
    Tier3AndPolice,
    PostOffices,
    Tier4,
}

impl ChildFetch {
    /// Cache tiers this fetch populates; their loading flags bracket it.
    fn target_tiers(&self) -> &'static [Tier] {
        match self {
            ChildFetch::Districts => &[Tier::District],
            ChildFetch::Tier3AndPolice => &[Tier::UpazilaOrCityCorporation, Tier::PoliceStation],
            ChildFetch::PostOffices => &[Tier::PostOffice],
            ChildFetch::Tier4 => &[Tier::UnionOrMunicipality],
        }
    }

    fn apply(&self, state: &mut SectionState, bundle: DirectoryBundle) {
        match self {
            ChildFetch::Districts => {
                state.cache.set_options(Tier::District, bundle.districts);
            }
            ChildFetch::Tier3AndPolice => {
                state
                    .cache
                    .set_options(Tier::UpazilaOrCityCorporation, bundle.merged_tier3());
                state
                    .cache
                    .set_options(Tier::PoliceStation, bundle.police_stations);
            }
            ChildFetch::PostOffices => {
                state.cache.set_options(Tier::PostOffice, bundle.post_offices);
            }
            ChildFetch::Tier4 => {
                state
                    .cache
                    .set_options(Tier::UnionOrMunicipality, bundle.merged_tier4());
            }
        }
    }
}

fn nonempty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// The scope this fetch kind would be issued with right now, derived from the
/// live form values. Compared against the issued scope to detect staleness.
pub(crate) fn live_scope(state: &SectionState, fetch: ChildFetch) -> FetchScope {
    let values = state.form.values();
    match fetch {
        ChildFetch::Districts => FetchScope {
            division_id: nonempty(&values.division_id),
            district_id: None,
            upazila_id: None,
        },
        ChildFetch::Tier3AndPolice => FetchScope {
            division_id: nonempty(&values.division_id),
            district_id: nonempty(&values.district_id),
            upazila_id: None,
        },
        ChildFetch::PostOffices => FetchScope {
            division_id: None,
            district_id: nonempty(&values.district_id),
            upazila_id: None,
        },
        ChildFetch::Tier4 => FetchScope {
            division_id: nonempty(&values.division_id),
            district_id: nonempty(&values.district_id),
            upazila_id: nonempty(&values.upazila_id),
        },
    }
}

pub struct DependencyResolver {
    directory: Arc<dyn DirectoryApi>,
}

impl DependencyResolver {
    pub fn new(directory: Arc<dyn DirectoryApi>) -> Self {
        Self { directory }
    }

    /// Load the root division list for a freshly created (empty) form.
    pub async fn load_divisions(
        &self,
        session: &Arc<RwLock<FormSession>>,
        section: AddressSection,
    ) -> Result<(), ResolveError> {
        {
            let mut guard = session.write().await;
            guard
                .section_mut(section)
                .cache
                .set_loading(Tier::Division, true);
        }

        let result = self.directory.fetch_dropdown(&FetchScope::root()).await;

        let mut guard = session.write().await;
        let state = guard.section_mut(section);
        state.cache.set_loading(Tier::Division, false);
        match result {
            Ok(bundle) => {
                state.cache.set_options(Tier::Division, bundle.divisions);
                Ok(())
            }
            Err(e) => {
                warn!(section = section.as_str(), error = %e, "Division list fetch failed");
                Err(ResolveError::Directory(e))
            }
        }
    }

    /// Apply a user selection: `(changed_tier, new_unit_id)`. An empty unit
    /// id clears the tier. Every strictly-deeper tier's fields and option
    /// lists are invalidated, then the children of the new selection are
    /// fetched (concurrently where the tier fans out).
    pub async fn select(
        &self,
        session: &Arc<RwLock<FormSession>>,
        section: AddressSection,
        tier: Tier,
        unit_id: &str,
    ) -> Result<(), ResolveError> {
        let fetches: Vec<(ChildFetch, FetchScope)> = {
            let mut guard = session.write().await;
            guard.touch();
            let state = guard.section_mut(section);

            let routed_kind = route_selection(state, tier, unit_id)?;
            let fetches = child_fetches(state, tier, routed_kind);

            // Dependent selections are always invalidated. Option lists are
            // dropped only for tiers this change does not refetch; a tier
            // about to be refetched keeps its previous list (behind a loading
            // flag) so a failed fetch leaves the prior options in place.
            let refetched: Vec<Tier> = fetches
                .iter()
                .flat_map(|(fetch, _)| fetch.target_tiers().iter().copied())
                .collect();
            for dependent in tier.dependent_tiers() {
                for field in dependent.fields() {
                    state.form.clear(*field);
                }
                if !refetched.contains(dependent) {
                    state.cache.clear_options(*dependent);
                }
            }
            for target in &refetched {
                state.cache.set_loading(*target, true);
            }
            fetches
        };

        debug!(
            section = section.as_str(),
            tier = ?tier,
            unit_id,
            fetches = fetches.len(),
            "Applied tier selection"
        );

        match fetches.as_slice() {
            [] => Ok(()),
            [(fetch, scope)] => self.run_child_fetch(session, section, *fetch, scope).await,
            [(fa, sa), (fb, sb)] => {
                // Sibling fetches are independent; issue them concurrently
                let (ra, rb) = tokio::join!(
                    self.run_child_fetch(session, section, *fa, sa),
                    self.run_child_fetch(session, section, *fb, sb),
                );
                ra.and(rb)
            }
            more => {
                for (fetch, scope) in more {
                    self.run_child_fetch(session, section, *fetch, scope).await?;
                }
                Ok(())
            }
        }
    }

    async fn run_child_fetch(
        &self,
        session: &Arc<RwLock<FormSession>>,
        section: AddressSection,
        fetch: ChildFetch,
        scope: &FetchScope,
    ) -> Result<(), ResolveError> {
        let result = self.directory.fetch_dropdown(scope).await;

        let mut guard = session.write().await;
        let state = guard.section_mut(section);

        if live_scope(state, fetch) != *scope {
            // The parent selection moved on while this fetch was in flight;
            // the newer fetch owns the cache and the loading flags now.
            debug!(
                section = section.as_str(),
                fetch = ?fetch,
                scope = ?scope,
                "Discarding stale dropdown response"
            );
            return Ok(());
        }

        for target in fetch.target_tiers() {
            state.cache.set_loading(*target, false);
        }

        match result {
            Ok(bundle) => {
                fetch.apply(state, bundle);
                Ok(())
            }
            Err(e) => {
                // Previous (now stale) list stays in place; the client can
                // re-trigger by re-selecting the parent tier.
                warn!(
                    section = section.as_str(),
                    fetch = ?fetch,
                    error = %e,
                    "Child tier fetch failed"
                );
                Err(ResolveError::Directory(e))
            }
        }
    }
}

/// Write the selected id into the right form field, routing merged-dropdown
/// choices by their kind tag. Clearing a tier (empty id) also drops every
/// dependent option list, since nothing will refetch them.
/// Returns the kind of the selected option, if any.
fn route_selection(
    state: &mut SectionState,
    tier: Tier,
    unit_id: &str,
) -> Result<Option<OptionKind>, ResolveError> {
    if unit_id.is_empty() {
        for field in tier.fields() {
            state.form.clear(*field);
        }
        for dependent in tier.dependent_tiers() {
            state.cache.clear_options(*dependent);
        }
        Ok(None)
    } else {
        let option = state
            .cache
            .find(tier, unit_id)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownOption {
                tier,
                id: unit_id.to_string(),
            })?;

        match (tier, option.kind) {
            (Tier::Division, OptionKind::Division) => {
                state.form.set_value(AddressField::DivisionId, unit_id);
            }
            (Tier::District, OptionKind::District) => {
                state.form.set_value(AddressField::DistrictId, unit_id);
            }
            (Tier::UpazilaOrCityCorporation, OptionKind::Upazila) => {
                state.form.set_value(AddressField::UpazilaId, unit_id);
                state.form.clear(AddressField::CityCorporationId);
            }
            (Tier::UpazilaOrCityCorporation, OptionKind::CityCorporation) => {
                state.form.set_value(AddressField::CityCorporationId, unit_id);
                state.form.clear(AddressField::UpazilaId);
            }
            (Tier::UnionOrMunicipality, OptionKind::UnionParishad) => {
                state.form.set_value(AddressField::UnionParishadId, unit_id);
                state.form.clear(AddressField::MunicipalityId);
            }
            (Tier::UnionOrMunicipality, OptionKind::Municipality) => {
                state.form.set_value(AddressField::MunicipalityId, unit_id);
                state.form.clear(AddressField::UnionParishadId);
            }
            (Tier::PoliceStation, OptionKind::PoliceStation) => {
                state.form.set_value(AddressField::PoliceStationId, unit_id);
            }
            (Tier::PostOffice, OptionKind::PostOffice) => {
                state.form.set_value(AddressField::PostOfficeId, unit_id);
            }
            // A cached option whose kind does not belong to its tier cannot
            // be routed; reject the selection.
            (tier, _) => {
                return Err(ResolveError::UnknownOption {
                    tier,
                    id: unit_id.to_string(),
                })
            }
        }
        Ok(Some(option.kind))
    }
}

/// Which child lookups a (non-empty) selection at this tier triggers.
fn child_fetches(
    state: &SectionState,
    tier: Tier,
    routed_kind: Option<OptionKind>,
) -> Vec<(ChildFetch, FetchScope)> {
    let values = state.form.values();
    match (tier, routed_kind) {
        (Tier::Division, Some(OptionKind::Division)) => vec![(
            ChildFetch::Districts,
            FetchScope::division(&values.division_id),
        )],
        (Tier::District, Some(OptionKind::District)) => vec![
            (
                ChildFetch::Tier3AndPolice,
                FetchScope::district_of(&values.division_id, &values.district_id),
            ),
            (
                ChildFetch::PostOffices,
                FetchScope::district_only(&values.district_id),
            ),
        ],
        // City corporations have no tier-4 children; only a real upazila does
        (Tier::UpazilaOrCityCorporation, Some(OptionKind::Upazila)) => vec![(
            ChildFetch::Tier4,
            FetchScope::upazila_of(
                &values.division_id,
                &values.district_id,
                &values.upazila_id,
            ),
        )],
        _ => Vec::new(),
    }
}
