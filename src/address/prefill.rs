// src/address/prefill.rs
//
// Prefill sequencer: replays the resolution chain once, tier by tier, so a
// persisted record's ids are written only after the option list they belong
// to has been fetched. Writing an id before its list loads would make the
// selection invisible, since the rendered label is looked up from the list.
//
// The chain is strictly sequential between tiers; only the tier-3 combined
// list and the post office list (both scoped by the same district) are
// fetched concurrently. An id absent from the record terminates the chain
// at that step, which is a valid final state.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::models::{AddressField, AddressSection, OptionKind, PersistedAddress, Tier};
use super::resolver::ResolveError;
use super::session::FormSession;
use crate::services::directory::{DirectoryApi, FetchScope};

/// One-shot lifecycle of the prefill chain. The latch is consumed on entry,
/// so a failed run does not re-arm; manual edits are handled exclusively by
/// the dependency resolver from then on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PrefillState {
    #[default]
    NotStarted,
    Running,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PrefillOutcome {
    /// The chain ran to its terminal step (which may be an early stop at the
    /// first absent id)
    Completed,
    /// The persisted record has no division id; there is nothing to replay
    Empty,
    /// The one-shot guard was already consumed; state is unchanged
    AlreadyRun,
}

pub struct PrefillSequencer {
    directory: Arc<dyn DirectoryApi>,
}

impl PrefillSequencer {
    pub fn new(directory: Arc<dyn DirectoryApi>) -> Self {
        Self { directory }
    }

    pub async fn run(
        &self,
        session: &Arc<RwLock<FormSession>>,
        section: AddressSection,
        record: PersistedAddress,
    ) -> Result<PrefillOutcome, ResolveError> {
        let division_id = match record.division_id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return Ok(PrefillOutcome::Empty),
        };

        {
            let mut guard = session.write().await;
            guard.touch();
            let state = guard.section_mut(section);

            if state.prefill != PrefillState::NotStarted {
                debug!(
                    session_id = %guard.id,
                    section = section.as_str(),
                    "Prefill already ran for this section; ignoring"
                );
                return Ok(PrefillOutcome::AlreadyRun);
            }
            let state = guard.section_mut(section);
            state.prefill = PrefillState::Running;

            // Free-text fields need no option list; write them up front
            if let Some(ward_no) = record.ward_no.as_deref().filter(|v| !v.is_empty()) {
                state.form.set_value(AddressField::WardNo, ward_no);
            }
            if let Some(line) = record.address_line.as_deref().filter(|v| !v.is_empty()) {
                state.form.set_value(AddressField::AddressLine, line);
            }
        }

        let outcome = self.replay(session, section, &record, &division_id).await;

        {
            let mut guard = session.write().await;
            let state = guard.section_mut(section);
            state.prefill = PrefillState::Done;
            // An aborted chain must not leave loading flags stuck
            for tier in Tier::ALL {
                state.cache.set_loading(tier, false);
            }
        }

        outcome?;

        info!(section = section.as_str(), "Prefill sequence finished");
        Ok(PrefillOutcome::Completed)
    }

    async fn replay(
        &self,
        session: &Arc<RwLock<FormSession>>,
        section: AddressSection,
        record: &PersistedAddress,
        division_id: &str,
    ) -> Result<(), ResolveError> {
        // ── Step 1: division list, then the stored division id ──
        {
            let mut guard = session.write().await;
            guard
                .section_mut(section)
                .cache
                .set_loading(Tier::Division, true);
        }
        let bundle = self.directory.fetch_dropdown(&FetchScope::root()).await?;
        {
            let mut guard = session.write().await;
            let state = guard.section_mut(section);
            state.cache.set_options(Tier::Division, bundle.divisions);
            state.cache.set_loading(Tier::Division, false);
            state.form.set_value(AddressField::DivisionId, division_id);
        }

        let district_id = match record.district_id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return Ok(()),
        };

        // ── Step 2: districts scoped by the division ──
        {
            let mut guard = session.write().await;
            guard
                .section_mut(section)
                .cache
                .set_loading(Tier::District, true);
        }
        let bundle = self
            .directory
            .fetch_dropdown(&FetchScope::division(division_id))
            .await?;
        {
            let mut guard = session.write().await;
            let state = guard.section_mut(section);
            state.cache.set_options(Tier::District, bundle.districts);
            state.cache.set_loading(Tier::District, false);
            state.form.set_value(AddressField::DistrictId, &district_id);
        }

        // The merged tier-3 id may be either an upazila or a city corporation
        let tier3_id = record
            .upazila_id
            .as_deref()
            .filter(|v| !v.is_empty())
            .or(record.city_corporation_id.as_deref().filter(|v| !v.is_empty()))
            .map(str::to_string);

        let tier3_id = match tier3_id {
            Some(id) => id,
            None => return Ok(()),
        };

        // ── Step 3: tier-3 combined + police stations, and post offices,
        //    both scoped by the district, fetched concurrently ──
        {
            let mut guard = session.write().await;
            let state = guard.section_mut(section);
            state.cache.set_loading(Tier::UpazilaOrCityCorporation, true);
            state.cache.set_loading(Tier::PoliceStation, true);
            state.cache.set_loading(Tier::PostOffice, true);
        }
        let combined_scope = FetchScope::district_of(division_id, &district_id);
        let post_office_scope = FetchScope::district_only(&district_id);
        let (combined, post_offices) = tokio::join!(
            self.directory.fetch_dropdown(&combined_scope),
            self.directory.fetch_dropdown(&post_office_scope),
        );
        let combined = combined?;
        let post_offices = post_offices?;
        {
            let mut guard = session.write().await;
            let state = guard.section_mut(section);
            state
                .cache
                .set_options(Tier::UpazilaOrCityCorporation, combined.merged_tier3());
            state
                .cache
                .set_options(Tier::PoliceStation, combined.police_stations);
            state
                .cache
                .set_options(Tier::PostOffice, post_offices.post_offices);
            state.cache.set_loading(Tier::UpazilaOrCityCorporation, false);
            state.cache.set_loading(Tier::PoliceStation, false);
            state.cache.set_loading(Tier::PostOffice, false);

            // Route the stored id into the correct hidden sub-field by
            // inspecting the kind tag on the freshly fetched option
            match state
                .cache
                .find(Tier::UpazilaOrCityCorporation, &tier3_id)
                .map(|o| o.kind)
            {
                Some(OptionKind::Upazila) => {
                    state.form.set_value(AddressField::UpazilaId, &tier3_id);
                    state.form.clear(AddressField::CityCorporationId);
                }
                Some(OptionKind::CityCorporation) => {
                    state
                        .form
                        .set_value(AddressField::CityCorporationId, &tier3_id);
                    state.form.clear(AddressField::UpazilaId);
                }
                _ => {
                    warn!(
                        section = section.as_str(),
                        unit_id = %tier3_id,
                        "Persisted tier-3 id not present in fetched list; leaving unresolved"
                    );
                }
            }

            if let Some(ps) = record.police_station_id.as_deref().filter(|v| !v.is_empty()) {
                state.form.set_value(AddressField::PoliceStationId, ps);
            }
            if let Some(po) = record.post_office_id.as_deref().filter(|v| !v.is_empty()) {
                state.form.set_value(AddressField::PostOfficeId, po);
            }
        }

        // ── Step 4: union parishads / municipalities, only under a real
        //    upazila (city corporations have no tier-4 children) ──
        let upazila_id = match record.upazila_id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return Ok(()),
        };
        let tier4_id = record
            .union_parishad_id
            .as_deref()
            .filter(|v| !v.is_empty())
            .or(record.municipality_id.as_deref().filter(|v| !v.is_empty()))
            .map(str::to_string);

        let tier4_id = match tier4_id {
            Some(id) => id,
            None => return Ok(()),
        };

        {
            let mut guard = session.write().await;
            guard
                .section_mut(section)
                .cache
                .set_loading(Tier::UnionOrMunicipality, true);
        }
        let bundle = self
            .directory
            .fetch_dropdown(&FetchScope::upazila_of(
                division_id,
                &district_id,
                &upazila_id,
            ))
            .await?;
        {
            let mut guard = session.write().await;
            let state = guard.section_mut(section);
            state
                .cache
                .set_options(Tier::UnionOrMunicipality, bundle.merged_tier4());
            state.cache.set_loading(Tier::UnionOrMunicipality, false);

            match state
                .cache
                .find(Tier::UnionOrMunicipality, &tier4_id)
                .map(|o| o.kind)
            {
                Some(OptionKind::UnionParishad) => {
                    state.form.set_value(AddressField::UnionParishadId, &tier4_id);
                    state.form.clear(AddressField::MunicipalityId);
                }
                Some(OptionKind::Municipality) => {
                    state.form.set_value(AddressField::MunicipalityId, &tier4_id);
                    state.form.clear(AddressField::UnionParishadId);
                }
                _ => {
                    warn!(
                        section = section.as_str(),
                        unit_id = %tier4_id,
                        "Persisted tier-4 id not present in fetched list; leaving unresolved"
                    );
                }
            }
        }

        Ok(())
    }
}
