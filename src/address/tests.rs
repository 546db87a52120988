//! Tests for the address module
//!
//! These tests verify the cascading address resolution core:
//! - Dependency resolver invalidation and sibling routing
//! - Prefill sequencer ordering and one-shot guard
//! - Stale-response discard under rapid re-selection
//! - Submission payload flattening and validators

#[cfg(test)]
mod tests {
    use super::super::models::*;
    use super::super::prefill::{PrefillOutcome, PrefillSequencer, PrefillState};
    use super::super::resolver::{DependencyResolver, ResolveError};
    use super::super::session::{FormSession, SessionStore};
    use super::super::validators::AddressFormValidator;
    use crate::common::Validator;
    use crate::services::directory::{
        DirectoryApi, DirectoryBundle, DirectoryError, FetchScope,
    };

    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::{Notify, RwLock};

    // ========================================================================
    // Stub directory
    // ========================================================================

    /// In-memory directory over a small fixed hierarchy. Records every fetch
    /// scope; individual scopes can be gated (to control arrival order) or
    /// made to fail.
    struct StubDirectory {
        calls: Mutex<Vec<FetchScope>>,
        gates: Mutex<HashMap<FetchScope, Arc<Notify>>>,
        failures: Mutex<HashSet<FetchScope>>,
    }

    impl StubDirectory {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                gates: Mutex::new(HashMap::new()),
                failures: Mutex::new(HashSet::new()),
            })
        }

        fn calls(&self) -> Vec<FetchScope> {
            self.calls.lock().unwrap().clone()
        }

        /// Make fetches for `scope` wait until the returned handle is notified.
        fn gate(&self, scope: FetchScope) -> Arc<Notify> {
            let notify = Arc::new(Notify::new());
            self.gates.lock().unwrap().insert(scope, notify.clone());
            notify
        }

        fn fail_on(&self, scope: FetchScope) {
            self.failures.lock().unwrap().insert(scope);
        }
    }

    fn unit(id: &str, name: &str, kind: OptionKind) -> TierOption {
        TierOption {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            post_code: None,
        }
    }

    fn post_office(id: &str, name: &str, code: &str) -> TierOption {
        TierOption {
            id: id.to_string(),
            name: name.to_string(),
            kind: OptionKind::PostOffice,
            post_code: Some(code.to_string()),
        }
    }

    fn fixture_bundle(scope: &FetchScope) -> DirectoryBundle {
        let key = (
            scope.division_id.as_deref(),
            scope.district_id.as_deref(),
            scope.upazila_id.as_deref(),
        );
        match key {
            (None, None, None) => DirectoryBundle {
                divisions: vec![
                    unit("6", "DHAKA", OptionKind::Division),
                    unit("7", "KHULNA", OptionKind::Division),
                ],
                ..Default::default()
            },
            (Some("6"), None, None) => DirectoryBundle {
                districts: vec![
                    unit("33", "GAZIPUR", OptionKind::District),
                    unit("34", "NARSINGDI", OptionKind::District),
                ],
                ..Default::default()
            },
            (Some("7"), None, None) => DirectoryBundle {
                districts: vec![unit("55", "BAGERHAT", OptionKind::District)],
                ..Default::default()
            },
            (Some("6"), Some("33"), None) => DirectoryBundle {
                upazilas: vec![
                    unit("X", "Sreepur", OptionKind::Upazila),
                    unit("X2", "Kaliakair", OptionKind::Upazila),
                ],
                city_corporations: vec![unit(
                    "CC1",
                    "Gazipur City Corporation",
                    OptionKind::CityCorporation,
                )],
                police_stations: vec![
                    unit("P", "Joydebpur", OptionKind::PoliceStation),
                    unit("P2", "Tongi", OptionKind::PoliceStation),
                ],
                ..Default::default()
            },
            (None, Some("33"), None) => DirectoryBundle {
                post_offices: vec![
                    post_office("O", "Bhawal", "1703"),
                    post_office("O2", "Rajendrapur", "1741"),
                ],
                ..Default::default()
            },
            (Some("6"), Some("33"), Some("X")) => DirectoryBundle {
                union_parishads: vec![
                    unit("Y", "Barmi", OptionKind::UnionParishad),
                    unit("Y2", "Telihati", OptionKind::UnionParishad),
                ],
                municipalities: vec![unit(
                    "M1",
                    "Sreepur Municipality",
                    OptionKind::Municipality,
                )],
                ..Default::default()
            },
            _ => DirectoryBundle::default(),
        }
    }

    #[async_trait]
    impl DirectoryApi for StubDirectory {
        async fn fetch_dropdown(
            &self,
            scope: &FetchScope,
        ) -> Result<DirectoryBundle, DirectoryError> {
            self.calls.lock().unwrap().push(scope.clone());

            let gate = self.gates.lock().unwrap().get(scope).cloned();
            if let Some(gate) = gate {
                gate.notified().await;
            }

            if self.failures.lock().unwrap().contains(scope) {
                return Err(DirectoryError::RequestFailed("stub failure".to_string()));
            }

            Ok(fixture_bundle(scope))
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn new_session() -> Arc<RwLock<FormSession>> {
        Arc::new(RwLock::new(FormSession::new()))
    }

    async fn mounted(
        directory: &Arc<StubDirectory>,
    ) -> (DependencyResolver, Arc<RwLock<FormSession>>) {
        let resolver = DependencyResolver::new(directory.clone() as Arc<dyn DirectoryApi>);
        let session = new_session();
        resolver
            .load_divisions(&session, AddressSection::Present)
            .await
            .unwrap();
        (resolver, session)
    }

    async fn select(
        resolver: &DependencyResolver,
        session: &Arc<RwLock<FormSession>>,
        tier: Tier,
        unit_id: &str,
    ) {
        resolver
            .select(session, AddressSection::Present, tier, unit_id)
            .await
            .unwrap();
    }

    async fn values(session: &Arc<RwLock<FormSession>>) -> AddressValues {
        session
            .read()
            .await
            .section(AddressSection::Present)
            .form
            .values()
            .clone()
    }

    async fn option_names(session: &Arc<RwLock<FormSession>>, tier: Tier) -> Vec<String> {
        session
            .read()
            .await
            .section(AddressSection::Present)
            .cache
            .options(tier)
            .iter()
            .map(|u| u.name.clone())
            .collect()
    }

    /// Walk the full manual-selection chain down to tier 4 plus leaves.
    async fn select_full_chain(resolver: &DependencyResolver, session: &Arc<RwLock<FormSession>>) {
        select(resolver, session, Tier::Division, "6").await;
        select(resolver, session, Tier::District, "33").await;
        select(resolver, session, Tier::UpazilaOrCityCorporation, "X").await;
        select(resolver, session, Tier::UnionOrMunicipality, "Y").await;
        select(resolver, session, Tier::PoliceStation, "P").await;
        select(resolver, session, Tier::PostOffice, "O").await;
    }

    // ========================================================================
    // Dependency resolver
    // ========================================================================

    #[tokio::test]
    async fn test_select_division_loads_sorted_districts() {
        let directory = StubDirectory::new();
        let (resolver, session) = mounted(&directory).await;

        select(&resolver, &session, Tier::Division, "6").await;

        let vals = values(&session).await;
        assert_eq!(vals.division_id, "6");
        assert_eq!(
            option_names(&session, Tier::District).await,
            vec!["GAZIPUR", "NARSINGDI"]
        );
        assert!(
            !session
                .read()
                .await
                .present
                .cache
                .is_loading(Tier::District)
        );
    }

    #[tokio::test]
    async fn test_changing_parent_clears_every_deeper_tier() {
        let directory = StubDirectory::new();
        let (resolver, session) = mounted(&directory).await;
        select_full_chain(&resolver, &session).await;

        // Sanity: the whole chain is populated
        let vals = values(&session).await;
        assert_eq!(vals.union_parishad_id, "Y");
        assert_eq!(vals.police_station_id, "P");
        assert_eq!(vals.post_office_id, "O");

        select(&resolver, &session, Tier::Division, "7").await;

        let vals = values(&session).await;
        assert_eq!(vals.division_id, "7");
        assert_eq!(vals.district_id, "");
        assert_eq!(vals.upazila_id, "");
        assert_eq!(vals.city_corporation_id, "");
        assert_eq!(vals.union_parishad_id, "");
        assert_eq!(vals.municipality_id, "");
        assert_eq!(vals.police_station_id, "");
        assert_eq!(vals.post_office_id, "");

        // District list was refetched for the new division; the lists whose
        // parents are now unselected are gone
        assert_eq!(
            option_names(&session, Tier::District).await,
            vec!["BAGERHAT"]
        );
        assert!(option_names(&session, Tier::UpazilaOrCityCorporation)
            .await
            .is_empty());
        assert!(option_names(&session, Tier::UnionOrMunicipality)
            .await
            .is_empty());
        assert!(option_names(&session, Tier::PoliceStation).await.is_empty());
        assert!(option_names(&session, Tier::PostOffice).await.is_empty());
    }

    #[tokio::test]
    async fn test_clearing_a_tier_clears_dependents_without_fetching() {
        let directory = StubDirectory::new();
        let (resolver, session) = mounted(&directory).await;
        select_full_chain(&resolver, &session).await;
        let calls_before = directory.calls().len();

        select(&resolver, &session, Tier::District, "").await;

        let vals = values(&session).await;
        assert_eq!(vals.division_id, "6");
        assert_eq!(vals.district_id, "");
        assert_eq!(vals.upazila_id, "");
        assert_eq!(vals.police_station_id, "");
        assert!(option_names(&session, Tier::UpazilaOrCityCorporation)
            .await
            .is_empty());
        assert!(option_names(&session, Tier::PostOffice).await.is_empty());
        assert_eq!(directory.calls().len(), calls_before);
    }

    #[tokio::test]
    async fn test_upazila_and_city_corporation_mutually_exclusive() {
        let directory = StubDirectory::new();
        let (resolver, session) = mounted(&directory).await;
        select(&resolver, &session, Tier::Division, "6").await;
        select(&resolver, &session, Tier::District, "33").await;

        select(&resolver, &session, Tier::UpazilaOrCityCorporation, "X").await;
        let vals = values(&session).await;
        assert_eq!(vals.upazila_id, "X");
        assert_eq!(vals.city_corporation_id, "");

        select(&resolver, &session, Tier::UpazilaOrCityCorporation, "CC1").await;
        let vals = values(&session).await;
        assert_eq!(vals.upazila_id, "");
        assert_eq!(vals.city_corporation_id, "CC1");
    }

    #[tokio::test]
    async fn test_union_and_municipality_mutually_exclusive() {
        let directory = StubDirectory::new();
        let (resolver, session) = mounted(&directory).await;
        select(&resolver, &session, Tier::Division, "6").await;
        select(&resolver, &session, Tier::District, "33").await;
        select(&resolver, &session, Tier::UpazilaOrCityCorporation, "X").await;

        select(&resolver, &session, Tier::UnionOrMunicipality, "Y").await;
        let vals = values(&session).await;
        assert_eq!(vals.union_parishad_id, "Y");
        assert_eq!(vals.municipality_id, "");

        select(&resolver, &session, Tier::UnionOrMunicipality, "M1").await;
        let vals = values(&session).await;
        assert_eq!(vals.union_parishad_id, "");
        assert_eq!(vals.municipality_id, "M1");
    }

    #[tokio::test]
    async fn test_city_corporation_has_no_tier4_children() {
        let directory = StubDirectory::new();
        let (resolver, session) = mounted(&directory).await;
        select(&resolver, &session, Tier::Division, "6").await;
        select(&resolver, &session, Tier::District, "33").await;

        select(&resolver, &session, Tier::UpazilaOrCityCorporation, "CC1").await;

        assert!(option_names(&session, Tier::UnionOrMunicipality)
            .await
            .is_empty());
        // No fetch was issued with an upazila id
        assert!(directory.calls().iter().all(|c| c.upazila_id.is_none()));
    }

    #[tokio::test]
    async fn test_unknown_option_is_rejected() {
        let directory = StubDirectory::new();
        let (resolver, session) = mounted(&directory).await;
        select(&resolver, &session, Tier::Division, "6").await;

        let result = resolver
            .select(&session, AddressSection::Present, Tier::District, "99")
            .await;

        assert!(matches!(
            result,
            Err(ResolveError::UnknownOption { tier: Tier::District, .. })
        ));
        assert_eq!(values(&session).await.district_id, "");
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_list_and_clears_loading() {
        let directory = StubDirectory::new();
        let (resolver, session) = mounted(&directory).await;
        select(&resolver, &session, Tier::Division, "6").await;

        directory.fail_on(FetchScope::division("7"));
        let result = resolver
            .select(&session, AddressSection::Present, Tier::Division, "7")
            .await;

        assert!(matches!(result, Err(ResolveError::Directory(_))));

        let guard = session.read().await;
        // Selection moved, but the stale district list from division 6 stays
        // until a later fetch succeeds
        assert_eq!(guard.present.form.values().division_id, "7");
        let names: Vec<&str> = guard
            .present
            .cache
            .options(Tier::District)
            .iter()
            .map(|u| u.name.as_str())
            .collect();
        assert_eq!(names, vec!["GAZIPUR", "NARSINGDI"]);
        assert!(!guard.present.cache.is_loading(Tier::District));
    }

    #[tokio::test]
    async fn test_sections_are_independent() {
        let directory = StubDirectory::new();
        let resolver = DependencyResolver::new(directory.clone() as Arc<dyn DirectoryApi>);
        let session = new_session();
        resolver
            .load_divisions(&session, AddressSection::Present)
            .await
            .unwrap();
        resolver
            .load_divisions(&session, AddressSection::Permanent)
            .await
            .unwrap();

        resolver
            .select(&session, AddressSection::Permanent, Tier::Division, "7")
            .await
            .unwrap();

        let guard = session.read().await;
        assert_eq!(guard.permanent.form.values().division_id, "7");
        assert_eq!(guard.present.form.values().division_id, "");
    }

    // ========================================================================
    // Stale-response discard and sibling fetches
    // ========================================================================

    #[tokio::test]
    async fn test_stale_response_discarded_on_rapid_reselect() {
        let directory = StubDirectory::new();
        let (resolver, session) = mounted(&directory).await;

        // Hold the district fetch for division 6 in flight
        let gate = directory.gate(FetchScope::division("6"));

        let resolver = Arc::new(resolver);
        let slow = {
            let resolver = resolver.clone();
            let session = session.clone();
            tokio::spawn(async move {
                resolver
                    .select(&session, AddressSection::Present, Tier::Division, "6")
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        // The user moves on before the first fetch resolves
        resolver
            .select(&session, AddressSection::Present, Tier::Division, "7")
            .await
            .unwrap();

        gate.notify_one();
        slow.await.unwrap().unwrap();

        // The late division-6 response must not overwrite division 7's list
        assert_eq!(values(&session).await.division_id, "7");
        assert_eq!(
            option_names(&session, Tier::District).await,
            vec!["BAGERHAT"]
        );
    }

    #[tokio::test]
    async fn test_concurrent_sibling_fetches_populate_all_caches() {
        let directory = StubDirectory::new();
        let (resolver, session) = mounted(&directory).await;
        select(&resolver, &session, Tier::Division, "6").await;

        // Delay the tier-3 fetch so the post office list arrives first
        let gate = directory.gate(FetchScope::district_of("6", "33"));

        let resolver = Arc::new(resolver);
        let handle = {
            let resolver = resolver.clone();
            let session = session.clone();
            tokio::spawn(async move {
                resolver
                    .select(&session, AddressSection::Present, Tier::District, "33")
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Post offices already landed while tier 3 is still loading
        {
            let guard = session.read().await;
            assert!(!guard.present.cache.options(Tier::PostOffice).is_empty());
            assert!(guard
                .present
                .cache
                .is_loading(Tier::UpazilaOrCityCorporation));
        }

        gate.notify_one();
        handle.await.unwrap().unwrap();

        let guard = session.read().await;
        assert_eq!(
            guard
                .present
                .cache
                .options(Tier::UpazilaOrCityCorporation)
                .len(),
            3
        );
        assert_eq!(guard.present.cache.options(Tier::PoliceStation).len(), 2);
        assert_eq!(guard.present.cache.options(Tier::PostOffice).len(), 2);
        assert!(!guard
            .present
            .cache
            .is_loading(Tier::UpazilaOrCityCorporation));
        assert!(!guard.present.cache.is_loading(Tier::PostOffice));
    }

    // ========================================================================
    // Prefill sequencer
    // ========================================================================

    fn full_record() -> PersistedAddress {
        PersistedAddress {
            division_id: Some("6".to_string()),
            district_id: Some("33".to_string()),
            upazila_id: Some("X".to_string()),
            union_parishad_id: Some("Y".to_string()),
            police_station_id: Some("P".to_string()),
            post_office_id: Some("O".to_string()),
            ward_no: Some("4".to_string()),
            address_line: Some("House 12, Road 3".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_prefill_full_record_resolves_all_fields_in_order() {
        let directory = StubDirectory::new();
        let sequencer = PrefillSequencer::new(directory.clone() as Arc<dyn DirectoryApi>);
        let session = new_session();

        let outcome = sequencer
            .run(&session, AddressSection::Present, full_record())
            .await
            .unwrap();
        assert_eq!(outcome, PrefillOutcome::Completed);

        let vals = values(&session).await;
        assert_eq!(vals.division_id, "6");
        assert_eq!(vals.district_id, "33");
        assert_eq!(vals.upazila_id, "X");
        assert_eq!(vals.city_corporation_id, "");
        assert_eq!(vals.union_parishad_id, "Y");
        assert_eq!(vals.police_station_id, "P");
        assert_eq!(vals.post_office_id, "O");
        assert_eq!(vals.ward_no, "4");
        assert_eq!(vals.address_line, "House 12, Road 3");

        // All option lists are populated
        assert!(!option_names(&session, Tier::Division).await.is_empty());
        assert!(!option_names(&session, Tier::District).await.is_empty());
        assert!(!option_names(&session, Tier::UpazilaOrCityCorporation)
            .await
            .is_empty());
        assert!(!option_names(&session, Tier::UnionOrMunicipality)
            .await
            .is_empty());

        // Strict sequential order between tiers; the two district-scoped
        // sibling fetches may land in either order
        let calls = directory.calls();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[0], FetchScope::root());
        assert_eq!(calls[1], FetchScope::division("6"));
        let middle: HashSet<_> = calls[2..4].iter().cloned().collect();
        assert_eq!(
            middle,
            HashSet::from([
                FetchScope::district_of("6", "33"),
                FetchScope::district_only("33"),
            ])
        );
        assert_eq!(calls[4], FetchScope::upazila_of("6", "33", "X"));

        assert_eq!(
            session.read().await.present.prefill,
            PrefillState::Done
        );
    }

    #[tokio::test]
    async fn test_prefill_routes_city_corporation_and_skips_tier4() {
        let directory = StubDirectory::new();
        let sequencer = PrefillSequencer::new(directory.clone() as Arc<dyn DirectoryApi>);
        let session = new_session();

        let record = PersistedAddress {
            division_id: Some("6".to_string()),
            district_id: Some("33".to_string()),
            city_corporation_id: Some("CC1".to_string()),
            police_station_id: Some("P".to_string()),
            post_office_id: Some("O".to_string()),
            ..Default::default()
        };

        let outcome = sequencer
            .run(&session, AddressSection::Present, record)
            .await
            .unwrap();
        assert_eq!(outcome, PrefillOutcome::Completed);

        let vals = values(&session).await;
        assert_eq!(vals.city_corporation_id, "CC1");
        assert_eq!(vals.upazila_id, "");

        // City corporation has no tier-4 children: no upazila-scoped fetch
        assert_eq!(directory.calls().len(), 4);
        assert!(directory.calls().iter().all(|c| c.upazila_id.is_none()));
    }

    #[tokio::test]
    async fn test_prefill_stops_where_persisted_ids_end() {
        let directory = StubDirectory::new();
        let sequencer = PrefillSequencer::new(directory.clone() as Arc<dyn DirectoryApi>);
        let session = new_session();

        let record = PersistedAddress {
            division_id: Some("6".to_string()),
            district_id: Some("33".to_string()),
            ..Default::default()
        };

        let outcome = sequencer
            .run(&session, AddressSection::Present, record)
            .await
            .unwrap();
        assert_eq!(outcome, PrefillOutcome::Completed);

        // Chain stopped after District: no tier-3 or deeper fetch was issued
        assert_eq!(
            directory.calls(),
            vec![FetchScope::root(), FetchScope::division("6")]
        );

        let vals = values(&session).await;
        assert_eq!(vals.district_id, "33");
        assert_eq!(vals.upazila_id, "");
        assert!(option_names(&session, Tier::UpazilaOrCityCorporation)
            .await
            .is_empty());

        // Early stop is a valid terminal state
        assert_eq!(session.read().await.present.prefill, PrefillState::Done);
    }

    #[tokio::test]
    async fn test_prefill_one_shot_guard_is_idempotent() {
        let directory = StubDirectory::new();
        let sequencer = PrefillSequencer::new(directory.clone() as Arc<dyn DirectoryApi>);
        let session = new_session();

        sequencer
            .run(&session, AddressSection::Present, full_record())
            .await
            .unwrap();
        let calls_after_first = directory.calls().len();
        let values_after_first = values(&session).await;

        let outcome = sequencer
            .run(&session, AddressSection::Present, full_record())
            .await
            .unwrap();

        assert_eq!(outcome, PrefillOutcome::AlreadyRun);
        assert_eq!(directory.calls().len(), calls_after_first);
        assert_eq!(values(&session).await, values_after_first);
    }

    #[tokio::test]
    async fn test_prefill_without_division_id_is_empty() {
        let directory = StubDirectory::new();
        let sequencer = PrefillSequencer::new(directory.clone() as Arc<dyn DirectoryApi>);
        let session = new_session();

        let outcome = sequencer
            .run(&session, AddressSection::Present, PersistedAddress::default())
            .await
            .unwrap();

        assert_eq!(outcome, PrefillOutcome::Empty);
        assert!(directory.calls().is_empty());
        // The guard is not consumed: a later record load may still prefill
        assert_eq!(
            session.read().await.present.prefill,
            PrefillState::NotStarted
        );
    }

    #[tokio::test]
    async fn test_prefill_failure_consumes_guard_and_clears_loading() {
        let directory = StubDirectory::new();
        directory.fail_on(FetchScope::division("6"));
        let sequencer = PrefillSequencer::new(directory.clone() as Arc<dyn DirectoryApi>);
        let session = new_session();

        let result = sequencer
            .run(&session, AddressSection::Present, full_record())
            .await;
        assert!(result.is_err());

        let guard = session.read().await;
        assert_eq!(guard.present.prefill, PrefillState::Done);
        for tier in Tier::ALL {
            assert!(!guard.present.cache.is_loading(tier));
        }
        // Step 1 landed before the failure
        assert_eq!(guard.present.form.values().division_id, "6");
    }

    // ========================================================================
    // Round-trip: manual selection to submission payload
    // ========================================================================

    #[tokio::test]
    async fn test_city_corporation_round_trip_to_payload() {
        let directory = StubDirectory::new();
        let (resolver, session) = mounted(&directory).await;

        select(&resolver, &session, Tier::Division, "6").await;
        select(&resolver, &session, Tier::District, "33").await;
        select(&resolver, &session, Tier::UpazilaOrCityCorporation, "CC1").await;
        select(&resolver, &session, Tier::PoliceStation, "P").await;
        select(&resolver, &session, Tier::PostOffice, "O").await;

        let mut guard = session.write().await;
        guard
            .present
            .form
            .set_value(AddressField::AddressLine, "House 12, Road 3");
        guard.is_same_as_present = true;

        // No union/municipality requirement applies under a city corporation
        let result = AddressFormValidator.validate(&guard);
        assert!(result.is_valid, "errors: {:?}", result.errors);

        let payloads = guard.to_submit_payloads("PRESENT_TYPE", "PERMANENT_TYPE");
        assert_eq!(payloads.len(), 2);

        let present = &payloads[0];
        assert_eq!(present.city_corporation_id, "CC1");
        assert_eq!(present.upazila_id, "");
        assert_eq!(present.union_parishad_id, "");
        assert_eq!(present.address_type_id, "PRESENT_TYPE");
        assert!(!present.is_same_as_present);

        // Permanent mirrors present when flagged
        let permanent = &payloads[1];
        assert_eq!(permanent.city_corporation_id, "CC1");
        assert_eq!(permanent.division_id, "6");
        assert_eq!(permanent.address_type_id, "PERMANENT_TYPE");
        assert!(permanent.is_same_as_present);
    }

    // ========================================================================
    // Validators
    // ========================================================================

    #[test]
    fn test_validator_requires_core_fields() {
        let session = FormSession::new();
        let result = AddressFormValidator.validate(&session);

        assert!(!result.is_valid);
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"present.divisionId"));
        assert!(fields.contains(&"present.districtId"));
        assert!(fields.contains(&"present.upazilaId"));
        assert!(fields.contains(&"present.policeStationId"));
        assert!(fields.contains(&"present.postOfficeId"));
        assert!(fields.contains(&"present.addressLine"));
        // Permanent section validated too while not mirroring
        assert!(fields.contains(&"permanent.divisionId"));
    }

    #[test]
    fn test_validator_requires_tier4_under_upazila_only() {
        let mut session = FormSession::new();
        session.is_same_as_present = true;
        let form = &mut session.present.form;
        form.set_value(AddressField::DivisionId, "6");
        form.set_value(AddressField::DistrictId, "33");
        form.set_value(AddressField::UpazilaId, "X");
        form.set_value(AddressField::PoliceStationId, "P");
        form.set_value(AddressField::PostOfficeId, "O");
        form.set_value(AddressField::AddressLine, "House 12");

        let result = AddressFormValidator.validate(&session);
        assert!(!result.is_valid);
        assert!(result
            .errors
            .iter()
            .any(|e| e.field == "present.unionParishadId"));

        // Swapping the upazila for a city corporation waives tier 4
        let form = &mut session.present.form;
        form.clear(AddressField::UpazilaId);
        form.set_value(AddressField::CityCorporationId, "CC1");

        let result = AddressFormValidator.validate(&session);
        assert!(result.is_valid, "errors: {:?}", result.errors);
    }

    #[test]
    fn test_validator_skips_permanent_when_mirroring() {
        let mut session = FormSession::new();
        session.is_same_as_present = true;

        let result = AddressFormValidator.validate(&session);
        assert!(result
            .errors
            .iter()
            .all(|e| e.field.starts_with("present.")));
    }

    // ========================================================================
    // Session store
    // ========================================================================

    #[tokio::test]
    async fn test_session_store_lifecycle() {
        let store = SessionStore::new();
        let (id, _handle) = store.create().await;

        assert_eq!(store.count().await, 1);
        assert!(store.get(&id).await.is_some());
        assert!(store.remove(&id).await);
        assert!(store.get(&id).await.is_none());
        assert!(!store.remove(&id).await);
    }
}
