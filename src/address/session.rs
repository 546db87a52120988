// src/address/session.rs
//
// In-memory address form sessions. A session is the server-held counterpart
// of one mounted address form: two sections (present, permanent), each with
// its own form values, hierarchy cache, and prefill latch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::binding::AddressForm;
use super::cache::HierarchyCache;
use super::models::{
    AddressField, AddressPayload, AddressSection, SectionSnapshot, SessionSnapshot,
};
use super::prefill::PrefillState;
use crate::common::generate_session_id;

#[derive(Debug, Default)]
pub struct SectionState {
    pub form: AddressForm,
    pub cache: HierarchyCache,
    pub prefill: PrefillState,
}

#[derive(Debug)]
pub struct FormSession {
    pub id: String,
    pub is_same_as_present: bool,
    pub present: SectionState,
    pub permanent: SectionState,
    pub created_at: DateTime<Utc>,
    pub last_touched: Instant,
}

impl FormSession {
    pub fn new() -> Self {
        Self {
            id: generate_session_id(),
            is_same_as_present: false,
            present: SectionState::default(),
            permanent: SectionState::default(),
            created_at: Utc::now(),
            last_touched: Instant::now(),
        }
    }

    pub fn section(&self, section: AddressSection) -> &SectionState {
        match section {
            AddressSection::Present => &self.present,
            AddressSection::Permanent => &self.permanent,
        }
    }

    pub fn section_mut(&mut self, section: AddressSection) -> &mut SectionState {
        match section {
            AddressSection::Present => &mut self.present,
            AddressSection::Permanent => &mut self.permanent,
        }
    }

    pub fn touch(&mut self) {
        self.last_touched = Instant::now();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            is_same_as_present: self.is_same_as_present,
            present: section_snapshot(&self.present),
            permanent: section_snapshot(&self.permanent),
        }
    }

    /// Flatten both sections into the (present, permanent) payload pair.
    /// When the permanent address mirrors the present one, present values are
    /// copied into the permanent record.
    pub fn to_submit_payloads(
        &self,
        present_type_id: &str,
        permanent_type_id: &str,
    ) -> Vec<AddressPayload> {
        let present = section_payload(&self.present, false, present_type_id);

        let permanent_source = if self.is_same_as_present {
            &self.present
        } else {
            &self.permanent
        };
        let permanent = section_payload(
            permanent_source,
            self.is_same_as_present,
            permanent_type_id,
        );

        vec![present, permanent]
    }
}

impl Default for FormSession {
    fn default() -> Self {
        Self::new()
    }
}

fn section_snapshot(state: &SectionState) -> SectionSnapshot {
    SectionSnapshot {
        values: state.form.values().clone(),
        options: state.cache.options_snapshot(),
        loading: state.cache.loading_snapshot(),
        prefill: state.prefill,
        errors: state.form.errors().clone(),
    }
}

fn section_payload(state: &SectionState, is_same_as_present: bool, type_id: &str) -> AddressPayload {
    let form = &state.form;
    AddressPayload {
        division_id: form.value(AddressField::DivisionId).to_string(),
        district_id: form.value(AddressField::DistrictId).to_string(),
        city_corporation_id: form.value(AddressField::CityCorporationId).to_string(),
        upazila_id: form.value(AddressField::UpazilaId).to_string(),
        union_parishad_id: form.value(AddressField::UnionParishadId).to_string(),
        municipality_id: form.value(AddressField::MunicipalityId).to_string(),
        police_station_id: form.value(AddressField::PoliceStationId).to_string(),
        post_office_id: form.value(AddressField::PostOfficeId).to_string(),
        ward_no: form.value(AddressField::WardNo).to_string(),
        address_line: form.value(AddressField::AddressLine).to_string(),
        is_same_as_present,
        address_type_id: type_id.to_string(),
    }
}

// ============================================================================
// Session store
// ============================================================================

/// Shared handle to the live form sessions. Sessions are wrapped in their own
/// lock so handlers never hold the store lock across a directory fetch.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, Arc<RwLock<FormSession>>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> (String, Arc<RwLock<FormSession>>) {
        let session = FormSession::new();
        let id = session.id.clone();
        let handle = Arc::new(RwLock::new(session));
        self.inner.write().await.insert(id.clone(), handle.clone());
        (id, handle)
    }

    pub async fn get(&self, id: &str) -> Option<Arc<RwLock<FormSession>>> {
        self.inner.read().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.inner.write().await.remove(id).is_some()
    }

    pub async fn count(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Spawn a periodic task that drops sessions idle longer than `ttl`.
    pub fn start_cleanup_task(store: SessionStore, ttl: Duration) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;

                let ids: Vec<String> = store.inner.read().await.keys().cloned().collect();
                let mut expired = Vec::new();
                for id in ids {
                    let handle = match store.inner.read().await.get(&id).cloned() {
                        Some(h) => h,
                        None => continue,
                    };
                    if handle.read().await.last_touched.elapsed() > ttl {
                        expired.push(id);
                    }
                }

                if expired.is_empty() {
                    continue;
                }

                let mut sessions = store.inner.write().await;
                for id in &expired {
                    sessions.remove(id);
                    debug!(session_id = %id, "Expired idle form session");
                }
                info!(
                    expired = expired.len(),
                    remaining = sessions.len(),
                    "Session cleanup pass complete"
                );
            }
        });
    }
}
