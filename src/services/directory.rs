// src/services/directory.rs
//
// Client for the external administrative directory service. A single
// parameterized query returns different subsets of the hierarchy depending
// on which ancestor ids are set:
//
//   (no params)              -> divisions
//   divisionId               -> districts of that division
//   divisionId + districtId  -> upazilas + city corporations + police stations
//   districtId               -> post offices of that district
//   divisionId + districtId + upazilaId -> union parishads + municipalities

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::debug;

use crate::address::models::{OptionKind, TierOption};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory request failed: {0}")]
    RequestFailed(String),

    #[error("directory returned status {0}")]
    BadStatus(reqwest::StatusCode),

    #[error("failed to decode directory response: {0}")]
    DecodeFailed(String),
}

/// The ancestor parameters a dropdown fetch is scoped by. Also used as the
/// staleness key: a completed fetch is applied only if the scope it was
/// issued with still matches the live selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FetchScope {
    pub division_id: Option<String>,
    pub district_id: Option<String>,
    pub upazila_id: Option<String>,
}

impl FetchScope {
    /// Root scope: no ancestors, returns the division list.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn division(id: &str) -> Self {
        Self {
            division_id: Some(id.to_string()),
            ..Self::default()
        }
    }

    pub fn district_of(division_id: &str, district_id: &str) -> Self {
        Self {
            division_id: Some(division_id.to_string()),
            district_id: Some(district_id.to_string()),
            upazila_id: None,
        }
    }

    /// Post office lookups are keyed by district alone.
    pub fn district_only(district_id: &str) -> Self {
        Self {
            division_id: None,
            district_id: Some(district_id.to_string()),
            upazila_id: None,
        }
    }

    pub fn upazila_of(division_id: &str, district_id: &str, upazila_id: &str) -> Self {
        Self {
            division_id: Some(division_id.to_string()),
            district_id: Some(district_id.to_string()),
            upazila_id: Some(upazila_id.to_string()),
        }
    }

    fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(id) = &self.division_id {
            params.push(("divisionId", id.clone()));
        }
        if let Some(id) = &self.district_id {
            params.push(("districtId", id.clone()));
        }
        if let Some(id) = &self.upazila_id {
            params.push(("upazilaId", id.clone()));
        }
        params
    }
}

/// The tier lists returned by a single dropdown fetch, already tagged with
/// their entity kind. Arrays absent from the response are empty.
#[derive(Debug, Clone, Default)]
pub struct DirectoryBundle {
    pub divisions: Vec<TierOption>,
    pub districts: Vec<TierOption>,
    pub upazilas: Vec<TierOption>,
    pub city_corporations: Vec<TierOption>,
    pub union_parishads: Vec<TierOption>,
    pub municipalities: Vec<TierOption>,
    pub police_stations: Vec<TierOption>,
    pub post_offices: Vec<TierOption>,
}

impl DirectoryBundle {
    /// The merged tier-3 dropdown: upazilas and city corporations are
    /// mutually exclusive backend kinds presented as a single list.
    pub fn merged_tier3(&self) -> Vec<TierOption> {
        self.upazilas
            .iter()
            .chain(self.city_corporations.iter())
            .cloned()
            .collect()
    }

    /// The merged tier-4 dropdown: union parishads and municipalities.
    pub fn merged_tier4(&self) -> Vec<TierOption> {
        self.union_parishads
            .iter()
            .chain(self.municipalities.iter())
            .cloned()
            .collect()
    }
}

/// Directory lookup contract. The HTTP client implements this; tests
/// substitute an in-memory stub.
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    async fn fetch_dropdown(&self, scope: &FetchScope) -> Result<DirectoryBundle, DirectoryError>;
}

// ============================================================================
// Wire format
// ============================================================================

/// The directory emits ids as either JSON numbers or strings depending on
/// the entity table; normalize both to strings.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Num(i64),
        Str(String),
    }

    Ok(match IdRepr::deserialize(deserializer)? {
        IdRepr::Num(n) => n.to_string(),
        IdRepr::Str(s) => s,
    })
}

#[derive(Debug, Deserialize)]
struct NamedUnit {
    #[serde(deserialize_with = "id_string")]
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostOfficeUnit {
    #[serde(deserialize_with = "id_string")]
    id: String,
    /// Display field differs from the other tiers
    post_office: String,
    #[serde(default)]
    post_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DropdownData {
    /// Divisions or districts, depending on which params were set
    data: Vec<NamedUnit>,
    upazilas: Vec<NamedUnit>,
    city_corporations: Vec<NamedUnit>,
    union_parishads: Vec<NamedUnit>,
    municipalities: Vec<NamedUnit>,
    police_stations: Vec<NamedUnit>,
    post_offices: Vec<PostOfficeUnit>,
}

#[derive(Debug, Deserialize)]
struct DropdownEnvelope {
    data: DropdownData,
}

fn tag(units: Vec<NamedUnit>, kind: OptionKind) -> Vec<TierOption> {
    units
        .into_iter()
        .map(|u| TierOption {
            id: u.id,
            name: u.name,
            kind,
            post_code: None,
        })
        .collect()
}

impl DropdownData {
    fn into_bundle(self, scope: &FetchScope) -> DirectoryBundle {
        // The primary `data` array is divisions at root scope and districts
        // when scoped by division only.
        let (divisions, districts) = if scope.division_id.is_none() && scope.district_id.is_none()
        {
            (tag(self.data, OptionKind::Division), Vec::new())
        } else if scope.district_id.is_none() {
            (Vec::new(), tag(self.data, OptionKind::District))
        } else {
            (Vec::new(), Vec::new())
        };

        DirectoryBundle {
            divisions,
            districts,
            upazilas: tag(self.upazilas, OptionKind::Upazila),
            city_corporations: tag(self.city_corporations, OptionKind::CityCorporation),
            union_parishads: tag(self.union_parishads, OptionKind::UnionParishad),
            municipalities: tag(self.municipalities, OptionKind::Municipality),
            police_stations: tag(self.police_stations, OptionKind::PoliceStation),
            post_offices: self
                .post_offices
                .into_iter()
                .map(|p| TierOption {
                    id: p.id,
                    name: p.post_office,
                    kind: OptionKind::PostOffice,
                    post_code: p.post_code,
                })
                .collect(),
        }
    }
}

// ============================================================================
// HTTP implementation
// ============================================================================

pub struct DirectoryService {
    http: Client,
    base_url: String,
}

impl DirectoryService {
    pub fn new(http: Client, base_url: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl DirectoryApi for DirectoryService {
    async fn fetch_dropdown(&self, scope: &FetchScope) -> Result<DirectoryBundle, DirectoryError> {
        let url = format!("{}/user/profile/address/dropdown", self.base_url);

        debug!(scope = ?scope, "Fetching directory dropdown");

        let response = self
            .http
            .get(&url)
            .query(&scope.query_params())
            .send()
            .await
            .map_err(|e| DirectoryError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DirectoryError::BadStatus(response.status()));
        }

        let envelope: DropdownEnvelope = response
            .json()
            .await
            .map_err(|e| DirectoryError::DecodeFailed(e.to_string()))?;

        Ok(envelope.data.into_bundle(scope))
    }
}
