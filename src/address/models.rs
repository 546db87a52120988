// src/address/models.rs

use serde::{Deserialize, Serialize};

use super::prefill::PrefillState;

// ============================================================================
// Administrative hierarchy
// ============================================================================

/// One rendered level of the administrative hierarchy. The two merged tiers
/// present a single dropdown over two mutually exclusive backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tier {
    Division,
    District,
    /// Merged dropdown over upazilas and city corporations
    UpazilaOrCityCorporation,
    /// Merged dropdown over union parishads and municipalities;
    /// only populated when the tier-3 choice is an upazila
    UnionOrMunicipality,
    /// Independent leaf under District
    PoliceStation,
    /// Independent leaf under District
    PostOffice,
}

impl Tier {
    pub const ALL: [Tier; 6] = [
        Tier::Division,
        Tier::District,
        Tier::UpazilaOrCityCorporation,
        Tier::UnionOrMunicipality,
        Tier::PoliceStation,
        Tier::PostOffice,
    ];

    /// Tiers whose selections and option lists become stale when this tier
    /// changes. Police stations and post offices hang off District, not off
    /// the tier-3 pair, so they are invalidated by District and above only.
    pub fn dependent_tiers(&self) -> &'static [Tier] {
        match self {
            Tier::Division => &[
                Tier::District,
                Tier::UpazilaOrCityCorporation,
                Tier::UnionOrMunicipality,
                Tier::PoliceStation,
                Tier::PostOffice,
            ],
            Tier::District => &[
                Tier::UpazilaOrCityCorporation,
                Tier::UnionOrMunicipality,
                Tier::PoliceStation,
                Tier::PostOffice,
            ],
            Tier::UpazilaOrCityCorporation => &[Tier::UnionOrMunicipality],
            Tier::UnionOrMunicipality | Tier::PoliceStation | Tier::PostOffice => &[],
        }
    }

    /// The form fields a selection at this tier can write into. Merged tiers
    /// split into two hidden sub-fields routed by the option's kind tag.
    pub fn fields(&self) -> &'static [AddressField] {
        match self {
            Tier::Division => &[AddressField::DivisionId],
            Tier::District => &[AddressField::DistrictId],
            Tier::UpazilaOrCityCorporation => {
                &[AddressField::UpazilaId, AddressField::CityCorporationId]
            }
            Tier::UnionOrMunicipality => {
                &[AddressField::UnionParishadId, AddressField::MunicipalityId]
            }
            Tier::PoliceStation => &[AddressField::PoliceStationId],
            Tier::PostOffice => &[AddressField::PostOfficeId],
        }
    }
}

/// The entity kind of a directory option. Selections from merged dropdowns
/// are routed into the correct hidden sub-field by matching on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionKind {
    Division,
    District,
    Upazila,
    CityCorporation,
    UnionParishad,
    Municipality,
    PoliceStation,
    PostOffice,
}

/// A single dropdown option as held in the hierarchy cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierOption {
    pub id: String,
    pub name: String,
    pub kind: OptionKind,
    /// Post offices carry their postal code alongside the display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_code: Option<String>,
}

// ============================================================================
// Form fields and sections
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AddressField {
    DivisionId,
    DistrictId,
    UpazilaId,
    CityCorporationId,
    UnionParishadId,
    MunicipalityId,
    PoliceStationId,
    PostOfficeId,
    WardNo,
    AddressLine,
}

impl AddressField {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressField::DivisionId => "divisionId",
            AddressField::DistrictId => "districtId",
            AddressField::UpazilaId => "upazilaId",
            AddressField::CityCorporationId => "cityCorporationId",
            AddressField::UnionParishadId => "unionParishadId",
            AddressField::MunicipalityId => "municipalityId",
            AddressField::PoliceStationId => "policeStationId",
            AddressField::PostOfficeId => "postOfficeId",
            AddressField::WardNo => "wardNo",
            AddressField::AddressLine => "addressLine",
        }
    }
}

/// Which of the two address copies a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressSection {
    Present,
    Permanent,
}

impl AddressSection {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressSection::Present => "present",
            AddressSection::Permanent => "permanent",
        }
    }
}

/// String-based form values, one instance per section. Selects always hold
/// string ids; empty string means "not selected".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressValues {
    pub division_id: String,
    pub district_id: String,
    pub upazila_id: String,
    pub city_corporation_id: String,
    pub union_parishad_id: String,
    pub municipality_id: String,
    pub police_station_id: String,
    pub post_office_id: String,
    pub ward_no: String,
    pub address_line: String,
}

impl AddressValues {
    pub fn get(&self, field: AddressField) -> &str {
        match field {
            AddressField::DivisionId => &self.division_id,
            AddressField::DistrictId => &self.district_id,
            AddressField::UpazilaId => &self.upazila_id,
            AddressField::CityCorporationId => &self.city_corporation_id,
            AddressField::UnionParishadId => &self.union_parishad_id,
            AddressField::MunicipalityId => &self.municipality_id,
            AddressField::PoliceStationId => &self.police_station_id,
            AddressField::PostOfficeId => &self.post_office_id,
            AddressField::WardNo => &self.ward_no,
            AddressField::AddressLine => &self.address_line,
        }
    }

    pub fn set(&mut self, field: AddressField, value: String) {
        let slot = match field {
            AddressField::DivisionId => &mut self.division_id,
            AddressField::DistrictId => &mut self.district_id,
            AddressField::UpazilaId => &mut self.upazila_id,
            AddressField::CityCorporationId => &mut self.city_corporation_id,
            AddressField::UnionParishadId => &mut self.union_parishad_id,
            AddressField::MunicipalityId => &mut self.municipality_id,
            AddressField::PoliceStationId => &mut self.police_station_id,
            AddressField::PostOfficeId => &mut self.post_office_id,
            AddressField::WardNo => &mut self.ward_no,
            AddressField::AddressLine => &mut self.address_line,
        };
        *slot = value;
    }
}

// ============================================================================
// Persisted record (prefill input)
// ============================================================================

/// A previously saved address as returned by the profile API; drives the
/// one-shot prefill sequence. Absent ids terminate the chain early.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedAddress {
    pub division_id: Option<String>,
    pub district_id: Option<String>,
    pub upazila_id: Option<String>,
    pub city_corporation_id: Option<String>,
    pub union_parishad_id: Option<String>,
    pub municipality_id: Option<String>,
    pub police_station_id: Option<String>,
    pub post_office_id: Option<String>,
    pub ward_no: Option<String>,
    pub address_line: Option<String>,
}

// ============================================================================
// Submission payload
// ============================================================================

/// Flattened submission record forwarded to the profile API, one per
/// section, tagged with the section's address-type identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressPayload {
    pub division_id: String,
    pub district_id: String,
    pub city_corporation_id: String,
    pub upazila_id: String,
    pub union_parishad_id: String,
    pub municipality_id: String,
    pub police_station_id: String,
    pub post_office_id: String,
    pub ward_no: String,
    pub address_line: String,
    pub is_same_as_present: bool,
    pub address_type_id: String,
}

// ============================================================================
// Request / response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectTierRequest {
    pub section: AddressSection,
    pub tier: Tier,
    /// Empty string clears the tier (and everything below it)
    #[serde(default)]
    pub unit_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetFieldsRequest {
    #[serde(default)]
    pub section: Option<AddressSection>,
    #[serde(default)]
    pub ward_no: Option<String>,
    #[serde(default)]
    pub address_line: Option<String>,
    #[serde(default)]
    pub is_same_as_present: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefillRequest {
    pub section: AddressSection,
    pub address: PersistedAddress,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefillResponse {
    pub outcome: super::prefill::PrefillOutcome,
    pub snapshot: SessionSnapshot,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub receipt: crate::services::submission::SubmissionReceipt,
    pub payloads: Vec<AddressPayload>,
}

// ============================================================================
// Snapshots
// ============================================================================

/// Option lists as rendered: six dropdowns, merged tiers already combined.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierListSnapshot {
    pub divisions: Vec<TierOption>,
    pub districts: Vec<TierOption>,
    pub upazila_city_corporations: Vec<TierOption>,
    pub union_municipalities: Vec<TierOption>,
    pub police_stations: Vec<TierOption>,
    pub post_offices: Vec<TierOption>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierLoadingSnapshot {
    pub divisions: bool,
    pub districts: bool,
    pub upazila_city_corporations: bool,
    pub union_municipalities: bool,
    pub police_stations: bool,
    pub post_offices: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSnapshot {
    pub values: AddressValues,
    pub options: TierListSnapshot,
    pub loading: TierLoadingSnapshot,
    pub prefill: PrefillState,
    pub errors: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub is_same_as_present: bool,
    pub present: SectionSnapshot,
    pub permanent: SectionSnapshot,
}
