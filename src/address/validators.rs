// src/address/validators.rs

use super::models::AddressValues;
use super::session::FormSession;
use crate::common::{ValidationResult, Validator};

// ============================================================================
// Address Form Validators
// ============================================================================

/// Submission-time validation for a whole session. The present section is
/// always required; the permanent section only when it does not mirror the
/// present one. Cross-tier sibling conflicts (e.g. a union id alongside a
/// city corporation) are prevented by the resolver, so only missing-field
/// rules are checked here.
pub struct AddressFormValidator;

impl Validator<FormSession> for AddressFormValidator {
    fn validate(&self, session: &FormSession) -> ValidationResult {
        let mut result = validate_section(session.present.form.values(), "present");
        if !session.is_same_as_present {
            result.merge(validate_section(session.permanent.form.values(), "permanent"));
        }
        result
    }
}

fn validate_section(values: &AddressValues, prefix: &str) -> ValidationResult {
    let mut result = ValidationResult::new();
    let path = |name: &str| format!("{}.{}", prefix, name);

    if values.division_id.is_empty() {
        result.add_error(&path("divisionId"), "Division is required");
    }
    if values.district_id.is_empty() {
        result.add_error(&path("districtId"), "District is required");
    }

    // Rule 1: either an upazila or a city corporation must be chosen
    if values.upazila_id.is_empty() && values.city_corporation_id.is_empty() {
        result.add_error(
            &path("upazilaId"),
            "Either Upazila or City Corporation is required",
        );
    }

    // Rule 2: an upazila requires a union or a municipality below it;
    // a city corporation waives tier 4 entirely
    if !values.upazila_id.is_empty()
        && values.union_parishad_id.is_empty()
        && values.municipality_id.is_empty()
    {
        result.add_error(
            &path("unionParishadId"),
            "Either Union or Municipality is required",
        );
    }

    if values.police_station_id.is_empty() {
        result.add_error(&path("policeStationId"), "Police Station is required");
    }
    if values.post_office_id.is_empty() {
        result.add_error(&path("postOfficeId"), "Post Office is required");
    }
    if values.address_line.is_empty() {
        result.add_error(&path("addressLine"), "Address is required");
    }

    result
}
