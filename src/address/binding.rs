// src/address/binding.rs
//
// Form binding layer: the typed value/error store the resolver and prefill
// sequencer read from and write into. Mirrors the form-library contract of
// get/set/watch plus a validation-error map keyed by field.

use std::collections::{BTreeMap, HashSet};

use super::models::{AddressField, AddressValues};

#[derive(Debug, Default)]
pub struct AddressForm {
    values: AddressValues,
    dirty: HashSet<AddressField>,
    errors: BTreeMap<String, String>,
}

impl AddressForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self, field: AddressField) -> &str {
        self.values.get(field)
    }

    pub fn values(&self) -> &AddressValues {
        &self.values
    }

    /// Write a field value and mark it dirty. Writing clears any stale
    /// validation error for the field.
    pub fn set_value(&mut self, field: AddressField, value: impl Into<String>) {
        self.values.set(field, value.into());
        self.dirty.insert(field);
        self.errors.remove(field.as_str());
    }

    /// Reset a field to empty without marking it dirty (cascade invalidation
    /// is not a user edit).
    pub fn clear(&mut self, field: AddressField) {
        self.values.set(field, String::new());
        self.errors.remove(field.as_str());
    }

    pub fn is_dirty(&self, field: AddressField) -> bool {
        self.dirty.contains(&field)
    }

    pub fn set_error(&mut self, field: &str, message: &str) {
        self.errors.insert(field.to_string(), message.to_string());
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_value_marks_dirty_and_clears_error() {
        let mut form = AddressForm::new();
        form.set_error("divisionId", "Division is required");

        form.set_value(AddressField::DivisionId, "6");

        assert_eq!(form.value(AddressField::DivisionId), "6");
        assert!(form.is_dirty(AddressField::DivisionId));
        assert!(form.errors().is_empty());
    }

    #[test]
    fn test_clear_resets_value_without_dirtying() {
        let mut form = AddressForm::new();
        form.set_value(AddressField::DistrictId, "33");

        let mut fresh = AddressForm::new();
        fresh.clear(AddressField::DistrictId);

        assert_eq!(form.value(AddressField::DistrictId), "33");
        assert_eq!(fresh.value(AddressField::DistrictId), "");
        assert!(!fresh.is_dirty(AddressField::DistrictId));
    }
}
