use std::collections::BTreeMap;

use serde::Serialize;
use shared::{Field, FormProfile, FormState, SubjectMode};

use crate::phone::is_complete;

pub const NAME_REQUIRED: &str = "Ism kiritish majburiy";
pub const NAME_TOO_SHORT: &str = "Ism kamida 2 ta belgidan iborat bo'lishi kerak";
pub const CITY_REQUIRED: &str = "Yashash manzilini tanlang";
pub const PHONE_INCOMPLETE: &str = "To'liq telefon raqamini kiriting";
pub const SUBJECT_REQUIRED: &str = "Fan tanlang";

const MIN_NAME_CHARS: usize = 2;

/// Per-field messages; a field without an entry is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    entries: BTreeMap<Field, String>,
}

impl ValidationErrors {
    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.entries.insert(field, message.into());
    }

    /// Returns whether an error was present.
    pub fn clear(&mut self, field: Field) -> bool {
        self.entries.remove(&field).is_some()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.entries.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.entries.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.entries
            .iter()
            .map(|(field, message)| (*field, message.as_str()))
    }
}

/// Checks every field independently and reports all failures at once.
pub fn validate(state: &FormState, profile: &FormProfile) -> ValidationErrors {
    let mut errors = ValidationErrors::default();

    let name = state.name.trim();
    if name.is_empty() {
        errors.insert(Field::Name, NAME_REQUIRED);
    } else if name.chars().count() < MIN_NAME_CHARS {
        errors.insert(Field::Name, NAME_TOO_SHORT);
    }

    if state.city.is_empty() {
        errors.insert(Field::City, CITY_REQUIRED);
    }

    if !is_complete(&state.phone) {
        errors.insert(Field::Phone, PHONE_INCOMPLETE);
    }

    if let SubjectMode::Selectable(_) = profile.subject {
        if state.subject.is_empty() {
            errors.insert(Field::Subject, SUBJECT_REQUIRED);
        }
    }

    errors
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
