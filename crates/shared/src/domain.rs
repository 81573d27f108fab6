use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::FormError;

/// Literal every canonical phone string starts with.
pub const PHONE_PREFIX: &str = "+998";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    City,
    Phone,
    Subject,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Name, Field::City, Field::Phone, Field::Subject];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::City => "city",
            Field::Phone => "phone",
            Field::Subject => "subject",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OptionEntry {
    pub value: &'static str,
    pub label: &'static str,
}

const fn entry(value: &'static str, label: &'static str) -> OptionEntry {
    OptionEntry { value, label }
}

pub const CAPITAL_CITY: &str = "toshkent";

pub const REGIONS: &[OptionEntry] = &[
    entry("toshkent", "Toshkent shahri"),
    entry("samarqand", "Samarqand"),
    entry("buxoro", "Buxoro"),
    entry("fargona", "Farg'ona"),
    entry("namangan", "Namangan"),
    entry("andijon", "Andijon"),
    entry("qashqadaryo", "Qashqadaryo"),
    entry("surxondaryo", "Surxondaryo"),
    entry("jizzax", "Jizzax"),
    entry("sirdaryo", "Sirdaryo"),
    entry("navoiy", "Navoiy"),
    entry("qoraqalpogiston", "Qoraqalpog'iston"),
];

pub const ZONES: &[OptionEntry] = &[
    entry("toshkent", "Toshkent shahri"),
    entry("boshqa", "Boshqa viloyat"),
];

pub const SUBJECTS: &[OptionEntry] = &[
    entry("matematika", "Matematika"),
    entry("fizika", "Fizika"),
    entry("kimyo", "Kimyo"),
    entry("biologiya", "Biologiya"),
    entry("ingliz-tili", "Ingliz tili"),
    entry("rus-tili", "Rus tili"),
    entry("tarix", "Tarix"),
    entry("informatika", "Informatika"),
];

pub const CAMPUS_SUBJECT: OptionEntry = entry("matematika", "Matematika");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectMode {
    Selectable(&'static [OptionEntry]),
    Fixed(OptionEntry),
}

impl SubjectMode {
    pub fn options(&self) -> &[OptionEntry] {
        match self {
            SubjectMode::Selectable(options) => options,
            SubjectMode::Fixed(entry) => std::slice::from_ref(entry),
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, SubjectMode::Fixed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    /// Twelve regions, selectable subject, registrations only logged locally.
    Regional,
    /// Capital-vs-other zones, one fixed subject, registrations forwarded to Telegram.
    Campus,
}

impl FromStr for ProfileKind {
    type Err = FormError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "regional" => Ok(ProfileKind::Regional),
            "campus" => Ok(ProfileKind::Campus),
            other => Err(FormError::UnknownProfile(other.to_string())),
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileKind::Regional => f.write_str("regional"),
            ProfileKind::Campus => f.write_str("campus"),
        }
    }
}

/// Deployment variant of the form expressed as data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormProfile {
    pub kind: ProfileKind,
    pub cities: &'static [OptionEntry],
    pub default_city: &'static str,
    pub subject: SubjectMode,
    /// Whether submissions are forwarded to the messaging webhook.
    pub notify: bool,
}

impl FormProfile {
    pub fn regional() -> Self {
        Self {
            kind: ProfileKind::Regional,
            cities: REGIONS,
            default_city: CAPITAL_CITY,
            subject: SubjectMode::Selectable(SUBJECTS),
            notify: false,
        }
    }

    pub fn campus() -> Self {
        Self {
            kind: ProfileKind::Campus,
            cities: ZONES,
            default_city: CAPITAL_CITY,
            subject: SubjectMode::Fixed(CAMPUS_SUBJECT),
            notify: true,
        }
    }

    pub fn for_kind(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Regional => Self::regional(),
            ProfileKind::Campus => Self::campus(),
        }
    }

    pub fn city_label(&self, value: &str) -> Option<&'static str> {
        lookup(self.cities, value)
    }

    pub fn subject_label(&self, value: &str) -> Option<&'static str> {
        match self.subject {
            SubjectMode::Selectable(options) => lookup(options, value),
            SubjectMode::Fixed(entry) => (entry.value == value).then_some(entry.label),
        }
    }

    /// Builds the outbound payload, resolving option codes to their labels.
    pub fn registration(&self, state: &FormState) -> Registration {
        Registration {
            name: state.name.trim().to_string(),
            city_label: self
                .city_label(&state.city)
                .map(str::to_string)
                .unwrap_or_else(|| state.city.clone()),
            phone: state.phone.clone(),
            subject_label: self
                .subject_label(&state.subject)
                .map(str::to_string)
                .unwrap_or_else(|| state.subject.clone()),
        }
    }
}

fn lookup(options: &[OptionEntry], value: &str) -> Option<&'static str> {
    options
        .iter()
        .find(|option| option.value == value)
        .map(|option| option.label)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormState {
    pub name: String,
    pub city: String,
    pub phone: String,
    pub subject: String,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            name: String::new(),
            city: String::new(),
            phone: PHONE_PREFIX.to_string(),
            subject: String::new(),
        }
    }
}

impl FormState {
    /// Empty state for `profile`; a fixed subject is filled in up front.
    pub fn for_profile(profile: &FormProfile) -> Self {
        let mut state = Self::default();
        if let SubjectMode::Fixed(entry) = profile.subject {
            state.subject = entry.value.to_string();
        }
        state
    }

    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::City => &self.city,
            Field::Phone => &self.phone,
            Field::Subject => &self.subject,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub city_label: String,
    pub phone: String,
    pub subject_label: String,
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
