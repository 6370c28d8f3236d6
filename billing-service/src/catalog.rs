use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Billing category of a CPT code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CptCategory {
    Evaluation,
    Treatment,
    Group,
    Teletherapy,
}

/// Procedure code with its default pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CptCode {
    pub code: String,
    pub description: String,
    pub category: CptCategory,
    /// Rate per billed unit
    pub default_rate: Decimal,
    pub default_units: u32,
    /// Timed codes bill one unit per started block of this many minutes
    pub minutes_per_unit: Option<u32>,
    pub requires_modifier: bool,
    pub allowed_modifiers: Vec<String>,
}

impl CptCode {
    /// Units billed for a session of `duration_minutes`
    pub fn units_for(&self, duration_minutes: u32) -> u32 {
        match self.minutes_per_unit {
            Some(block) if block > 0 => duration_minutes.div_ceil(block).max(1),
            _ => self.default_units,
        }
    }

    pub fn allows_modifier(&self, modifier: &str) -> bool {
        self.allowed_modifiers.iter().any(|allowed| allowed == modifier)
    }
}

// code, description, category, rate in cents, default units, minutes per unit, modifier required, modifiers
type CatalogRow = (
    &'static str,
    &'static str,
    CptCategory,
    i64,
    u32,
    Option<u32>,
    bool,
    &'static [&'static str],
);

const TELEHEALTH: &[&str] = &["95", "GT"];
const SESSION_MODIFIERS: &[&str] = &["GN", "95", "GT", "59"];

const STANDARD_CODES: &[CatalogRow] = &[
    ("92521", "Evaluation of speech fluency", CptCategory::Evaluation, 16500, 1, None, false, TELEHEALTH),
    ("92522", "Evaluation of speech sound production", CptCategory::Evaluation, 14000, 1, None, false, TELEHEALTH),
    (
        "92523",
        "Evaluation of speech sound production with evaluation of language comprehension and expression",
        CptCategory::Evaluation,
        28500,
        1,
        None,
        false,
        TELEHEALTH,
    ),
    ("92524", "Behavioral and qualitative analysis of voice and resonance", CptCategory::Evaluation, 15000, 1, None, false, TELEHEALTH),
    (
        "92607",
        "Evaluation for prescription of speech-generating AAC device, first hour",
        CptCategory::Evaluation,
        21000,
        1,
        None,
        false,
        TELEHEALTH,
    ),
    (
        "92608",
        "Evaluation for prescription of speech-generating AAC device, each additional 30 minutes",
        CptCategory::Evaluation,
        8500,
        1,
        Some(30),
        false,
        TELEHEALTH,
    ),
    (
        "92507",
        "Treatment of speech, language, voice, communication and/or auditory processing disorder; individual",
        CptCategory::Treatment,
        15000,
        1,
        None,
        false,
        SESSION_MODIFIERS,
    ),
    (
        "92609",
        "Therapeutic services for the use of speech-generating AAC device, including programming and modification",
        CptCategory::Treatment,
        12500,
        1,
        None,
        false,
        SESSION_MODIFIERS,
    ),
    (
        "92508",
        "Treatment of speech, language, voice, communication and/or auditory processing disorder; group, 2 or more individuals",
        CptCategory::Group,
        4500,
        1,
        None,
        false,
        SESSION_MODIFIERS,
    ),
    (
        "97129",
        "Therapeutic interventions that focus on cognitive function, initial 15 minutes",
        CptCategory::Treatment,
        4000,
        1,
        None,
        false,
        SESSION_MODIFIERS,
    ),
    (
        "97130",
        "Therapeutic interventions that focus on cognitive function, each additional 15 minutes",
        CptCategory::Treatment,
        3500,
        1,
        Some(15),
        false,
        SESSION_MODIFIERS,
    ),
    (
        "98970",
        "Qualified nonphysician online digital assessment and management, 5-10 minutes",
        CptCategory::Teletherapy,
        3000,
        1,
        None,
        true,
        &["95", "GT", "GQ"],
    ),
    (
        "98971",
        "Qualified nonphysician online digital assessment and management, 11-20 minutes",
        CptCategory::Teletherapy,
        5000,
        1,
        None,
        true,
        &["95", "GT", "GQ"],
    ),
    (
        "98972",
        "Qualified nonphysician online digital assessment and management, 21 or more minutes",
        CptCategory::Teletherapy,
        7500,
        1,
        None,
        true,
        &["95", "GT", "GQ"],
    ),
];

/// Lookup table of billable CPT codes
#[derive(Debug, Clone)]
pub struct CptCatalog {
    codes: BTreeMap<String, CptCode>,
}

impl CptCatalog {
    /// Speech-language pathology and AAC codes with default rates
    pub fn standard() -> Self {
        Self::from_codes(STANDARD_CODES.iter().map(
            |&(code, description, category, cents, default_units, minutes_per_unit, requires_modifier, modifiers)| {
                CptCode {
                    code: code.to_string(),
                    description: description.to_string(),
                    category,
                    default_rate: Decimal::new(cents, 2),
                    default_units,
                    minutes_per_unit,
                    requires_modifier,
                    allowed_modifiers: modifiers.iter().map(|m| m.to_string()).collect(),
                }
            },
        ))
    }

    pub fn from_codes(codes: impl IntoIterator<Item = CptCode>) -> Self {
        Self {
            codes: codes.into_iter().map(|code| (code.code.clone(), code)).collect(),
        }
    }

    pub fn lookup(&self, code: &str) -> Option<&CptCode> {
        self.codes.get(code)
    }

    pub fn by_category(&self, category: CptCategory) -> impl Iterator<Item = &CptCode> {
        self.codes.values().filter(move |code| code.category == category)
    }

    pub fn codes(&self) -> impl Iterator<Item = &CptCode> {
        self.codes.values()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl Default for CptCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
