// Static lookup tables: governorate codes and ISO alpha-3 country codes.

use crate::utils::KycError;
use lazy_static::lazy_static;
use log::warn;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub const FOREIGN_GOVERNORATE: &str = "Foreign";
pub const UNKNOWN_GOVERNORATE: &str = "Unknown";

const GOVERNORATES: [(&str, &str); 28] = [
    ("01", "Cairo"),
    ("02", "Alexandria"),
    ("03", "Port Said"),
    ("04", "Suez"),
    ("11", "Damietta"),
    ("12", "Dakahlia"),
    ("13", "Ash Sharqia"),
    ("14", "Kaliobeya"),
    ("15", "Kafr El-Sheikh"),
    ("16", "Gharbia"),
    ("17", "Monoufia"),
    ("18", "El Beheira"),
    ("19", "Ismailia"),
    ("21", "Giza"),
    ("22", "Beni Suef"),
    ("23", "Fayoum"),
    ("24", "El Menia"),
    ("25", "Assiut"),
    ("26", "Sohag"),
    ("27", "Qena"),
    ("28", "Aswan"),
    ("29", "Luxor"),
    ("31", "Red Sea"),
    ("32", "New Valley"),
    ("33", "Matrouh"),
    ("34", "North Sinai"),
    ("35", "South Sinai"),
    ("88", FOREIGN_GOVERNORATE),
];

static BUILTIN_COUNTRY_CODES: &str = include_str!("../../data/country_codes.json");

lazy_static! {
    static ref GOVERNORATE_TABLE: HashMap<&'static str, &'static str> =
        GOVERNORATES.iter().copied().collect();
    static ref BUILTIN_COUNTRIES: Arc<CountryTable> = Arc::new(
        CountryTable::from_json(BUILTIN_COUNTRY_CODES).unwrap_or_else(|e| {
            warn!("Built-in country table unreadable: {}", e);
            CountryTable::default()
        })
    );
}

/// Governorate name for a two-digit code, `"Unknown"` when not listed.
pub fn governorate_name(code: &str) -> &'static str {
    GOVERNORATE_TABLE
        .get(code)
        .copied()
        .unwrap_or(UNKNOWN_GOVERNORATE)
}

#[derive(Deserialize)]
struct CountryEntry {
    name: String,
    #[serde(rename = "alpha-3")]
    alpha3: String,
}

/// ISO 3166 alpha-3 code to country name, plus the ICAO-specific codes
/// (`D`, `UNO`, `XXA`, ...) that show up in MRZs.
#[derive(Debug, Clone, Default)]
pub struct CountryTable {
    names: HashMap<String, String>,
}

impl CountryTable {
    pub fn builtin() -> Arc<CountryTable> {
        Arc::clone(&BUILTIN_COUNTRIES)
    }

    /// Parse a JSON array of `{"name": ..., "alpha-3": ...}` entries.
    pub fn from_json(json: &str) -> Result<Self, KycError> {
        let entries: Vec<CountryEntry> = serde_json::from_str(json)
            .map_err(|e| KycError::Config(format!("Invalid country table: {}", e)))?;
        let names = entries
            .into_iter()
            .map(|entry| (entry.alpha3.trim().to_uppercase(), entry.name))
            .collect();
        Ok(CountryTable { names })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, KycError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Upper-cased country name, or the code itself when it is not known.
    pub fn name_for(&self, code: &str) -> String {
        match self.names.get(code) {
            Some(name) => name.to_uppercase(),
            None => code.to_string(),
        }
    }
}
