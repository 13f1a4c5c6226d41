use crate::models::data::{BoundingBox, DetectedRegion};
use crate::utils::ErrorKind;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "Male"),
            Gender::Female => write!(f, "Female"),
        }
    }
}

/// A decoded 14-digit Egyptian national ID number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NationalIdRecord {
    pub digits: String,
    pub century_digit: u8,
    pub year_of_century: u8,
    pub month: u8,
    pub day: u8,
    pub governorate_code: String,
    pub sequence_and_check_digits: String,
    pub gender_code: u8,
    /// `YYYY-MM-DD`, zero padded.
    pub birth_date: String,
    pub governorate: String,
    pub gender: Gender,
}

/// ICAO MRZ layout a character stream was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MrzFormat {
    /// Passport, 2 lines of 44 characters.
    Td3,
    Partial,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MrzFormatInfo {
    pub format: MrzFormat,
    pub description: String,
    pub line_count: usize,
    pub lines: Vec<String>,
    pub total_chars: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MrzRecord {
    pub document_type: String,
    pub issuing_country_code: String,
    pub issuing_country: String,
    pub surname: String,
    pub given_names: String,
    pub passport_number: String,
    pub nationality_code: String,
    pub nationality: String,
    /// `DD/MM/YYYY`, or the raw `YYMMDD` text when it does not parse.
    pub date_of_birth: String,
    pub sex: char,
    pub expiration_date: String,
    pub personal_number: Option<String>,
    pub raw_lines: Vec<String>,
}

/// In-memory images produced while serving one request.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugArtifacts {
    #[serde(serialize_with = "png_as_base64", skip_serializing_if = "Option::is_none")]
    pub overlay_png: Option<Vec<u8>>,
    #[serde(serialize_with = "png_as_base64", skip_serializing_if = "Option::is_none")]
    pub card_crop_png: Option<Vec<u8>>,
    #[serde(serialize_with = "png_as_base64", skip_serializing_if = "Option::is_none")]
    pub mrz_crop_png: Option<Vec<u8>>,
}

fn png_as_base64<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
    match bytes {
        Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
        None => serializer.serialize_none(),
    }
}

/// A problem a pipeline recovered from, reported next to the partial result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub stage: &'static str,
    pub kind: Option<ErrorKind>,
    pub message: String,
}

impl Diagnostic {
    pub fn note(stage: &'static str, message: impl Into<String>) -> Self {
        Diagnostic {
            stage,
            kind: None,
            message: message.into(),
        }
    }

    pub fn failure(stage: &'static str, kind: ErrorKind, message: impl Into<String>) -> Self {
        Diagnostic {
            stage,
            kind: Some(kind),
            message: message.into(),
        }
    }
}

/// Result of reading a national ID card photo. Fields that could not be
/// found are empty strings.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdCardExtraction {
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub national_id: String,
    pub address: String,
    pub serial: String,
    pub birth_date: String,
    pub governorate: String,
    pub gender: String,
    pub rotation_degrees: u32,
    pub detected_fields: Vec<DetectedRegion>,
    pub diagnostics: Vec<Diagnostic>,
    pub debug: DebugArtifacts,
}

/// Result of reading a passport photo. `data` is `None` when the MRZ could
/// not be located or decoded; `error` then says why.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassportExtraction {
    pub success: bool,
    pub data: Option<MrzRecord>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub mrz_detected: bool,
    pub mrz_box: Option<BoundingBox>,
    pub mrz_info: Option<MrzFormatInfo>,
    pub diagnostics: Vec<Diagnostic>,
    pub debug: DebugArtifacts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_artifacts_serialize_as_base64() {
        let artifacts = DebugArtifacts {
            overlay_png: Some(vec![1, 2, 3]),
            ..Default::default()
        };
        let json = serde_json::to_value(&artifacts).unwrap();
        assert_eq!(json["overlayPng"], "AQID");
        assert!(json.get("cardCropPng").is_none());
    }

    #[test]
    fn test_gender_display() {
        assert_eq!(Gender::Male.to_string(), "Male");
        assert_eq!(Gender::Female.to_string(), "Female");
    }
}
