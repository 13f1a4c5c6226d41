use crate::models::{CountryTable, MrzFormat, MrzFormatInfo, MrzRecord};
use crate::utils::DecodeError;
use chrono::NaiveDate;
use log::{debug, warn};
use std::sync::Arc;

pub const FILLER: char = '<';
pub const TD3_LINE_LENGTH: usize = 44;
pub const TD1_LINE_LENGTH: usize = 30;

/// Century prepended to every `YYMMDD` date. Births before 2000 come out a
/// hundred years late; callers that need real birth years must pivot.
const DATE_CENTURY_PREFIX: &str = "20";

/// Parses passport MRZ lines (TD3 layout) into a [`MrzRecord`].
///
/// Line 1: `TT CCC SURNAME<<GIVEN<NAMES`
/// Line 2: `NNNNNNNNN c NAT YYMMDD c S YYMMDD c PERSONAL#######`
pub struct MrzDecoder {
    countries: Arc<CountryTable>,
}

impl Default for MrzDecoder {
    fn default() -> Self {
        Self::new(CountryTable::builtin())
    }
}

impl MrzDecoder {
    pub fn new(countries: Arc<CountryTable>) -> Self {
        MrzDecoder { countries }
    }

    pub fn decode<S: AsRef<str>>(&self, lines: &[S]) -> Result<MrzRecord, DecodeError> {
        let lines: Vec<&str> = lines
            .iter()
            .map(|l| l.as_ref().trim())
            .filter(|l| !l.is_empty())
            .collect();
        if lines.len() < 2 {
            return Err(DecodeError::InsufficientMrzData { found: lines.len() });
        }

        let line1 = pad_line(lines[0], TD3_LINE_LENGTH);
        let line2 = pad_line(lines[1], TD3_LINE_LENGTH);
        debug!("Decoding MRZ lines:\n{}\n{}", to_string(&line1), to_string(&line2));

        let (surname, given_names) = split_names(&line1[5..TD3_LINE_LENGTH]);
        let issuing_country_code = clean_code(&line1[2..5]);
        let nationality_code = clean_code(&line2[10..13]);
        let personal_number = strip_filler(&line2[28..42]);

        Ok(MrzRecord {
            document_type: clean_code(&line1[0..2]),
            issuing_country: self.countries.name_for(&issuing_country_code),
            issuing_country_code,
            surname,
            given_names,
            passport_number: clean_code(&line2[0..9]),
            nationality: self.countries.name_for(&nationality_code),
            nationality_code,
            date_of_birth: parse_mrz_date(&to_string(&line2[13..19])),
            sex: normalize_sex(&clean_code(&line2[20..21])),
            expiration_date: parse_mrz_date(&to_string(&line2[21..27])),
            personal_number: if personal_number.is_empty() {
                None
            } else {
                Some(personal_number)
            },
            raw_lines: lines.iter().map(|l| l.to_string()).collect(),
        })
    }
}

/// Classify a single concatenated MRZ stream by length and split it into
/// lines. Pure diagnostic metadata; decoding does not depend on it.
pub fn classify_format(raw: &str) -> MrzFormatInfo {
    let chars: Vec<char> = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let total = chars.len();
    let chunks = |size: usize, limit: usize| -> Vec<String> {
        chars[..limit.min(total)]
            .chunks(size)
            .map(|c| c.iter().collect())
            .collect()
    };

    let (format, description, lines) = if total == 0 {
        (MrzFormat::Unknown, "Unknown (empty)".to_string(), Vec::new())
    } else if total >= 2 * TD3_LINE_LENGTH {
        // A 3x30 stream is 90 chars, so it always lands here first.
        (
            MrzFormat::Td3,
            "Type 3 (2 lines x 44 chars)".to_string(),
            chunks(TD3_LINE_LENGTH, 2 * TD3_LINE_LENGTH),
        )
    } else {
        let lines = if total > TD3_LINE_LENGTH {
            chunks(TD3_LINE_LENGTH, total)
        } else if total > TD1_LINE_LENGTH {
            chunks(TD1_LINE_LENGTH, total)
        } else {
            vec![chars.iter().collect()]
        };
        (
            MrzFormat::Partial,
            format!("Partial/Unknown ({} chars)", total),
            lines,
        )
    };

    MrzFormatInfo {
        format,
        description,
        line_count: lines.len(),
        lines,
        total_chars: total,
    }
}

fn pad_line(line: &str, width: usize) -> Vec<char> {
    let mut chars: Vec<char> = line.chars().collect();
    if chars.len() < width {
        chars.resize(width, FILLER);
    }
    chars
}

fn to_string(chars: &[char]) -> String {
    chars.iter().collect()
}

/// Alphanumeric characters only, upper-cased.
fn clean_code(chars: &[char]) -> String {
    chars
        .iter()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_uppercase())
        .collect()
}

/// Filler becomes a space, whitespace runs collapse to one space.
fn humanize(text: &str) -> String {
    text.replace(FILLER, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

fn strip_filler(chars: &[char]) -> String {
    humanize(&to_string(chars))
}

fn split_names(chars: &[char]) -> (String, String) {
    let names = to_string(chars);
    match names.split_once("<<") {
        Some((surname, given)) => (humanize(surname), humanize(given)),
        None => (humanize(&names), String::new()),
    }
}

/// `M`/`m` and the OCR-confused `0` read as male; everything else,
/// including unreadable codes, reads as female.
fn normalize_sex(code: &str) -> char {
    match code {
        "M" | "0" => 'M',
        _ => 'F',
    }
}

/// `YYMMDD` to `DD/MM/YYYY` using a fixed `20` century. Returns the input
/// unchanged when it is not a valid date.
pub fn parse_mrz_date(yymmdd: &str) -> String {
    let full = if yymmdd.chars().count() == 6 {
        format!("{}{}", DATE_CENTURY_PREFIX, yymmdd)
    } else {
        yymmdd.to_string()
    };
    match NaiveDate::parse_from_str(&full, "%Y%m%d") {
        Ok(date) => date.format("%d/%m/%Y").to_string(),
        Err(e) => {
            warn!("Error parsing MRZ date '{}': {}", yymmdd, e);
            yymmdd.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE1: &str = "P<EGYDOE<<JOHN<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<";
    const LINE2: &str = "A123456789EGY9001019M3001011<<<<<<<<<<<<08";

    #[test]
    fn test_decode_passport_lines() {
        let record = MrzDecoder::default().decode(&[LINE1, LINE2]).unwrap();
        assert_eq!(record.document_type, "P");
        assert_eq!(record.issuing_country_code, "EGY");
        assert_eq!(record.issuing_country, "EGYPT");
        assert_eq!(record.surname, "DOE");
        assert_eq!(record.given_names, "JOHN");
        assert_eq!(record.passport_number, "A12345678");
        assert_eq!(record.nationality, "EGYPT");
        assert_eq!(record.sex, 'M');
        assert_eq!(record.date_of_birth, "01/01/2090");
        assert_eq!(record.expiration_date, "01/01/2030");
        assert_eq!(record.personal_number, Some("08".to_string()));
    }

    #[test]
    fn test_multi_part_given_names() {
        let record = MrzDecoder::default()
            .decode(&[
                "P<GBRSMITH<JONES<<ANNA<MARIA<<<<<<<<<<<<<<<<<<",
                "1234567890GBR8507142F2511301<<<<<<<<<<<<<<04",
            ])
            .unwrap();
        assert_eq!(record.surname, "SMITH JONES");
        assert_eq!(record.given_names, "ANNA MARIA");
        assert_eq!(record.issuing_country, "UNITED KINGDOM");
        assert_eq!(record.sex, 'F');
        assert_eq!(record.personal_number, None);
    }

    #[test]
    fn test_fewer_than_two_lines_is_insufficient() {
        let decoder = MrzDecoder::default();
        assert_eq!(
            decoder.decode::<&str>(&[]),
            Err(DecodeError::InsufficientMrzData { found: 0 })
        );
        assert_eq!(
            decoder.decode(&[LINE1, "   "]),
            Err(DecodeError::InsufficientMrzData { found: 1 })
        );
    }

    #[test]
    fn test_short_lines_are_padded() {
        let record = MrzDecoder::default().decode(&["P<EGYDOE", "A1"]).unwrap();
        assert_eq!(record.surname, "DOE");
        assert_eq!(record.given_names, "");
        assert_eq!(record.passport_number, "A1");
        assert_eq!(record.nationality, "");
        assert_eq!(record.sex, 'F');
        assert_eq!(record.date_of_birth, "<<<<<<");
    }

    #[test]
    fn test_non_ascii_ocr_noise_does_not_panic() {
        let record = MrzDecoder::default()
            .decode(&["P<EGYDÖE<<JOHN", "A123456789EGY9001019M"])
            .unwrap();
        assert_eq!(record.surname, "DÖE");
    }

    #[test]
    fn test_sex_codes() {
        assert_eq!(normalize_sex("M"), 'M');
        assert_eq!(normalize_sex("0"), 'M');
        assert_eq!(normalize_sex("F"), 'F');
        assert_eq!(normalize_sex(""), 'F');
        assert_eq!(normalize_sex("X"), 'F');
    }

    #[test]
    fn test_lowercase_sex_is_upcased_first() {
        let line2 = "A123456789EGY9001019m3001011<<<<<<<<<<<<08";
        let record = MrzDecoder::default().decode(&[LINE1, line2]).unwrap();
        assert_eq!(record.sex, 'M');
    }

    #[test]
    fn test_unknown_country_keeps_code() {
        let record = MrzDecoder::default()
            .decode(&["P<ZZZDOE<<JOHN", "A123456789QQQ9001019M3001011"])
            .unwrap();
        assert_eq!(record.issuing_country, "ZZZ");
        assert_eq!(record.nationality, "QQQ");
    }

    #[test]
    fn test_invalid_date_is_returned_verbatim() {
        assert_eq!(parse_mrz_date("901399"), "901399");
        assert_eq!(parse_mrz_date("850714"), "14/07/2085");
    }

    #[test]
    fn test_classify_td3_stream() {
        let stream = format!("{}{}", LINE1, pad(LINE2, 44));
        let info = classify_format(&stream);
        assert_eq!(info.format, MrzFormat::Td3);
        assert_eq!(info.line_count, 2);
        assert_eq!(info.lines[0], LINE1);
        assert_eq!(info.total_chars, 88);
    }

    #[test]
    fn test_classify_long_streams_as_td3() {
        for first in ['I', 'P'] {
            let stream = format!("{}{}", first, "<".repeat(89));
            let info = classify_format(&stream);
            assert_eq!(info.format, MrzFormat::Td3);
            assert_eq!(info.lines.len(), 2);
            assert!(info.lines.iter().all(|l| l.len() == 44));
            assert_eq!(info.total_chars, 90);
        }
    }

    #[test]
    fn test_classify_partial_stream() {
        let info = classify_format(&"A".repeat(50));
        assert_eq!(info.format, MrzFormat::Partial);
        assert_eq!(info.lines, vec!["A".repeat(44), "A".repeat(6)]);

        let info = classify_format(&"B".repeat(40));
        assert_eq!(info.lines, vec!["B".repeat(30), "B".repeat(10)]);

        let info = classify_format("");
        assert_eq!(info.format, MrzFormat::Unknown);
        assert_eq!(info.line_count, 0);
    }

    #[test]
    fn test_classify_is_repeatable() {
        let stream = format!("{}{}", LINE1, pad(LINE2, 44));
        assert_eq!(classify_format(&stream), classify_format(&stream));
    }

    fn pad(line: &str, width: usize) -> String {
        format!("{:<<width$}", line, width = width)
    }
}
