use crate::models::{governorate_name, Gender, NationalIdRecord};
use crate::utils::DecodeError;

pub const NATIONAL_ID_LENGTH: usize = 14;

/// Decodes the positional fields of an Egyptian national ID number.
///
/// Layout: `C YY MM DD GG SSS K X` where `C` is the century (2 = 1900s,
/// 3 = 2000s), `GG` the governorate of birth and the 13th digit (`K`)
/// carries the gender, odd for male.
///
/// Month and day are not checked against the calendar; `2991332...` decodes
/// to `1999-13-32`.
pub struct NationalIdDecoder;

impl NationalIdDecoder {
    pub fn decode(digits: &str) -> Result<NationalIdRecord, DecodeError> {
        let chars: Vec<char> = digits.chars().collect();
        if chars.len() < NATIONAL_ID_LENGTH {
            return Err(DecodeError::InvalidLength { found: chars.len() });
        }

        // Positions 0-8 (century, date, governorate) and 12 (gender) are read.
        for position in (0..9).chain(std::iter::once(12)) {
            if !chars[position].is_ascii_digit() {
                return Err(DecodeError::InvalidFormat { position });
            }
        }

        let digit = |i: usize| chars[i] as u8 - b'0';
        let pair = |i: usize| digit(i) * 10 + digit(i + 1);

        let century_digit = digit(0);
        let base_year: u32 = match century_digit {
            2 => 1900,
            3 => 2000,
            _ => return Err(DecodeError::InvalidCentury(chars[0])),
        };

        let year_of_century = pair(1);
        let month = pair(3);
        let day = pair(5);
        let governorate_code: String = chars[7..9].iter().collect();
        let gender_code = digit(12);
        let gender = if gender_code % 2 == 1 {
            Gender::Male
        } else {
            Gender::Female
        };

        Ok(NationalIdRecord {
            digits: chars[..NATIONAL_ID_LENGTH].iter().collect(),
            century_digit,
            year_of_century,
            month,
            day,
            governorate: governorate_name(&governorate_code).to_string(),
            governorate_code,
            sequence_and_check_digits: chars[9..NATIONAL_ID_LENGTH].iter().collect(),
            gender_code,
            birth_date: format!(
                "{:04}-{:02}-{:02}",
                base_year + year_of_century as u32,
                month,
                day
            ),
            gender,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(century: u8, year: u8, month: u8, day: u8, gov: &str, gender: u8) -> String {
        format!("{}{:02}{:02}{:02}{}123{}4", century, year, month, day, gov, gender)
    }

    #[test]
    fn test_decode_known_number() {
        let record = NationalIdDecoder::decode("29001011234517").unwrap();
        assert_eq!(record.birth_date, "1990-01-01");
        assert_eq!(record.governorate_code, "12");
        assert_eq!(record.governorate, "Dakahlia");
        assert_eq!(record.gender, Gender::Male);
        assert_eq!(record.sequence_and_check_digits, "34517");
    }

    #[test]
    fn test_every_synthetic_date_and_gender_decodes() {
        for century in [2u8, 3] {
            let base = if century == 2 { 1900 } else { 2000 };
            for year in [0u8, 1, 47, 99] {
                for month in 1..=12u8 {
                    for day in [1u8, 15, 28, 31] {
                        for gender in 0..=9u8 {
                            let digits = synthetic(century, year, month, day, "21", gender);
                            let record = NationalIdDecoder::decode(&digits).unwrap();
                            assert_eq!(
                                record.birth_date,
                                format!("{:04}-{:02}-{:02}", base + year as u32, month, day)
                            );
                            let expected = if gender % 2 == 1 {
                                Gender::Male
                            } else {
                                Gender::Female
                            };
                            assert_eq!(record.gender, expected);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_short_input_is_invalid_length() {
        assert_eq!(
            NationalIdDecoder::decode(""),
            Err(DecodeError::InvalidLength { found: 0 })
        );
        assert_eq!(
            NationalIdDecoder::decode("123"),
            Err(DecodeError::InvalidLength { found: 3 })
        );
    }

    #[test]
    fn test_century_one_is_rejected() {
        let digits = format!("1{}", "2".repeat(13));
        assert_eq!(
            NationalIdDecoder::decode(&digits),
            Err(DecodeError::InvalidCentury('1'))
        );
    }

    #[test]
    fn test_non_digit_is_invalid_format() {
        assert_eq!(
            NationalIdDecoder::decode("29O01011234567"),
            Err(DecodeError::InvalidFormat { position: 2 })
        );
        assert_eq!(
            NationalIdDecoder::decode("290010112345X7"),
            Err(DecodeError::InvalidFormat { position: 12 })
        );
    }

    #[test]
    fn test_governorate_codes() {
        let cairo = NationalIdDecoder::decode(&synthetic(3, 1, 2, 3, "01", 1)).unwrap();
        assert_eq!(cairo.governorate, "Cairo");
        let foreign = NationalIdDecoder::decode(&synthetic(3, 1, 2, 3, "88", 1)).unwrap();
        assert_eq!(foreign.governorate, "Foreign");
        let unknown = NationalIdDecoder::decode(&synthetic(3, 1, 2, 3, "99", 1)).unwrap();
        assert_eq!(unknown.governorate, "Unknown");
    }

    #[test]
    fn test_calendar_bounds_are_not_checked() {
        let record = NationalIdDecoder::decode("29913321234567").unwrap();
        assert_eq!(record.birth_date, "1999-13-32");
    }
}
