pub mod grammar;
pub mod mrz;
pub mod national_id;

pub use grammar::{Correction, FieldGrammar};
pub use mrz::{classify_format, parse_mrz_date, MrzDecoder};
pub use national_id::NationalIdDecoder;
