pub mod data;
pub mod records;
pub mod tables;

pub use data::*;
pub use records::*;
pub use tables::{governorate_name, CountryTable};
