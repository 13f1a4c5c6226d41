pub mod capture;
pub mod config;
pub mod decoding;
pub mod id_card_extractor;
pub mod models;
pub mod passport_extractor;
pub mod processing;
pub mod utils;

pub use capture::CaptureAnalyzer;
pub use config::PipelineConfig;
pub use id_card_extractor::IdCardExtractor;
pub use passport_extractor::PassportExtractor;
