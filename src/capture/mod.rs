pub mod analyzer;
pub mod gate;

pub use analyzer::CaptureAnalyzer;
pub use gate::{CaptureDecision, CaptureQualityGate, CaptureSignals};
