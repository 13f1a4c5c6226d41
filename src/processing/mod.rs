pub mod detector;
pub mod digits;
pub mod image;
pub mod morphology;
pub mod mrz_locator;
pub mod ocr;
pub mod orientation;
pub mod quality;

pub use detector::{DetectorSet, FieldDetector, RecordedDetector};
pub use digits::{DigitReader, DigitReading};
pub use self::image::ImageProcessor;
pub use mrz_locator::{MrzLocator, MrzRegion};
pub use ocr::{LanguageHint, RecognizedText, TextRecognizer};
pub use orientation::{OrientationSelector, OrientedImage};
