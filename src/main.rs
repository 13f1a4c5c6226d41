// Command line front end for reading Egyptian ID cards and passports.

use clap::{Parser, Subcommand};
use hawiya::decoding::{classify_format, MrzDecoder, NationalIdDecoder};
use hawiya::models::CountryTable;
use hawiya::processing::detector::DetectorSet;
use hawiya::processing::image::ImageProcessor;
use hawiya::processing::mrz_locator::MrzLocator;
use hawiya::processing::quality;
use hawiya::utils::KycError;
use hawiya::{CaptureAnalyzer, PipelineConfig};
use image::DynamicImage;
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "hawiya")]
#[command(about = "Extract fields from Egyptian national ID cards and passport MRZs")]
#[command(version)]
struct Cli {
    /// Pipeline configuration (JSON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a 14-digit national ID number.
    Nid { digits: String },

    /// Decode MRZ lines.
    Mrz {
        #[arg(num_args = 2..=3, required = true)]
        lines: Vec<String>,
    },

    /// Classify a concatenated MRZ character stream.
    MrzFormat { text: String },

    /// Find the MRZ block in a passport image.
    LocateMrz {
        image: PathBuf,
        /// Write the MRZ crop here (PNG).
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print quality metrics for an image.
    Quality { image: PathBuf },

    /// Evaluate a camera frame against recorded detections.
    Capture {
        image: PathBuf,
        /// Recorded detections (JSON with document/fields/digits passes).
        #[arg(long)]
        detections: PathBuf,
    },

    /// Read a passport image end to end.
    #[cfg(feature = "tesseract")]
    Passport {
        image: PathBuf,
        /// Tesseract data directory.
        #[arg(long)]
        tessdata: Option<String>,
    },

    /// Read a national ID card image end to end.
    #[cfg(feature = "tesseract")]
    IdCard {
        image: PathBuf,
        #[arg(long)]
        detections: PathBuf,
        #[arg(long)]
        tessdata: Option<String>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error [{:?}]: {}", e.kind(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), KycError> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Commands::Nid { digits } => print_json(&NationalIdDecoder::decode(&digits)?),
        Commands::Mrz { lines } => {
            let countries = match &config.country_table {
                Some(path) => Arc::new(CountryTable::from_file(path)?),
                None => CountryTable::builtin(),
            };
            print_json(&MrzDecoder::new(countries).decode(&lines)?)
        }
        Commands::MrzFormat { text } => print_json(&classify_format(&text)),
        Commands::LocateMrz { image, out } => {
            let img = load_image(&image)?;
            match MrzLocator::new(config.mrz.clone()).locate(&img) {
                Some(region) => {
                    if let Some(out) = out {
                        let png = ImageProcessor::encode_png(&DynamicImage::ImageLuma8(region.crop))?;
                        std::fs::write(&out, png)?;
                        info!("MRZ crop written to {:?}", out);
                    }
                    print_json(&region.bbox)
                }
                None => {
                    println!("No MRZ region found");
                    Ok(())
                }
            }
        }
        Commands::Quality { image } => {
            let gray = ImageProcessor::to_gray(&load_image(&image)?);
            let metrics = quality::assess(&gray, &config.quality);
            let photo = quality::photo_present(&gray, &config.quality);
            print_json(&serde_json::json!({ "quality": metrics, "photoPresent": photo }))
        }
        Commands::Capture { image, detections } => {
            let detectors = DetectorSet::from_recorded_file(&detections)?;
            let bytes = std::fs::read(&image)?;
            print_json(&CaptureAnalyzer::new(detectors, config).analyze_bytes(&bytes))
        }
        #[cfg(feature = "tesseract")]
        Commands::Passport { image, tessdata } => {
            let recognizer = Arc::new(hawiya::processing::ocr::TesseractRecognizer::new(tessdata));
            let extractor = hawiya::PassportExtractor::new(recognizer, config)?;
            print_json(&extractor.extract_bytes(&std::fs::read(&image)?)?)
        }
        #[cfg(feature = "tesseract")]
        Commands::IdCard {
            image,
            detections,
            tessdata,
        } => {
            let detectors = DetectorSet::from_recorded_file(&detections)?;
            let recognizer = Arc::new(hawiya::processing::ocr::TesseractRecognizer::new(tessdata));
            let extractor = hawiya::IdCardExtractor::new(detectors, recognizer, config);
            print_json(&extractor.extract_bytes(&std::fs::read(&image)?)?)
        }
    }
}

fn load_image(path: &Path) -> Result<image::RgbImage, KycError> {
    ImageProcessor::decode(&std::fs::read(path)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), KycError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| KycError::Config(format!("Failed to serialise output: {}", e)))?;
    println!("{}", json);
    Ok(())
}
