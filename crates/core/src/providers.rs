//! Provider contracts (spec.md §4.1) and the bootstrap step that
//! populates a [`Providers`] bundle before any [`crate::engine::Engine`]
//! is constructed.
//!
//! `FileScanner` and `ContentHasher`/`PerceptualHasher` are implemented
//! in this crate (`scanner`, `hash::content`, `hash::perceptual`).
//! `MetadataProvider`, `OcrProvider` and `ImageClassifier` are the
//! out-of-scope collaborators spec.md §1 calls out (EXIF/OCR/ONNX) —
//! only their contracts live here so a caller can register a concrete
//! implementation and have it picked up by `organize`/`classify`-style
//! callers identically to the built-in providers.

use crate::error::Result;
use crate::hash::content::{ContentHasher, Fast64Hasher, Sha256Hasher};
use crate::hash::perceptual::{AHasher, DHasher, PHasher, PerceptualHasher};
use crate::model::PerceptualAlgorithm;
use crate::registry::Registry;
use crate::scanner::{FileScanner, WalkdirScanner};
use chrono::{DateTime, Utc};
use std::path::Path;

/// A single EXIF/XMP-style metadata record. Field presence mirrors
/// spec.md §4.7's placeholder table (`{year}`, `{camera_make}`, ...).
#[derive(Debug, Clone, Default)]
pub struct ImageMetadata {
    pub taken_at: Option<DateTime<Utc>>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub gps_lat: Option<f64>,
    pub gps_lon: Option<f64>,
}

pub trait MetadataProvider: Send + Sync {
    fn name(&self) -> &str;
    fn read(&self, path: &Path) -> Result<Option<ImageMetadata>>;
}

#[derive(Debug, Clone)]
pub struct OcrResult {
    pub text: String,
}

pub trait OcrProvider: Send + Sync {
    fn name(&self) -> &str;
    fn recognize(&self, path: &Path, lang: &str) -> Result<Option<OcrResult>>;
}

#[derive(Debug, Clone)]
pub struct Classification {
    pub label: String,
    pub confidence: f64,
}

pub trait ImageClassifier: Send + Sync {
    fn name(&self) -> &str;
    fn classify(&self, path: &Path) -> Result<Vec<Classification>>;
}

/// The six provider-kind registries, populated once by [`bootstrap`].
pub struct Providers {
    pub scanners: Registry<dyn FileScanner>,
    pub hashers: Registry<dyn ContentHasher>,
    pub perceptual_hashers: Registry<dyn PerceptualHasher>,
    pub metadata: Registry<dyn MetadataProvider>,
    pub ocr: Registry<dyn OcrProvider>,
    pub classifiers: Registry<dyn ImageClassifier>,
}

/// Register the providers this crate ships with. Callers add their own
/// OCR/metadata/classifier providers after this returns and before
/// constructing an `Engine` — registration is not safe once an `Engine`
/// is concurrently calling `create`/`names` (spec.md §4.1).
pub fn bootstrap() -> Providers {
    let scanners: Registry<dyn FileScanner> = Registry::new();
    scanners.add("walkdir", || Ok(Box::new(WalkdirScanner::new())));

    let hashers: Registry<dyn ContentHasher> = Registry::new();
    hashers.add("fast64", || Ok(Box::new(Fast64Hasher)));
    hashers.add("sha256", || Ok(Box::new(Sha256Hasher)));

    let perceptual_hashers: Registry<dyn PerceptualHasher> = Registry::new();
    perceptual_hashers.add("ahash", || Ok(Box::new(AHasher)));
    perceptual_hashers.add("dhash", || Ok(Box::new(DHasher)));
    perceptual_hashers.add("phash", || Ok(Box::new(PHasher)));

    Providers {
        scanners,
        hashers,
        perceptual_hashers,
        metadata: Registry::new(),
        ocr: Registry::new(),
        classifiers: Registry::new(),
    }
}

/// Resolve a perceptual hasher by its [`PerceptualAlgorithm`] rather than
/// a free-form string; used by `similar` callers that already parsed the
/// `--phash` flag.
pub fn perceptual_hasher_for(
    providers: &Providers,
    algorithm: PerceptualAlgorithm,
) -> Result<Box<dyn PerceptualHasher>> {
    providers.perceptual_hashers.require(algorithm.name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_registers_builtin_providers() {
        let providers = bootstrap();
        assert_eq!(providers.scanners.names(), vec!["walkdir".to_string()]);
        assert_eq!(
            providers.hashers.names(),
            vec!["fast64".to_string(), "sha256".to_string()]
        );
        assert_eq!(
            providers.perceptual_hashers.names(),
            vec!["ahash".to_string(), "dhash".to_string(), "phash".to_string()]
        );
        assert!(providers.metadata.names().is_empty());
    }
}
