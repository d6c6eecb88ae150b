//! Detection pipeline for scanned telecom site plans.
//!
//! [`PlanScan`] runs ONNX text detection/recognition and circular-symbol
//! detection over a raster, associates labels with symbols by proximity, and
//! georeferences the accepted matches against an axis-aligned bounding box.
//! Map rendering and placemark export live in consuming applications.

use std::path::PathBuf;

use image::DynamicImage;
use rec_net::RecNet;
use text_net::TextNet;
use tracing::instrument;

pub mod circles;
pub mod classify;
mod entity;
mod error;
pub mod georef;
pub mod naming;
mod rec_net;
mod text_net;
pub mod tokens;
pub mod util;

pub use entity::*;
pub use error::{Error, Result};

use circles::CircleParams;
use georef::GeoBoundingBox;
use naming::NamingConfig;

pub use ort as runtime;

pub struct PlanScanBuilder {
    threads: usize,
    det_path: Option<PathBuf>,
    rec_paths: Option<(PathBuf, PathBuf)>,
    max_side_len: u32,
    cache_path: Option<PathBuf>,
    execution_providers: Vec<ExecutionProvider>,
}

impl PlanScanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn det_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.det_path = Some(path.into());
        self
    }

    pub fn rec_model(
        mut self,
        model_path: impl Into<PathBuf>,
        keys_path: impl Into<PathBuf>,
    ) -> Self {
        self.rec_paths = Some((model_path.into(), keys_path.into()));
        self
    }

    pub fn max_side_len(mut self, max_side_len: u32) -> Self {
        self.max_side_len = max_side_len;
        self
    }

    pub fn with_engine_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    pub fn with_execution_providers(
        mut self,
        providers: impl IntoIterator<Item = ExecutionProvider>,
    ) -> Self {
        self.execution_providers = providers.into_iter().collect();
        self
    }

    #[instrument(skip(self))]
    pub fn build(mut self) -> Result<PlanScan> {
        let det_path = self
            .det_path
            .take()
            .unwrap_or_else(|| "models/det.onnx".into());
        let (rec_path, keys_path) = self
            .rec_paths
            .take()
            .unwrap_or_else(|| ("models/rec.onnx".into(), "models/keys.txt".into()));
        let text_net = TextNet::init(
            det_path,
            self.threads,
            &self.execution_providers,
            self.cache_path.clone(),
        )?;
        let rec_net = RecNet::init(
            rec_path,
            keys_path,
            self.threads,
            &self.execution_providers,
            self.cache_path,
        )?;
        Ok(PlanScan {
            text_net,
            rec_net,
            max_side_len: self.max_side_len,
        })
    }
}

impl Default for PlanScanBuilder {
    fn default() -> Self {
        Self {
            threads: 4,
            det_path: None,
            rec_paths: None,
            max_side_len: 2048,
            cache_path: None,
            execution_providers: DEFAULT_PROVIDERS.to_vec(),
        }
    }
}

/// The detection engine: immutable model sessions only, so `detect` is
/// stateless and reentrant. Each run recomputes everything from scratch.
pub struct PlanScan {
    text_net: TextNet,
    rec_net: RecNet,
    max_side_len: u32,
}

impl PlanScan {
    /// Full detection run: token extraction, circle detection, per-candidate
    /// classification, georeferencing.
    ///
    /// Candidates without a qualifying label are dropped silently; a raster
    /// with no circles yields an empty list, not an error.
    #[instrument(skip(self, image, bounds, naming))]
    pub fn detect(
        &self,
        image: &DynamicImage,
        bounds: &GeoBoundingBox,
        naming: &NamingConfig,
        options: &DetectionOptions,
    ) -> Result<Vec<DetectedEntity>> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(Error::InvalidGeometry(format!(
                "raster dimensions must be non-zero, got {width}x{height}"
            )));
        }

        let gray = image.to_luma8();
        let gray_image = DynamicImage::ImageLuma8(gray.clone());

        let tokens = self.extract_tokens(&gray_image, options)?;
        log::debug!("extracted {} tokens", tokens.len());

        let symbols = circles::find_circles(&gray, &options.circles);
        log::debug!("detected {} candidate symbols", symbols.len());

        let mut entities = Vec::new();
        for symbol in &symbols {
            let Some((category, label)) = classify::classify_symbol(
                symbol,
                &tokens,
                naming,
                options.max_association_distance,
            ) else {
                continue;
            };
            let (lat, lon) = georef::pixel_to_lat_lon(symbol.x, symbol.y, width, height, bounds)?;
            entities.push(DetectedEntity {
                category,
                label,
                lat,
                lon,
            });
        }
        Ok(entities)
    }

    /// Runs only the OCR half of the pipeline: word boxes, recognition, and
    /// token filtering, in recognition order.
    #[instrument(skip(self, image))]
    pub fn extract_tokens(
        &self,
        image: &DynamicImage,
        options: &DetectionOptions,
    ) -> Result<Vec<TextToken>> {
        let max_side_len = if options.max_side_len != 0 {
            options.max_side_len
        } else {
            self.max_side_len
        };
        let scale = util::scale_for_inference(image, max_side_len);
        let boxes = self.text_net.get_text_boxes(
            image,
            scale,
            options.box_score_threshold,
            options.box_threshold,
            options.unclip_ratio,
        )?;
        let crops = boxes
            .iter()
            .map(|text_box| util::crop_box(image, &text_box.rect))
            .collect::<Vec<_>>();
        let lines = self.rec_net.recognize(&crops)?;
        let raw = tokens::raw_from_ocr(&boxes, &lines);
        Ok(tokens::filter_tokens(
            raw,
            options.min_confidence,
            options.clean_tokens,
        ))
    }
}

/// Per-run tuning. `for_dpi` derives the resolution-dependent values (circle
/// profile and association distance) from the scan resolution; the OCR
/// thresholds do not vary with DPI.
#[derive(Debug, Clone, Copy)]
pub struct DetectionOptions {
    /// Long-side cap for detection inference; 0 uses the engine default.
    pub max_side_len: u32,
    pub box_score_threshold: f32,
    pub box_threshold: f32,
    pub unclip_ratio: f32,
    /// Tokens must score strictly above this, in [0, 100].
    pub min_confidence: f32,
    /// Strip characters outside `[A-Za-z0-9-]` before matching.
    pub clean_tokens: bool,
    pub max_association_distance: f32,
    pub circles: CircleParams,
}

impl DetectionOptions {
    pub fn for_dpi(dpi: u32) -> Self {
        Self {
            max_side_len: 0,
            box_score_threshold: 0.5,
            box_threshold: 0.3,
            unclip_ratio: 1.6,
            min_confidence: 30.0,
            clean_tokens: true,
            max_association_distance: classify::association_distance_for_dpi(dpi),
            circles: CircleParams::for_dpi(dpi),
        }
    }
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self::for_dpi(CircleParams::REFERENCE_DPI)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionProvider {
    Default,
    #[cfg(feature = "tensorrt")]
    TensorRT,
    #[cfg(feature = "coreml")]
    CoreML,
    #[cfg(feature = "cuda")]
    Cuda,
    #[cfg(feature = "directml")]
    DirectML,
}

const DEFAULT_PROVIDERS: &[ExecutionProvider] = &[
    #[cfg(feature = "tensorrt")]
    ExecutionProvider::TensorRT,
    #[cfg(feature = "coreml")]
    ExecutionProvider::CoreML,
    #[cfg(feature = "directml")]
    ExecutionProvider::DirectML,
    #[cfg(feature = "cuda")]
    ExecutionProvider::Cuda,
    ExecutionProvider::Default,
];
