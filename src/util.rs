use std::path::{Path, PathBuf};

use geo::{
    point, Area, BoundingRect, Contains, Coord, EuclideanLength, HasDimensions, LineString,
    MinimumRotatedRect, Polygon, Translate,
};
use geo_clipper::{Clipper, EndType, JoinType};
use image::{DynamicImage, GrayImage, ImageBuffer};
use imageproc::point::Point;
use ndarray::{s, Array3, ArrayView2, Axis};
use ort::{GraphOptimizationLevel, Session};
use tracing::instrument;

use crate::ExecutionProvider;

/// Converts an image into a CHW f32 tensor with per-channel mean/std
/// normalization, the layout both detection and recognition models expect.
#[instrument(level = "debug", skip(image))]
pub(crate) fn normalize_to_chw(
    image: &DynamicImage,
    mean_vals: &[f32; 3],
    norm_vals: &[f32; 3],
) -> Array3<f32> {
    let rgb = image.to_rgb32f();
    Array3::<f32>::from_shape_fn(
        (3, rgb.height() as usize, rgb.width() as usize),
        |(ch, y, x)| {
            let value = rgb.get_pixel(x as u32, y as u32).0[ch];
            (value - mean_vals[ch]) * norm_vals[ch]
        },
    )
}

pub(crate) fn probability_map_to_luma(data: ArrayView2<f32>) -> GrayImage {
    let height = data.len_of(Axis(0));
    let width = data.len_of(Axis(1));
    let pixels = data
        .iter()
        .map(|p| (p * 255.0) as u8)
        .collect::<Vec<u8>>();
    ImageBuffer::from_raw(width as u32, height as u32, pixels)
        .expect("pixel buffer matches dimensions")
}

pub(crate) fn contour_to_poly(points: &[Point<i32>]) -> Polygon<f32> {
    let coords = points
        .iter()
        .map(|p| Coord {
            x: p.x as f32,
            y: p.y as f32,
        })
        .collect();
    Polygon::new(LineString::new(coords), vec![])
}

pub(crate) fn max_side(rect: &Polygon<f32>) -> f32 {
    rect.exterior()
        .lines()
        .map(|line| line.euclidean_length() as i32)
        .max()
        .unwrap_or(0) as f32
}

/// Mean probability over the pixels of the predicted map covered by `rect`.
pub(crate) fn box_score(rect: &Polygon<f32>, pred: ArrayView2<f32>) -> f32 {
    let Some(bounds) = rect.bounding_rect() else {
        return 0.0;
    };
    let min = bounds.min();
    let max = bounds.max();
    let y1 = (min.y.max(0.0) as usize).min(pred.len_of(Axis(0)));
    let y2 = (max.y.max(0.0) as usize).min(pred.len_of(Axis(0)));
    let x1 = (min.x.max(0.0) as usize).min(pred.len_of(Axis(1)));
    let x2 = (max.x.max(0.0) as usize).min(pred.len_of(Axis(1)));
    if y1 >= y2 || x1 >= x2 {
        return 0.0;
    }

    let sliced = pred.slice(s![y1..y2, x1..x2]);
    let local = rect.translate(-(x1 as f32), -(y1 as f32));

    let mut sum = 0.0;
    let mut count = 0usize;
    for ((y, x), value) in sliced.indexed_iter() {
        if local.contains(&point![x: x as f32, y: y as f32]) {
            sum += *value;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

/// Expands a tight text rect outward so descenders and thin strokes survive
/// the crop, then refits a minimum rotated rectangle.
pub(crate) fn unclip(rect: Polygon<f32>, unclip_ratio: f32) -> Option<Polygon<f32>> {
    let perimeter = rect.exterior().euclidean_length();
    if perimeter == 0.0 {
        return None;
    }
    let distance = (rect.unsigned_area() * 0.5 * unclip_ratio) / perimeter;
    let expanded = rect.offset(distance, JoinType::Round(0.25), EndType::ClosedPolygon, 1.0);
    if expanded.is_empty() {
        None
    } else {
        expanded.minimum_rotated_rect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Scale {
    pub factor_x: f32,
    pub factor_y: f32,
    pub target_width: u32,
    pub target_height: u32,
}

/// Aspect-preserving rescale of the raster to at most `target_size` on the
/// long side, floored to multiples of 32 as the detection model requires.
pub fn scale_for_inference(image: &DynamicImage, target_size: u32) -> Scale {
    let aspect_ratio = image.width() as f32 / image.height() as f32;
    let (mut target_width, mut target_height) = if aspect_ratio >= 1.0 {
        let width = image.width().min(target_size);
        (width, (width as f32 / aspect_ratio) as u32)
    } else {
        let height = image.height().min(target_size);
        ((height as f32 * aspect_ratio) as u32, height)
    };
    target_width = (target_width / 32 * 32).max(32);
    target_height = (target_height / 32 * 32).max(32);
    let factor_x = image.width() as f32 / target_width as f32;
    let factor_y = image.height() as f32 / target_height as f32;
    log::debug!(
        "inference scale: {}x{} -> {target_width}x{target_height} (factors {factor_x}, {factor_y})",
        image.width(),
        image.height()
    );
    Scale {
        factor_x,
        factor_y,
        target_width,
        target_height,
    }
}

/// Axis-aligned crop of one text box out of the full raster.
pub(crate) fn crop_box(image: &DynamicImage, b_box: &Polygon<f32>) -> DynamicImage {
    let Some(rect) = b_box.bounding_rect() else {
        return image.crop_imm(0, 0, 0, 0);
    };
    let x = (rect.min().x.max(0.0) as u32).min(image.width());
    let y = (rect.min().y.max(0.0) as u32).min(image.height());
    let width = (rect.width() as u32).min(image.width() - x);
    let height = (rect.height() as u32).min(image.height() - y);
    log::trace!("cropping text box at ({x}, {y}) size {width}x{height}");
    image.crop_imm(x, y, width, height)
}

#[cfg(feature = "tensorrt")]
fn setup_tensorrt(cache_path: PathBuf) -> ort::ExecutionProviderDispatch {
    use ort::TensorRTExecutionProvider;

    TensorRTExecutionProvider::default()
        .with_engine_cache(true)
        .with_engine_cache_path(cache_path.to_string_lossy())
        .with_timing_cache(true)
        .build()
}

#[cfg(feature = "cuda")]
fn setup_cuda() -> ort::ExecutionProviderDispatch {
    use ort::CUDAExecutionProvider;

    CUDAExecutionProvider::default().build()
}

#[cfg(feature = "coreml")]
fn setup_coreml() -> ort::ExecutionProviderDispatch {
    use ort::CoreMLExecutionProvider;

    CoreMLExecutionProvider::default().build()
}

#[cfg(feature = "directml")]
fn setup_directml() -> ort::ExecutionProviderDispatch {
    use ort::DirectMLExecutionProvider;

    DirectMLExecutionProvider::default().build()
}

/// Builds an ONNX session with the configured execution providers. Shared by
/// the detection and recognition models.
#[instrument(level = "debug", skip(execution_providers, cache_path))]
pub(crate) fn build_session(
    path: &Path,
    num_threads: usize,
    execution_providers: &[ExecutionProvider],
    #[allow(unused_variables)] cache_path: Option<PathBuf>,
) -> ort::Result<Session> {
    #[cfg(feature = "directml")]
    let parallel = execution_providers.contains(&ExecutionProvider::DirectML);
    #[cfg(not(feature = "directml"))]
    let parallel = true;

    let providers = execution_providers.iter().filter_map(
        |provider| -> Option<ort::ExecutionProviderDispatch> {
            match provider {
                ExecutionProvider::Default => None,
                #[cfg(feature = "tensorrt")]
                ExecutionProvider::TensorRT => Some(setup_tensorrt(
                    cache_path
                        .clone()
                        .unwrap_or_else(|| path.parent().unwrap_or(Path::new(".")).join(".cache")),
                )),
                #[cfg(feature = "cuda")]
                ExecutionProvider::Cuda => Some(setup_cuda()),
                #[cfg(feature = "coreml")]
                ExecutionProvider::CoreML => Some(setup_coreml()),
                #[cfg(feature = "directml")]
                ExecutionProvider::DirectML => Some(setup_directml()),
            }
        },
    );

    Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_memory_pattern(parallel)?
        .with_parallel_execution(parallel)?
        .with_inter_threads(num_threads)?
        .with_intra_threads(num_threads)?
        .with_execution_providers(providers)?
        .commit_from_file(path)
}
