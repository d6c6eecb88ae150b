//! DB-style word-box detection.
//!
//! Site plans scatter labels irregularly, so every contour of the probability
//! map is kept as an independent box; no line or paragraph grouping is done.

use std::path::PathBuf;

use geo::{Coord, MinimumRotatedRect, Scale as GeoScale};
use image::{imageops::FilterType, DynamicImage, GrayImage};
use imageproc::{
    contours::find_contours,
    contrast::{threshold_mut, ThresholdType},
    distance_transform::Norm,
    morphology::dilate_mut,
};
use ndarray::{ArrayView2, Axis};
use ort::{inputs, Session};
use tracing::instrument;

use crate::{
    util::{self, box_score, contour_to_poly, max_side, normalize_to_chw, probability_map_to_luma, unclip},
    ExecutionProvider, TextBox,
};

const MEAN_VALUES: [f32; 3] = [0.485, 0.456, 0.406];
const NORM_VALUES: [f32; 3] = [1.0 / 0.229, 1.0 / 0.224, 1.0 / 0.225];

pub struct TextNet {
    session: Session,
}

impl TextNet {
    #[instrument(level = "debug", skip(execution_providers, cache_path))]
    pub fn init(
        path: PathBuf,
        num_threads: usize,
        execution_providers: &[ExecutionProvider],
        cache_path: Option<PathBuf>,
    ) -> ort::Result<Self> {
        let session = util::build_session(&path, num_threads, execution_providers, cache_path)?;
        log::debug!("text detection inputs: {:?}", session.inputs);
        log::debug!("text detection outputs: {:?}", session.outputs);
        Ok(Self { session })
    }

    /// Runs the detection model over the rescaled raster and returns word
    /// boxes in original-image coordinates.
    #[instrument(skip(self, image), level = "debug")]
    pub fn get_text_boxes(
        &self,
        image: &DynamicImage,
        scale: util::Scale,
        box_score_thresh: f32,
        box_thresh: f32,
        unclip_ratio: f32,
    ) -> ort::Result<Vec<TextBox>> {
        let image =
            image.resize_exact(scale.target_width, scale.target_height, FilterType::Nearest);
        let input_values =
            normalize_to_chw(&image, &MEAN_VALUES, &NORM_VALUES).insert_axis(Axis(0));
        let outputs = self.session.run(inputs!["x" => input_values]?)?;
        let pred_mat = outputs
            .first_key_value()
            .expect("detection model produces one output")
            .1
            .try_extract_tensor::<f32>()?;

        let width = pred_mat.len_of(Axis(3));
        let height = pred_mat.len_of(Axis(2));

        let pred_data = pred_mat
            .to_owned()
            .remove_axis(Axis(0))
            .remove_axis(Axis(0));
        let pred_data = pred_data
            .to_shape((height, width))
            .expect("prediction map is height x width");

        let mut mask = probability_map_to_luma(pred_data.view());
        threshold_mut(&mut mask, (box_thresh * 255.0) as u8, ThresholdType::Binary);
        dilate_mut(&mut mask, Norm::L1, 2);

        Ok(boxes_from_mask(
            pred_data.view(),
            mask,
            scale,
            box_score_thresh,
            unclip_ratio,
        ))
    }
}

#[instrument(skip(pred_data, mask), level = "trace")]
fn boxes_from_mask(
    pred_data: ArrayView2<f32>,
    mask: GrayImage,
    util::Scale {
        factor_x, factor_y, ..
    }: util::Scale,
    box_score_threshold: f32,
    unclip_ratio: f32,
) -> Vec<TextBox> {
    let long_side_threshold = 3.0;
    let max_candidates = 1000;

    find_contours::<i32>(&mask)
        .into_iter()
        .take(max_candidates)
        .filter(|contour| contour.points.len() > 2)
        .filter_map(|contour| contour_to_poly(&contour.points).minimum_rotated_rect())
        .filter(|rect| max_side(rect) >= long_side_threshold)
        .map(|rect| {
            let score = box_score(&rect, pred_data.view());
            (rect, score)
        })
        .filter(|(_, score)| *score >= box_score_threshold)
        .filter_map(|(rect, score)| Some((unclip(rect, unclip_ratio)?, score)))
        .filter(|(expanded, _)| max_side(expanded) >= long_side_threshold + 2.0)
        .map(|(rect, score)| TextBox {
            score,
            rect: rect.scale_around_point(factor_x, factor_y, Coord::zero()),
        })
        .collect()
}
