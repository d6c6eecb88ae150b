//! CRNN-style text recognition with CTC argmax decoding.

use std::path::PathBuf;

use float_ord::FloatOrd;
use image::{imageops::FilterType, DynamicImage};
use ndarray::{ArrayView2, Axis};
use ort::{inputs, Session};
use tracing::instrument;

use crate::{util, ExecutionProvider, TextLine};

const MEAN_VALUES: [f32; 3] = [0.5, 0.5, 0.5];
const NORM_VALUES: [f32; 3] = [2.0, 2.0, 2.0];

const DEST_HEIGHT: u32 = 48;

pub struct RecNet {
    session: Session,
    keys: Vec<String>,
}

impl RecNet {
    #[instrument(level = "debug", skip(execution_providers, cache_path))]
    pub fn init(
        model_path: PathBuf,
        keys_path: PathBuf,
        num_threads: usize,
        execution_providers: &[ExecutionProvider],
        cache_path: Option<PathBuf>,
    ) -> ort::Result<Self> {
        let session =
            util::build_session(&model_path, num_threads, execution_providers, cache_path)?;

        let keys = std::fs::read_to_string(&keys_path).map_err(|_| ort::Error::FileDoesNotExist {
            filename: keys_path,
        })?;
        // Index 0 is the CTC blank; the model's last class is space.
        let keys = ["#".to_string()]
            .into_iter()
            .chain(keys.lines().map(|line| line.to_string()))
            .chain([" ".to_string()])
            .collect::<Vec<_>>();

        log::debug!("recognition inputs: {:?}", session.inputs);
        log::debug!("recognition outputs: {:?}", session.outputs);

        Ok(Self { session, keys })
    }

    #[instrument(level = "debug", skip(self, images))]
    pub fn recognize(&self, images: &[DynamicImage]) -> ort::Result<Vec<TextLine>> {
        images.iter().map(|image| self.recognize_one(image)).collect()
    }

    #[instrument(level = "trace", skip(self, image))]
    fn recognize_one(&self, image: &DynamicImage) -> ort::Result<TextLine> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(TextLine {
                text: String::new(),
                character_scores: Vec::new(),
            });
        }
        let scale = DEST_HEIGHT as f32 / image.height() as f32;
        let dest_width = ((image.width() as f32 * scale) as u32)
            .min(u16::MAX as u32)
            .max(1);
        let image = image.resize_exact(dest_width, DEST_HEIGHT, FilterType::Nearest);

        let tensor_values =
            util::normalize_to_chw(&image, &MEAN_VALUES, &NORM_VALUES).insert_axis(Axis(0));
        let outputs = self.session.run(inputs!["x" => tensor_values]?)?;
        let output_tensor = outputs
            .first_key_value()
            .expect("recognition model produces one output")
            .1
            .try_extract_tensor::<f32>()?;

        log::trace!("recognition output shape: {:?}", output_tensor.dim());
        let steps = output_tensor.len_of(Axis(1));

        let output_tensor = output_tensor.remove_axis(Axis(0));
        let output = output_tensor
            .to_shape((steps, self.keys.len()))
            .expect("class axis matches key table");

        Ok(self.decode(output.view()))
    }

    /// Greedy CTC decode: argmax per step, blanks dropped, scores kept per
    /// emitted character.
    #[instrument(level = "trace", skip(self, data))]
    fn decode(&self, data: ArrayView2<f32>) -> TextLine {
        let keys_size = self.keys.len();

        let emitted = data
            .outer_iter()
            .filter_map(|step| {
                step.indexed_iter()
                    .max_by_key(|(_, value)| FloatOrd(**value))
                    .map(|(i, value)| (i, *value))
            })
            .filter(|(i, _)| *i > 0 && *i < keys_size)
            .map(|(i, score)| (self.keys[i].as_str(), score))
            .collect::<Vec<_>>();

        TextLine {
            text: emitted.iter().map(|(text, _)| *text).collect(),
            character_scores: emitted.iter().map(|(_, score)| *score).collect(),
        }
    }
}
