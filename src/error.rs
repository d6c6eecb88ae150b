use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Degenerate raster dimensions or an inverted bounding box. These are
    /// configuration mistakes and fail the run before any division happens.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Rejected naming configuration (e.g. an empty keyword, which would
    /// match every token).
    #[error("invalid naming config: {0}")]
    InvalidNaming(String),

    #[error("model inference failed")]
    Inference(#[from] ort::Error),

    #[error("failed to decode raster")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;
