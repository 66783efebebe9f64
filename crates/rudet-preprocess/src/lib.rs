//! rudet-preprocess – decode, resize and normalize still images.
//!
//! Turns an image file into the `Array3<f32>` (H, W, C) tensor the
//! inference layer expects: RGB, resized to the model input size,
//! normalized to 0-1.0.  The original image is kept around by the caller
//! for rendering, so only the tensor copy is produced here.

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array3;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

pub type Result<T> = std::result::Result<T, PreprocessError>;

/// Read an image file into RGB pixels.
///
/// Decode failures are fatal for the invocation and surface here, before
/// any detection work starts.
pub fn load_image(path: &Path) -> Result<RgbImage> {
    let img = image::open(path).map_err(|source| PreprocessError::Decode {
        path: path.display().to_string(),
        source,
    })?;
    Ok(img.to_rgb8())
}

/// Resizes RGB images to the model input size and normalizes them.
#[derive(Clone)]
pub struct Preprocessor {
    dst_w: u32,
    dst_h: u32,
}

impl Preprocessor {
    /// Create a pre-processor that outputs W×H RGB (0-1.0 f32).
    pub fn new(dst_w: u32, dst_h: u32) -> Self {
        Self { dst_w, dst_h }
    }

    /// Bilinear resize to the target size, then pack into an (H, W, C)
    /// tensor of 0-1 floats.
    pub fn run(&self, image: &RgbImage) -> Array3<f32> {
        let resized = imageops::resize(image, self.dst_w, self.dst_h, FilterType::Triangle);
        Array3::from_shape_fn(
            (self.dst_h as usize, self.dst_w as usize, 3),
            |(y, x, c)| resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0,
        )
    }
}
