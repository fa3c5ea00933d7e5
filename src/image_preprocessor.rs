use image::{imageops::FilterType, ImageReader};
use ndarray::{Array, ArrayView4, Ix4};
use std::io::Cursor;
use thiserror::Error;

/// Side length, in pixels, of the square grayscale input the image classifier expects.
pub const IMAGE_SIZE: usize = 150;

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("content type `{0}` is not an image")]
    InvalidInputKind(String),
    #[error("Could not decode image: {0}")]
    Decode(String),
}

/// Normalized `(1, 150, 150, 1)` tensor, values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor(Array<f32, Ix4>);

impl ImageTensor {
    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.0.view()
    }

    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }
}

pub fn is_image_content_type(content_type: &str) -> bool {
    content_type.starts_with("image/")
}

/// Decodes raw upload bytes as a grayscale raster, resizes it to
/// `IMAGE_SIZE`x`IMAGE_SIZE` with bilinear interpolation and scales the
/// intensities to `[0, 1]`.
pub fn preprocess_image(bytes: &[u8], content_type: &str) -> Result<ImageTensor, PreprocessError> {
    if !is_image_content_type(content_type) {
        return Err(PreprocessError::InvalidInputKind(content_type.to_string()));
    }

    let image_reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| PreprocessError::Decode(e.to_string()))?;

    let original_img = image_reader
        .decode()
        .map_err(|e| PreprocessError::Decode(e.to_string()))?;

    let gray = original_img.to_luma8();
    let size = IMAGE_SIZE as u32;
    let img = image::imageops::resize(&gray, size, size, FilterType::Triangle);

    let mut input = Array::zeros((1, IMAGE_SIZE, IMAGE_SIZE, 1));
    for (x, y, pixel) in img.enumerate_pixels() {
        input[[0, y as usize, x as usize, 0]] = (pixel.0[0] as f32) / 255.;
    }

    Ok(ImageTensor(input))
}
