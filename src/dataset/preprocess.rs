//! Image preprocessing for training and inference
//!
//! Every image the network sees goes through the same steps: decode, resize to
//! a fixed square, convert to RGB, optionally mirror (training only), then
//! scale to [0, 1]. The output is a flat CHW `Vec<f32>` ready to be packed
//! into a `[N, 3, H, W]` tensor.

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, RgbImage};
use rand::Rng;

use super::{CHANNELS, IMAGE_SIZE};
use crate::utils::error::{PlantError, Result};

/// Probability that a training image is mirrored horizontally
pub const MIRROR_PROBABILITY: f64 = 0.5;

/// Where an image comes from
#[derive(Debug, Clone, Copy)]
pub enum ImageInput<'a> {
    /// A file on disk
    Path(&'a Path),
    /// An encoded image held in memory, e.g. an uploaded file
    Bytes(&'a [u8]),
}

impl<'a> ImageInput<'a> {
    /// Decode the input, guessing the format from its content
    pub fn decode(&self) -> Result<DynamicImage> {
        match self {
            ImageInput::Path(path) => {
                let reader = ImageReader::open(path)
                    .map_err(|e| PlantError::decode_path(path, e))?
                    .with_guessed_format()
                    .map_err(|e| PlantError::decode_path(path, e))?;
                reader.decode().map_err(|e| PlantError::decode_path(path, e))
            }
            ImageInput::Bytes(bytes) => image::load_from_memory(bytes)
                .map_err(|e| PlantError::decode_bytes(bytes.len(), e)),
        }
    }
}

impl<'a> From<&'a Path> for ImageInput<'a> {
    fn from(path: &'a Path) -> Self {
        ImageInput::Path(path)
    }
}

impl<'a> From<&'a [u8]> for ImageInput<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        ImageInput::Bytes(bytes)
    }
}

/// Decodes and normalises images into network input
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    image_size: u32,
    mirror_probability: f64,
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self {
            image_size: IMAGE_SIZE as u32,
            mirror_probability: MIRROR_PROBABILITY,
        }
    }
}

impl ImagePreprocessor {
    /// Preprocessor producing `image_size`×`image_size` inputs
    ///
    /// Fails with `Config` for a zero size or one the image crate cannot address.
    pub fn new(image_size: usize) -> Result<Self> {
        let side = u32::try_from(image_size)
            .ok()
            .filter(|&side| side > 0)
            .ok_or_else(|| {
                PlantError::Config(format!("Invalid preprocessing image size {}", image_size))
            })?;

        Ok(Self {
            image_size: side,
            mirror_probability: MIRROR_PROBABILITY,
        })
    }

    /// Override the mirroring probability used in training mode
    pub fn with_mirror_probability(mut self, probability: f64) -> Self {
        self.mirror_probability = probability.clamp(0.0, 1.0);
        self
    }

    pub fn image_size(&self) -> usize {
        self.image_size as usize
    }

    /// Number of floats produced per image
    pub fn output_len(&self) -> usize {
        CHANNELS * self.image_size() * self.image_size()
    }

    /// Full pipeline: decode, resize, RGB, optional mirror, scale to [0, 1]
    pub fn preprocess<R: Rng + ?Sized>(
        &self,
        input: ImageInput<'_>,
        training: bool,
        rng: &mut R,
    ) -> Result<Vec<f32>> {
        let img = input.decode()?;
        let mut rgb = self.resize(&img);

        if training && rng.gen_bool(self.mirror_probability) {
            image::imageops::flip_horizontal_in_place(&mut rgb);
        }

        Ok(self.to_tensor_data(&rgb))
    }

    /// Preprocess without augmentation
    pub fn preprocess_for_inference(&self, input: ImageInput<'_>) -> Result<Vec<f32>> {
        let img = input.decode()?;
        let rgb = self.resize(&img);
        Ok(self.to_tensor_data(&rgb))
    }

    fn resize(&self, img: &DynamicImage) -> RgbImage {
        img.resize_exact(self.image_size, self.image_size, FilterType::Triangle)
            .to_rgb8()
    }

    /// Convert to CHW float data normalized to [0, 1]
    fn to_tensor_data(&self, rgb: &RgbImage) -> Vec<f32> {
        let (width, height) = rgb.dimensions();
        let plane = (width * height) as usize;
        let mut data = vec![0.0f32; CHANNELS * plane];

        for (x, y, pixel) in rgb.enumerate_pixels() {
            let offset = (y * width + x) as usize;
            for c in 0..CHANNELS {
                data[c * plane + offset] = pixel[c] as f32 / 255.0;
            }
        }

        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::test_support::{write_solid, write_split};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::io::Cursor;
    use tempfile::TempDir;

    const PLANE: usize = IMAGE_SIZE * IMAGE_SIZE;

    #[test]
    fn test_output_shape_and_range() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("leaf.png");
        write_solid(&path, 40, [255, 128, 0]);

        let preprocessor = ImagePreprocessor::default();
        let data = preprocessor
            .preprocess_for_inference(ImageInput::Path(&path))
            .unwrap();

        assert_eq!(data.len(), 3 * 128 * 128);
        assert_eq!(data.len(), preprocessor.output_len());
        assert!(data.iter().all(|v| (0.0..=1.0).contains(v)));

        // Channel planes are contiguous
        assert!((data[0] - 1.0).abs() < 1e-6);
        assert!((data[PLANE] - 128.0 / 255.0).abs() < 1e-6);
        assert!(data[2 * PLANE].abs() < 1e-6);
    }

    #[test]
    fn test_mirror_in_training_mode() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("half.png");
        write_split(&path, 16);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let plain = ImagePreprocessor::default()
            .with_mirror_probability(0.0)
            .preprocess(ImageInput::Path(&path), true, &mut rng)
            .unwrap();
        let mirrored = ImagePreprocessor::default()
            .with_mirror_probability(1.0)
            .preprocess(ImageInput::Path(&path), true, &mut rng)
            .unwrap();

        assert_eq!(plain[0], 0.0);
        assert_eq!(plain[IMAGE_SIZE - 1], 1.0);
        assert_eq!(mirrored[0], 1.0);
        assert_eq!(mirrored[IMAGE_SIZE - 1], 0.0);
    }

    #[test]
    fn test_no_mirror_outside_training() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("half.png");
        write_split(&path, 16);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let data = ImagePreprocessor::default()
            .with_mirror_probability(1.0)
            .preprocess(ImageInput::Path(&path), false, &mut rng)
            .unwrap();

        assert_eq!(data[0], 0.0);
    }

    #[test]
    fn test_bytes_match_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("leaf.png");
        write_split(&path, 32);
        let bytes = std::fs::read(&path).unwrap();

        let preprocessor = ImagePreprocessor::new(64).unwrap();
        let from_path = preprocessor
            .preprocess_for_inference(ImageInput::Path(&path))
            .unwrap();
        let from_bytes = preprocessor
            .preprocess_for_inference(ImageInput::Bytes(&bytes))
            .unwrap();

        assert_eq!(from_path.len(), 3 * 64 * 64);
        assert_eq!(from_path, from_bytes);
    }

    #[test]
    fn test_jpeg_bytes_decode() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 10, image::Rgb([0, 200, 0])));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
            .unwrap();

        let data = ImagePreprocessor::default()
            .preprocess_for_inference(ImageInput::Bytes(&bytes))
            .unwrap();
        assert_eq!(data.len(), 3 * PLANE);
    }

    #[test]
    fn test_rejects_unusable_image_size() {
        for size in [0, usize::MAX] {
            let err = ImagePreprocessor::new(size).unwrap_err();
            assert!(matches!(err, PlantError::Config(_)));
        }
        assert_eq!(ImagePreprocessor::new(1).unwrap().output_len(), 3);
    }

    #[test]
    fn test_decode_error() {
        let err = ImagePreprocessor::default()
            .preprocess_for_inference(ImageInput::Bytes(b"plain text"))
            .unwrap_err();
        assert!(matches!(err, PlantError::Decode { .. }));

        let err = ImagePreprocessor::default()
            .preprocess_for_inference(ImageInput::Path(Path::new("/missing/leaf.jpg")))
            .unwrap_err();
        assert!(matches!(err, PlantError::Decode { .. }));
    }
}
