use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tract_onnx::prelude::tract_ndarray::{Array4, Axis};

use super::{ImageBatch, InferenceError};

/// Normalization applied in place to a freshly decoded 0-255 batch.
pub type Normalizer = fn(&mut ImageBatch);

const CAFFE_BGR_MEAN: [f32; 3] = [103.939, 116.779, 123.68];
const TORCH_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const TORCH_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Architecture family of an exported classifier. Each family was trained on
/// its own pixel convention, so the family decides the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelFamily {
    #[serde(rename = "mobilenet_v3")]
    MobileNetV3,
    #[serde(rename = "efficientnet")]
    EfficientNet,
    #[serde(rename = "mobilenet_v2")]
    MobileNetV2,
    #[serde(rename = "inception_v3")]
    InceptionV3,
    #[serde(rename = "xception")]
    Xception,
    #[serde(rename = "resnet50")]
    ResNet50,
    #[serde(rename = "vgg16")]
    Vgg16,
    #[serde(rename = "densenet121")]
    DenseNet121,
}

impl ModelFamily {
    pub fn normalizer(self) -> Normalizer {
        match self {
            // Rescaling layers are part of these graphs.
            ModelFamily::MobileNetV3 | ModelFamily::EfficientNet => passthrough,
            ModelFamily::MobileNetV2 | ModelFamily::InceptionV3 | ModelFamily::Xception => {
                scale_symmetric
            }
            ModelFamily::ResNet50 | ModelFamily::Vgg16 => caffe_bgr,
            ModelFamily::DenseNet121 => torch_standardize,
        }
    }
}

fn passthrough(_batch: &mut ImageBatch) {}

/// Maps 0..255 to -1..1.
fn scale_symmetric(batch: &mut ImageBatch) {
    batch.mapv_inplace(|v| v / 127.5 - 1.0);
}

/// RGB to BGR, then zero-centre on the ImageNet channel means.
fn caffe_bgr(batch: &mut ImageBatch) {
    for mut pixel in batch.lanes_mut(Axis(3)) {
        let (r, g, b) = (pixel[0], pixel[1], pixel[2]);
        pixel[0] = b - CAFFE_BGR_MEAN[0];
        pixel[1] = g - CAFFE_BGR_MEAN[1];
        pixel[2] = r - CAFFE_BGR_MEAN[2];
    }
}

fn torch_standardize(batch: &mut ImageBatch) {
    for mut pixel in batch.lanes_mut(Axis(3)) {
        for c in 0..3 {
            pixel[c] = (pixel[c] / 255.0 - TORCH_MEAN[c]) / TORCH_STD[c];
        }
    }
}

pub fn load_image(path: &Path) -> Result<DynamicImage, InferenceError> {
    let reader = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|source| InferenceError::ImageOpen {
            path: path.to_path_buf(),
            source,
        })?;
    reader.decode().map_err(|source| InferenceError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })
}

/// Stretches the image to `[width, height]` (aspect ratio is not kept) and
/// lays it out as a single-image RGB batch with raw 0-255 values.
pub fn to_batch(image: &DynamicImage, [width, height]: [u32; 2]) -> ImageBatch {
    let resized = image
        .resize_exact(width, height, FilterType::CatmullRom)
        .to_rgb8();
    Array4::from_shape_fn(
        (1, height as usize, width as usize, 3),
        |(_, y, x, c)| resized.get_pixel(x as u32, y as u32)[c] as f32,
    )
}

pub fn load_batch(path: &Path, image_size: [u32; 2]) -> Result<ImageBatch, InferenceError> {
    let image = load_image(path)?;
    Ok(to_batch(&image, image_size))
}
