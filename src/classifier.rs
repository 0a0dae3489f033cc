use std::path::Path;

use image::DynamicImage;
use ndarray::Array4;
use serde::Serialize;
use thiserror::Error;
use tract_onnx::prelude::*;

use crate::labels::{ClassLabel, CLASS_COUNT};

/// Side length of the square model input.
pub const INPUT_SIZE: u32 = 224;

type OnnxPlan = TypedRunnableModel<TypedModel>;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("model error: {0}")]
    Model(String),
    #[error("model produced {0} values, expected {CLASS_COUNT}")]
    BadOutput(usize),
}

/// Outcome of one forward pass: the full probability vector in label order
/// plus the argmax label and its confidence. Built per request, dropped
/// after rendering.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub probabilities: [f32; CLASS_COUNT],
    pub label: ClassLabel,
    pub confidence: f32,
}

impl Prediction {
    /// Validates the raw output vector and selects the top label. Ties go
    /// to the earliest label in model output order.
    pub fn from_output(output: &[f32]) -> Result<Prediction, ClassifierError> {
        let probabilities: [f32; CLASS_COUNT] = output
            .try_into()
            .map_err(|_| ClassifierError::BadOutput(output.len()))?;

        let mut best = 0;
        for i in 1..CLASS_COUNT {
            if probabilities[i] > probabilities[best] {
                best = i;
            }
        }

        Ok(Prediction {
            probabilities,
            label: ClassLabel::ALL[best],
            confidence: probabilities[best],
        })
    }

    pub fn probability(&self, label: ClassLabel) -> f32 {
        self.probabilities[label as usize]
    }
}

/// The pre-converted inference artifact, loaded once at startup into an
/// optimized tract plan. `run` takes `&self`, so one instance is shared
/// across workers without a lock.
#[derive(Debug)]
pub struct Classifier {
    plan: OnnxPlan,
}

impl Classifier {
    pub fn load(model_path: &Path) -> Result<Classifier, ClassifierError> {
        let size = INPUT_SIZE as usize;
        let build = || -> TractResult<OnnxPlan> {
            tract_onnx::onnx()
                .model_for_path(model_path)?
                .with_input_fact(
                    0,
                    InferenceFact::dt_shape(f32::datum_type(), tvec!(1, size, size, 3)),
                )?
                .into_optimized()?
                .into_runnable()
        };
        let plan = build().map_err(|e| ClassifierError::Model(e.to_string()))?;
        Ok(Classifier { plan })
    }

    /// Reads the uploaded file once and runs a single forward pass.
    pub fn predict_file(&self, path: &Path) -> Result<Prediction, ClassifierError> {
        let img = image::open(path)?;
        self.predict(&img)
    }

    pub fn predict(&self, img: &DynamicImage) -> Result<Prediction, ClassifierError> {
        let size = INPUT_SIZE as usize;
        let input = preprocess(img);

        let tensor = tract_ndarray::Array4::from_shape_vec(
            (1, size, size, 3),
            input.into_raw_vec(),
        )
        .map_err(|e| ClassifierError::Model(e.to_string()))?
        .into_tensor();

        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| ClassifierError::Model(e.to_string()))?;
        let scores = outputs[0]
            .to_array_view::<f32>()
            .map_err(|e| ClassifierError::Model(e.to_string()))?;

        let scores: Vec<f32> = scores.iter().copied().collect();
        Prediction::from_output(&scores)
    }
}

/// Resizes to the fixed 224x224x3 input (aspect ratio is ignored) and
/// scales pixel intensities to [0,1]. NHWC layout, matching the artifact.
pub fn preprocess(img: &DynamicImage) -> Array4<f32> {
    let resized = img.resize_exact(INPUT_SIZE, INPUT_SIZE, image::imageops::FilterType::Triangle);
    let rgb = resized.to_rgb8();

    let size = INPUT_SIZE as usize;
    let mut tensor = Array4::zeros((1, size, size, 3));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, y as usize, x as usize, c]] = pixel[c] as f32 / 255.0;
        }
    }
    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid_image(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    #[test]
    fn preprocess_produces_fixed_shape_scaled_to_unit_range() {
        let tensor = preprocess(&solid_image(50, 90, [255, 128, 0]));
        assert_eq!(tensor.shape(), &[1, 224, 224, 3]);

        // A solid image survives resizing unchanged, so every pixel carries
        // the scaled source color.
        let center = [0, 112, 112];
        assert!((tensor[[center[0], center[1], center[2], 0]] - 1.0).abs() < 1e-6);
        assert!((tensor[[center[0], center[1], center[2], 1]] - 128.0 / 255.0).abs() < 1e-6);
        assert!((tensor[[center[0], center[1], center[2], 2]]).abs() < 1e-6);

        for &v in tensor.iter() {
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn preprocess_is_deterministic() {
        let img = solid_image(33, 17, [10, 200, 60]);
        assert_eq!(preprocess(&img), preprocess(&img));
    }

    #[test]
    fn argmax_selects_the_top_label() {
        // The spec scenario: index 4 (mel) wins with 0.81.
        let output = [0.02, 0.03, 0.05, 0.04, 0.81, 0.03, 0.02];
        let prediction = Prediction::from_output(&output).unwrap();

        assert_eq!(prediction.label, ClassLabel::Mel);
        assert!((prediction.confidence - 0.81).abs() < 1e-6);

        let sum: f32 = prediction.probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
    }

    #[test]
    fn ties_break_toward_the_first_label() {
        let output = [0.3, 0.3, 0.1, 0.1, 0.1, 0.05, 0.05];
        let prediction = Prediction::from_output(&output).unwrap();
        assert_eq!(prediction.label, ClassLabel::Akiec);
    }

    #[test]
    fn wrong_output_length_is_rejected() {
        assert!(matches!(
            Prediction::from_output(&[0.5, 0.5]),
            Err(ClassifierError::BadOutput(2))
        ));
        assert!(matches!(
            Prediction::from_output(&[0.1; 8]),
            Err(ClassifierError::BadOutput(8))
        ));
    }

    #[test]
    fn probability_reads_every_label_at_its_output_index() {
        let output = [0.05, 0.1, 0.15, 0.2, 0.25, 0.15, 0.1];
        let prediction = Prediction::from_output(&output).unwrap();
        for (i, &label) in ClassLabel::ALL.iter().enumerate() {
            assert!((prediction.probability(label) - output[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn loading_a_missing_artifact_fails() {
        let err = Classifier::load(Path::new("does-not-exist.onnx")).unwrap_err();
        assert!(matches!(err, ClassifierError::Model(_)));
    }
}
