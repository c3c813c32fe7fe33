//! Capability contracts consumed by the notes pipeline.

pub mod text_detection;
pub mod text_recognition;

pub use text_detection::{Detection, TextDetectionConfig, TextDetector};
pub use text_recognition::{
    RecognitionOptions, RecognitionOutput, RecognitionTask, TextLine, TextRecognizer,
};
