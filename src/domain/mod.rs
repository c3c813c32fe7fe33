//! OCR capabilities: contracts, ONNX implementations, and the shared handle.

pub mod adapters;
pub mod models;
pub mod tasks;

pub use adapters::{OnnxTextDetector, OnnxTextRecognizer};
pub use models::OcrModels;
pub use tasks::{
    Detection, RecognitionOptions, RecognitionOutput, RecognitionTask, TextDetectionConfig,
    TextDetector, TextLine, TextRecognizer,
};
