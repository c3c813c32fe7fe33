//! ONNX-backed implementations of the detection and recognition capabilities.

mod text_detection_adapter;
mod text_recognition_adapter;

pub use text_detection_adapter::{OnnxTextDetector, OnnxTextDetectorBuilder};
pub use text_recognition_adapter::{OnnxTextRecognizer, OnnxTextRecognizerBuilder};
