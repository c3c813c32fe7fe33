//! Image and tensor processors used by the ONNX capability implementations.
//!
//! - [`geometry`] - points and polygons shared across the pipeline
//! - [`normalization`] - image to NCHW tensor conversion
//! - [`db_postprocess`] - probability map to text-line boxes
//! - [`ctc_decode`] - CTC probabilities to text

pub mod ctc_decode;
pub mod db_postprocess;
pub mod geometry;
pub mod normalization;

pub use ctc_decode::CtcLabelDecode;
pub use db_postprocess::DBPostProcess;
pub use geometry::{BoundingBox, Point};
pub use normalization::{ColorOrder, NormalizeImage};
