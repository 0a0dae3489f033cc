//! Skin-lesion screening service: image upload, one forward pass through
//! a pre-converted ONNX classifier, server-rendered result page.

pub mod classifier;
pub mod config;
pub mod handlers;
pub mod labels;
pub mod pages;
