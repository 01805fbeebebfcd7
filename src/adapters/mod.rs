pub mod fs;
pub mod http;
pub mod ml;
pub mod onnx;
