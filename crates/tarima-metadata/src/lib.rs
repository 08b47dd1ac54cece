pub mod config;
pub mod image_probe;
pub mod sidecar;

pub use config::ImageConfig;
pub use image_probe::RasterImageInspector;
pub use sidecar::{JsonSidecarSerializer, SIDECAR_VERSION};
