pub mod classification;
pub mod domain;
pub mod errors;
pub mod naming;
pub mod ports;
pub mod result;
pub mod text;

pub use errors::CoreError;
pub use result::OperationResult;
