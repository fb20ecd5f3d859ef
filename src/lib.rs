pub mod app;
pub mod compendium;
pub mod config;
pub mod constants;
pub mod convert;
pub mod error;
pub mod logging;
pub mod sources;
pub mod writer;

pub use error::{ConverterError, Result};
