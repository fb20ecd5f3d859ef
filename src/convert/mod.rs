//! Character mapping: hero record in, platform actor document out.

pub mod hero;
pub mod level;
pub mod mapper;
pub mod quality;

pub use hero::Hero;
pub use mapper::{convert_character, ConversionOutcome};
pub use quality::QualityReport;
