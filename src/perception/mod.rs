pub mod annotator;
pub mod coords;
pub mod extractor;
pub mod traits;
pub mod types;
pub mod ui_tree;

pub use extractor::{ElementExtractor, ExtractorConfig};
pub use traits::ScreenCapture;
pub use types::{Bounds, CandidateElement, ElementFlags, ScreenSize};
