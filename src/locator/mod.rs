pub mod inspector;
pub mod prompts;
pub mod resolver;

pub use inspector::{ScreenInspector, Verdict};
pub use resolver::ElementResolver;
