pub mod provider;
pub mod providers;
pub mod registry;
pub mod response;
pub mod sse_parser;
pub mod types;

pub use provider::{Classifier, LlmProvider, RoleClassifier};
pub use registry::{ProviderRegistry, Role, RoleClassifiers};
