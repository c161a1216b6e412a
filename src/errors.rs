use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeeDroidError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM provider error: {0}")]
    LlmProvider(String),

    #[error("SSE parsing error: {0}")]
    SseParsing(String),

    #[error("Perception error: {0}")]
    Perception(String),

    /// Screenshot or UI tree could not be obtained from the device.
    #[error("Screen capture failed: {0}")]
    Capture(String),

    #[error("Device error: {0}")]
    Device(String),

    /// No element matches the description (classifier answered -1 or the
    /// screen offered no candidates at all).
    #[error("Element not found: {0}")]
    NotFound(String),

    /// The classifier kept answering with something that is not a valid
    /// candidate id until the retry budget ran out.
    #[error("Classifier gave no usable answer for '{description}' after {attempts} attempts: {last}")]
    AmbiguousResponse {
        description: String,
        attempts: u32,
        last: String,
    },

    #[error("Classifier unavailable after {attempts} attempts: {last}")]
    ClassifierUnavailable { attempts: u32, last: String },

    #[error("Planning failed: {0}")]
    Planning(String),

    #[error("Verification failed: {0}")]
    Verification(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Step {index} ({action}) failed: {source}")]
    StepFailed {
        index: usize,
        action: String,
        #[source]
        source: Box<SeeDroidError>,
    },

    #[error("Script error: {0}")]
    Script(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl SeeDroidError {
    /// Index of the failing step when this error came out of an instruction run.
    pub fn step_index(&self) -> Option<usize> {
        match self {
            SeeDroidError::StepFailed { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Innermost error, unwrapping step failures.
    pub fn root_cause(&self) -> &SeeDroidError {
        match self {
            SeeDroidError::StepFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl serde::Serialize for SeeDroidError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type SeeDroidResult<T> = Result<T, SeeDroidError>;
