/// Element resolution: description → one candidate on the current screen.
///
/// 1. Capture the screen size and UI tree (fresh on every call).
/// 2. Extract candidates; none at all fails fast with `NotFound`.
/// 3. Structural: send the textual listing. Visual: send the Set-of-Mark
///    annotated screenshot.
/// 4. Ask the classifier for an id, retrying unusable answers with a fixed
///    backoff until the retry budget is spent.
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{LocatorConfig, Strategy};
use crate::device::Device;
use crate::errors::{SeeDroidError, SeeDroidResult};
use crate::llm::provider::Classifier;
use crate::llm::response::first_integer;
use crate::locator::prompts;
use crate::perception::annotator;
use crate::perception::extractor::{ElementExtractor, ExtractorConfig};
use crate::perception::types::{CandidateElement, ScreenSize};
use crate::timing::Clock;

/// What one classifier answer means for the current candidate list.
#[derive(Debug, PartialEq)]
enum Answer<'a> {
    Pick(&'a CandidateElement),
    NoMatch,
    Unusable,
}

fn interpret<'a>(answer: &str, candidates: &'a [CandidateElement]) -> Answer<'a> {
    match first_integer(answer) {
        Some(-1) => Answer::NoMatch,
        Some(n) => candidates
            .iter()
            .find(|c| i64::from(c.id) == n)
            .map_or(Answer::Unusable, Answer::Pick),
        None => Answer::Unusable,
    }
}

enum LastFailure {
    Unusable(String),
    Transport(String),
}

pub struct ElementResolver {
    device: Arc<dyn Device>,
    classifier: Arc<dyn Classifier>,
    clock: Arc<dyn Clock>,
    extractor: ElementExtractor,
    config: LocatorConfig,
}

impl ElementResolver {
    pub fn new(
        device: Arc<dyn Device>,
        classifier: Arc<dyn Classifier>,
        clock: Arc<dyn Clock>,
        config: LocatorConfig,
    ) -> Self {
        Self {
            device,
            classifier,
            clock,
            extractor: ElementExtractor::new(ExtractorConfig::from(&config)),
            config,
        }
    }

    pub fn default_strategy(&self) -> Strategy {
        self.config.strategy
    }

    /// Current candidates, numbered for `strategy`.
    pub async fn candidates(
        &self,
        strategy: Strategy,
    ) -> SeeDroidResult<(Vec<CandidateElement>, ScreenSize)> {
        let screen = self.device.screen_size().await?;
        let tree = self.device.ui_tree().await?;
        Ok((self.extractor.extract(&tree, screen, strategy), screen))
    }

    pub async fn resolve(
        &self,
        description: &str,
        strategy: Strategy,
    ) -> SeeDroidResult<CandidateElement> {
        let (candidates, screen) = self.candidates(strategy).await?;
        if candidates.is_empty() {
            return Err(SeeDroidError::NotFound(format!(
                "'{description}': no candidate elements on screen"
            )));
        }
        tracing::debug!(%description, %strategy, candidates = candidates.len(), "resolving");

        let (prompt, image) = match strategy {
            Strategy::Structural => (prompts::structural_locate(description, &candidates), None),
            Strategy::Visual => {
                let shot = self.device.screenshot().await?;
                let marked = annotator::annotate_image(&shot, &candidates, screen)
                    .map_err(|e| SeeDroidError::Capture(format!("annotation: {e}")))?;
                annotator::persist_debug_image(&marked, Path::new(&self.config.debug_image_path));
                (prompts::visual_locate(description), Some(marked))
            }
        };

        let element = self
            .choose(description, &candidates, &prompt, image.as_deref())
            .await?;
        tracing::info!(
            %description,
            id = element.id,
            label = %element.display_text(),
            bounds = %element.bounds,
            "element resolved"
        );
        Ok(element)
    }

    /// Centre of the resolved element, in input coordinates.
    pub async fn locate(&self, description: &str, strategy: Strategy) -> SeeDroidResult<(i32, i32)> {
        Ok(self.resolve(description, strategy).await?.center())
    }

    /// Text shown by the resolved element, falling back to its accessibility label.
    pub async fn get_text(&self, description: &str, strategy: Strategy) -> SeeDroidResult<String> {
        let element = self.resolve(description, strategy).await?;
        Ok(element
            .text
            .or(element.accessibility_label)
            .unwrap_or_default())
    }

    async fn choose(
        &self,
        description: &str,
        candidates: &[CandidateElement],
        prompt: &str,
        image: Option<&[u8]>,
    ) -> SeeDroidResult<CandidateElement> {
        let attempts = self.config.retry_count.max(1);
        let backoff = Duration::from_millis(self.config.retry_backoff_ms);
        let mut last = LastFailure::Unusable(String::new());

        for attempt in 1..=attempts {
            match self.classifier.generate(prompt, image).await {
                Ok(answer) => match interpret(&answer, candidates) {
                    Answer::Pick(element) => return Ok(element.clone()),
                    Answer::NoMatch => {
                        return Err(SeeDroidError::NotFound(format!(
                            "'{description}': classifier reported no match"
                        )))
                    }
                    Answer::Unusable => {
                        tracing::warn!(attempt, answer = %answer.trim(), "unusable classifier answer");
                        last = LastFailure::Unusable(answer);
                    }
                },
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "classifier call failed");
                    last = LastFailure::Transport(e.to_string());
                }
            }

            if attempt < attempts {
                self.clock.sleep(backoff).await;
            }
        }

        Err(match last {
            LastFailure::Transport(last) => SeeDroidError::ClassifierUnavailable { attempts, last },
            LastFailure::Unusable(last) => SeeDroidError::AmbiguousResponse {
                description: description.to_string(),
                attempts,
                last: last.trim().to_string(),
            },
        })
    }
}
