/// Screen-level questions: does a condition hold, wait until it does, and
/// free-form data extraction.
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Strategy;
use crate::device::Device;
use crate::errors::{SeeDroidError, SeeDroidResult};
use crate::llm::provider::Classifier;
use crate::llm::response::parse_json_response;
use crate::locator::prompts;
use crate::perception::extractor::ElementExtractor;
use crate::timing::Clock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub passed: bool,
    #[serde(default)]
    pub reason: String,
}

impl Verdict {
    fn from_value(value: &Value) -> SeeDroidResult<Self> {
        let passed = match value.get("passed") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
            _ => {
                return Err(SeeDroidError::LlmProvider(format!(
                    "verdict without a 'passed' field: {value}"
                )))
            }
        };
        let reason = value
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(Self { passed, reason })
    }
}

pub struct ScreenInspector {
    device: Arc<dyn Device>,
    classifier: Arc<dyn Classifier>,
    clock: Arc<dyn Clock>,
    extractor: ElementExtractor,
    strategy: Strategy,
    poll: Duration,
}

impl ScreenInspector {
    pub fn new(
        device: Arc<dyn Device>,
        classifier: Arc<dyn Classifier>,
        clock: Arc<dyn Clock>,
        extractor: ElementExtractor,
        strategy: Strategy,
        poll: Duration,
    ) -> Self {
        Self {
            device,
            classifier,
            clock,
            extractor,
            strategy,
            poll,
        }
    }

    /// Element listing for structural mode, raw screenshot for visual mode.
    async fn observe(&self) -> SeeDroidResult<(Option<String>, Option<Vec<u8>>)> {
        match self.strategy {
            Strategy::Structural => {
                let screen = self.device.screen_size().await?;
                let tree = self.device.ui_tree().await?;
                let candidates = self.extractor.extract(&tree, screen, Strategy::Structural);
                Ok((Some(prompts::element_listing(&candidates)), None))
            }
            Strategy::Visual => Ok((None, Some(self.device.screenshot().await?))),
        }
    }

    /// Ask whether `condition` holds on the current screen.
    pub async fn verify(&self, condition: &str) -> SeeDroidResult<Verdict> {
        let (listing, image) = self.observe().await?;
        let prompt = match &listing {
            Some(listing) => prompts::structural_verify(condition, listing),
            None => prompts::visual_verify(condition),
        };
        let answer = self.classifier.generate(&prompt, image.as_deref()).await?;
        let verdict = Verdict::from_value(&parse_json_response(&answer)?)?;
        tracing::info!(%condition, passed = verdict.passed, reason = %verdict.reason, "verify");
        Ok(verdict)
    }

    /// `verify`, turning a negative verdict into a `Verification` error.
    pub async fn assert(&self, condition: &str) -> SeeDroidResult<()> {
        let verdict = self.verify(condition).await?;
        if verdict.passed {
            Ok(())
        } else {
            Err(SeeDroidError::Verification(format!(
                "'{condition}': {}",
                verdict.reason
            )))
        }
    }

    /// Poll until `condition` holds. Errors while polling count as "not yet".
    pub async fn wait_for(&self, condition: &str, timeout: Duration) -> SeeDroidResult<()> {
        let start = self.clock.elapsed();
        let mut checks = 0u32;
        loop {
            checks += 1;
            match self.verify(condition).await {
                Ok(v) if v.passed => {
                    tracing::info!(%condition, checks, "condition met");
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(%condition, error = %e, "wait check failed"),
            }

            let waited = self.clock.elapsed().saturating_sub(start);
            if waited >= timeout {
                return Err(SeeDroidError::Timeout(format!(
                    "'{condition}' not met within {:.1}s ({checks} checks)",
                    timeout.as_secs_f64()
                )));
            }
            self.clock.sleep(self.poll.min(timeout - waited)).await;
        }
    }

    /// Free-form extraction; the answer must be JSON.
    pub async fn query(&self, question: &str) -> SeeDroidResult<Value> {
        let (listing, image) = self.observe().await?;
        let prompt = prompts::query(question, listing.as_deref());
        let answer = self.classifier.generate(&prompt, image.as_deref()).await?;
        parse_json_response(&answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{hierarchy, ScriptedClassifier, StubDevice};
    use crate::timing::ManualClock;

    fn inspector(
        strategy: Strategy,
        classifier: ScriptedClassifier,
    ) -> (ScreenInspector, Arc<ScriptedClassifier>, Arc<ManualClock>) {
        let device = StubDevice::new(hierarchy(&[
            r#"text="Wi-Fi" bounds="[0,200][1080,300]""#,
            r#"text="On" checkable="true" bounds="[900,200][1050,300]""#,
        ]));
        let classifier = Arc::new(classifier);
        let clock = Arc::new(ManualClock::new());
        let inspector = ScreenInspector::new(
            Arc::new(device),
            classifier.clone(),
            clock.clone(),
            ElementExtractor::default(),
            strategy,
            Duration::from_secs(2),
        );
        (inspector, classifier, clock)
    }

    #[tokio::test]
    async fn structural_verify_sends_listing() {
        let (i, classifier, _) = inspector(
            Strategy::Structural,
            ScriptedClassifier::answering(r#"{"passed": true, "reason": "Wi-Fi row visible"}"#),
        );
        let verdict = i.verify("Wi-Fi settings are open").await.unwrap();
        assert!(verdict.passed);
        assert_eq!(verdict.reason, "Wi-Fi row visible");

        let prompt = &classifier.prompts()[0];
        assert!(prompt.contains("[0] text=\"Wi-Fi\""));
        assert!(prompt.contains("\"Wi-Fi settings are open\""));
        assert!(!prompt.contains("No UI elements"));
        assert_eq!(classifier.saw_images(), vec![false]);
    }

    #[tokio::test]
    async fn visual_verify_sends_raw_screenshot() {
        let (i, classifier, _) = inspector(
            Strategy::Visual,
            ScriptedClassifier::answering("```json\n{\"passed\": \"false\", \"reason\": \"dialog\"}\n```"),
        );
        let verdict = i.verify("home screen").await.unwrap();
        assert!(!verdict.passed);
        assert_eq!(classifier.saw_images(), vec![true]);
    }

    #[tokio::test]
    async fn assert_fails_on_negative_verdict() {
        let (i, _, _) = inspector(
            Strategy::Structural,
            ScriptedClassifier::answering(r#"{"passed": false, "reason": "still loading"}"#),
        );
        let err = i.assert("page loaded").await.unwrap_err();
        assert!(matches!(err, SeeDroidError::Verification(m) if m.contains("still loading")));
    }

    #[tokio::test]
    async fn verdict_without_passed_is_an_error() {
        let (i, _, _) = inspector(
            Strategy::Structural,
            ScriptedClassifier::answering(r#"{"reason": "?"}"#),
        );
        assert!(i.verify("x").await.is_err());
    }

    #[tokio::test]
    async fn wait_for_polls_until_met() {
        let answers = vec![
            Ok(r#"{"passed": false}"#.to_string()),
            Err(SeeDroidError::LlmProvider("502".into())),
            Ok(r#"{"passed": true}"#.to_string()),
        ];
        let (i, classifier, clock) = inspector(Strategy::Structural, ScriptedClassifier::new(answers));
        i.wait_for("loaded", Duration::from_secs(30)).await.unwrap();
        assert_eq!(classifier.call_count(), 3);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(2); 2]);
    }

    #[tokio::test]
    async fn wait_for_times_out_on_the_deadline() {
        let (i, classifier, clock) = inspector(
            Strategy::Structural,
            ScriptedClassifier::answering(r#"{"passed": false}"#),
        );
        let err = i.wait_for("never", Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, SeeDroidError::Timeout(_)));
        // Checks at 0s, 2s, 4s and 5s.
        assert_eq!(classifier.call_count(), 4);
        assert_eq!(clock.total_slept(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn query_returns_json() {
        let (i, classifier, _) = inspector(
            Strategy::Structural,
            ScriptedClassifier::answering(r#"Here: {"wifi": "On"}"#),
        );
        let value = i.query("Is Wi-Fi on?").await.unwrap();
        assert_eq!(value["wifi"], "On");
        assert!(classifier.prompts()[0].contains("Is Wi-Fi on?"));
    }
}
