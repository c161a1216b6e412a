use std::sync::Arc;
use std::time::Duration;

use crate::agent_engine::history::ExecutionReport;
use crate::agent_engine::planner::Planner;
use crate::agent_engine::state::{Action, ExecutionState};
use crate::config::{AppConfig, Strategy};
use crate::device::{AppDirectory, Device};
use crate::errors::{SeeDroidError, SeeDroidResult};
use crate::executor::dispatcher::ActionDispatcher;
use crate::llm::registry::RoleClassifiers;
use crate::locator::{ElementResolver, ScreenInspector};
use crate::perception::extractor::{ElementExtractor, ExtractorConfig};
use crate::timing::Clock;

/// Runs one natural-language instruction: plan once, then execute the
/// steps strictly in order, stopping at the first failure.
pub struct InstructionExecutor {
    planner: Planner,
    dispatcher: ActionDispatcher,
    clock: Arc<dyn Clock>,
    settle: Duration,
    state: ExecutionState,
}

impl InstructionExecutor {
    pub fn new(
        planner: Planner,
        dispatcher: ActionDispatcher,
        clock: Arc<dyn Clock>,
        settle: Duration,
    ) -> Self {
        Self {
            planner,
            dispatcher,
            clock,
            settle,
            state: ExecutionState::Idle,
        }
    }

    /// Wire resolver, inspector and dispatcher from the loaded config.
    pub fn from_config(
        config: &AppConfig,
        device: Arc<dyn Device>,
        classifiers: RoleClassifiers,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let resolver = Arc::new(ElementResolver::new(
            device.clone(),
            classifiers.locator,
            clock.clone(),
            config.locator.clone(),
        ));
        let inspector = Arc::new(ScreenInspector::new(
            device.clone(),
            classifiers.verifier,
            clock.clone(),
            ElementExtractor::new(ExtractorConfig::from(&config.locator)),
            config.locator.strategy,
            Duration::from_millis(config.executor.wait_poll_ms),
        ));
        let dispatcher = ActionDispatcher::new(
            device,
            resolver,
            inspector,
            AppDirectory::from_config(&config.device),
            clock.clone(),
            config.executor.clone(),
        );
        Self::new(
            Planner::new(classifiers.planner),
            dispatcher,
            clock,
            Duration::from_millis(config.executor.settle_ms),
        )
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.dispatcher = self.dispatcher.with_strategy(strategy);
        self
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    /// Plan and run `instruction`. A bad plan fails before any device
    /// interaction; a failing step is reported as `StepFailed` with its index.
    pub async fn execute(&mut self, instruction: &str) -> SeeDroidResult<ExecutionReport> {
        tracing::info!(%instruction, "Idle → Planning");
        self.state = ExecutionState::Planning {
            instruction: instruction.to_string(),
        };

        let mut report = ExecutionReport::new(instruction);
        let mut plan: Vec<Action> = Vec::new();
        let mut failure: Option<SeeDroidError> = None;

        while !self.state.is_terminal() {
            self.state = match self.state.clone() {
                ExecutionState::Idle => ExecutionState::Failed {
                    index: None,
                    reason: "executor was not started".into(),
                },

                // ── Planning: one classifier call, validated plan ─────────
                ExecutionState::Planning { instruction } => {
                    match self.planner.plan(&instruction).await {
                        Ok(steps) => {
                            plan = steps;
                            match plan.first() {
                                Some(first) => {
                                    tracing::info!(steps = plan.len(), "Planning → Executing(0)");
                                    ExecutionState::Executing {
                                        index: 0,
                                        action: first.clone(),
                                    }
                                }
                                None => ExecutionState::Done { steps: 0 },
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Planning → Failed");
                            let reason = e.to_string();
                            failure = Some(e);
                            ExecutionState::Failed { index: None, reason }
                        }
                    }
                }

                // ── Executing(i): dispatch, settle, advance ───────────────
                ExecutionState::Executing { index, action } => {
                    tracing::info!(step = index, %action, "executing");
                    let started_at = chrono::Utc::now();
                    match self.dispatcher.dispatch(&action).await {
                        Ok(()) => {
                            report.push(index, action, started_at);
                            self.clock.sleep(self.settle).await;
                            match plan.get(index + 1) {
                                Some(next) => ExecutionState::Executing {
                                    index: index + 1,
                                    action: next.clone(),
                                },
                                None => ExecutionState::Done { steps: plan.len() },
                            }
                        }
                        Err(e) => {
                            tracing::error!(step = index, %action, error = %e, "Executing → Failed");
                            let err = SeeDroidError::StepFailed {
                                index,
                                action: action.to_string(),
                                source: Box::new(e),
                            };
                            let reason = err.to_string();
                            failure = Some(err);
                            ExecutionState::Failed {
                                index: Some(index),
                                reason,
                            }
                        }
                    }
                }

                terminal => terminal,
            };
        }

        match failure {
            Some(e) => Err(e),
            None => {
                report.finish();
                tracing::info!(run_id = %report.run_id, steps = report.steps.len(), "Executing → Done");
                Ok(report)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::test_support::{hierarchy, ScriptedClassifier, StubDevice};
    use crate::timing::ManualClock;

    fn executor(
        answers: Vec<SeeDroidResult<String>>,
    ) -> (InstructionExecutor, Arc<StubDevice>, Arc<ScriptedClassifier>, Arc<ManualClock>) {
        let device = Arc::new(StubDevice::new(hierarchy(&[
            r#"text="Display" clickable="true" bounds="[0,400][1080,500]""#,
        ])));
        let classifier = Arc::new(ScriptedClassifier::new(answers));
        let clock = Arc::new(ManualClock::new());
        let mut config = AppConfig::default();
        config.locator.debug_image_path = String::new();
        let exec = InstructionExecutor::from_config(
            &config,
            device.clone(),
            RoleClassifiers::uniform(classifier.clone()),
            clock.clone(),
        );
        (exec, device, classifier, clock)
    }

    #[tokio::test]
    async fn plan_runs_to_done_with_settle_after_each_step() {
        let (mut exec, device, _, clock) = executor(vec![
            Ok(r#"[{"action": "click", "target": "Display"}, {"action": "back"}]"#.into()),
            Ok("0".into()),
        ]);
        let report = exec.execute("open display settings").await.unwrap();

        assert_eq!(device.events(), vec!["tap 540 450", "key KEYCODE_BACK"]);
        assert_eq!(report.steps.len(), 2);
        assert!(report.finished_at.is_some());
        assert_eq!(exec.state(), &ExecutionState::Done { steps: 2 });
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(500); 2]);
    }

    #[tokio::test]
    async fn malformed_plan_touches_nothing() {
        let (mut exec, device, classifier, _) = executor(vec![Ok("sorry, no idea".into())]);
        let err = exec.execute("do something").await.unwrap_err();

        assert!(matches!(err, SeeDroidError::Planning(_)));
        assert_eq!(err.step_index(), None);
        assert!(device.events().is_empty());
        assert_eq!(classifier.call_count(), 1);
        assert!(matches!(exec.state(), ExecutionState::Failed { index: None, .. }));
    }

    #[tokio::test]
    async fn first_failure_stops_the_run() {
        let (mut exec, device, _, clock) = executor(vec![
            Ok(r#"[{"action": "home"}, {"action": "click", "target": "Bluetooth"}, {"action": "back"}]"#.into()),
            Ok("-1".into()),
        ]);
        let err = exec.execute("open bluetooth").await.unwrap_err();

        assert_eq!(err.step_index(), Some(1));
        assert!(matches!(err.root_cause(), SeeDroidError::NotFound(_)));
        assert_eq!(device.events(), vec!["key KEYCODE_HOME"]);
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(500)]);
        assert!(matches!(exec.state(), ExecutionState::Failed { index: Some(1), .. }));
    }

    #[tokio::test]
    async fn planner_transport_failure_is_reported() {
        let (mut exec, device, _, _) =
            executor(vec![Err(SeeDroidError::LlmProvider("timeout".into()))]);
        let err = exec.execute("anything").await.unwrap_err();
        assert!(matches!(err, SeeDroidError::ClassifierUnavailable { .. }));
        assert!(device.events().is_empty());
    }
}
