// Action dispatcher: one planned step → device side effects.
use std::sync::Arc;
use std::time::Duration;

use crate::agent_engine::state::Action;
use crate::config::{ExecutorConfig, Strategy};
use crate::device::{AppDirectory, Device};
use crate::errors::{SeeDroidError, SeeDroidResult};
use crate::executor::coordinator::swipe_path;
use crate::executor::input::Key;
use crate::locator::{ElementResolver, ScreenInspector};
use crate::timing::Clock;

pub struct ActionDispatcher {
    device: Arc<dyn Device>,
    resolver: Arc<ElementResolver>,
    inspector: Arc<ScreenInspector>,
    apps: AppDirectory,
    clock: Arc<dyn Clock>,
    config: ExecutorConfig,
    strategy: Strategy,
}

impl ActionDispatcher {
    pub fn new(
        device: Arc<dyn Device>,
        resolver: Arc<ElementResolver>,
        inspector: Arc<ScreenInspector>,
        apps: AppDirectory,
        clock: Arc<dyn Clock>,
        config: ExecutorConfig,
    ) -> Self {
        let strategy = resolver.default_strategy();
        Self {
            device,
            resolver,
            inspector,
            apps,
            clock,
            config,
            strategy,
        }
    }

    /// Resolve targets with `strategy` instead of the configured default.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    fn package(&self, app: Option<&str>) -> SeeDroidResult<String> {
        self.apps.resolve(app).ok_or_else(|| {
            SeeDroidError::Device(match app {
                Some(name) => format!("unknown app '{name}'"),
                None => "no app named and no default package configured".into(),
            })
        })
    }

    pub async fn dispatch(&self, action: &Action) -> SeeDroidResult<()> {
        match action {
            Action::OpenApp { app } => {
                let package = self.package(app.as_deref())?;
                self.device.launch_app(&package).await?;
                self.clock
                    .sleep(Duration::from_millis(self.config.app_launch_ms))
                    .await;
            }
            Action::CloseApp { app } => {
                let package = self.package(app.as_deref())?;
                self.device.stop_app(&package).await?;
            }
            Action::Click { target } => {
                let (x, y) = self.resolver.locate(target, self.strategy).await?;
                tracing::info!(%target, x, y, "tap");
                self.device.tap(x, y).await?;
            }
            Action::Input { target, text } => {
                let (x, y) = self.resolver.locate(target, self.strategy).await?;
                self.device.tap(x, y).await?;
                self.clock
                    .sleep(Duration::from_millis(self.config.input_focus_ms))
                    .await;
                tracing::info!(%target, chars = text.chars().count(), "send text");
                self.device.send_text(text).await?;
            }
            Action::Wait { condition, timeout } => {
                let secs = timeout.unwrap_or(self.config.default_wait_timeout_secs);
                let limit = Duration::try_from_secs_f64(secs.max(0.0)).map_err(|_| {
                    SeeDroidError::Planning(format!("wait timeout {secs} is out of range"))
                })?;
                self.inspector.wait_for(condition, limit).await?;
            }
            Action::Verify { condition } => self.inspector.assert(condition).await?,
            Action::Swipe { direction } => {
                let screen = self.device.screen_size().await?;
                let ((x1, y1), (x2, y2)) =
                    swipe_path(*direction, screen, self.config.swipe_distance);
                self.device
                    .swipe(x1, y1, x2, y2, self.config.swipe_duration_ms)
                    .await?;
            }
            Action::Back => self.device.press_key(Key::Back).await?,
            Action::Home => self.device.press_key(Key::Home).await?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LocatorConfig;
    use crate::executor::coordinator::SwipeDirection;
    use crate::perception::extractor::ElementExtractor;
    use crate::test_support::{hierarchy, ScriptedClassifier, StubDevice};
    use crate::timing::ManualClock;

    struct Rig {
        device: Arc<StubDevice>,
        clock: Arc<ManualClock>,
        dispatcher: ActionDispatcher,
    }

    fn rig(classifier: ScriptedClassifier, default_package: Option<&str>) -> Rig {
        let device = Arc::new(StubDevice::new(hierarchy(&[
            r#"text="" resource-id="com.app:id/search" class="android.widget.EditText" clickable="true" bounds="[100,100][980,200]""#,
        ])));
        let classifier = Arc::new(classifier);
        let clock = Arc::new(ManualClock::new());
        let resolver = Arc::new(ElementResolver::new(
            device.clone(),
            classifier.clone(),
            clock.clone(),
            LocatorConfig {
                debug_image_path: String::new(),
                ..LocatorConfig::default()
            },
        ));
        let inspector = Arc::new(ScreenInspector::new(
            device.clone(),
            classifier,
            clock.clone(),
            ElementExtractor::default(),
            Strategy::Structural,
            Duration::from_secs(2),
        ));
        let apps = AppDirectory::new(Default::default(), default_package.map(str::to_string));
        let dispatcher = ActionDispatcher::new(
            device.clone(),
            resolver,
            inspector,
            apps,
            clock.clone(),
            ExecutorConfig::default(),
        );
        Rig {
            device,
            clock,
            dispatcher,
        }
    }

    #[tokio::test]
    async fn input_taps_waits_then_types() {
        let r = rig(ScriptedClassifier::answering("0"), None);
        r.dispatcher
            .dispatch(&Action::Input {
                target: "search field".into(),
                text: "phone case".into(),
            })
            .await
            .unwrap();
        assert_eq!(r.device.events(), vec!["tap 540 150", "text phone case"]);
        assert_eq!(r.clock.sleeps(), vec![Duration::from_millis(500)]);
    }

    #[tokio::test]
    async fn open_app_uses_alias_or_default() {
        let r = rig(ScriptedClassifier::answering("0"), Some("com.example.shop"));
        r.dispatcher
            .dispatch(&Action::OpenApp { app: Some("Settings".into()) })
            .await
            .unwrap();
        r.dispatcher.dispatch(&Action::OpenApp { app: None }).await.unwrap();
        r.dispatcher.dispatch(&Action::CloseApp { app: None }).await.unwrap();
        assert_eq!(
            r.device.events(),
            vec![
                "launch com.android.settings",
                "launch com.example.shop",
                "stop com.example.shop"
            ]
        );
        assert_eq!(r.clock.total_slept(), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn open_app_without_any_package_fails() {
        let r = rig(ScriptedClassifier::answering("0"), None);
        let err = r
            .dispatcher
            .dispatch(&Action::OpenApp { app: None })
            .await
            .unwrap_err();
        assert!(matches!(err, SeeDroidError::Device(_)));
        assert!(r.device.events().is_empty());
    }

    #[tokio::test]
    async fn keys_and_swipes_skip_resolution() {
        let r = rig(ScriptedClassifier::answering("not a number"), None);
        r.dispatcher.dispatch(&Action::Back).await.unwrap();
        r.dispatcher.dispatch(&Action::Home).await.unwrap();
        r.dispatcher
            .dispatch(&Action::Swipe { direction: SwipeDirection::Up })
            .await
            .unwrap();
        assert_eq!(
            r.device.events(),
            vec![
                "key KEYCODE_BACK",
                "key KEYCODE_HOME",
                "swipe 540 1260 540 660 300"
            ]
        );
    }

    #[tokio::test]
    async fn verify_failure_is_an_assertion() {
        let r = rig(
            ScriptedClassifier::answering(r#"{"passed": false, "reason": "login page shown"}"#),
            None,
        );
        let err = r
            .dispatcher
            .dispatch(&Action::Verify { condition: "logged in".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, SeeDroidError::Verification(_)));
    }

    #[tokio::test]
    async fn wait_uses_explicit_timeout() {
        let r = rig(ScriptedClassifier::answering(r#"{"passed": false}"#), None);
        let err = r
            .dispatcher
            .dispatch(&Action::Wait {
                condition: "spinner gone".into(),
                timeout: Some(3.0),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SeeDroidError::Timeout(_)));
        assert_eq!(r.clock.total_slept(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn oversized_wait_timeout_is_rejected() {
        let mut r = rig(ScriptedClassifier::answering(r#"{"passed": true}"#), None);
        let wait = |timeout| Action::Wait {
            condition: "spinner gone".into(),
            timeout,
        };
        let err = r.dispatcher.dispatch(&wait(Some(1e30))).await.unwrap_err();
        assert!(matches!(err, SeeDroidError::Planning(_)), "{err}");

        r.dispatcher.config.default_wait_timeout_secs = f64::INFINITY;
        let err = r.dispatcher.dispatch(&wait(None)).await.unwrap_err();
        assert!(matches!(err, SeeDroidError::Planning(_)), "{err}");
        assert!(r.device.events().is_empty());
    }
}
