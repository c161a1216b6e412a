use serde::{Deserialize, Serialize};

use crate::executor::coordinator::SwipeDirection;

/// Lifecycle of one instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExecutionState {
    Idle,
    Planning { instruction: String },
    Executing { index: usize, action: Action },
    Done { steps: usize },
    Failed { index: Option<usize>, reason: String },
}

impl ExecutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionState::Done { .. } | ExecutionState::Failed { .. })
    }
}

/// One step of a decomposed instruction, as the planner emits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    OpenApp {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        app: Option<String>,
    },
    CloseApp {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        app: Option<String>,
    },
    Click {
        target: String,
    },
    Input {
        target: String,
        #[serde(default)]
        text: String,
    },
    Wait {
        condition: String,
        /// Seconds; the configured default applies when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<f64>,
    },
    Verify {
        condition: String,
    },
    Swipe {
        #[serde(default)]
        direction: SwipeDirection,
    },
    Back,
    Home,
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::OpenApp { .. } => "open_app",
            Action::CloseApp { .. } => "close_app",
            Action::Click { .. } => "click",
            Action::Input { .. } => "input",
            Action::Wait { .. } => "wait",
            Action::Verify { .. } => "verify",
            Action::Swipe { .. } => "swipe",
            Action::Back => "back",
            Action::Home => "home",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::OpenApp { app: Some(app) } => write!(f, "open_app {app}"),
            Action::CloseApp { app: Some(app) } => write!(f, "close_app {app}"),
            Action::Click { target } => write!(f, "click '{target}'"),
            Action::Input { target, text } => write!(f, "input '{text}' into '{target}'"),
            Action::Wait { condition, .. } => write!(f, "wait until '{condition}'"),
            Action::Verify { condition } => write!(f, "verify '{condition}'"),
            Action::Swipe { direction } => write!(f, "swipe {direction:?}"),
            other => f.write_str(other.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planner_json_shapes() {
        let plan: Vec<Action> = serde_json::from_str(
            r#"[
                {"action": "open_app"},
                {"action": "click", "target": "search box"},
                {"action": "input", "target": "search box", "text": "phone"},
                {"action": "wait", "condition": "results shown", "timeout": 10},
                {"action": "swipe", "direction": "down"},
                {"action": "swipe"},
                {"action": "back", "reason": "ignored"}
            ]"#,
        )
        .unwrap();

        assert_eq!(plan[0], Action::OpenApp { app: None });
        assert_eq!(
            plan[2],
            Action::Input {
                target: "search box".into(),
                text: "phone".into()
            }
        );
        assert_eq!(
            plan[3],
            Action::Wait {
                condition: "results shown".into(),
                timeout: Some(10.0)
            }
        );
        assert_eq!(plan[4], Action::Swipe { direction: SwipeDirection::Down });
        assert_eq!(plan[5], Action::Swipe { direction: SwipeDirection::Up });
        assert_eq!(plan[6], Action::Back);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(serde_json::from_str::<Action>(r#"{"action": "teleport"}"#).is_err());
        assert!(serde_json::from_str::<Action>(r#"{"action": "click"}"#).is_err());
    }

    #[test]
    fn state_serialises_with_tag() {
        let state = ExecutionState::Executing {
            index: 1,
            action: Action::Home,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["state"], "executing");
        assert_eq!(json["action"]["action"], "home");
        assert!(!state.is_terminal());
        assert!(ExecutionState::Done { steps: 3 }.is_terminal());
    }

    #[test]
    fn display_is_readable() {
        assert_eq!(
            Action::Click { target: "Display".into() }.to_string(),
            "click 'Display'"
        );
        assert_eq!(Action::OpenApp { app: None }.to_string(), "open_app");
    }
}
