/// Instruction decomposition: one classifier call, one validated plan.
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::agent_engine::state::Action;
use crate::errors::{SeeDroidError, SeeDroidResult};
use crate::llm::provider::Classifier;
use crate::llm::response::parse_json_response;

const PLANNING_PROMPT: &str = "\
You are an Android UI test automation expert. Break the instruction below into \
basic operation steps.

Instruction: {instruction}

Reply with a JSON array only, for example:
[
  {\"action\": \"open_app\"},
  {\"action\": \"click\", \"target\": \"search box\"},
  {\"action\": \"input\", \"target\": \"search box\", \"text\": \"phone\"},
  {\"action\": \"click\", \"target\": \"search button\"},
  {\"action\": \"wait\", \"condition\": \"search results are shown\"},
  {\"action\": \"verify\", \"condition\": \"a product list is shown\"},
  {\"action\": \"swipe\", \"direction\": \"up\"}
]

Allowed action kinds:
- open_app: launch the app (optional \"app\": name or package)
- close_app: stop the app (optional \"app\")
- click: tap an element (needs \"target\")
- input: type text into an element (needs \"target\" and \"text\")
- wait: wait for a condition (needs \"condition\", optional \"timeout\" in seconds)
- verify: check the screen state (needs \"condition\")
- swipe: swipe the screen (\"direction\": up/down/left/right)
- back: press the back key
- home: press the home key";

pub fn planning_prompt(instruction: &str) -> String {
    PLANNING_PROMPT.replace("{instruction}", instruction.trim())
}

/// Parse and validate a plan. Anything short of a non-empty list of
/// well-formed actions is a `Planning` error.
pub fn parse_plan(answer: &str) -> SeeDroidResult<Vec<Action>> {
    let value = parse_json_response(answer)
        .map_err(|_| SeeDroidError::Planning(format!("no JSON plan in answer: {}", clip(answer))))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("actions").or_else(|| map.remove("steps")) {
            Some(Value::Array(items)) => items,
            _ => vec![Value::Object(map)],
        },
        other => {
            return Err(SeeDroidError::Planning(format!(
                "plan is not a list: {}",
                clip(&other.to_string())
            )))
        }
    };

    if items.is_empty() {
        return Err(SeeDroidError::Planning("plan has no steps".into()));
    }

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let action: Action = serde_json::from_value(item)
                .map_err(|e| SeeDroidError::Planning(format!("step {i}: {e}")))?;
            validate(&action).map_err(|why| SeeDroidError::Planning(format!("step {i}: {why}")))?;
            Ok(action)
        })
        .collect()
}

fn validate(action: &Action) -> Result<(), String> {
    let blank = |s: &str| s.trim().is_empty();
    match action {
        Action::Click { target } | Action::Input { target, .. } if blank(target) => {
            Err(format!("{} needs a target", action.kind()))
        }
        Action::Wait { condition, .. } | Action::Verify { condition } if blank(condition) => {
            Err(format!("{} needs a condition", action.kind()))
        }
        Action::Wait {
            timeout: Some(t), ..
        } if Duration::try_from_secs_f64(*t).is_err() => Err(format!("invalid wait timeout {t}")),
        _ => Ok(()),
    }
}

fn clip(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.chars().count() > 200 {
        format!("{}…", trimmed.chars().take(200).collect::<String>())
    } else {
        trimmed.to_string()
    }
}

pub struct Planner {
    classifier: Arc<dyn Classifier>,
}

impl Planner {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    pub async fn plan(&self, instruction: &str) -> SeeDroidResult<Vec<Action>> {
        if instruction.trim().is_empty() {
            return Err(SeeDroidError::Planning("empty instruction".into()));
        }
        let answer = self
            .classifier
            .generate(&planning_prompt(instruction), None)
            .await
            .map_err(|e| SeeDroidError::ClassifierUnavailable {
                attempts: 1,
                last: e.to_string(),
            })?;
        let plan = parse_plan(&answer)?;
        tracing::info!(steps = plan.len(), "plan ready");
        for (i, action) in plan.iter().enumerate() {
            tracing::debug!(step = i, %action, "planned");
        }
        Ok(plan)
    }
}
