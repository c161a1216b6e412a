//! Prompt text sent to the classifier.
use crate::perception::types::CandidateElement;

const MAX_ATTR_CHARS: usize = 60;

fn clip(s: &str) -> String {
    let mut out: String = s.chars().take(MAX_ATTR_CHARS).collect();
    if s.chars().count() > MAX_ATTR_CHARS {
        out.push('…');
    }
    out.replace('\n', " ")
}

/// One line per candidate: `[id] text="…", desc="…", id=… (Class) [state]`.
pub fn element_listing(candidates: &[CandidateElement]) -> String {
    if candidates.is_empty() {
        return "No UI elements detected.".to_string();
    }

    let mut lines = vec!["UI elements on the current screen:".to_string()];
    for c in candidates {
        let mut attrs = Vec::new();
        if let Some(text) = &c.text {
            attrs.push(format!("text=\"{}\"", clip(text)));
        }
        if let Some(desc) = &c.accessibility_label {
            attrs.push(format!("desc=\"{}\"", clip(desc)));
        }
        if let Some(id) = c.short_identifier() {
            attrs.push(format!("id={}", clip(id)));
        }

        let mut state = Vec::new();
        if c.flags.clickable {
            state.push("clickable");
        }
        if c.flags.checkable {
            state.push("checkable");
        }
        if c.flags.focused {
            state.push("focused");
        }
        if c.flags.selected {
            state.push("selected");
        }
        if !c.flags.enabled {
            state.push("disabled");
        }

        let attr_str = if attrs.is_empty() {
            c.short_class().to_string()
        } else {
            attrs.join(", ")
        };
        let state_str = if state.is_empty() {
            String::new()
        } else {
            format!(" [{}]", state.join(", "))
        };
        lines.push(format!("[{}] {} ({}){}", c.id, attr_str, c.short_class(), state_str));
    }
    lines.join("\n")
}

pub fn structural_locate(description: &str, candidates: &[CandidateElement]) -> String {
    format!(
        "{}\n\n\
Task: find the element that best matches \"{description}\".\n\n\
Rules:\n\
1. Judge by text, description and id together.\n\
2. Reply with the element number only, nothing else.\n\
3. If no element matches, reply -1.\n\n\
Answer (number only):",
        element_listing(candidates)
    )
}

pub fn visual_locate(description: &str) -> String {
    format!(
        "You are a UI automation assistant. Every interactive element in the screenshot \
carries a coloured box with a number label.\n\n\
Target: \"{description}\"\n\n\
Rules:\n\
1. Look at the visual features (colour, shape, icon, text).\n\
2. Use layout context (\"the button on the right\", \"the input at the bottom\").\n\
3. Reply with exactly one number and no explanation. If unsure or absent, reply -1.\n\n\
Example:\nUser: tap the search box\nAssistant: 5"
    )
}

pub fn structural_verify(condition: &str, listing: &str) -> String {
    format!(
        "{listing}\n\n\
Task: decide whether the current screen satisfies \"{condition}\".\n\
Judge from the element list above.\n\n\
Reply with JSON only:\n\
{{\"passed\": true/false, \"reason\": \"why\"}}"
    )
}

pub fn visual_verify(condition: &str) -> String {
    format!(
        "Task: decide whether the screen in the screenshot satisfies \"{condition}\".\n\
Look carefully at the screenshot.\n\n\
Reply with JSON only:\n\
{{\"passed\": true/false, \"reason\": \"why\"}}"
    )
}

pub fn query(question: &str, listing: Option<&str>) -> String {
    match listing {
        Some(listing) => format!(
            "{listing}\n\nTask: {question}\nExtract the data from the element list above. Reply with JSON only:"
        ),
        None => format!(
            "Task: {question}\nExtract the data from the screenshot. Reply with JSON only:"
        ),
    }
}
