/// Declarative YAML test definitions → Robot Framework style scripts.
///
/// ```yaml
/// name: Search flow
/// steps:
///   - action: Open App
///   - loop: 3
///     steps:
///       - action: Click Element
///         args: next page
///   - try:
///       steps: [{action: Click Element, args: close}]
///     except:
///       steps: [{action: Press Back}]
///   - while: "'${status}' != 'done'"
///     steps: [{action: Swipe Up}]
/// ```
use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::config::ScriptConfig;
use crate::errors::{SeeDroidError, SeeDroidResult};

const INDENT: &str = "    ";
const SEP: &str = "    ";

pub struct ScriptCompiler {
    library: String,
}

impl ScriptCompiler {
    pub fn new(library: impl Into<String>) -> Self {
        Self {
            library: library.into(),
        }
    }

    pub fn from_config(cfg: &ScriptConfig) -> Self {
        Self::new(cfg.library.clone())
    }

    pub fn convert(&self, yaml: &str) -> SeeDroidResult<String> {
        let doc: Value = serde_yaml::from_str(yaml)?;
        let Value::Mapping(root) = doc else {
            return Err(SeeDroidError::Script("document root must be a mapping".into()));
        };

        let name = match root.get("name") {
            Some(v) => scalar(v, "name")?,
            None => "Test Case".to_string(),
        };
        let steps = step_list(root.get("steps"), "steps")?;

        let mut lines = vec![
            "*** Settings ***".to_string(),
            format!("Library{SEP}{}", self.library),
            String::new(),
            "*** Test Cases ***".to_string(),
            name,
        ];
        convert_steps(steps, 1, &mut lines)?;
        Ok(lines.join("\n"))
    }

    /// Convert `yaml_path`, writing the script to `output` when given.
    pub fn convert_file(&self, yaml_path: &Path, output: Option<&Path>) -> SeeDroidResult<String> {
        let yaml = std::fs::read_to_string(yaml_path)?;
        let script = self.convert(&yaml)?;
        if let Some(out) = output {
            std::fs::write(out, &script)?;
            tracing::info!(input = %yaml_path.display(), output = %out.display(), "script written");
        }
        Ok(script)
    }
}

fn convert_steps(steps: &[Value], level: usize, lines: &mut Vec<String>) -> SeeDroidResult<()> {
    let indent = INDENT.repeat(level);
    for (i, step) in steps.iter().enumerate() {
        let Value::Mapping(block) = step else {
            return Err(SeeDroidError::Script(format!("step {i} is not a mapping")));
        };

        if let Some(keyword) = block.get("action") {
            let mut line = format!("{indent}{}", scalar(keyword, "action")?);
            for arg in args(block.get("args"))? {
                line.push_str(SEP);
                line.push_str(&arg);
            }
            lines.push(line);
        } else if let Some(count) = block.get("loop") {
            lines.push(format!(
                "{indent}FOR{SEP}${{i}}{SEP}IN RANGE{SEP}{}",
                scalar(count, "loop")?
            ));
            convert_steps(step_list(block.get("steps"), "loop.steps")?, level + 1, lines)?;
            lines.push(format!("{indent}END"));
        } else if let Some(body) = block.get("try") {
            lines.push(format!("{indent}TRY"));
            convert_steps(nested_steps(Some(body), "try")?, level + 1, lines)?;
            lines.push(format!("{indent}EXCEPT"));
            convert_steps(nested_steps(block.get("except"), "except")?, level + 1, lines)?;
            lines.push(format!("{indent}END"));
        } else if let Some(condition) = block.get("while") {
            lines.push(format!("{indent}WHILE{SEP}{}", scalar(condition, "while")?));
            convert_steps(step_list(block.get("steps"), "while.steps")?, level + 1, lines)?;
            lines.push(format!("{indent}END"));
        } else {
            return Err(SeeDroidError::Script(format!(
                "step {i}: expected one of action, loop, try, while (keys: {})",
                keys(block)
            )));
        }
    }
    Ok(())
}

/// A missing list is empty; anything else must be a sequence.
fn step_list<'a>(value: Option<&'a Value>, field: &str) -> SeeDroidResult<&'a [Value]> {
    match value {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Sequence(seq)) => Ok(seq.as_slice()),
        Some(_) => Err(SeeDroidError::Script(format!("'{field}' must be a list"))),
    }
}

/// `try:` / `except:` hold a mapping with its own `steps`.
fn nested_steps<'a>(value: Option<&'a Value>, field: &str) -> SeeDroidResult<&'a [Value]> {
    match value {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Mapping(m)) => step_list(m.get("steps"), &format!("{field}.steps")),
        Some(_) => Err(SeeDroidError::Script(format!("'{field}' must be a mapping with steps"))),
    }
}

fn args(value: Option<&Value>) -> SeeDroidResult<Vec<String>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Sequence(items)) => items.iter().map(|v| scalar(v, "args")).collect(),
        Some(single) => Ok(vec![scalar(single, "args")?]),
    }
}

fn scalar(value: &Value, field: &str) -> SeeDroidResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(true) => Ok("True".into()),
        Value::Bool(false) => Ok("False".into()),
        Value::Null => Ok("None".into()),
        _ => Err(SeeDroidError::Script(format!("'{field}' must be a scalar"))),
    }
}

fn keys(block: &Mapping) -> String {
    block
        .keys()
        .filter_map(Value::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(yaml: &str) -> SeeDroidResult<String> {
        ScriptCompiler::new("SeeDroidLibrary").convert(yaml)
    }

    #[test]
    fn flat_actions_with_args() {
        let script = compile(
            "name: Login\nsteps:\n  - action: Open App\n  - action: Input Text\n    args: [user name, alice]\n  - action: Sleep\n    args: 2\n",
        )
        .unwrap();
        assert_eq!(
            script,
            "*** Settings ***\n\
Library    SeeDroidLibrary\n\
\n\
*** Test Cases ***\n\
Login\n    \
Open App\n    \
Input Text    user name    alice\n    \
Sleep    2"
        );
    }

    #[test]
    fn nested_blocks_indent_and_close() {
        let yaml = r#"
steps:
  - loop: 3
    steps:
      - action: Swipe Up
      - try:
          steps:
            - action: Click Element
              args: Close
        except:
          steps:
            - action: Press Back
  - while: "'${state}' != 'ready'"
    steps:
      - action: Sleep
        args: 1
"#;
        let script = compile(yaml).unwrap();
        let body: Vec<&str> = script.lines().skip(4).collect();
        assert_eq!(
            body,
            vec![
                "Test Case",
                "    FOR    ${i}    IN RANGE    3",
                "        Swipe Up",
                "        TRY",
                "            Click Element    Close",
                "        EXCEPT",
                "            Press Back",
                "        END",
                "    END",
                "    WHILE    '${state}' != 'ready'",
                "        Sleep    1",
                "    END",
            ]
        );
    }

    #[test]
    fn try_without_except_still_closes() {
        let script = compile("steps:\n  - try:\n      steps:\n        - action: Log\n          args: hi\n").unwrap();
        assert!(script.ends_with("    TRY\n        Log    hi\n    EXCEPT\n    END"));
    }

    #[test]
    fn malformed_definitions_are_rejected() {
        assert!(matches!(compile("- just a list"), Err(SeeDroidError::Script(_))));
        assert!(matches!(compile("steps:\n  - jump: 3\n"), Err(SeeDroidError::Script(_))));
        assert!(matches!(compile("steps: 5"), Err(SeeDroidError::Script(_))));
        assert!(matches!(compile("steps:\n  - action: {a: 1}\n"), Err(SeeDroidError::Script(_))));
        assert!(matches!(compile("steps: [unclosed"), Err(SeeDroidError::Yaml(_))));
    }

    #[test]
    fn convert_file_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("case.yaml");
        let output = dir.path().join("case.robot");
        std::fs::write(&input, "name: Smoke\nsteps:\n  - action: Go Home\n").unwrap();

        let compiler = ScriptCompiler::from_config(&ScriptConfig::default());
        let script = compiler.convert_file(&input, Some(&output)).unwrap();
        assert_eq!(std::fs::read_to_string(&output).unwrap(), script);
        assert!(script.contains("Library    SeeDroidLibrary"));
        assert!(script.ends_with("Smoke\n    Go Home"));
    }
}
