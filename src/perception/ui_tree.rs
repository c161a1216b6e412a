/// UI hierarchy dump scanning.
///
/// Reads the XML produced by `uiautomator dump` (`<hierarchy><node …/>`) as
/// well as Appium-style page sources where the tag is the widget class.
/// Every element is returned in document order with its attributes; the
/// document must be well-formed (balanced tags, terminated quotes).
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{SeeDroidError, SeeDroidResult};
use crate::perception::types::Bounds;

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("attribute regex must compile")
});

static BOUNDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(-?\d+),(-?\d+)\]\[(-?\d+),(-?\d+)\]").expect("bounds regex must compile")
});

#[derive(Debug, Clone, Default)]
pub struct UiNode {
    pub tag: String,
    pub depth: usize,
    attributes: HashMap<String, String>,
}

impl UiNode {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Attribute value, `None` when absent or empty.
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.attr(name).filter(|v| !v.trim().is_empty())
    }

    pub fn flag(&self, name: &str, default: bool) -> bool {
        match self.attr(name) {
            Some(v) => v.eq_ignore_ascii_case("true"),
            None => default,
        }
    }

    /// Widget class: the `class` attribute, or the tag itself for Appium dumps.
    pub fn class_name(&self) -> Option<&str> {
        self.non_empty("class").or_else(|| {
            (self.tag.contains('.') && self.tag != "node").then_some(self.tag.as_str())
        })
    }
}

/// Parse a bounds string such as `[0,63][1080,210]`.
pub fn parse_bounds(raw: &str) -> Option<Bounds> {
    let caps = BOUNDS_RE.captures(raw.trim())?;
    let n = |i: usize| caps.get(i)?.as_str().parse::<i32>().ok();
    Some(Bounds::new(n(1)?, n(2)?, n(3)?, n(4)?))
}

pub fn parse_nodes(xml: &str) -> SeeDroidResult<Vec<UiNode>> {
    let malformed = |why: &str| SeeDroidError::Perception(format!("malformed UI tree: {why}"));

    let mut nodes = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut rest = xml;

    while let Some(open) = rest.find('<') {
        rest = &rest[open..];

        if let Some(after) = rest.strip_prefix("<?") {
            let end = after.find("?>").ok_or_else(|| malformed("unterminated declaration"))?;
            rest = &after[end + 2..];
            continue;
        }
        if let Some(after) = rest.strip_prefix("<!--") {
            let end = after.find("-->").ok_or_else(|| malformed("unterminated comment"))?;
            rest = &after[end + 3..];
            continue;
        }
        if let Some(after) = rest.strip_prefix("<!") {
            let end = after.find('>').ok_or_else(|| malformed("unterminated directive"))?;
            rest = &after[end + 1..];
            continue;
        }
        if let Some(after) = rest.strip_prefix("</") {
            let end = after.find('>').ok_or_else(|| malformed("unterminated end tag"))?;
            let name = after[..end].trim();
            match stack.pop() {
                Some(open_name) if open_name == name => {}
                _ => return Err(malformed(&format!("unexpected </{name}>"))),
            }
            rest = &after[end + 1..];
            continue;
        }

        let body = &rest[1..];
        let end = tag_end(body).ok_or_else(|| malformed("unterminated tag"))?;
        let inner = &body[..end];
        rest = &body[end + 1..];

        let (inner, self_closing) = match inner.strip_suffix('/') {
            Some(stripped) => (stripped, true),
            None => (inner, false),
        };
        let name_len = inner
            .find(|c: char| c.is_whitespace())
            .unwrap_or(inner.len());
        let tag = &inner[..name_len];
        if tag.is_empty() {
            return Err(malformed("empty tag name"));
        }

        let attributes = ATTR_RE
            .captures_iter(&inner[name_len..])
            .filter_map(|c| {
                let key = c.get(1)?.as_str().to_string();
                let value = c.get(2).or_else(|| c.get(3))?.as_str();
                Some((key, unescape(value)))
            })
            .collect();

        nodes.push(UiNode {
            tag: tag.to_string(),
            depth: stack.len(),
            attributes,
        });
        if !self_closing {
            stack.push(tag.to_string());
        }
    }

    if let Some(open_name) = stack.last() {
        return Err(malformed(&format!("<{open_name}> never closed")));
    }
    if nodes.is_empty() {
        return Err(malformed("no elements"));
    }
    Ok(nodes)
}

/// Index of the `>` closing a tag, skipping quoted attribute values.
fn tag_end(body: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in body.char_indices() {
        match (quote, c) {
            (None, '"') | (None, '\'') => quote = Some(c),
            (Some(q), c) if q == c => quote = None,
            (None, '>') => return Some(i),
            (None, '<') => return None,
            _ => {}
        }
    }
    None
}

fn unescape(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let entity = &tail[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
