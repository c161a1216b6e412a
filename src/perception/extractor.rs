/// Candidate extraction: UI tree → flat, numbered list of actionable regions.
use crate::config::{LocatorConfig, Strategy};
use crate::perception::types::{CandidateElement, ElementFlags, ScreenSize};
use crate::perception::ui_tree::{self, UiNode};

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Minimum width and height in pixels.
    pub min_size: i32,
    /// Nodes at least this large on both axes (as a share of the screen) are backgrounds.
    pub background_ratio: f64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            min_size: 20,
            background_ratio: 0.95,
        }
    }
}

impl From<&LocatorConfig> for ExtractorConfig {
    fn from(cfg: &LocatorConfig) -> Self {
        Self {
            min_size: cfg.min_element_size,
            background_ratio: cfg.background_ratio,
        }
    }
}

/// First id handed out for a strategy. Visual labels start at 1 so that a
/// stray "0" in an answer is never confused with a mark on the image.
pub fn first_id(strategy: Strategy) -> u32 {
    match strategy {
        Strategy::Structural => 0,
        Strategy::Visual => 1,
    }
}

#[derive(Debug, Clone, Default)]
pub struct ElementExtractor {
    config: ExtractorConfig,
}

impl ElementExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Walk the tree in document order and keep every node that passes the
    /// filters, numbering survivors from `first_id(strategy)` upwards.
    ///
    /// An unparseable or empty tree yields an empty list.
    pub fn extract(
        &self,
        ui_tree: &str,
        screen: ScreenSize,
        strategy: Strategy,
    ) -> Vec<CandidateElement> {
        let nodes = match ui_tree::parse_nodes(ui_tree) {
            Ok(nodes) => nodes,
            Err(e) => {
                tracing::warn!(error = %e, "UI tree unusable, no candidates");
                return Vec::new();
            }
        };

        let mut next_id = first_id(strategy);
        let mut out = Vec::new();
        for node in &nodes {
            if let Some(mut candidate) = self.candidate(node, screen) {
                candidate.id = next_id;
                next_id += 1;
                out.push(candidate);
            }
        }

        tracing::debug!(
            nodes = nodes.len(),
            candidates = out.len(),
            %strategy,
            "candidates extracted"
        );
        out
    }

    /// Apply the filters in order; the first failing one discards the node.
    fn candidate(&self, node: &UiNode, screen: ScreenSize) -> Option<CandidateElement> {
        let bounds = ui_tree::parse_bounds(node.non_empty("bounds")?)?;
        if bounds.is_empty() {
            return None;
        }

        let flags = ElementFlags {
            clickable: node.flag("clickable", false),
            long_clickable: node.flag("long-clickable", false),
            checkable: node.flag("checkable", false),
            focusable: node.flag("focusable", false),
            enabled: node.flag("enabled", true),
            focused: node.flag("focused", false),
            selected: node.flag("selected", false),
        };
        let text = node.non_empty("text").map(str::to_string);
        let accessibility_label = node.non_empty("content-desc").map(str::to_string);
        let identifier = node.non_empty("resource-id").map(str::to_string);
        let has_semantics =
            text.is_some() || accessibility_label.is_some() || identifier.is_some();
        if !flags.is_interactive() && !has_semantics {
            return None;
        }

        let (w, h) = (bounds.width() as f64, bounds.height() as f64);
        let ratio = self.config.background_ratio;
        if w >= screen.width as f64 * ratio && h >= screen.height as f64 * ratio {
            return None;
        }

        if bounds.width() < self.config.min_size || bounds.height() < self.config.min_size {
            return None;
        }

        if bounds.is_outside(screen) {
            return None;
        }

        Some(CandidateElement {
            id: 0,
            bounds,
            text,
            accessibility_label,
            identifier,
            class_name: node.class_name().map(str::to_string),
            flags,
        })
    }
}
