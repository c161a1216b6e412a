use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle in pixels, `(x1, y1)` inclusive, `(x2, y2)` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Bounds {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> i32 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    pub fn center(&self) -> (i32, i32) {
        let mid = |a: i32, b: i32| ((a as i64 + b as i64) / 2) as i32;
        (mid(self.x1, self.x2), mid(self.y1, self.y2))
    }

    /// True when no pixel of the rectangle lies on a `screen`-sized viewport.
    pub fn is_outside(&self, screen: ScreenSize) -> bool {
        self.x2 <= 0
            || self.y2 <= 0
            || self.x1 >= screen.width as i32
            || self.y1 >= screen.height as i32
    }
}

impl std::fmt::Display for Bounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{}][{},{}]", self.x1, self.y1, self.x2, self.y2)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementFlags {
    pub clickable: bool,
    pub long_clickable: bool,
    pub checkable: bool,
    pub focusable: bool,
    pub enabled: bool,
    pub focused: bool,
    pub selected: bool,
}

impl ElementFlags {
    pub fn is_interactive(&self) -> bool {
        self.clickable || self.long_clickable || self.checkable || self.focusable
    }
}

/// One region of the current screen offered to the classifier.
///
/// Ids are only meaningful within the resolution pass that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateElement {
    pub id: u32,
    pub bounds: Bounds,
    pub text: Option<String>,
    pub accessibility_label: Option<String>,
    pub identifier: Option<String>,
    pub class_name: Option<String>,
    pub flags: ElementFlags,
}

impl CandidateElement {
    pub fn center(&self) -> (i32, i32) {
        self.bounds.center()
    }

    /// `com.android.settings:id/title` → `title`
    pub fn short_identifier(&self) -> Option<&str> {
        self.identifier
            .as_deref()
            .map(|id| id.rsplit('/').next().unwrap_or(id))
    }

    /// `android.widget.TextView` → `TextView`
    pub fn short_class(&self) -> &str {
        self.class_name
            .as_deref()
            .map(|c| c.rsplit('.').next().unwrap_or(c))
            .unwrap_or("View")
    }

    /// Best human-readable label: text, then accessibility label, then id, then class.
    pub fn display_text(&self) -> &str {
        self.text
            .as_deref()
            .or(self.accessibility_label.as_deref())
            .or(self.short_identifier())
            .unwrap_or_else(|| self.short_class())
    }
}
