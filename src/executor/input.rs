use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::SeeDroidResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Back,
    Home,
    Enter,
    AppSwitch,
    Delete,
}

impl Key {
    /// Android `KEYCODE_*` name understood by `input keyevent`.
    pub fn keycode(&self) -> &'static str {
        match self {
            Key::Back => "KEYCODE_BACK",
            Key::Home => "KEYCODE_HOME",
            Key::Enter => "KEYCODE_ENTER",
            Key::AppSwitch => "KEYCODE_APP_SWITCH",
            Key::Delete => "KEYCODE_DEL",
        }
    }
}

/// Low-level input delivery. Coordinates are in UI-tree space.
#[async_trait]
pub trait InputDelivery: Send + Sync {
    async fn tap(&self, x: i32, y: i32) -> SeeDroidResult<()>;

    async fn swipe(&self, x1: i32, y1: i32, x2: i32, y2: i32, duration_ms: u64)
        -> SeeDroidResult<()>;

    async fn send_text(&self, text: &str) -> SeeDroidResult<()>;

    async fn press_key(&self, key: Key) -> SeeDroidResult<()>;

    async fn launch_app(&self, package: &str) -> SeeDroidResult<()>;

    async fn stop_app(&self, package: &str) -> SeeDroidResult<()>;
}
