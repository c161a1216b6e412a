use async_trait::async_trait;

use crate::errors::SeeDroidResult;
use crate::perception::types::ScreenSize;

/// Source of the current screen state.
///
/// Every resolution pass captures afresh; implementations must not cache
/// across calls.
#[async_trait]
pub trait ScreenCapture: Send + Sync {
    /// PNG (or any `image`-decodable) bytes of the current screen.
    async fn screenshot(&self) -> SeeDroidResult<Vec<u8>>;

    /// Hierarchy dump as XML text.
    async fn ui_tree(&self) -> SeeDroidResult<String>;

    /// Size of the coordinate space used by the UI tree and by input events.
    async fn screen_size(&self) -> SeeDroidResult<ScreenSize>;
}
