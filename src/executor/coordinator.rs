// Swipe geometry.
use serde::{Deserialize, Serialize};

use crate::perception::types::ScreenSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeDirection {
    /// Finger moves up, content scrolls down.
    #[default]
    Up,
    Down,
    Left,
    Right,
}

/// Start and end point of a swipe of `distance` px through the screen centre,
/// clamped to stay on screen.
pub fn swipe_path(
    direction: SwipeDirection,
    screen: ScreenSize,
    distance: i32,
) -> ((i32, i32), (i32, i32)) {
    let (w, h) = (screen.width as i32, screen.height as i32);
    let (cx, cy) = (w / 2, h / 2);
    let clamp_x = |x: i32| x.clamp(0, (w - 1).max(0));
    let clamp_y = |y: i32| y.clamp(0, (h - 1).max(0));

    match direction {
        SwipeDirection::Up => ((cx, clamp_y(cy + distance)), (cx, clamp_y(cy - distance))),
        SwipeDirection::Down => ((cx, clamp_y(cy - distance)), (cx, clamp_y(cy + distance))),
        SwipeDirection::Left => ((clamp_x(cx + distance), cy), (clamp_x(cx - distance), cy)),
        SwipeDirection::Right => ((clamp_x(cx - distance), cy), (clamp_x(cx + distance), cy)),
    }
}
