pub mod adb;
pub mod apps;

use crate::executor::input::InputDelivery;
use crate::perception::traits::ScreenCapture;

pub use adb::AdbSession;
pub use apps::AppDirectory;

/// A device that can both be observed and driven.
pub trait Device: ScreenCapture + InputDelivery {}

impl<T: ScreenCapture + InputDelivery + ?Sized> Device for T {}
