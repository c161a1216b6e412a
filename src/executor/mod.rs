pub mod coordinator;
pub mod dispatcher;
pub mod input;
pub mod text_input;

pub use coordinator::SwipeDirection;
pub use dispatcher::ActionDispatcher;
pub use input::{InputDelivery, Key};
