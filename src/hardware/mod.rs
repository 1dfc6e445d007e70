pub mod fan;

pub use fan::{Dispatch, FanController};
