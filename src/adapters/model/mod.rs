//! Model client adapters.

pub mod command;
pub mod mock;

pub use command::CommandModelClient;
pub use mock::{MockModelClient, MockReply};
