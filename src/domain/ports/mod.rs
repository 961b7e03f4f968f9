//! Domain ports (interfaces) for the Heike agent runtime.

pub mod memory;
pub mod model_client;
pub mod session;
pub mod tool_executor;

pub use memory::{MemoryManager, NullMemoryManager};
pub use model_client::{ChatCompletion, ModelClient};
pub use session::{EphemeralSessionManager, SessionManager};
pub use tool_executor::ToolExecutor;
