pub mod agent;
pub mod bus;
pub mod tracker;

pub use agent::{register_agent, Agent};
pub use bus::{EventBus, Handler, HandlerFuture};
pub use tracker::{CompletionRecord, CompletionTracker};
