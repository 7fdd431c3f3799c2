use std::sync::Arc;

use async_trait::async_trait;
use mtap_models::{Event, EventKind};

use crate::bus::EventBus;

/// A pipeline agent: a named component that subscribes to a fixed set of
/// event kinds. Agents never call each other directly; all coordination goes
/// through the bus.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &'static str;

    /// The event kinds this agent wants delivered to `handle`.
    fn subscriptions(&self) -> &'static [EventKind];

    async fn handle(&self, event: Event) -> anyhow::Result<()>;
}

/// Register every subscription of `agent` on the bus.
pub fn register_agent(bus: &EventBus, agent: Arc<dyn Agent>) {
    for kind in agent.subscriptions() {
        let agent = Arc::clone(&agent);
        bus.register(
            *kind,
            agent.name(),
            Arc::new(move |event| {
                let agent = Arc::clone(&agent);
                Box::pin(async move { agent.handle(event).await })
            }),
        );
    }
}
