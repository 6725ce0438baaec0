//! §4.I's pipeline host: owns the registered plugins (in declared order,
//! each with its own flow table), feeds every inbound event through them
//! until one reports the event handled, and persists every dirtied
//! database afterward.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use kzm_core::ids::Context;
use kzm_docstore::Database;
use kzm_gateway::{Gateway, NameCache};

use crate::dispatcher;
use crate::error::RuntimeError;
use crate::event::{parse_event, GatewayEvent};
use crate::flow::FlowTable;
use crate::plugin::Plugin;

struct PluginEntry {
    plugin: Arc<dyn Plugin>,
    flows: Mutex<FlowTable>,
}

/// The process-wide plugin pipeline. Construct once at startup, register
/// every plugin in the order they should run, and feed it one decoded
/// gateway event at a time.
pub struct PipelineHost {
    plugins: Vec<PluginEntry>,
    gateway: Gateway,
    name_cache: Arc<NameCache>,
    admin_conversation: Context,
    flow_retention_secs: f64,
}

impl PipelineHost {
    pub fn new(gateway: Gateway, name_cache: Arc<NameCache>, admin_conversation: Context, flow_retention_secs: f64) -> Self {
        PipelineHost { plugins: Vec::new(), gateway, name_cache, admin_conversation, flow_retention_secs }
    }

    /// Registers a plugin. Plugins run in registration order, mirroring the
    /// source's module-load-then-declaration-order discovery — this runtime
    /// has no reflective `leaf_subclasses` equivalent, so the binary wiring
    /// everything together is what fixes the order instead.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.push(PluginEntry { plugin, flows: Mutex::new(FlowTable::new()) });
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.plugin.plugin_name()).collect()
    }

    /// Decodes and runs one gateway event through the full pipeline, then
    /// saves every dirtied database. A plugin error never propagates past
    /// this call: it is logged and reported to the event's conversation
    /// (or the administrative one, if the event had none), exactly as
    /// §4.I/§7 require — the only error this can return is a malformed
    /// event payload itself, which the HTTP layer turns into a 4xx.
    ///
    /// `databases` is shared, not owned: a plugin module that keeps its own
    /// records holds the same `Arc<Mutex<Database>>` it was constructed
    /// with, so a write a plugin makes mid-dispatch is exactly what gets
    /// saved here afterward — the host never copies or re-derives table
    /// state.
    pub async fn handle_event(&self, raw_event: &Value, databases: &[Arc<Mutex<Database>>]) -> Result<(), RuntimeError> {
        let event = parse_event(raw_event)?;
        let context = event_context(&event);

        if let GatewayEvent::Message { context, sender, sender_meta: Some(meta), .. } = &event {
            self.name_cache.observe_sender(*context, *sender, &meta.nickname, meta.card.as_deref());
        }

        if let Err(err) = self.run_pipeline(&event).await {
            self.report_error(context, &err).await;
        }

        self.save_dirty_databases(databases);
        Ok(())
    }

    async fn run_pipeline(&self, event: &GatewayEvent) -> Result<(), RuntimeError> {
        for entry in &self.plugins {
            let handled =
                dispatcher::dispatch_event(entry.plugin.as_ref(), &entry.flows, &self.gateway, event, self.flow_retention_secs)
                    .await?;
            if handled {
                break;
            }
        }
        Ok(())
    }

    fn save_dirty_databases(&self, databases: &[Arc<Mutex<Database>>]) {
        for db in databases {
            let mut db = db.lock().unwrap();
            if db.dirty() {
                if let Err(err) = db.save() {
                    tracing::error!(target: "kzm.runtime", %err, "failed to save database");
                }
            }
        }
    }

    async fn report_error(&self, context: Context, err: &RuntimeError) {
        tracing::error!(target: "kzm.runtime", %err, "uncaught plugin error");
        let target = if context != 0 { context } else { self.admin_conversation };
        let message = format!("\u{267b}\u{fe0f} {err}");
        if let Err(send_err) = self.gateway.send(target, &message).await {
            tracing::error!(target: "kzm.runtime", %send_err, "failed to report error in-channel");
        }
    }
}

fn event_context(event: &GatewayEvent) -> Context {
    match event {
        GatewayEvent::Message { context, .. }
        | GatewayEvent::Request { context, .. }
        | GatewayEvent::MessageRecalled { context, .. }
        | GatewayEvent::OfflineFile { context, .. }
        | GatewayEvent::GroupUpload { context, .. } => *context,
        GatewayEvent::MetaEvent | GatewayEvent::Ignored => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandSpec, Outcome};
    use async_trait::async_trait;
    use serde_json::json;

    struct NeverHandles;

    #[async_trait]
    impl Plugin for NeverHandles {
        fn plugin_name(&self) -> &str {
            "never"
        }
    }

    #[tokio::test]
    async fn an_event_nobody_handles_still_saves_databases_and_returns_ok() {
        let host = PipelineHost::new(Gateway::new("http://127.0.0.1:0"), Arc::new(NameCache::new()), 1, 86400.0);
        let data = json!({"post_type": "meta_event"});
        let databases: Vec<Arc<Mutex<Database>>> = Vec::new();
        assert!(host.handle_event(&data, &databases).await.is_ok());
    }

    #[tokio::test]
    async fn plugins_after_the_first_to_handle_an_event_are_skipped() {
        struct First;
        struct Second(std::sync::Arc<std::sync::atomic::AtomicBool>);

        #[async_trait]
        impl Plugin for First {
            fn plugin_name(&self) -> &str {
                "first"
            }
            fn commands(&self) -> Vec<CommandSpec> {
                vec![CommandSpec::new("debug_p", "", Vec::new(), |_a, _k| Box::pin(async { Outcome::Handled }))]
            }
        }

        #[async_trait]
        impl Plugin for Second {
            fn plugin_name(&self) -> &str {
                "second"
            }
            fn commands(&self) -> Vec<CommandSpec> {
                let flag = self.0.clone();
                vec![CommandSpec::new("debug_p", "", Vec::new(), move |_a, _k| {
                    flag.store(true, std::sync::atomic::Ordering::SeqCst);
                    Box::pin(async { Outcome::Handled })
                })]
            }
        }

        let mut host = PipelineHost::new(Gateway::new("http://127.0.0.1:0"), Arc::new(NameCache::new()), 1, 86400.0);
        let second_ran = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        host.register(Arc::new(First));
        host.register(Arc::new(Second(second_ran.clone())));

        let data = json!({"post_type": "message", "user_id": 7, "raw_message": ".debug p", "message_id": 1});
        let databases: Vec<Arc<Mutex<Database>>> = Vec::new();
        host.handle_event(&data, &databases).await.unwrap();

        assert!(!second_ran.load(std::sync::atomic::Ordering::SeqCst));
    }
}
