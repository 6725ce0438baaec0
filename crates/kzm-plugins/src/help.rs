//! `.help` — renders whatever accumulated in a shared [`HelpRegistry`].
//! Grounded on the source's `HelpProvider` plugin, which walked every
//! `@documented` method of every other plugin at call time; here the
//! registry is filled once at wiring time instead (see `kzm-runtime::help`).
use std::sync::Arc;

use async_trait::async_trait;
use kzm_runtime::{CommandSpec, HelpRegistry, Outcome, Plugin};

pub struct Help {
    registry: Arc<HelpRegistry>,
}

impl Help {
    pub fn new(registry: Arc<HelpRegistry>) -> Self {
        Help { registry }
    }
}

#[async_trait]
impl Plugin for Help {
    fn plugin_name(&self) -> &str {
        "help"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        let registry = Arc::clone(&self.registry);
        vec![CommandSpec::new(
            "help",
            "显示所有已登记的命令",
            Vec::new(),
            move |_ambient, _kwargs| {
                let registry = Arc::clone(&registry);
                Box::pin(async move {
                    let rendered = registry.render();
                    if rendered.is_empty() {
                        Outcome::reply("暂无已登记的命令。")
                    } else {
                        Outcome::reply(rendered)
                    }
                })
            },
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn an_empty_registry_replies_with_a_placeholder() {
        let help = Help::new(Arc::new(HelpRegistry::new()));
        let spec = &help.commands()[0];
        let ambient = kzm_runtime::Ambient { context: 1, sender: 1, text: ".help".to_string(), message_id: 1 };
        let outcome = (spec.handler)(ambient, HashMap::new()).await;
        match outcome {
            Outcome::Reply(text) => assert_eq!(text, "暂无已登记的命令。"),
            _ => panic!("expected a reply"),
        }
    }
}
