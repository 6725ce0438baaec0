//! §4.F's command router: matches a command attempt against a plugin's
//! registered command table, trying progressively shorter token lists so
//! the longest-matching name wins, then falls back to the plugin's generic
//! message hook.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use kzm_core::{ArgValue, ParamDescriptor};

use crate::event::Ambient;
use crate::flow::Flow;

/// A handler's return value, mirroring the source's "any non-`true`,
/// non-absent return is sent back" convention.
pub enum Outcome {
    /// Not handled; the pipeline host tries the next plugin.
    Absent,
    /// Handled, nothing to send back.
    Handled,
    /// Handled; send this text back to `context`.
    Reply(String),
    /// The handler wants to suspend and await the participant's next
    /// message — §4.G's redesign of the source's generator return.
    StartFlow(Box<dyn Flow>),
}

impl Outcome {
    pub fn reply(text: impl Into<String>) -> Self {
        Outcome::Reply(text.into())
    }
}

pub type CommandFuture = Pin<Box<dyn Future<Output = Outcome> + Send>>;

/// One registered `on_command_<name>` handler: the canonicalised name it
/// answers to, its typed parameter descriptors (ambient parameters are not
/// listed — they're bound from [`Ambient`] directly), its documentation
/// (whose first line backs a bare syntax-error reply), and the handler
/// itself.
#[derive(Clone)]
pub struct CommandSpec {
    pub name: String,
    pub doc: String,
    pub params: Vec<ParamDescriptor>,
    pub handler: Arc<dyn Fn(Ambient, HashMap<String, ArgValue>) -> CommandFuture + Send + Sync>,
}

impl CommandSpec {
    pub fn new(
        name: impl Into<String>,
        doc: impl Into<String>,
        params: Vec<ParamDescriptor>,
        handler: impl Fn(Ambient, HashMap<String, ArgValue>) -> CommandFuture + Send + Sync + 'static,
    ) -> Self {
        CommandSpec { name: name.into(), doc: doc.into(), params, handler: Arc::new(handler) }
    }
}

/// Finds and invokes the most specific matching `on_command_<name>`, or
/// falls back to `on_message` when no token prefix matches anything.
pub async fn dispatch_command<F, Fut>(commands: &[CommandSpec], ambient: Ambient, on_message: F) -> Outcome
where
    F: FnOnce(Ambient) -> Fut,
    Fut: Future<Output = Outcome>,
{
    let mut parts = kzm_core::tokenize_command_name(&ambient.text);
    while !parts.is_empty() {
        let name: String = parts.concat();
        if let Some(spec) = commands.iter().find(|c| c.name == name) {
            let body = kzm_core::command_body_after_name(&ambient.text, &name);
            return match kzm_core::parse_command(&spec.params, &body) {
                Ok(kwargs) => (spec.handler)(ambient, kwargs).await,
                Err(err) => {
                    let message = if err.is_bare() { first_doc_line(&spec.doc) } else { err.0 };
                    Outcome::Reply(message)
                }
            };
        }
        parts.pop();
    }
    on_message(ambient).await
}

fn first_doc_line(doc: &str) -> String {
    doc.lines().next().unwrap_or_default().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kzm_core::ParamKind;

    fn ambient(text: &str) -> Ambient {
        Ambient { context: 7, sender: 7, text: text.to_string(), message_id: 1 }
    }

    fn echo_spec() -> CommandSpec {
        CommandSpec::new("debug_p", "show the raw text", Vec::new(), |_ambient, _kwargs| {
            Box::pin(async { Outcome::reply("你好，世界！") })
        })
    }

    #[tokio::test]
    async fn the_longest_matching_command_name_wins() {
        let specs = vec![echo_spec()];
        let outcome = dispatch_command(&specs, ambient(".debug p"), |_| async { Outcome::Absent }).await;
        match outcome {
            Outcome::Reply(text) => assert_eq!(text, "你好，世界！"),
            _ => panic!("expected a reply"),
        }
    }

    #[tokio::test]
    async fn an_unmatched_command_falls_through_to_on_message() {
        let specs = vec![echo_spec()];
        let outcome = dispatch_command(&specs, ambient(".bar"), |_| async { Outcome::reply("fallback") }).await;
        match outcome {
            Outcome::Reply(text) => assert_eq!(text, "fallback"),
            _ => panic!("expected on_message's reply"),
        }
    }

    #[tokio::test]
    async fn a_syntax_error_with_a_message_is_returned_verbatim() {
        let spec = CommandSpec::new(
            "n",
            "takes a number",
            vec![ParamDescriptor::new("n", ParamKind::Integer, false)],
            |_ambient, _kwargs| Box::pin(async { Outcome::Handled }),
        );
        let outcome = dispatch_command(&[spec], ambient(".n abc"), |_| async { Outcome::Absent }).await;
        match outcome {
            Outcome::Reply(text) => assert!(!text.is_empty()),
            _ => panic!("expected a syntax-error reply"),
        }
    }

    #[tokio::test]
    async fn a_bare_syntax_error_falls_back_to_documentation() {
        let spec = CommandSpec::new(
            "help",
            "shows available commands\nmore detail",
            vec![ParamDescriptor::new("_", ParamKind::Never, false)],
            |_ambient, _kwargs| Box::pin(async { Outcome::Handled }),
        );
        let outcome = dispatch_command(&[spec], ambient(".help"), |_| async { Outcome::Absent }).await;
        match outcome {
            Outcome::Reply(text) => assert_eq!(text, "shows available commands"),
            _ => panic!("expected the handler's doc first line"),
        }
    }
}
