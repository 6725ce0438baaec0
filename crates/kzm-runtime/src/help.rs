//! The `.help` aggregator: the Rust analogue of the source's `documented()`
//! decorator and `HelpProvider` plugin. Rather than discovering documented
//! commands by introspecting live objects, each plugin's command table is
//! folded into this registry once, at wiring time, and `.help` renders
//! whatever has accumulated.
use std::sync::Mutex;

use crate::command::CommandSpec;

#[derive(Default)]
pub struct HelpRegistry {
    entries: Mutex<Vec<(String, String)>>,
}

impl HelpRegistry {
    pub fn new() -> Self {
        HelpRegistry::default()
    }

    /// Records one plugin's command table under its own name. Commands with
    /// an empty doc string are skipped — matching the source's convention
    /// that an undocumented `on_command_*` simply never appears in `.help`.
    pub fn register(&self, plugin_name: &str, commands: &[CommandSpec]) {
        let mut entries = self.entries.lock().unwrap();
        for spec in commands {
            let summary = first_line(&spec.doc);
            if summary.is_empty() {
                continue;
            }
            entries.push((format!(".{}", spec.name), format!("{summary} ({plugin_name})")));
        }
    }

    /// Renders one line per documented command, sorted by command name so
    /// the output is stable across registration order.
    pub fn render(&self) -> String {
        let mut entries = self.entries.lock().unwrap().clone();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.into_iter().map(|(name, summary)| format!("{name} — {summary}")).collect::<Vec<_>>().join("\n")
    }
}

fn first_line(doc: &str) -> String {
    doc.lines().next().unwrap_or_default().trim().to_string()
}
