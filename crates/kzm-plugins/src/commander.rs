//! `.debug_s`/`.select_from` — a narrow port of `95commander.py`'s admin
//! "commander" plugin. The source's `.reload` (process restart under a
//! supervisor) and `.print` (`eval` an arbitrary Python expression) are not
//! ported: the former has no daemon-supervisor counterpart in scope here,
//! and the latter has no safe Rust analogue.
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use kzm_core::{format_timespan, ArgValue, ParamDescriptor, ParamKind};
use kzm_gateway::{Gateway, NameCache};
use kzm_runtime::{CommandSpec, Outcome, Plugin};

pub struct Commander {
    gateway: Gateway,
    name_cache: Arc<NameCache>,
    admin_conversation: i64,
    workbook_dir: PathBuf,
}

impl Commander {
    pub fn new(gateway: Gateway, name_cache: Arc<NameCache>, admin_conversation: i64, workbook_dir: PathBuf) -> Self {
        Commander { gateway, name_cache, admin_conversation, workbook_dir }
    }

    async fn debug_status(&self, context: i64, sender: i64) -> String {
        debug_status(&self.gateway, &self.name_cache, self.admin_conversation, context, sender).await
    }
}

async fn debug_status(gateway: &Gateway, name_cache: &NameCache, admin_conversation: i64, context: i64, sender: i64) -> String {
    let sender_name = name_cache.member_name(gateway, context, sender).await.unwrap_or_default();
    let context_name = name_cache.context_name(gateway, context).await.unwrap_or_default();

    let mut lines = vec!["下面是调试信息。".to_string()];
    lines.push(format!("消息发送者 ID = {sender}"));
    lines.push(format!("消息发送者 = {sender_name}"));
    lines.push(format!("消息上下文 ID = {context}"));
    lines.push(format!("消息上下文 = {context_name}"));
    if context == admin_conversation {
        lines.push("消息来自管理用群。".to_string());
    }
    if let Some(uptime) = read_uptime_seconds() {
        lines.push(format!("服务器运行时间 = {}", format_timespan(uptime)));
    }
    if let Ok(cwd) = std::env::current_dir() {
        lines.push(format!("所在 = {}", cwd.display()));
    }
    lines.join("\n")
}

#[async_trait]
impl Plugin for Commander {
    fn plugin_name(&self) -> &str {
        "commander"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        let debug_gateway = self.gateway.clone();
        let debug_names = Arc::clone(&self.name_cache);
        let debug_admin = self.admin_conversation;

        let select_gateway = self.gateway.clone();
        let select_dir = self.workbook_dir.clone();
        let select_admin = self.admin_conversation;

        vec![
            CommandSpec::new("debug_s", "显示服务器与会话调试信息", Vec::new(), move |ambient, _kwargs| {
                let gateway = debug_gateway.clone();
                let name_cache = Arc::clone(&debug_names);
                let admin_conversation = debug_admin;
                Box::pin(async move {
                    Outcome::reply(debug_status(&gateway, &name_cache, admin_conversation, ambient.context, ambient.sender).await)
                })
            }),
            CommandSpec::new(
                "select_from",
                "把一张表对应的工作簿文件发回来，用法：.select_from <表名>",
                vec![ParamDescriptor::new("db", ParamKind::LastString, false)],
                move |ambient, kwargs| {
                    let gateway = select_gateway.clone();
                    let dir = select_dir.clone();
                    let admin_conversation = select_admin;
                    Box::pin(async move {
                        if ambient.context != admin_conversation {
                            return Outcome::reply("这个指令仅限管理用群使用。");
                        }
                        let Some(ArgValue::Str(db)) = kwargs.get("db") else {
                            return Outcome::reply("缺少表名。");
                        };
                        let Some(db) = sanitize_table_name(db) else {
                            return Outcome::reply("表名不合法。");
                        };
                        let path = dir.join(format!("{db}.xlsx"));
                        match gateway.send_file(ambient.context, &path, None).await {
                            Ok(()) => Outcome::Handled,
                            Err(err) => Outcome::reply(format!("发送失败：{err}")),
                        }
                    })
                },
            ),
        ]
    }
}

/// Restricts `.select_from`'s table-name argument to a single path
/// component with no separators, so it can't be used to walk out of
/// `workbook_dir`.
fn sanitize_table_name(name: &str) -> Option<&str> {
    let name = name.trim();
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return None;
    }
    Some(name)
}

fn read_uptime_seconds() -> Option<u64> {
    let raw = std::fs::read_to_string("/proc/uptime").ok()?;
    let first = raw.split_whitespace().next()?;
    first.parse::<f64>().ok().map(|secs| secs as u64)
}
