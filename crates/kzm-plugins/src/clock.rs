//! `.clock` — a delayed-reminder plugin. Parses a leading or trailing
//! integer out of the command body as a delay in seconds, and replies with
//! whatever text is left once that delay elapses.
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kzm_core::{ArgValue, ParamDescriptor, ParamKind};
use kzm_gateway::Gateway;
use kzm_runtime::{CommandSpec, Outcome, Plugin};

struct Reminder {
    due: f64,
    context: i64,
    text: String,
}

fn now_unix() -> f64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

/// An in-memory queue of pending reminders — unlike the source's
/// pickle-backed priority queue, a restart drops anything still pending;
/// a demo plugin has no call to reach for `kzm-docstore` just for this.
pub struct Clock {
    gateway: Gateway,
    pending: Arc<Mutex<Vec<Reminder>>>,
    commands: Vec<CommandSpec>,
}

impl Clock {
    pub fn new(gateway: Gateway) -> Self {
        let pending = Arc::new(Mutex::new(Vec::new()));
        let commands = vec![CommandSpec::new(
            "clock",
            "安排一次定时提醒，用法：.clock <延迟秒数> <提醒内容>",
            vec![ParamDescriptor::new("body", ParamKind::LastString, true)],
            {
                let pending = Arc::clone(&pending);
                move |ambient, kwargs| {
                    let pending = Arc::clone(&pending);
                    Box::pin(async move {
                        let body = match kwargs.get("body") {
                            Some(ArgValue::Str(s)) => s.as_str(),
                            _ => "",
                        };
                        match parse_delay_and_title(body) {
                            Some((delay, title)) if !title.is_empty() => {
                                pending.lock().unwrap().push(Reminder {
                                    due: now_unix() + delay as f64,
                                    context: ambient.context,
                                    text: title.clone(),
                                });
                                Outcome::reply(format!("已安排在 {delay} 秒后提醒：{title}"))
                            }
                            Some(_) => Outcome::reply("标题不能为空"),
                            None => Outcome::reply("无法识别到有效时间"),
                        }
                    })
                }
            },
        )];
        Clock { gateway, pending, commands }
    }
}

#[async_trait]
impl Plugin for Clock {
    fn plugin_name(&self) -> &str {
        "clock"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        self.commands.clone()
    }

    async fn on_interval(&self) {
        let due: Vec<Reminder> = {
            let mut pending = self.pending.lock().unwrap();
            let now = now_unix();
            let (due, rest): (Vec<_>, Vec<_>) = pending.drain(..).partition(|r| r.due <= now);
            *pending = rest;
            due
        };
        for reminder in due {
            if let Err(err) = self.gateway.send(reminder.context, &reminder.text).await {
                tracing::warn!(target: "kzm.plugins.clock", %err, "failed to deliver a reminder");
            }
        }
    }
}

/// Extracts a leading or trailing run of digits as the delay, the
/// remainder (trimmed) as the title — mirroring the source's
/// `re.search(r"^\d+|\d+$", ...)`.
fn parse_delay_and_title(body: &str) -> Option<(i64, String)> {
    leading_digits(body).or_else(|| trailing_digits(body))
}

fn leading_digits(body: &str) -> Option<(i64, String)> {
    let end = body.chars().take_while(|c| c.is_ascii_digit()).count();
    if end == 0 {
        return None;
    }
    let (digits, rest) = body.split_at(end);
    Some((digits.parse().ok()?, rest.trim().to_string()))
}

fn trailing_digits(body: &str) -> Option<(i64, String)> {
    let start = body.chars().rev().take_while(|c| c.is_ascii_digit()).count();
    if start == 0 {
        return None;
    }
    let split = body.len() - start;
    let (rest, digits) = body.split_at(split);
    Some((digits.parse().ok()?, rest.trim().to_string()))
}
