//! Illustrative plugin demonstrating the hook surface and the flow engine.
//! Grounded on `70demo.py`'s `Demonstration` plugin: a handful of `on_message`
//! one-liners, a multi-message command, and the number-guessing flow that
//! exercises §4.G end to end (literal scenario 2 of the testable properties).
use async_trait::async_trait;
use rand::Rng;

use kzm_gateway::Gateway;
use kzm_runtime::{Ambient, CommandSpec, Flow, FlowStep, Outcome, Plugin};

const CAT_SOUNDS: [&str; 4] = ["喵呜～", "喵！", "喵？", "喵～"];

pub struct Demo {
    gateway: Gateway,
}

impl Demo {
    pub fn new(gateway: Gateway) -> Self {
        Demo { gateway }
    }
}

#[async_trait]
impl Plugin for Demo {
    fn plugin_name(&self) -> &str {
        "demo"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        let gateway = self.gateway.clone();
        vec![
            CommandSpec::new("debug_m", "连续发送两条消息", Vec::new(), move |ambient, _kwargs| {
                let gateway = gateway.clone();
                Box::pin(async move {
                    if let Err(err) = gateway.send(ambient.context, "这是第一条消息。").await {
                        tracing::warn!(target: "kzm.plugins.demo", %err, "failed to send the first of two messages");
                    }
                    Outcome::reply("这是第二条消息。")
                })
            }),
            CommandSpec::new("猜数字", "开始一局猜数字游戏", Vec::new(), |_ambient, _kwargs| {
                Box::pin(async { Outcome::StartFlow(Box::new(GuessingGame::new())) })
            }),
        ]
    }

    async fn on_message(&self, ambient: Ambient) -> Outcome {
        let text = ambient.text.trim();
        if text == ".debug p" {
            Outcome::reply("你好，世界！")
        } else if text == ".cat" {
            let pick = rand::thread_rng().gen_range(0..CAT_SOUNDS.len());
            Outcome::reply(CAT_SOUNDS[pick])
        } else if (!text.starts_with('^') && text.ends_with('^')) || text == "More?" {
            Outcome::reply("More?")
        } else {
            Outcome::Absent
        }
    }
}

/// `.猜数字` — guesses a number between 1 and 100, one message at a time.
struct GuessingGame {
    target: i64,
    started: bool,
}

impl GuessingGame {
    fn new() -> Self {
        GuessingGame { target: rand::thread_rng().gen_range(1..=100), started: false }
    }
}

impl Flow for GuessingGame {
    fn resume(&mut self, input: Option<&str>) -> FlowStep {
        if !self.started {
            self.started = true;
            return FlowStep::Prompt("我从 1～100 中随机选了一个整数。猜对了也没有奖励，猜错了也没有惩罚。".to_string());
        }
        let Some(guess) = input.and_then(|s| s.trim().parse::<i64>().ok()) else {
            return FlowStep::Done(Some(format!("游戏结束。正确答案是 {}。", self.target)));
        };
        if guess < self.target {
            FlowStep::Prompt("太小了。".to_string())
        } else if guess > self.target {
            FlowStep::Prompt("太大了。".to_string())
        } else {
            FlowStep::Done(Some("猜对了！".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn debug_p_echoes_a_greeting() {
        let demo = Demo::new(Gateway::new("http://127.0.0.1:0"));
        let ambient = Ambient { context: 1, sender: 1, text: ".debug p".to_string(), message_id: 1 };
        match demo.on_message(ambient).await {
            Outcome::Reply(text) => assert_eq!(text, "你好，世界！"),
            _ => panic!("expected a reply"),
        }
    }

    #[tokio::test]
    async fn a_caret_suffixed_message_prompts_more() {
        let demo = Demo::new(Gateway::new("http://127.0.0.1:0"));
        let ambient = Ambient { context: 1, sender: 1, text: "something^".to_string(), message_id: 1 };
        match demo.on_message(ambient).await {
            Outcome::Reply(text) => assert_eq!(text, "More?"),
            _ => panic!("expected More?"),
        }
    }

    #[test]
    fn the_guessing_game_narrows_toward_the_target() {
        let mut game = GuessingGame { target: 50, started: false };
        match game.resume(None) {
            FlowStep::Prompt(_) => {}
            _ => panic!("expected the opening prompt"),
        }
        match game.resume(Some("10")) {
            FlowStep::Prompt(p) => assert_eq!(p, "太小了。"),
            _ => panic!("expected too-small"),
        }
        match game.resume(Some("90")) {
            FlowStep::Prompt(p) => assert_eq!(p, "太大了。"),
            _ => panic!("expected too-big"),
        }
        match game.resume(Some("50")) {
            FlowStep::Done(Some(reply)) => assert_eq!(reply, "猜对了！"),
            _ => panic!("expected a win"),
        }
    }

    #[test]
    fn a_non_numeric_guess_ends_the_game() {
        let mut game = GuessingGame { target: 50, started: true };
        match game.resume(Some("abc")) {
            FlowStep::Done(Some(reply)) => assert!(reply.contains("50")),
            _ => panic!("expected the game to end"),
        }
    }
}
