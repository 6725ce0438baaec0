//! The display-name cache: a process-local first level in front of the
//! gateway's own (go-cqhttp's) second-level cache, so plugins can call
//! [`NameCache::context_name`]/[`NameCache::member_name`] as often as they
//! like without hammering the gateway.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{json, Value};

use crate::error::GatewayError;
use crate::gateway::Gateway;

/// Caches friend/group names (keyed by `context`) and group-member display
/// names (keyed by `(context, sender)`) separately, since they're
/// resolved through different gateway calls.
#[derive(Default)]
pub struct NameCache {
    contexts: Mutex<HashMap<i64, String>>,
    members: Mutex<HashMap<(i64, i64), String>>,
}

impl NameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The name of a friend (`context >= 0`) or a group (`context < 0`).
    pub async fn context_name(&self, gateway: &Gateway, context: i64) -> Result<String, GatewayError> {
        if let Some(cached) = self.contexts.lock().unwrap().get(&context).cloned() {
            return Ok(cached);
        }

        let name = if context >= 0 {
            let friends = gateway.call("get_friend_list", json!({})).await?;
            let mut contexts = self.contexts.lock().unwrap();
            populate_friend_cache(&friends, &mut contexts);
            contexts.get(&context).cloned().unwrap_or_default()
        } else {
            let info = gateway.call("get_group_info", json!({ "group_id": -context })).await?;
            info.get("group_name").and_then(Value::as_str).unwrap_or_default().to_string()
        };

        self.contexts.lock().unwrap().insert(context, name.clone());
        Ok(name)
    }

    /// The display name of `sender` within `context`: a group's card name
    /// if set, the group member's nickname otherwise, or just the sender's
    /// friend name if `context` isn't a group at all.
    pub async fn member_name(&self, gateway: &Gateway, context: i64, sender: i64) -> Result<String, GatewayError> {
        if let Some(cached) = self.members.lock().unwrap().get(&(context, sender)).cloned() {
            return Ok(cached);
        }

        let name = if context >= 0 {
            self.context_name(gateway, sender).await?
        } else {
            let info =
                gateway.call("get_group_member_info", json!({ "group_id": -context, "user_id": sender })).await?;
            member_display_name(&info)
        };

        self.members.lock().unwrap().insert((context, sender), name.clone());
        Ok(name)
    }

    /// Opportunistically primes the cache from a message event's own
    /// `sender` block, so a reply quoting the sender's name rarely needs a
    /// round trip to the gateway. Mirrors the source's always-on,
    /// never-handles-the-event companion behavior: a friend name, the
    /// sender's own member name within a 1:1 context, and their display
    /// name (card, or nickname if blank) within `context`.
    pub fn observe_sender(&self, context: i64, sender: i64, nickname: &str, card: Option<&str>) {
        self.contexts.lock().unwrap().insert(sender, nickname.to_string());
        let display = card.filter(|c| !c.is_empty()).unwrap_or(nickname).to_string();
        let mut members = self.members.lock().unwrap();
        members.insert((sender, sender), nickname.to_string());
        members.insert((context, sender), display);
    }
}

fn populate_friend_cache(friends: &Value, cache: &mut HashMap<i64, String>) {
    let Some(list) = friends.as_array() else { return };
    for friend in list {
        if let (Some(id), Some(nickname)) =
            (friend.get("user_id").and_then(Value::as_i64), friend.get("nickname").and_then(Value::as_str))
        {
            cache.insert(id, nickname.to_string());
        }
    }
}

fn member_display_name(info: &Value) -> String {
    info.get("card")
        .and_then(Value::as_str)
        .filter(|card| !card.is_empty())
        .or_else(|| info.get("nickname").and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_display_name_prefers_a_nonempty_card() {
        let info = json!({"card": "old chap", "nickname": "real name"});
        assert_eq!(member_display_name(&info), "old chap");
    }

    #[test]
    fn member_display_name_falls_back_to_nickname_when_card_is_blank() {
        let info = json!({"card": "", "nickname": "real name"});
        assert_eq!(member_display_name(&info), "real name");
    }

    #[test]
    fn member_display_name_falls_back_to_nickname_when_card_is_absent() {
        let info = json!({"nickname": "real name"});
        assert_eq!(member_display_name(&info), "real name");
    }

    #[test]
    fn observing_a_sender_primes_both_maps() {
        let cache = NameCache::new();
        cache.observe_sender(-2, 9, "nick", Some("card"));
        assert_eq!(cache.contexts.lock().unwrap().get(&9), Some(&"nick".to_string()));
        assert_eq!(cache.members.lock().unwrap().get(&(9, 9)), Some(&"nick".to_string()));
        assert_eq!(cache.members.lock().unwrap().get(&(-2, 9)), Some(&"card".to_string()));
    }

    #[test]
    fn observing_a_sender_with_a_blank_card_falls_back_to_nickname() {
        let cache = NameCache::new();
        cache.observe_sender(-2, 9, "nick", Some(""));
        assert_eq!(cache.members.lock().unwrap().get(&(-2, 9)), Some(&"nick".to_string()));
    }

    #[test]
    fn populate_friend_cache_reads_every_entry() {
        let friends = json!([
            {"user_id": 1, "nickname": "a"},
            {"user_id": 2, "nickname": "b"},
        ]);
        let mut cache = HashMap::new();
        populate_friend_cache(&friends, &mut cache);
        assert_eq!(cache.get(&1), Some(&"a".to_string()));
        assert_eq!(cache.get(&2), Some(&"b".to_string()));
    }
}
