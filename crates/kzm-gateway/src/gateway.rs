//! The gateway HTTP client: a thin POST-and-check-status wrapper around the
//! local chat gateway's RPC-ish HTTP API, plus the two convenience calls
//! the rest of the runtime actually needs (send a message, send a file).

use std::path::Path;

use serde_json::{json, Value};

use kzm_core::encode;

use crate::error::GatewayError;

/// A client bound to one gateway base URL (normally the local gateway
/// process, e.g. `http://127.0.0.1:5700`).
#[derive(Clone)]
pub struct Gateway {
    client: reqwest::Client,
    base_url: String,
}

impl Gateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into() }
    }

    /// Calls a gateway endpoint with a JSON body, returning its `data`
    /// field. A `"status": "failed"` response becomes an error instead of
    /// a successful empty object.
    pub async fn call(&self, endpoint: &str, params: Value) -> Result<Value, GatewayError> {
        let url = format!("{}/{endpoint}", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&params)
            .send()
            .await
            .map_err(|source| GatewayError::Http { endpoint: endpoint.to_string(), source })?;
        let data: Value =
            response.json().await.map_err(|source| GatewayError::Http { endpoint: endpoint.to_string(), source })?;
        let result = parse_response(endpoint, data);
        if let Err(err) = &result {
            tracing::warn!(target: "kzm.gateway", endpoint, %err, "gateway call failed");
        }
        result
    }

    /// Sends a message to `context` (a positive id addresses a 1:1 chat, a
    /// negative one addresses `abs(context)`'s group).
    pub async fn send(&self, context: i64, message: &str) -> Result<(), GatewayError> {
        let mut params = target_params(context);
        params["message"] = Value::String(encode(message));
        self.call("send_msg", params).await?;
        Ok(())
    }

    /// Uploads a local file to `context`, displayed as `display_name` (or
    /// the file's own name if not given).
    pub async fn send_file(&self, context: i64, path: &Path, display_name: Option<&str>) -> Result<(), GatewayError> {
        let absolute = std::fs::canonicalize(path)?;
        let name = display_name
            .map(str::to_string)
            .or_else(|| path.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_default();

        let endpoint = if context >= 0 { "upload_private_file" } else { "upload_group_file" };
        let mut params = target_params(context);
        params["file"] = Value::String(absolute.to_string_lossy().into_owned());
        params["name"] = Value::String(name);
        self.call(endpoint, params).await?;
        Ok(())
    }
}

fn target_params(context: i64) -> Value {
    if context >= 0 {
        json!({ "user_id": context })
    } else {
        json!({ "group_id": -context })
    }
}

fn parse_response(endpoint: &str, data: Value) -> Result<Value, GatewayError> {
    if data.get("status").and_then(Value::as_str) == Some("failed") {
        return Err(GatewayError::Failed {
            endpoint: endpoint.to_string(),
            message: data.get("msg").and_then(Value::as_str).unwrap_or_default().to_string(),
            wording: data.get("wording").and_then(Value::as_str).unwrap_or_default().to_string(),
        });
    }
    Ok(data.get("data").cloned().unwrap_or_else(|| json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_failed_status_becomes_an_error_carrying_the_message_and_wording() {
        let data = json!({"status": "failed", "retcode": 100, "msg": "BAD_PARAM", "wording": "参数错误"});
        let err = parse_response("send_msg", data).unwrap_err();
        match err {
            GatewayError::Failed { endpoint, message, wording } => {
                assert_eq!(endpoint, "send_msg");
                assert_eq!(message, "BAD_PARAM");
                assert_eq!(wording, "参数错误");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn a_successful_response_yields_the_data_field() {
        let data = json!({"status": "ok", "retcode": 0, "data": {"message_id": 42}});
        let parsed = parse_response("send_msg", data).unwrap();
        assert_eq!(parsed["message_id"], 42);
    }

    #[test]
    fn a_response_with_no_data_field_yields_an_empty_object() {
        let data = json!({"status": "ok", "retcode": 0});
        let parsed = parse_response("send_msg", data).unwrap();
        assert_eq!(parsed, json!({}));
    }

    #[test]
    fn target_params_splits_on_the_sign_of_context() {
        assert_eq!(target_params(114514), json!({"user_id": 114514}));
        assert_eq!(target_params(-1919810), json!({"group_id": 1919810}));
    }
}
