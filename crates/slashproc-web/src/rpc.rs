//! JSON-RPC 2.0 envelope around [`dispatch`].
//!
//! Transport-level problems (bad JSON, unknown method, bad params) become
//! JSON-RPC errors. Lookup failures are ordinary results carrying `{err, msg}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use utoipa::ToSchema;

use slashproc_core::api::{Method, Params, Reply, dispatch};
use slashproc_core::registry::Registry;

pub(crate) const PARSE_ERROR: i64 = -32700;
pub(crate) const INVALID_REQUEST: i64 = -32600;
pub(crate) const METHOD_NOT_FOUND: i64 = -32601;
pub(crate) const INVALID_PARAMS: i64 = -32602;

/// One JSON-RPC 2.0 call. A batch is an array of these.
#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct RpcCall {
    /// Must be "2.0" when present.
    #[serde(default)]
    jsonrpc: Option<String>,
    /// get_groups, get_vars, get_data, get_sources or validate.
    #[serde(default)]
    method: Option<String>,
    /// Named params object, or positional `[path]` / `[parser, get]`.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    params: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    #[allow(dead_code)]
    id: Option<Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct RpcError {
    pub(crate) code: i64,
    pub(crate) message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct RpcResponse {
    #[schema(value_type = String)]
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Reply>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
    #[schema(value_type = Object)]
    id: Value,
}

impl RpcResponse {
    fn result(id: Value, reply: Reply) -> Self {
        Self {
            jsonrpc: "2.0",
            result: Some(reply),
            error: None,
            id,
        }
    }

    fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
            id,
        }
    }
}

/// Answers a request body: one call or a batch.
///
/// Blocks on source reads; run it off the async workers.
pub(crate) fn handle_body(registry: &Registry, body: &[u8]) -> Value {
    let request: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => return to_value(RpcResponse::error(Value::Null, PARSE_ERROR, format!("Parse error: {e}"))),
    };

    match request {
        Value::Array(calls) if calls.is_empty() => {
            to_value(RpcResponse::error(Value::Null, INVALID_REQUEST, "Invalid Request: empty batch"))
        }
        Value::Array(calls) => Value::Array(
            calls
                .into_iter()
                .map(|call| to_value(handle_call(registry, call)))
                .collect(),
        ),
        call => to_value(handle_call(registry, call)),
    }
}

fn handle_call(registry: &Registry, call: Value) -> RpcResponse {
    let id = call.get("id").cloned().unwrap_or(Value::Null);
    if !call.is_object() {
        return RpcResponse::error(id, INVALID_REQUEST, "Invalid Request: not an object");
    }
    let call: RpcCall = match serde_json::from_value(call) {
        Ok(call) => call,
        Err(e) => return RpcResponse::error(id, INVALID_REQUEST, format!("Invalid Request: {e}")),
    };

    if call.jsonrpc.as_deref().is_some_and(|v| v != "2.0") {
        return RpcResponse::error(id, INVALID_REQUEST, "Invalid Request: jsonrpc must be \"2.0\"");
    }
    let Some(name) = call.method else {
        return RpcResponse::error(id, INVALID_REQUEST, "Invalid Request: missing method");
    };
    let Some(method) = Method::from_name(&name) else {
        return RpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {name}"));
    };

    let params = match parse_params(call.params) {
        Ok(params) => params,
        Err(message) => return RpcResponse::error(id, INVALID_PARAMS, message),
    };

    debug!(%method, ?id, "rpc call");
    RpcResponse::result(id, dispatch(registry, method, &params))
}

/// Accepts named params, nothing, or positional `[path]` / `[parser, get]`.
fn parse_params(params: Option<Value>) -> Result<Params, String> {
    let named = match params {
        None | Some(Value::Null) => return Ok(Params::default()),
        Some(Value::Object(map)) => map,
        Some(Value::Array(items)) => positional(items)?,
        Some(other) => return Err(format!("Invalid params: expected object, got {other}")),
    };
    serde_json::from_value(Value::Object(named)).map_err(|e| format!("Invalid params: {e}"))
}

fn positional(items: Vec<Value>) -> Result<Map<String, Value>, String> {
    let keys: &[&str] = match items.len() {
        0 => &[],
        1 => &["path"],
        2 => &["parser", "get"],
        n => return Err(format!("Invalid params: expected at most 2 positional params, got {n}")),
    };
    Ok(keys.iter().map(|k| k.to_string()).zip(items).collect())
}

fn to_value(response: RpcResponse) -> Value {
    // Every field is a plain string, number or map.
    serde_json::to_value(response).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use slashproc_core::source::StaticSource;

    fn registry() -> Registry {
        let registry = Registry::new();
        let uptime = StaticSource::from_json(
            json!({"uptime": {"label": "Uptime", "parents": ["root"]}}),
            json!({
                "total": {"label": "Total Uptime", "unit": "Seconds", "parents": ["uptime"]},
                "idle": {"label": "Idle Uptime", "unit": "Seconds", "parents": ["uptime"]}
            }),
            json!({"uptime": {"total": "12345.6", "idle": "11000.2"}}),
        )
        .unwrap();
        registry.register("uptime", uptime).unwrap();
        registry
    }

    fn call(body: Value) -> Value {
        handle_body(&registry(), body.to_string().as_bytes())
    }

    #[test]
    fn test_get_data_named_params() {
        let response = call(json!({
            "jsonrpc": "2.0", "id": 1, "method": "get_data",
            "params": {"parser": "uptime", "get": ["total"]}
        }));
        assert_eq!(
            response,
            json!({"jsonrpc": "2.0", "id": 1, "result": {"found": {"total": "12345.6"}}})
        );
    }

    #[test]
    fn test_get_data_path_and_positional() {
        let by_path = call(json!({
            "jsonrpc": "2.0", "id": "a", "method": "get_data", "params": {"path": "/proc/uptime/bogus"}
        }));
        assert_eq!(by_path["result"], json!({"notfound": ["bogus"]}));

        let positional = call(json!({
            "jsonrpc": "2.0", "id": 2, "method": "get_vars", "params": ["uptime", "idle"]
        }));
        assert_eq!(positional["result"]["found"]["idle"]["unit"], json!("Seconds"));
    }

    #[test]
    fn test_unknown_source_is_a_result() {
        let response = call(json!({
            "jsonrpc": "2.0", "id": 3, "method": "get_groups", "params": {"parser": "nope"}
        }));
        assert!(response.get("error").is_none());
        assert_eq!(response["result"], json!({"err": 1, "msg": "Parser not Found"}));
    }

    #[test]
    fn test_protocol_errors() {
        let registry = registry();
        let parse = handle_body(&registry, b"{not json");
        assert_eq!(parse["error"]["code"], json!(PARSE_ERROR));
        assert_eq!(parse["id"], Value::Null);

        let invalid = call(json!({"jsonrpc": "2.0", "id": 4}));
        assert_eq!(invalid["error"]["code"], json!(INVALID_REQUEST));
        assert_eq!(invalid["id"], json!(4));

        let unknown = call(json!({"jsonrpc": "2.0", "id": 5, "method": "drop_tables"}));
        assert_eq!(unknown["error"]["code"], json!(METHOD_NOT_FOUND));

        let bad_params = call(json!({"jsonrpc": "2.0", "id": 6, "method": "get_data", "params": 7}));
        assert_eq!(bad_params["error"]["code"], json!(INVALID_PARAMS));

        let unknown_field = call(json!({
            "jsonrpc": "2.0", "id": 7, "method": "get_data", "params": {"pth": "uptime"}
        }));
        assert_eq!(unknown_field["error"]["code"], json!(INVALID_PARAMS));

        let empty = call(json!([]));
        assert_eq!(empty["error"]["code"], json!(INVALID_REQUEST));
    }

    #[test]
    fn test_batch() {
        let response = call(json!([
            {"jsonrpc": "2.0", "id": 1, "method": "get_sources"},
            {"jsonrpc": "2.0", "id": 2, "method": "nope"},
            3
        ]));
        let items = response.as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["result"]["sources"]["uptime"]["label"], json!("Uptime"));
        assert_eq!(items[1]["error"]["code"], json!(METHOD_NOT_FOUND));
        assert_eq!(items[2]["error"]["code"], json!(INVALID_REQUEST));
    }
}
