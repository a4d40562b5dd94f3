//! Dispatch pipeline tests
//!
//! Drives `JsonRpcSite::dispatch_request` with raw bodies the way the HTTP
//! adapter does and checks the resulting envelopes, status codes and headers.

use std::time::Duration;

use jsonrpc_dispatch::prelude::*;
use jsonrpc_dispatch::response::ResponseBody;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
struct ValueError(String);

impl Exception for ValueError {
    const KIND: &'static str = "ValueError";
}

#[derive(Debug, Error)]
#[error("{0}")]
struct InsufficientFunds(String);

impl Exception for InsufficientFunds {
    const KIND: &'static str = "InsufficientFunds";

    fn ancestors() -> &'static [&'static str] {
        &["ValueError"]
    }
}

fn greeting() -> ProcedureBuilder {
    ProcedureBuilder::new("greeting")
        .param_with_default("name", ParamType::String, json!("JSON-RPC"))
        .returns(ParamType::String)
        .handler_fn(|args| {
            let name: String = args.get("name")?;
            Ok(json!(format!("Hello {name}")))
        })
}

fn sum() -> ProcedureBuilder {
    ProcedureBuilder::new("sum")
        .param("a", ParamType::Number)
        .param("b", ParamType::Number)
        .returns(ParamType::Number)
        .handler_fn(|args| {
            let a: f64 = args.get("a")?;
            let b: f64 = args.get("b")?;
            Ok(json!(a + b))
        })
}

fn add() -> ProcedureBuilder {
    ProcedureBuilder::new("add")
        .param("a", ParamType::Integer)
        .param("b", ParamType::Integer)
        .returns(ParamType::Integer)
        .handler_fn(|args| {
            let a: i64 = args.get("a")?;
            let b: i64 = args.get("b")?;
            Ok(json!(a + b))
        })
}

fn fails() -> ProcedureBuilder {
    ProcedureBuilder::new("fails")
        .param("n", ParamType::Integer)
        .returns(ParamType::Integer)
        .handler_fn(|args| {
            let n: i64 = args.get("n")?;
            if n % 2 != 0 {
                return Err(ValueError("number is odd".to_string()).into());
            }
            Ok(json!(n))
        })
}

fn withdraw() -> ProcedureBuilder {
    ProcedureBuilder::new("withdraw")
        .param("amount", ParamType::Integer)
        .returns(ParamType::Integer)
        .handler_fn(|args| {
            let amount: i64 = args.get("amount")?;
            Err::<Value, _>(InsufficientFunds(format!("cannot withdraw {amount}")).into())
        })
}

fn slow() -> ProcedureBuilder {
    ProcedureBuilder::new("slow")
        .param("ms", ParamType::Integer)
        .returns(ParamType::Integer)
        .handler(|args: BoundArgs| async move {
            let ms: u64 = args.get("ms")?;
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok::<_, ProcedureError>(json!(ms))
        })
}

fn site_with(config: SiteConfig) -> JsonRpcSite {
    let site = JsonRpcSite::new(config);
    for builder in [greeting(), sum(), fails(), withdraw(), slow()] {
        site.register(builder).unwrap();
    }
    site
}

fn site() -> JsonRpcSite {
    site_with(SiteConfig::default())
}

async fn post(site: &JsonRpcSite, body: Value) -> DispatchResponse {
    site.dispatch_request(body.to_string().as_bytes(), "application/json")
        .await
}

fn data_message(response: &Value) -> &str {
    response["error"]["data"]["message"]
        .as_str()
        .unwrap_or_default()
}

#[tokio::test]
async fn test_positional_call() {
    let site = site();
    site.register(add()).unwrap();
    let response = post(
        &site,
        json!({"id": 1, "jsonrpc": "2.0", "method": "add", "params": [1, 3]}),
    )
    .await;

    assert_eq!(response.status_code, 200);
    assert_eq!(
        response.json().unwrap(),
        json!({"id": 1, "jsonrpc": "2.0", "result": 4})
    );
    let text = serde_json::to_string(&response.json().unwrap()).unwrap();
    assert_eq!(text, r#"{"id":1,"jsonrpc":"2.0","result":4}"#);
}

#[tokio::test]
async fn test_float_sum_keeps_number_result() {
    let site = site();
    let response = post(
        &site,
        json!({"id": 1, "jsonrpc": "2.0", "method": "sum", "params": [1, 3]}),
    )
    .await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.json().unwrap()["result"].as_f64(), Some(4.0));
}

#[tokio::test]
async fn test_positional_and_named_calls_agree() {
    let site = site();
    let positional = post(
        &site,
        json!({"id": 7, "jsonrpc": "2.0", "method": "sum", "params": [2.5, 4]}),
    )
    .await;
    let named = post(
        &site,
        json!({"id": 7, "jsonrpc": "2.0", "method": "sum", "params": {"b": 4, "a": 2.5}}),
    )
    .await;

    assert_eq!(positional.json(), named.json());
    assert_eq!(positional.status_code, named.status_code);
}

#[tokio::test]
async fn test_default_parameter_is_used() {
    let site = site();
    let response = post(&site, json!({"id": "a", "jsonrpc": "2.0", "method": "greeting"})).await;
    assert_eq!(
        response.json().unwrap(),
        json!({"id": "a", "jsonrpc": "2.0", "result": "Hello JSON-RPC"})
    );
}

#[tokio::test]
async fn test_jsonrpc_member_is_echoed() {
    let site = site();
    let response = post(&site, json!({"id": 1, "method": "greeting", "params": ["A"]})).await;
    let body = response.json().unwrap();
    assert_eq!(body["jsonrpc"], json!("2.0"));

    let response = post(
        &site,
        json!({"id": 1, "jsonrpc": "1.0", "method": "greeting", "params": ["A"]}),
    )
    .await;
    assert_eq!(response.json().unwrap()["jsonrpc"], json!("1.0"));
}

#[tokio::test]
async fn test_unknown_method() {
    let site = site();
    let response = post(
        &site,
        json!({"id": 1, "jsonrpc": "2.0", "method": "not.a.method"}),
    )
    .await;

    assert_eq!(response.status_code, 400);
    let body = response.json().unwrap();
    assert_eq!(body["id"], json!(1));
    assert_eq!(body["error"]["code"], json!(-32601));
    assert_eq!(body["error"]["name"], json!("MethodNotFoundError"));
    assert_eq!(data_message(&body), "Method not found: not.a.method");
}

#[tokio::test]
async fn test_unhandled_fault_becomes_server_error() {
    let site = site();
    let response = post(
        &site,
        json!({"id": 5, "jsonrpc": "2.0", "method": "fails", "params": {"n": 1}}),
    )
    .await;

    assert_eq!(response.status_code, 500);
    assert_eq!(
        response.json().unwrap(),
        json!({
            "id": 5,
            "jsonrpc": "2.0",
            "error": {
                "name": "ServerError",
                "code": -32000,
                "message": "Server error",
                "data": {"message": "number is odd"},
            }
        })
    );
}

#[tokio::test]
async fn test_malformed_json() {
    let site = site();
    let response = site
        .dispatch_request(b"{\"id\": 1, \"method\": ", "application/json")
        .await;

    assert_eq!(response.status_code, 400);
    let body = response.json().unwrap();
    assert_eq!(body["id"], Value::Null);
    assert_eq!(body["jsonrpc"], json!("2.0"));
    assert_eq!(body["error"]["code"], json!(-32700));
    assert_eq!(body["error"]["name"], json!("ParseError"));
    assert!(data_message(&body).starts_with("Invalid JSON: "));
}

#[tokio::test]
async fn test_invalid_mime_type() {
    let site = site();
    let response = site.dispatch_request(b"{}", "text/plain; charset=utf-8").await;

    assert_eq!(response.status_code, 400);
    let body = response.json().unwrap();
    assert_eq!(body["error"]["code"], json!(-32700));
    assert_eq!(
        data_message(&body),
        "Invalid mime type for JSON: text/plain, use header Content-Type: application/json"
    );
}

#[tokio::test]
async fn test_vendor_json_mime_type_is_accepted() {
    let site = site();
    let body = json!({"id": 1, "method": "greeting", "params": ["A"]}).to_string();
    let response = site
        .dispatch_request(body.as_bytes(), "application/vnd.api+json")
        .await;
    assert_eq!(response.status_code, 200);
}

#[tokio::test]
async fn test_invalid_envelope() {
    let site = site();
    let response = post(&site, json!({"id": 3, "jsonrpc": "2.0"})).await;

    assert_eq!(response.status_code, 400);
    let body = response.json().unwrap();
    assert_eq!(body["id"], json!(3));
    assert_eq!(body["error"]["code"], json!(-32600));
    assert_eq!(data_message(&body), r#"Invalid JSON: {"id":3,"jsonrpc":"2.0"}"#);

    let response = post(&site, json!(42)).await;
    let body = response.json().unwrap();
    assert_eq!(body["id"], Value::Null);
    assert_eq!(data_message(&body), "Invalid JSON: 42");
}

#[tokio::test]
async fn test_invalid_params_shape() {
    let site = site();
    let response = post(&site, json!({"id": 1, "method": "sum", "params": 3})).await;

    assert_eq!(response.status_code, 400);
    let body = response.json().unwrap();
    assert_eq!(body["error"]["code"], json!(-32602));
    assert_eq!(
        data_message(&body),
        "Parameter structures are by-position (list) or by-name (dict): 3"
    );
}

#[tokio::test]
async fn test_type_mismatch_is_invalid_params() {
    let site = site();
    let response = post(&site, json!({"id": 1, "method": "fails", "params": ["one"]})).await;

    assert_eq!(response.status_code, 400);
    let body = response.json().unwrap();
    assert_eq!(body["error"]["name"], json!("InvalidParamsError"));
    assert_eq!(
        data_message(&body),
        r#"type of argument "n" must be integer; got string instead"#
    );
}

#[tokio::test]
async fn test_decimal_exponent_overflow_is_invalid_params() {
    let site = site();
    site.register(
        ProcedureBuilder::new("price")
            .typed_param::<Decimal>("amount")
            .returns(ParamType::String)
            .handler_fn(|args| {
                let amount: Decimal = args.get("amount")?;
                Ok(json!(amount.to_string()))
            }),
    )
    .unwrap();

    for literal in ["1e9223372036854775807", "1.5e-9223372036854775808"] {
        let response = post(&site, json!({"id": 1, "method": "price", "params": [literal]})).await;
        assert_eq!(response.status_code, 400);
        let body = response.json().unwrap();
        assert_eq!(body["error"]["code"], json!(-32602), "{literal}");
        assert_eq!(body["id"], json!(1));
    }

    let response = post(&site, json!({"id": 2, "method": "price", "params": ["1.5e-9"]})).await;
    assert_eq!(response.json().unwrap()["result"], json!("1.5E-9"));
}

#[tokio::test]
async fn test_deeply_nested_body_is_parse_error() {
    let site = site();
    let body = format!("{}{}", "[".repeat(1000), "]".repeat(1000));
    let response = site
        .dispatch_request(body.as_bytes(), "application/json")
        .await;

    assert_eq!(response.status_code, 400);
    let body = response.json().unwrap();
    assert_eq!(body["error"]["code"], json!(-32700));
    assert_eq!(body["id"], Value::Null);
}

mod notifications {
    use super::*;

    #[tokio::test]
    async fn test_notification_has_no_body() {
        let site = site();
        let response = post(&site, json!({"jsonrpc": "2.0", "method": "greeting"})).await;
        assert_eq!(response.status_code, 204);
        assert_eq!(response.body, ResponseBody::Empty);
        assert!(response.json().is_none());
    }

    #[tokio::test]
    async fn test_failing_notification_has_no_body() {
        let site = site();
        let response = post(&site, json!({"method": "fails", "params": [1]})).await;
        assert_eq!(response.status_code, 204);
        assert!(response.body.is_empty());

        let response = post(&site, json!({"method": "fails", "params": ["bad"]})).await;
        assert_eq!(response.status_code, 204);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_null_id_is_answered() {
        let site = site();
        let response = post(&site, json!({"id": null, "method": "greeting", "params": ["B"]})).await;
        assert_eq!(response.status_code, 200);
        assert_eq!(
            response.json().unwrap(),
            json!({"id": null, "jsonrpc": "2.0", "result": "Hello B"})
        );
    }

    #[tokio::test]
    async fn test_notification_not_allowed() {
        let site = site();
        site.register(
            ProcedureBuilder::new("strict")
                .notification(false)
                .handler_fn(|_| Ok(())),
        )
        .unwrap();

        let response = post(&site, json!({"jsonrpc": "2.0", "method": "strict"})).await;
        assert_eq!(response.status_code, 400);
        let body = response.json().unwrap();
        assert_eq!(body["id"], Value::Null);
        assert_eq!(body["error"]["code"], json!(-32600));
        assert_eq!(
            data_message(&body),
            "The method 'strict' doesn't allow Notification Request object (without an 'id' member)"
        );
    }

    #[tokio::test]
    async fn test_unknown_method_notification_is_answered() {
        let site = site();
        let response = post(&site, json!({"method": "missing"})).await;
        assert_eq!(response.status_code, 400);
        assert_eq!(response.json().unwrap()["error"]["code"], json!(-32601));
    }

    #[tokio::test]
    async fn test_notification_keeps_reply_headers() {
        let site = site();
        site.register(ProcedureBuilder::new("traced").returns(ParamType::String).handler_fn(|_| {
            Ok(Reply::with_headers(
                json!("ok"),
                Headers::new().with("X-Trace", "abc"),
            ))
        }))
        .unwrap();

        let response = post(&site, json!({"method": "traced"})).await;
        assert_eq!(response.status_code, 204);
        assert_eq!(response.headers.get("x-trace"), Some("abc"));
    }
}

mod batches {
    use super::*;

    #[tokio::test]
    async fn test_empty_batch() {
        let site = site();
        let response = post(&site, json!([])).await;

        assert_eq!(response.status_code, 400);
        let body = response.json().unwrap();
        assert_eq!(body["id"], Value::Null);
        assert_eq!(body["error"]["name"], json!("InvalidRequestError"));
        assert_eq!(data_message(&body), "Empty array");
    }

    #[tokio::test]
    async fn test_mixed_batch() {
        let site = site();
        let response = post(
            &site,
            json!([
                {"id": 1, "method": "greeting", "params": ["A"]},
                {"id": 2, "method": "missing"},
            ]),
        )
        .await;

        assert_eq!(response.status_code, 200);
        let body = response.json().unwrap();
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["result"], json!("Hello A"));
        assert_eq!(items[1]["id"], json!(2));
        assert_eq!(items[1]["error"]["name"], json!("MethodNotFoundError"));
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let site = site();
        let response = post(
            &site,
            json!([
                {"id": 1, "method": "greeting", "params": ["A"]},
                {"id": 2, "method": "fails", "params": [3]},
                {"method": "greeting", "params": ["quiet"]},
                {"id": 3, "method": "sum", "params": [1, 2]},
            ]),
        )
        .await;

        assert_eq!(response.status_code, 200);
        let body = response.json().unwrap();
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 3);
        let ids: Vec<_> = items.iter().map(|item| item["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);
        let errors = items.iter().filter(|item| item.get("error").is_some()).count();
        assert_eq!(errors, 1);
        assert_eq!(items[1]["error"]["code"], json!(-32000));
    }

    #[tokio::test]
    async fn test_batch_of_notifications() {
        let site = site();
        let response = post(
            &site,
            json!([
                {"method": "greeting"},
                {"method": "sum", "params": [1, 2]},
            ]),
        )
        .await;

        assert_eq!(response.status_code, 204);
        assert!(response.json().is_none());
    }

    #[tokio::test]
    async fn test_batch_with_invalid_element() {
        let site = site();
        let response = post(&site, json!([1, {"id": 1, "method": "greeting"}])).await;

        let body = response.json().unwrap();
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["error"]["code"], json!(-32600));
        assert_eq!(items[1]["result"], json!("Hello JSON-RPC"));
    }

    #[tokio::test]
    async fn test_batch_merges_headers() {
        let site = site();
        site.register(
            ProcedureBuilder::new("tagged")
                .param("tag", ParamType::String)
                .returns(ParamType::String)
                .handler_fn(|args| {
                    let tag: String = args.get("tag")?;
                    Ok(Reply::with_headers(
                        json!(tag.clone()),
                        Headers::new().with("X-Tag", tag),
                    ))
                }),
        )
        .unwrap();

        let response = post(
            &site,
            json!([
                {"id": 1, "method": "tagged", "params": ["a"]},
                {"method": "tagged", "params": ["b"]},
            ]),
        )
        .await;

        assert_eq!(response.status_code, 200);
        let tags: Vec<_> = response.headers.get_all("X-Tag").collect();
        assert_eq!(tags, vec!["a", "b"]);
        assert_eq!(response.json().unwrap().as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_batch_keeps_input_order() {
        let site = site_with(SiteConfig::default().concurrent_batches(true));
        let response = post(
            &site,
            json!([
                {"id": "a", "method": "slow", "params": [40]},
                {"id": "b", "method": "slow", "params": [1]},
                {"id": "c", "method": "slow", "params": [15]},
            ]),
        )
        .await;

        let body = response.json().unwrap();
        let results: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|item| (item["id"].clone(), item["result"].clone()))
            .collect();
        assert_eq!(
            results,
            vec![
                (json!("a"), json!(40)),
                (json!("b"), json!(1)),
                (json!("c"), json!(15)),
            ]
        );
    }
}

mod error_handlers {
    use super::*;

    #[tokio::test]
    async fn test_handler_reply_becomes_error_data() {
        let site = site();
        site.register_error_handler::<ValueError, _>(|fault| {
            Reply::Value(json!({"message": fault.message(), "code": "0001"}))
        });

        let response = post(&site, json!({"id": 1, "method": "fails", "params": [1]})).await;
        assert_eq!(response.status_code, 500);
        let body = response.json().unwrap();
        assert_eq!(body["error"]["name"], json!("ServerError"));
        assert_eq!(
            body["error"]["data"],
            json!({"message": "number is odd", "code": "0001"})
        );
    }

    #[tokio::test]
    async fn test_panicking_handler_falls_back_to_server_error() {
        let site = site();
        site.register_error_handler_kind("Exception", |_| panic!("handler failed"));

        let response = post(&site, json!({"id": 1, "method": "fails", "params": [1]})).await;
        assert_eq!(response.status_code, 500);
        let body = response.json().unwrap();
        assert_eq!(body["error"]["name"], json!("ServerError"));
        assert_eq!(data_message(&body), "number is odd");
    }

    #[tokio::test]
    async fn test_panicking_handler_keeps_batch_siblings() {
        let site = site();
        site.register_error_handler_kind("Exception", |_| panic!("handler failed"));

        let response = post(
            &site,
            json!([
                {"id": 1, "method": "fails", "params": [1]},
                {"id": 2, "method": "greeting"}
            ]),
        )
        .await;

        assert_eq!(response.status_code, 200);
        let body = response.json().unwrap();
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["error"]["code"], json!(-32000));
        assert_eq!(items[0]["error"]["data"]["message"], json!("number is odd"));
        assert_eq!(items[1]["result"], json!("Hello JSON-RPC"));
    }

    #[tokio::test]
    async fn test_handler_status_and_headers_are_kept() {
        let site = site();
        site.register_error_handler::<ValueError, _>(|fault| {
            Reply::full(
                json!({"reason": fault.message()}),
                409,
                Headers::new().with("X-Error", fault.kind()),
            )
        });

        let response = post(&site, json!({"id": 1, "method": "fails", "params": [1]})).await;
        assert_eq!(response.status_code, 409);
        assert_eq!(response.headers.get("X-Error"), Some("ValueError"));
        assert_eq!(
            response.json().unwrap()["error"]["data"],
            json!({"reason": "number is odd"})
        );
    }

    #[tokio::test]
    async fn test_ancestor_handler_catches_subtype() {
        let site = site();
        site.register_error_handler::<ValueError, _>(|fault| {
            Reply::with_status(json!({"kind": fault.kind()}), 402)
        });

        let response = post(&site, json!({"id": 1, "method": "withdraw", "params": [10]})).await;
        assert_eq!(response.status_code, 402);
        assert_eq!(
            response.json().unwrap()["error"]["data"],
            json!({"kind": "InsufficientFunds"})
        );
    }

    #[tokio::test]
    async fn test_server_error_fallback_handler() {
        let site = site();
        site.register_error_handler_kind("ServerError", |fault| {
            Reply::Value(json!({"fallback": fault.message()}))
        });

        let response = post(&site, json!({"id": 1, "method": "fails", "params": [1]})).await;
        assert_eq!(response.status_code, 500);
        assert_eq!(
            response.json().unwrap()["error"]["data"],
            json!({"fallback": "number is odd"})
        );
    }

    #[tokio::test]
    async fn test_protocol_errors_skip_handlers() {
        let site = site();
        site.register_error_handler_kind("Exception", |_| Reply::Value(json!("handled")));

        let response = post(&site, json!({"id": 1, "method": "fails", "params": ["x"]})).await;
        assert_eq!(response.status_code, 400);
        assert_eq!(response.json().unwrap()["error"]["code"], json!(-32602));
    }

    #[tokio::test]
    async fn test_custom_rpc_error_is_serialized_directly() {
        let site = site();
        site.register(ProcedureBuilder::new("locked").handler_fn(|_| {
            Err::<(), _>(
                RpcError::custom("AccountLocked", -32010, "Account locked")
                    .with_data(json!({"account": 7}))
                    .with_status_code(423)
                    .into(),
            )
        }))
        .unwrap();

        let response = post(&site, json!({"id": 1, "method": "locked"})).await;
        assert_eq!(response.status_code, 423);
        assert_eq!(
            response.json().unwrap()["error"],
            json!({
                "name": "AccountLocked",
                "code": -32010,
                "message": "Account locked",
                "data": {"account": 7},
            })
        );
    }
}

mod replies {
    use super::*;

    #[tokio::test]
    async fn test_status_tuple() {
        let site = site();
        site.register(
            ProcedureBuilder::new("create")
                .returns(ParamType::String)
                .handler_fn(|_| Ok((json!("created"), 201u16))),
        )
        .unwrap();

        let response = post(&site, json!({"id": 1, "method": "create"})).await;
        assert_eq!(response.status_code, 201);
        assert_eq!(response.json().unwrap()["result"], json!("created"));
    }

    #[tokio::test]
    async fn test_invalid_tuple_is_server_error() {
        let site = site();
        site.register(
            ProcedureBuilder::new("broken")
                .returns(ParamType::String)
                .handler_fn(|_| Ok(Reply::Tuple(Vec::new()))),
        )
        .unwrap();

        let response = post(&site, json!({"id": 1, "method": "broken"})).await;
        assert_eq!(response.status_code, 500);
        let body = response.json().unwrap();
        assert_eq!(body["error"]["code"], json!(-32000));
        assert!(data_message(&body).starts_with("the view function did not return a valid response tuple"));
    }

    #[tokio::test]
    async fn test_undeclared_return_value_is_rejected() {
        let site = site();
        site.register(ProcedureBuilder::new("chatty").handler_fn(|_| Ok(json!("surprise"))))
            .unwrap();
        site.register(
            ProcedureBuilder::new("lenient")
                .validate(false)
                .handler_fn(|_| Ok(json!("surprise"))),
        )
        .unwrap();
        site.register(ProcedureBuilder::new("quiet").handler_fn(|_| Ok(())))
            .unwrap();

        let response = post(&site, json!({"id": 1, "method": "chatty"})).await;
        assert_eq!(response.status_code, 400);
        let body = response.json().unwrap();
        assert_eq!(body["error"]["code"], json!(-32602));
        assert_eq!(
            data_message(&body),
            "return type of string must be a type; got null instead"
        );

        let response = post(&site, json!({"id": 1, "method": "lenient"})).await;
        assert_eq!(response.json().unwrap()["result"], json!("surprise"));

        let response = post(&site, json!({"id": 1, "method": "quiet"})).await;
        assert_eq!(response.json().unwrap()["result"], Value::Null);
    }
}

mod faults {
    use super::*;

    #[tokio::test]
    async fn test_procedure_timeout() {
        let site = site_with(SiteConfig::default().procedure_timeout(Duration::from_millis(20)));
        let response = post(&site, json!({"id": 1, "method": "slow", "params": [5000]})).await;

        assert_eq!(response.status_code, 500);
        assert_eq!(
            data_message(&response.json().unwrap()),
            "procedure 'slow' timed out after 20ms"
        );
    }

    #[tokio::test]
    async fn test_timeout_can_be_handled() {
        let site = site_with(SiteConfig::default().procedure_timeout(Duration::from_millis(20)));
        site.register_error_handler::<jsonrpc_dispatch::TimeoutError, _>(|_| {
            Reply::with_status(json!({"retry": true}), 503)
        });

        let response = post(&site, json!({"id": 1, "method": "slow", "params": [5000]})).await;
        assert_eq!(response.status_code, 503);
    }

    #[tokio::test]
    async fn test_panicking_procedure() {
        let site = site();
        site.register(
            ProcedureBuilder::new("explode")
                .handler_fn(|_| -> Result<Value, ProcedureError> { panic!("kaboom") }),
        )
        .unwrap();

        let response = post(&site, json!({"id": 1, "method": "explode"})).await;
        assert_eq!(response.status_code, 500);
        assert_eq!(data_message(&response.json().unwrap()), "kaboom");

        let response = post(&site, json!({"id": 2, "method": "greeting"})).await;
        assert_eq!(response.status_code, 200);
    }

    #[tokio::test]
    async fn test_debug_adds_stack_and_executable() {
        let site = site_with(SiteConfig::default().debug(true));
        let response = post(&site, json!({"id": 1, "method": "fails", "params": [1]})).await;
        let error = &response.json().unwrap()["error"];
        assert!(error["stack"].is_string());
        assert!(error["executable"].is_string());

        let site = super::site();
        let response = post(&site, json!({"id": 1, "method": "fails", "params": [1]})).await;
        assert!(response.json().unwrap()["error"].get("stack").is_none());
    }
}

mod describe {
    use super::*;

    #[tokio::test]
    async fn test_describe_method() {
        let site = site();
        let response = post(&site, json!({"id": 1, "jsonrpc": "2.0", "method": "rpc.describe"})).await;

        assert_eq!(response.status_code, 200);
        let result = response.json().unwrap()["result"].clone();
        assert_eq!(result["id"], json!(format!("urn:uuid:{}", site.uuid())));
        assert_eq!(result["name"], json!("jsonrpc-dispatch"));
        assert_eq!(result["servers"], json!([{"url": "/api"}]));

        let methods: Vec<_> = result["methods"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(methods, vec!["greeting", "sum", "fails", "withdraw", "slow"]);
        assert_eq!(
            result["methods"]["sum"]["params"],
            json!([{"name": "a", "type": "Number"}, {"name": "b", "type": "Number"}])
        );
        assert_eq!(result["methods"]["sum"]["returns"], json!({"name": "default", "type": "Number"}));
    }

    #[tokio::test]
    async fn test_describe_id_is_stable() {
        let site = site();
        let first = site.describe();
        let second = site.describe();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_describe_rejects_notifications() {
        let site = site();
        let response = post(&site, json!({"method": "rpc.describe"})).await;
        assert_eq!(response.status_code, 400);
    }

    #[tokio::test]
    async fn test_describe_uses_base_url() {
        let site = site_with(
            SiteConfig::default()
                .base_url("https://rpc.example.com")
                .path("/v1/rpc"),
        );
        assert_eq!(site.describe().servers[0].url, "https://rpc.example.com/v1/rpc");
    }
}
