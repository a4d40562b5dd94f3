//! Simple Calculator JSON-RPC Example
//!
//! Registers a few calculator procedures on a site and feeds raw request
//! bodies straight into the dispatcher, without any transport.

use jsonrpc_dispatch::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("division by zero")]
struct ZeroDivisionError;

impl Exception for ZeroDivisionError {
    const KIND: &'static str = "ZeroDivisionError";
}

fn calculator() -> Result<JsonRpcSite, String> {
    let site = JsonRpcSite::new(SiteConfig::new().name("calculator").version("1.0.0"));

    site.register(
        ProcedureBuilder::new("add")
            .summary("Add two numbers")
            .param("a", ParamType::Number)
            .param("b", ParamType::Number)
            .returns(ParamType::Number)
            .handler_fn(|args| {
                let a: f64 = args.get("a")?;
                let b: f64 = args.get("b")?;
                Ok(json!(a + b))
            }),
    )?;

    site.register(
        ProcedureBuilder::new("divide")
            .summary("Divide a by b")
            .param("a", ParamType::Number)
            .param("b", ParamType::Number.with(Metadata::Description("non-zero divisor".into())))
            .returns(ParamType::Number)
            .handler_fn(|args| {
                let a: f64 = args.get("a")?;
                let b: f64 = args.get("b")?;
                if b == 0.0 {
                    return Err(ZeroDivisionError.into());
                }
                Ok(json!(a / b))
            }),
    )?;

    site.register_error_handler::<ZeroDivisionError, _>(|fault| {
        Reply::with_status(json!({"reason": fault.message()}), 422)
    });

    Ok(site)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let site = calculator()?;

    let bodies = [
        r#"{"jsonrpc": "2.0", "id": 1, "method": "add", "params": [2, 3]}"#,
        r#"{"jsonrpc": "2.0", "id": 2, "method": "divide", "params": {"a": 1, "b": 0}}"#,
        r#"[{"jsonrpc": "2.0", "id": 3, "method": "add", "params": [1, 1]}, {"jsonrpc": "2.0", "method": "add", "params": [0, 0]}]"#,
        r#"{"jsonrpc": "2.0", "id": 4, "method": "rpc.describe"}"#,
    ];

    for body in bodies {
        let response = site.dispatch_request(body.as_bytes(), "application/json").await;
        println!("--> {body}");
        match response.json() {
            Some(json) => println!("<-- {} {}", response.status_code, serde_json::to_string_pretty(&json)?),
            None => println!("<-- {} (no content)", response.status_code),
        }
    }

    Ok(())
}
