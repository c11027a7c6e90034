//! Dispatch
//!
//! The single choke point through which all remote execution flows. Every
//! entry point validates the session, looks the operation up in the scoped
//! catalog, resolves the target fresh, and invokes the catalog body with the
//! caller's parameters wrapped as structured CDP call arguments.
//!
//! The dispatcher holds no state of its own. Each call is an independent
//! request/response exchange; ordering between concurrent dispatches against
//! the same target is whatever the transport provides.

use async_trait::async_trait;
use serde_json::Value;

use crate::catalog::{self, OperationDef};
use crate::cdp::types::{
    CallArgument, DOMResolveNode, DOMResolveNodeResult, RuntimeCallFunctionOn,
    RuntimeCallFunctionOnResult, RuntimeEvaluate, RuntimeEvaluateResult,
};
use crate::error::{Error, Result};

/// Object group for the transient remote references created during dispatch
const OBJECT_GROUP: &str = "proctor";

/// Minimal capability a dispatch session must provide.
///
/// Any transport that can send a named CDP command with JSON params and
/// return the JSON result satisfies this; test doubles implement it to
/// observe exactly what reaches the wire.
#[async_trait]
pub trait RemoteCall: Send + Sync {
    /// Send a command and await its result
    async fn call(&self, method: &str, params: Value) -> Result<Value>;

    /// Whether the underlying connection can still carry commands
    fn is_open(&self) -> bool;
}

/// Execute a catalogued element operation against a DOM node.
///
/// `params` are wrapped one-to-one as CDP call arguments; they never enter
/// the operation's source text. The result is materialized by value.
pub async fn dispatch_on_element<S: RemoteCall + ?Sized>(
    session: &S,
    node_id: i32,
    operation: &str,
    params: &[Value],
) -> Result<Value> {
    validate_session(session)?;
    if node_id == 0 {
        return Err(Error::InvalidTarget(node_id));
    }
    let op = catalog::element_op(operation)?;
    check_arity(op, params)?;

    let object_id = resolve_target(session, node_id).await?;
    tracing::debug!(operation = op.name, node_id, "dispatching element operation");
    invoke(session, op, &object_id, params, Some(node_id)).await
}

/// Execute a catalogued page operation against the page's global object.
///
/// Same contract as [`dispatch_on_element`], looked up in the page catalog.
/// The implicit target is obtained per call; there is no caller-supplied
/// handle to resolve.
pub async fn dispatch_on_page<S: RemoteCall + ?Sized>(
    session: &S,
    operation: &str,
    params: &[Value],
) -> Result<Value> {
    validate_session(session)?;
    let op = catalog::page_op(operation)?;
    check_arity(op, params)?;

    let object_id = page_object(session, op, params).await?;
    tracing::debug!(operation = op.name, "dispatching page operation");
    invoke(session, op, &object_id, params, None).await
}

/// Fail unless the session can still carry commands. Mandatory before any
/// remote call on every entry point.
fn validate_session<S: RemoteCall + ?Sized>(session: &S) -> Result<()> {
    if session.is_open() {
        Ok(())
    } else {
        Err(Error::InvalidSession("connection is closed".to_string()))
    }
}

fn check_arity(op: &OperationDef, params: &[Value]) -> Result<()> {
    if params.len() != op.arity {
        return Err(Error::InvalidArguments {
            operation: op.name.to_string(),
            expected: op.arity,
            got: params.len(),
        });
    }
    Ok(())
}

/// Resolve a node handle to a transient remote object id.
///
/// Resolution is fresh on every dispatch. The remote DOM can mutate between
/// calls, so a cached reference could dispatch against a detached node.
async fn resolve_target<S: RemoteCall + ?Sized>(session: &S, node_id: i32) -> Result<String> {
    let params = serde_json::to_value(DOMResolveNode {
        node_id: Some(node_id),
        object_group: Some(OBJECT_GROUP.to_string()),
    })?;

    let raw = session
        .call("DOM.resolveNode", params)
        .await
        .map_err(|err| Error::resolution(node_id, err.to_string()))?;

    let result: DOMResolveNodeResult = serde_json::from_value(raw)?;
    result
        .object
        .object_id
        .ok_or_else(|| Error::resolution(node_id, "node did not resolve to a remote object"))
}

/// Obtain a transient reference to the page's global object.
async fn page_object<S: RemoteCall + ?Sized>(
    session: &S,
    op: &OperationDef,
    params: &[Value],
) -> Result<String> {
    // Fixed expression; no caller data reaches evaluate.
    let eval = serde_json::to_value(RuntimeEvaluate {
        expression: "window".to_string(),
        object_group: Some(OBJECT_GROUP.to_string()),
        return_by_value: Some(false),
        await_promise: None,
    })?;

    let raw = session
        .call("Runtime.evaluate", eval)
        .await
        .map_err(|err| operation_failed(op, None, params, err.to_string()))?;

    let result: RuntimeEvaluateResult = serde_json::from_value(raw)?;
    result.result.object_id.ok_or_else(|| {
        operation_failed(op, None, params, "page global did not resolve to a remote object")
    })
}

async fn invoke<S: RemoteCall + ?Sized>(
    session: &S,
    op: &'static OperationDef,
    object_id: &str,
    params: &[Value],
    target: Option<i32>,
) -> Result<Value> {
    let arguments = params
        .iter()
        .map(|value| CallArgument {
            value: Some(value.clone()),
            object_id: None,
        })
        .collect();

    let call = serde_json::to_value(RuntimeCallFunctionOn {
        function_declaration: op.body.to_string(),
        object_id: Some(object_id.to_string()),
        arguments: Some(arguments),
        silent: None,
        return_by_value: Some(true),
        await_promise: Some(true),
    })?;

    let raw = session
        .call("Runtime.callFunctionOn", call)
        .await
        .map_err(|err| operation_failed(op, target, params, err.to_string()))?;

    let result: RuntimeCallFunctionOnResult = serde_json::from_value(raw)?;
    if let Some(exception) = result.exception_details {
        return Err(operation_failed(op, target, params, exception.describe()));
    }

    Ok(result.result.value.unwrap_or(Value::Null))
}

fn operation_failed(
    op: &OperationDef,
    target: Option<i32>,
    params: &[Value],
    message: impl Into<String>,
) -> Error {
    Error::OperationFailed {
        operation: op.name.to_string(),
        target,
        arguments: params.to_vec(),
        message: message.into(),
    }
}
