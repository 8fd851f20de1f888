use axum::{extract::State, response::Response};
use tracing::{debug, instrument};

use crate::{
    app_state::AppState,
    handlers::xml,
    xmlrpc::{
        MethodCall, Value,
        codec::{INVALID_PARAMS, METHOD_NOT_FOUND, PARSE_ERROR},
        fault_xml, response_xml,
    },
};

pub const METHODS: [&str; 3] = [
    "pingback.ping",
    "pingback.extensions.getPingbacks",
    "system.listMethods",
];

type Fault = (i32, String);

/// XML-RPC entry point. Protocol outcomes, including pingback error codes,
/// are regular responses; faults are kept for requests that cannot be served.
pub async fn handle(State(state): State<AppState>, body: String) -> Response {
    let call = match MethodCall::parse(&body) {
        Ok(call) => call,
        Err(e) => {
            debug!(error = %e, "unreadable xml-rpc request");
            return xml(fault_xml(PARSE_ERROR, &e.to_string()));
        }
    };

    match dispatch(&state, &call).await {
        Ok(value) => xml(response_xml(&value)),
        Err((code, message)) => xml(fault_xml(code, &message)),
    }
}

#[instrument(skip_all, fields(method = %call.method_name))]
async fn dispatch(state: &AppState, call: &MethodCall) -> Result<Value, Fault> {
    match call.method_name.as_str() {
        "pingback.ping" => {
            let [source, target] = string_params::<2>(&call.params)?;
            Ok(match state.pingbacks.ping(source, target).await {
                Ok(message) => Value::from(message),
                Err(e) => Value::Int(e.code()),
            })
        }
        "pingback.extensions.getPingbacks" => {
            let [target] = string_params::<1>(&call.params)?;
            Ok(match state.pingbacks.get_pingbacks(target).await {
                Ok(sources) => Value::Array(sources.into_iter().map(Value::from).collect()),
                Err(e) => Value::Int(e.code()),
            })
        }
        "system.listMethods" => Ok(Value::Array(
            METHODS.iter().copied().map(Value::from).collect(),
        )),
        other => Err((METHOD_NOT_FOUND, format!("method {other:?} is not supported"))),
    }
}

fn string_params<const N: usize>(params: &[Value]) -> Result<[&str; N], Fault> {
    if params.len() != N {
        return Err((
            INVALID_PARAMS,
            format!("expected {N} parameters, got {}", params.len()),
        ));
    }
    let mut strings = [""; N];
    for (slot, param) in strings.iter_mut().zip(params) {
        *slot = param
            .as_str()
            .ok_or_else(|| (INVALID_PARAMS, "parameters must be strings".to_string()))?;
    }
    Ok(strings)
}
