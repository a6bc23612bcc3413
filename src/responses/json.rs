// responses/json.rs
use crate::errors::{ResultResp, ServerError};
use astra::{Body, ResponseBuilder};
use serde::Serialize;

/// Serialize `value` as the JSON response body.
pub fn json_response<T: Serialize>(status: u16, value: &T) -> ResultResp {
    let body = serde_json::to_vec(value).map_err(|_| ServerError::InternalError)?;

    ResponseBuilder::new()
        .status(status)
        .header("Content-Type", mime::APPLICATION_JSON.as_ref())
        .body(Body::from(body))
        .map_err(|_| ServerError::InternalError)
}

/// Status-only response, e.g. 204 after a delete.
pub fn empty_response(status: u16) -> ResultResp {
    ResponseBuilder::new()
        .status(status)
        .body(Body::empty())
        .map_err(|_| ServerError::InternalError)
}
