use crate::errors::ServerError;
use astra::{Body, Response, ResponseBuilder};
use serde_json::json;

/// Convert a ServerError into a JSON error response.
/// Validation failures carry the full list of offending fields.
pub fn error_to_response(err: ServerError) -> Response {
    let body = json!({
        "error": err.to_string(),
        "fields": err.fields(),
    });

    ResponseBuilder::new()
        .status(err.status())
        .header("Content-Type", mime::APPLICATION_JSON.as_ref())
        .body(Body::from(body.to_string()))
        .unwrap_or_else(|_| Response::new(Body::from("Internal Server Error")))
}
