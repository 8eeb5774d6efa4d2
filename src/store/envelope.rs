//! Response envelope decoding.
//!
//! Every answer from the store is wrapped as `{"status": "success"|"error", "data": ...}`.
//! [`Envelope::decode`] turns a [`RawResponse`] into either the success payload or
//! a typed [`AppError`].

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::store::request::StoreRequest;
use crate::store::traits::RawResponse;

/// Envelope status flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Uniform `{status, data}` wrapper used by the store and by command responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub status: Status,
    #[serde(default)]
    pub data: JsonValue,
}

impl Envelope {
    /// Wraps a successful payload.
    pub fn success(data: JsonValue) -> Self {
        Self {
            status: Status::Success,
            data,
        }
    }

    /// Wraps an error payload.
    pub fn error(data: JsonValue) -> Self {
        Self {
            status: Status::Error,
            data,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Decodes a raw store response for the given request.
    ///
    /// - 2xx with a success envelope → `Ok(data)`
    /// - 404 → [`AppError::NotFound`] for the requested path
    /// - any other error envelope or non-2xx status → [`AppError::Remote`] carrying the payload
    /// - a body that is not an envelope → [`AppError::Remote`] carrying the raw body
    pub fn decode(request: &StoreRequest, response: RawResponse) -> Result<JsonValue, AppError> {
        let RawResponse { status, body } = response;

        let envelope = match serde_json::from_value::<Envelope>(body.clone()) {
            Ok(envelope) => envelope,
            Err(_) if status == 404 => return Err(not_found(request)),
            Err(_) => {
                return Err(AppError::Remote {
                    status,
                    payload: body,
                })
            }
        };

        if envelope.is_success() && (200..300).contains(&status) {
            return Ok(envelope.data);
        }

        if status == 404 {
            return Err(not_found(request));
        }

        Err(AppError::Remote {
            status,
            payload: envelope.data,
        })
    }
}

fn not_found(request: &StoreRequest) -> AppError {
    let mut segments = request.segments().iter();
    let table = segments.next().cloned().unwrap_or_default();
    let id = segments.cloned().collect::<Vec<_>>().join("/");
    AppError::NotFound { table, id }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::request::Method;
    use serde_json::json;

    fn get(path: &[&str]) -> StoreRequest {
        StoreRequest::new(Method::Get, path.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_success_envelope_yields_data() {
        let response = RawResponse::new(200, json!({"status": "success", "data": {"id": 1}}));
        let data = Envelope::decode(&get(&["zones", "1"]), response).unwrap();
        assert_eq!(data, json!({"id": 1}));
    }

    #[test]
    fn test_success_envelope_without_data_is_null() {
        let response = RawResponse::new(200, json!({"status": "success"}));
        let data = Envelope::decode(&get(&["zones", "1"]), response).unwrap();
        assert!(data.is_null());
    }

    #[test]
    fn test_error_envelope_carries_payload() {
        let response = RawResponse::new(200, json!({"status": "error", "data": "boom"}));
        let err = Envelope::decode(&get(&["zones"]), response).unwrap_err();
        match err {
            AppError::Remote { status, payload } => {
                assert_eq!(status, 200);
                assert_eq!(payload, json!("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_404_maps_to_not_found() {
        let response = RawResponse::new(404, json!({"status": "error", "data": "missing"}));
        let err = Envelope::decode(&get(&["renderers", "52"]), response).unwrap_err();
        match err {
            AppError::NotFound { table, id } => {
                assert_eq!(table, "renderers");
                assert_eq!(id, "52");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_envelope_body_is_remote_error() {
        let response = RawResponse::new(502, json!("Bad Gateway"));
        let err = Envelope::decode(&get(&["zones"]), response).unwrap_err();
        assert!(matches!(err, AppError::Remote { status: 502, .. }));
    }

    #[test]
    fn test_serializes_lowercase_status() {
        let value = serde_json::to_value(Envelope::success(json!(1))).unwrap();
        assert_eq!(value, json!({"status": "success", "data": 1}));
    }
}
