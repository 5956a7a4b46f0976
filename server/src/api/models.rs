//! Request and response bodies for the HTTP API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::errors::ApiError;

/// Longest accepted query identifier, in characters.
pub const MAX_QUERY_ID_LEN: usize = 100;

/// Body of `POST /api/query/`, after validation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueryRequest {
    pub query_id: String,
    pub query_text: String,
}

impl QueryRequest {
    /// Validate a raw JSON body.
    ///
    /// Both fields must be present, be strings, and be non-blank once
    /// trimmed; the returned request holds the trimmed values.
    pub fn from_json(body: &Value) -> Result<Self, ApiError> {
        let query_id = required_string(body, "query_id")?;
        if query_id.chars().count() > MAX_QUERY_ID_LEN {
            return Err(ApiError::InvalidInput(format!(
                "query_id: must be at most {MAX_QUERY_ID_LEN} characters"
            )));
        }
        let query_text = required_string(body, "query_text")?;

        Ok(Self {
            query_id,
            query_text,
        })
    }
}

fn required_string(body: &Value, field: &str) -> Result<String, ApiError> {
    match body.get(field) {
        None | Some(Value::Null) => Err(ApiError::InvalidInput(format!(
            "{field}: this field is required"
        ))),
        Some(Value::String(s)) if s.trim().is_empty() => Err(ApiError::InvalidInput(format!(
            "{field}: this field may not be blank"
        ))),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(_) => Err(ApiError::InvalidInput(format!(
            "{field}: must be a string"
        ))),
    }
}

/// Body returned by `POST /api/query/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Ranked document ids, best first.
    pub top_docs: Vec<String>,

    /// Precision at 5, rounded to 3 decimals.
    pub p5: f64,
}

/// Body returned by `POST /api/status/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub num_of_indexed_items: usize,
    pub num_of_queries_in_qrels: usize,
}

/// Body returned by `GET /api/health/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_fields_are_trimmed() {
        let request =
            QueryRequest::from_json(&json!({"query_id": " PLAIN-1 ", "query_text": "  heart "}))
                .unwrap();
        assert_eq!(
            request,
            QueryRequest {
                query_id: "PLAIN-1".to_string(),
                query_text: "heart".to_string(),
            }
        );
    }

    #[test]
    fn test_rejects_invalid_bodies() {
        let cases = [
            json!({"query_text": "heart"}),
            json!({"query_id": "PLAIN-1"}),
            json!({"query_id": "PLAIN-1", "query_text": "   "}),
            json!({"query_id": 7, "query_text": "heart"}),
            json!({"query_id": "PLAIN-1", "query_text": null}),
            json!({"query_id": "x".repeat(101), "query_text": "heart"}),
            json!(["not", "an", "object"]),
        ];

        for body in cases {
            assert!(
                matches!(QueryRequest::from_json(&body), Err(ApiError::InvalidInput(_))),
                "accepted {body}"
            );
        }
    }

    #[test]
    fn test_query_id_at_limit() {
        let id = "x".repeat(MAX_QUERY_ID_LEN);
        let request = QueryRequest::from_json(&json!({"query_id": id, "query_text": "t"})).unwrap();
        assert_eq!(request.query_id.len(), MAX_QUERY_ID_LEN);
    }
}
