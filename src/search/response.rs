//! Search responses and the status payload handed to a request surface.

use serde::Serialize;
use serde_json::Value;

use crate::aggregation::AggregationResult;
use crate::document::Document;
use crate::error::HalberdError;

/// Outcome of a successful search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResponse {
    /// Ranked, projected, and paged documents
    Documents(Vec<Document>),
    /// Aggregation tree of the first query's `aggs`
    Aggregation(AggregationResult),
}

impl SearchResponse {
    pub fn is_aggregation(&self) -> bool {
        matches!(self, SearchResponse::Aggregation(_))
    }

    /// Documents, when this is a document response.
    pub fn documents(&self) -> Option<&[Document]> {
        match self {
            SearchResponse::Documents(docs) => Some(docs),
            SearchResponse::Aggregation(_) => None,
        }
    }

    /// Aggregation tree, when this is an aggregation response.
    pub fn aggregation(&self) -> Option<&AggregationResult> {
        match self {
            SearchResponse::Aggregation(result) => Some(result),
            SearchResponse::Documents(_) => None,
        }
    }
}

/// Status, body, and error text of a handled request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultPayload {
    /// HTTP status code
    pub status_code: u16,
    /// Document list or aggregation tree; null on errors
    pub body_data: Value,
    /// Error text, empty on success
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error_message: String,
    /// Whether `body_data` holds an aggregation tree
    pub is_aggregation: bool,
}

impl SearchResultPayload {
    /// 200 with the response body.
    pub fn ok(response: SearchResponse) -> Self {
        let is_aggregation = response.is_aggregation();
        let body_data = match response {
            SearchResponse::Documents(docs) => {
                Value::Array(docs.into_iter().map(Value::Object).collect())
            }
            SearchResponse::Aggregation(result) => {
                serde_json::to_value(result).unwrap_or_default()
            }
        };
        SearchResultPayload {
            status_code: 200,
            body_data,
            error_message: String::new(),
            is_aggregation,
        }
    }

    /// The status and message of an error.
    pub fn from_error(error: &HalberdError) -> Self {
        SearchResultPayload {
            status_code: error.status_code(),
            body_data: Value::Null,
            error_message: error.to_string(),
            is_aggregation: false,
        }
    }

    /// 405 for search endpoints reached with a method other than POST.
    pub fn method_not_allowed() -> Self {
        SearchResultPayload {
            status_code: 405,
            body_data: Value::Null,
            error_message: "Method Not Allowed".to_string(),
            is_aggregation: false,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

impl From<HalberdError> for SearchResultPayload {
    fn from(error: HalberdError) -> Self {
        SearchResultPayload::from_error(&error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_payload() {
        let doc = json!({"id": 1, "_score": 0.0}).as_object().cloned().unwrap();
        let payload = SearchResultPayload::ok(SearchResponse::Documents(vec![doc]));
        assert!(payload.is_success());
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"statusCode": 200, "bodyData": [{"id": 1, "_score": 0.0}], "isAggregation": false})
        );
    }

    #[test]
    fn test_aggregation_payload() {
        let payload = SearchResultPayload::ok(SearchResponse::Aggregation(AggregationResult::default()));
        assert!(payload.is_aggregation);
        assert_eq!(payload.body_data["buckets"], json!([]));
    }

    #[test]
    fn test_error_payloads() {
        let payload = SearchResultPayload::from(HalberdError::MissingComposite);
        assert_eq!(payload.status_code, 500);
        assert!(payload.error_message.contains("Composite"));

        let payload = SearchResultPayload::from(HalberdError::query("bad"));
        assert_eq!(payload.status_code, 400);

        assert_eq!(SearchResultPayload::method_not_allowed().status_code, 405);
        assert!(!SearchResultPayload::method_not_allowed().is_success());
    }
}
