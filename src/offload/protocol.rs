//! Wire messages between the coordinator and the worker.
//!
//! Requests are validated into [`Validated`] before anything reads them. The
//! worker never trusts a field's shape from the JSON alone.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::CatalogItem;
use crate::engine::{FilterOptions, SortDirection, SortKey};
use crate::error::ProtocolError;

/// Largest catalog a single request may carry.
pub const MAX_CATALOG_LEN: usize = 100_000;

/// Largest comparator input a single request may carry.
pub const MAX_COMPARATOR_LEN: usize = 10_000;

/// Outgoing request, borrowing from the coordinator's state.
///
/// `catalog` and `comparator_input` are omitted when the worker's cached copy
/// is still current.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<&'a [CatalogItem]>,
    pub filter_options: &'a FilterOptions,
    pub sort_key: &'a str,
    pub sort_direction: SortDirection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparator_input: Option<&'a [u32]>,
    pub request_id: u64,
}

impl WorkerRequest<'_> {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRequest {
    pub catalog: Option<Vec<CatalogItem>>,
    pub filter_options: FilterOptions,
    pub sort_key: SortKey,
    pub sort_direction: SortDirection,
    pub comparator_input: Option<Vec<u32>>,
    pub request_id: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Validated {
    Valid(Box<ValidRequest>),
    /// `request_id` is present when it could be read, so the sender can still
    /// be told about the rejection.
    Rejected {
        request_id: Option<u64>,
        error: ProtocolError,
    },
}

/// Reply to a request. `error` is set on rejected or failed requests, which
/// always carry an empty `result_ids`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerResponse {
    pub result_ids: Vec<u32>,
    pub request_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerResponse {
    pub fn ok(request_id: u64, result_ids: Vec<u32>) -> Self {
        Self {
            result_ids,
            request_id,
            error: None,
        }
    }

    pub fn failed(request_id: u64, error: impl Into<String>) -> Self {
        Self {
            result_ids: Vec::new(),
            request_id,
            error: Some(error.into()),
        }
    }

    pub fn parse(raw: &str) -> Option<WorkerResponse> {
        serde_json::from_str(raw).ok()
    }
}

fn array_field<'v>(
    obj: &'v Map<String, Value>,
    field: &'static str,
    limit: usize,
) -> Result<Option<&'v Value>, ProtocolError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value @ Value::Array(items)) => {
            if items.len() > limit {
                return Err(ProtocolError::Oversized {
                    field,
                    len: items.len(),
                    limit,
                });
            }
            Ok(Some(value))
        }
        Some(_) => Err(ProtocolError::InvalidField(field)),
    }
}

fn validate_fields(obj: &Map<String, Value>, request_id: u64) -> Result<ValidRequest, ProtocolError> {
    let sort_direction = obj
        .get("sortDirection")
        .and_then(Value::as_str)
        .and_then(SortDirection::parse)
        .ok_or(ProtocolError::InvalidDirection)?;

    let sort_key = match obj.get("sortKey") {
        Some(Value::String(key)) => SortKey::from(key.as_str()),
        _ => return Err(ProtocolError::InvalidField("sortKey")),
    };

    let filter_options = match obj.get("filterOptions") {
        None | Some(Value::Null) => FilterOptions::default(),
        Some(value @ Value::Object(_)) => serde_json::from_value(value.clone())
            .map_err(|_| ProtocolError::InvalidField("filterOptions"))?,
        Some(_) => return Err(ProtocolError::InvalidField("filterOptions")),
    };

    // Sizes are checked before the arrays are deserialized.
    let catalog = array_field(obj, "catalog", MAX_CATALOG_LEN)?
        .map(|v| serde_json::from_value(v.clone()).map_err(|_| ProtocolError::InvalidField("catalog")))
        .transpose()?;
    let comparator_input = array_field(obj, "comparatorInput", MAX_COMPARATOR_LEN)?
        .map(|v| {
            serde_json::from_value(v.clone()).map_err(|_| ProtocolError::InvalidField("comparatorInput"))
        })
        .transpose()?;

    Ok(ValidRequest {
        catalog,
        filter_options,
        sort_key,
        sort_direction,
        comparator_input,
        request_id,
    })
}

/// Validate a raw request message.
pub fn validate(raw: &str) -> Validated {
    let obj = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(obj)) => obj,
        _ => {
            return Validated::Rejected {
                request_id: None,
                error: ProtocolError::NotAnObject,
            };
        }
    };
    let Some(request_id) = obj.get("requestId").and_then(Value::as_u64) else {
        return Validated::Rejected {
            request_id: None,
            error: ProtocolError::InvalidRequestId,
        };
    };
    match validate_fields(&obj, request_id) {
        Ok(request) => Validated::Valid(Box::new(request)),
        Err(error) => Validated::Rejected {
            request_id: Some(request_id),
            error,
        },
    }
}
