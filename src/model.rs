// Structured tracking data produced by the response parser
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// A numeric carrier code and, once enriched, its human-readable name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationCode {
    pub id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl OperationCode {
    pub fn new(id: Option<u32>, name: Option<String>) -> Self {
        Self { id, name }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub index: Option<String>,
    pub description: Option<String>,
}

impl Location {
    pub fn is_empty(&self) -> bool {
        self.index.is_none() && self.description.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingRecord {
    pub barcode: String,
    pub operation_type: OperationCode,
    pub operation_attr: OperationCode,
    pub operation_date: Option<String>,
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mass: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
}

// Opaque token the carrier hands out for a submitted batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchTicket(String);

impl BatchTicket {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOperation {
    pub oper_type: OperationCode,
    pub oper_ctg: OperationCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oper_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_oper: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_oper: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub barcode: String,
    pub operations: Vec<BatchOperation>,
}

// A header-level `<error>` that did not signal "not ready".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderError {
    pub error_id: String,
    pub error_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub success_items: Vec<BatchItem>,
    pub error_messages: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_error: Option<HeaderError>,
}

impl BatchResult {
    // A barcode that the carrier rejected never also appears as a success.
    pub fn record_error(&mut self, barcode: String, message: String) {
        self.success_items.retain(|item| item.barcode != barcode);
        self.error_messages.insert(barcode, message);
    }

    // Returns false when the barcode already carries an error.
    pub fn record_success(&mut self, item: BatchItem) -> bool {
        if self.error_messages.contains_key(&item.barcode) {
            return false;
        }
        self.success_items.push(item);
        true
    }

    pub fn barcode_count(&self) -> usize {
        self.success_items.len() + self.error_messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.barcode_count() == 0
    }
}
