use serde::{Deserialize, Serialize};

use courier_api::Header;

/// Одна строка `<partition>.jsonl`. Байтовые поля — base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskRecord {
    pub offset: u64,
    pub timestamp_ms: i64,
    #[serde(default, with = "courier_api::util::b64_opt", skip_serializing_if = "Option::is_none")]
    pub key: Option<Vec<u8>>,
    #[serde(with = "courier_api::util::b64")]
    pub value: Vec<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<Header>,
}
