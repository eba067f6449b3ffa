//! Raw API records and their projection onto the fixed column set.

use crate::json_utils::record_id;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A post exactly as returned in a search response's `data` array.
pub type RawRecord = Value;

/// One collected post, projected onto
/// `{id, created_at, in_reply_to_user_id, referenced_tweets, text}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub in_reply_to_user_id: Option<String>,
    /// Usually a list of `{type, id}`; absent is `null`. Kept untyped so
    /// non-list values pass through the reference splitter unchanged.
    #[serde(default)]
    pub referenced_tweets: Value,
    #[serde(default)]
    pub text: String,
}

impl Record {
    /// Project a raw record. Returns `None` when there is no usable id.
    pub fn from_raw(raw: &RawRecord) -> Option<Self> {
        let obj = raw.as_object()?;
        let id = record_id(raw)?;
        let str_field = |k: &str| obj.get(k).and_then(|v| v.as_str()).map(|s| s.to_string());
        let in_reply_to_user_id = obj
            .get("in_reply_to_user_id")
            .and_then(crate::json_utils::id_string);
        Some(Self {
            id,
            created_at: str_field("created_at").unwrap_or_default(),
            in_reply_to_user_id,
            referenced_tweets: obj.get("referenced_tweets").cloned().unwrap_or(Value::Null),
            text: str_field("text").unwrap_or_default(),
        })
    }
}

/// Flatten raw records into the tabular shape, preserving arrival order.
/// Records without an id are dropped.
pub fn flatten(raw: &[RawRecord]) -> Vec<Record> {
    let out: Vec<Record> = raw.iter().filter_map(Record::from_raw).collect();
    let skipped = raw.len() - out.len();
    if skipped > 0 {
        tracing::debug!(skipped, "dropped raw records without a usable id");
    }
    out
}
