use crate::anonymise::AnonymisedRecord;
use crate::json_utils::cell_from_value;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferenceKind {
    Quoted,
    RepliedTo,
}

impl ReferenceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReferenceKind::Quoted => "quoted",
            ReferenceKind::RepliedTo => "replied_to",
        }
    }
}

/// Id of the first `{type, id}` entry whose type matches `kind`.
///
/// - non-list values are returned unchanged (this covers `null`)
/// - a list with no matching entry yields `null`
pub fn split_reference(entry: &Value, kind: ReferenceKind) -> Value {
    let Some(list) = entry.as_array() else {
        return entry.clone();
    };
    list.iter()
        .find(|r| r.get("type").and_then(|t| t.as_str()) == Some(kind.as_str()))
        .and_then(|r| r.get("id").cloned())
        .unwrap_or(Value::Null)
}

/// Final persisted shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TidyRecord {
    pub id: String,
    pub created_at: String,
    pub in_reply_to_target: bool,
    pub replied_to_tweet: Option<String>,
    pub quoted_tweet: Option<String>,
    pub text: String,
}

impl TidyRecord {
    pub fn from_anonymised(r: &AnonymisedRecord) -> Self {
        let quoted = split_reference(&r.referenced_tweets, ReferenceKind::Quoted);
        let replied = split_reference(&r.referenced_tweets, ReferenceKind::RepliedTo);
        Self {
            id: r.id.clone(),
            created_at: r.created_at.clone(),
            in_reply_to_target: r.in_reply_to_target,
            replied_to_tweet: cell_from_value(&replied),
            quoted_tweet: cell_from_value(&quoted),
            text: r.text.clone(),
        }
    }
}

pub fn tidy(dataset: &[AnonymisedRecord]) -> Vec<TidyRecord> {
    dataset.iter().map(TidyRecord::from_anonymised).collect()
}
