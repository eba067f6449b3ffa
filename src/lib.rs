mod config;
mod date;
mod query;
mod error;
mod secrets;
mod api;

mod record;
mod anonymise;
mod references;
mod paginate;
mod reconcile;

mod json_utils;
mod dedupe;
mod tsv;
mod progress;
mod util;
mod pipeline;

pub use crate::config::{EtlOptions, Floor, LookupCfg, RateLimitCfg};
pub use crate::config::{DEFAULT_LOOKUP_URL, DEFAULT_SAVE_LOCATION, DEFAULT_SEARCH_URL, DEFAULT_TARGET_USER_ID};
pub use crate::date::{format_api_timestamp, parse_api_timestamp, SearchWindow};
pub use crate::query::{SearchQuery, DEFAULT_QUERY};
pub use crate::error::{EtlError, Result as EtlResult};
pub use crate::pipeline::{CollectSummary, SyncSummary, TweetETL};

// Transport seam and credential sources.
pub use crate::api::{HttpTransport, Params, RetryPolicy, Transport, DEFAULT_USER_AGENT};
pub use crate::secrets::{token_from_toml, EnvToken, FirstOf, SecretsFile, StaticToken, TokenSource, DEFAULT_SECRETS_PATH, TOKEN_ENV_VAR};

// Pipeline stages, usable on their own.
pub use crate::record::{flatten, RawRecord, Record};
pub use crate::anonymise::{extract_mentions, in_reply_to_target, AnonymisedRecord, Anonymiser, DEFAULT_ALLOWED_HANDLE, DEFAULT_PLACEHOLDER};
pub use crate::references::{split_reference, tidy, ReferenceKind, TidyRecord};
pub use crate::paginate::{Paginator, Prompt, RateLimitDecision, RateLimitPolicy, Stop, WaitOut};
pub use crate::reconcile::{filter_out_missing, format_ids, identify_missing, ReconcileOutcome, Reconciler};

// Persistence.
pub use crate::tsv::{escape_field, read_dataset, read_dataset_counting, replace_dataset, unescape_field, write_dataset, TsvReader, TsvWriter, WriteMode, WriteStats, HEADER};
pub use crate::dedupe::dedupe_by_id;
pub use crate::json_utils::{cell_from_value, id_string, next_token, record_id};

pub use crate::util::init_tracing_once;
