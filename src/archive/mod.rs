//! Archival client for the external record store.
//!
//! Talks to the store through the credential proxy: tokens come from the
//! proxy's exchange endpoint (empty body; the proxy holds the credentials)
//! and every call carries them as a bearer header.

mod api;
pub mod history;
pub mod token;

pub use history::HistoryFeed;
pub use token::{Credentials, TokenCache};

use crate::error::{FetchError, SyncError};
use crate::reconcile::DraftPair;
use api::{CreateRecordRequest, RecordFields, RecordPage, StoreEnvelope};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Records fetched per page, newest first
const PAGE_SIZE: u32 = 20;

/// Path of the credential-exchange endpoint, relative to a platform or
/// proxy base URL.
pub const AUTH_PATH: &str = "open-apis/auth/v3/tenant_access_token/internal";

/// One archived question/answer pair. Created at archival time, never
/// mutated afterwards; retention is the store's concern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub original: String,
    pub refined: String,
    pub style: String,
    pub date: DateTime<Utc>,
}

impl SyncRecord {
    /// Tie a reconciled pair to the persona active when it was produced.
    pub fn from_pair(pair: DraftPair, style: &str, date: DateTime<Utc>) -> Self {
        SyncRecord {
            original: pair.original,
            refined: pair.refined,
            style: style.to_string(),
            date,
        }
    }
}

/// One page of archived records.
#[derive(Clone, Debug)]
pub struct PageResult {
    pub items: Vec<SyncRecord>,
    pub has_more: bool,
    /// Opaque continuation token; meaningful only while `has_more` holds.
    pub next_page_token: Option<String>,
}

pub struct ArchiveClient {
    http: reqwest::Client,
    base_url: String,
    base_id: String,
    table_id: String,
    token: TokenCache,
}

impl ArchiveClient {
    pub fn new(settings: &config::ArchiveSettings) -> Self {
        let base_url = settings.base_url.trim_end_matches('/').to_string();
        let token = TokenCache::delegated(format!("{}/{}", base_url, AUTH_PATH));

        ArchiveClient {
            http: reqwest::Client::new(),
            base_url,
            base_id: settings.base_id.clone(),
            table_id: settings.table_id.clone(),
            token,
        }
    }

    fn records_url(&self) -> String {
        format!(
            "{}/open-apis/bitable/v1/apps/{}/tables/{}/records",
            self.base_url, self.base_id, self.table_id
        )
    }

    /// Archive one record. The store's envelope code is checked even on
    /// HTTP success.
    #[instrument(level = "debug", skip(self, record), fields(style = %record.style))]
    pub async fn sync_record(&self, record: &SyncRecord) -> Result<(), SyncError> {
        let token = self
            .token
            .get_token()
            .await
            .map_err(|e| SyncError::Request(e.to_string()))?;

        let request = CreateRecordRequest {
            fields: RecordFields::from(record),
        };

        let response = self
            .http
            .post(self.records_url())
            .bearer_auth(&token)
            .json(&request)
            .send()
            .await
            .map_err(|e| SyncError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Request(format!("status {}: {}", status, body)));
        }

        let envelope: StoreEnvelope<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| SyncError::Request(e.to_string()))?;

        if envelope.code != 0 {
            return Err(SyncError::Rejected {
                code: envelope.code,
                msg: envelope.msg,
            });
        }

        debug!("record archived");
        Ok(())
    }

    /// Archive a batch strictly sequentially, each write awaited before the
    /// next begins. A failure leaves a deterministic prefix archived and
    /// reports how long it was.
    pub async fn sync_all(&self, records: &[SyncRecord]) -> Result<usize, SyncError> {
        for (synced, record) in records.iter().enumerate() {
            if let Err(source) = self.sync_record(record).await {
                return Err(SyncError::Partial {
                    synced,
                    total: records.len(),
                    source: Box::new(source),
                });
            }
        }
        Ok(records.len())
    }

    /// Fetch one page of archived records, newest first.
    ///
    /// Stateless between calls: pass the previous page's token to continue,
    /// none to start over. The token is threaded through verbatim.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_page(&self, page_token: Option<&str>) -> Result<PageResult, FetchError> {
        let token = self
            .token
            .get_token()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let sort = serde_json::json!([{ "field_name": api::DATE_FIELD, "desc": true }]);
        let mut request = self
            .http
            .get(self.records_url())
            .bearer_auth(&token)
            .query(&[
                ("page_size", PAGE_SIZE.to_string()),
                ("sort", sort.to_string()),
            ]);
        if let Some(token) = page_token {
            request = request.query(&[("page_token", token)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Request(format!("status {}: {}", status, body)));
        }

        let envelope: StoreEnvelope<RecordPage> = response
            .json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;

        if envelope.code != 0 {
            return Err(FetchError::Rejected {
                code: envelope.code,
                msg: envelope.msg,
            });
        }

        let page = envelope
            .data
            .ok_or_else(|| FetchError::Malformed("reply carried no data".to_string()))?;

        Ok(PageResult {
            items: page.items.into_iter().map(|i| i.fields.into()).collect(),
            has_more: page.has_more,
            next_page_token: page.page_token.filter(|t| !t.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_from_pair_keeps_texts_and_stamps_the_style() {
        let pair = DraftPair {
            original: "my draft".into(),
            refined: "tighter draft".into(),
        };
        let now = Utc::now();
        let record = SyncRecord::from_pair(pair, "The Skeptic", now);

        assert_eq!(record.original, "my draft");
        assert_eq!(record.refined, "tighter draft");
        assert_eq!(record.style, "The Skeptic");
        assert_eq!(record.date, now);
    }

    #[test]
    fn page_reply_maps_into_domain_records() {
        let envelope: StoreEnvelope<RecordPage> = serde_json::from_value(serde_json::json!({
            "code": 0,
            "msg": "success",
            "data": {
                "items": [
                    { "fields": { "Original": "q1", "Refined": "a1", "Style": "s", "Date": 1700000000000_i64 } },
                    { "fields": { "Original": "q2", "Refined": "a2", "Style": "s", "Date": 1600000000000_i64 } }
                ],
                "has_more": true,
                "page_token": "tok-abc"
            }
        }))
        .unwrap();

        let page = envelope.data.unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.has_more);
        assert_eq!(page.page_token.as_deref(), Some("tok-abc"));

        let record: SyncRecord = page.items[0].fields.clone().into();
        assert_eq!(record.original, "q1");
        assert_eq!(record.date.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn empty_page_reply_defaults_to_no_items_no_more() {
        let page: RecordPage = serde_json::from_str("{}").unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_more);
        assert!(page.page_token.is_none());
    }
}
