//! ChatStore backed by the external SQL query service.
//!
//! Every request is `POST {base}/query` with a bearer token and a JSON body
//! `{"sql": ..., "params": [...]}`. Statements answer with
//! `{"changes": n, "lastInsertRowid": id}`, queries with an array of rows.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::domain::{
    ChatDispatchEnvelope, ChatScope, ChatStore, ChatStoreError, DisplayName, Identity,
    MessageBody, MessageId, RoomId, Timestamp, ValueObjectError,
};

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS relay_messages (
    id TEXT PRIMARY KEY,
    scope TEXT NOT NULL,
    target TEXT,
    sender_id TEXT NOT NULL,
    sender_name TEXT NOT NULL,
    message TEXT NOT NULL,
    created_at INTEGER NOT NULL
)";

const INSERT_SQL: &str = "INSERT OR IGNORE INTO relay_messages \
    (id, scope, target, sender_id, sender_name, message, created_at) \
    VALUES (?, ?, ?, ?, ?, ?, ?)";

const RECENT_SQL: &str = "SELECT id, sender_id, sender_name, scope, target, message, created_at \
    FROM relay_messages \
    WHERE scope = 'global' OR sender_id = ? OR (scope = 'direct' AND target = ?) \
    ORDER BY created_at DESC LIMIT ?";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings of the query service.
#[derive(Debug, Clone)]
pub struct HttpChatStoreConfig {
    pub base_url: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    sql: &'a str,
    params: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// One row of `relay_messages` as returned by the query service.
#[derive(Debug, Clone, Deserialize)]
struct MessageRow {
    id: String,
    sender_id: String,
    sender_name: String,
    scope: String,
    target: Option<String>,
    message: String,
    created_at: i64,
}

impl TryFrom<MessageRow> for ChatDispatchEnvelope {
    type Error = ChatStoreError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let invalid = |e: ValueObjectError| ChatStoreError::InvalidResponse(e.to_string());
        let scope = match (row.scope.as_str(), row.target) {
            ("global", _) => ChatScope::Global,
            ("direct", Some(to)) => ChatScope::Direct {
                to: Identity::new(to).map_err(invalid)?,
            },
            ("room", Some(room_id)) => ChatScope::Room {
                room_id: RoomId::new(room_id).map_err(invalid)?,
            },
            (other, _) => {
                return Err(ChatStoreError::InvalidResponse(format!(
                    "unknown scope '{}'",
                    other
                )));
            }
        };
        Ok(ChatDispatchEnvelope::new(
            Identity::new(row.sender_id).map_err(invalid)?,
            DisplayName::new(row.sender_name).map_err(invalid)?,
            scope,
            MessageBody::new(row.message).map_err(invalid)?,
            Timestamp::new(row.created_at),
        )
        .with_id(MessageId::new(row.id).map_err(invalid)?))
    }
}

/// HTTP ChatStore client.
#[derive(Debug, Clone)]
pub struct HttpChatStore {
    http: reqwest::Client,
    query_url: String,
}

impl HttpChatStore {
    pub fn new(config: &HttpChatStoreConfig) -> Result<Self, ChatStoreError> {
        let mut headers = HeaderMap::new();
        let token = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| ChatStoreError::Unreachable("invalid store token".to_string()))?;
        headers.insert(AUTHORIZATION, token);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ChatStoreError::Unreachable(e.to_string()))?;

        let base_url = config.base_url.trim_end_matches('/');
        Ok(Self {
            http,
            query_url: format!("{}/query", base_url),
        })
    }

    /// Create the message table if the store does not have it yet.
    pub async fn ensure_schema(&self) -> Result<(), ChatStoreError> {
        self.query(CREATE_TABLE_SQL, Vec::new()).await.map(|_| ())
    }

    async fn query(&self, sql: &str, params: Vec<Value>) -> Result<Value, ChatStoreError> {
        let response = self
            .http
            .post(&self.query_url)
            .json(&QueryRequest { sql, params })
            .send()
            .await
            .map_err(|e| ChatStoreError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());
            return Err(ChatStoreError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ChatStoreError::InvalidResponse(e.to_string()))
    }
}

fn insert_params(envelope: &ChatDispatchEnvelope) -> Vec<Value> {
    vec![
        json!(envelope.id.as_str()),
        json!(envelope.scope.kind()),
        json!(envelope.scope.target()),
        json!(envelope.sender.as_str()),
        json!(envelope.sender_display_name.as_str()),
        json!(envelope.body.as_str()),
        json!(envelope.sent_at.value()),
    ]
}

/// Convert query rows (newest first) into envelopes, oldest first.
fn rows_to_history(rows: Value) -> Result<Vec<ChatDispatchEnvelope>, ChatStoreError> {
    let rows: Vec<MessageRow> =
        serde_json::from_value(rows).map_err(|e| ChatStoreError::InvalidResponse(e.to_string()))?;
    let mut history: Vec<ChatDispatchEnvelope> = rows
        .into_iter()
        .filter_map(|row| match ChatDispatchEnvelope::try_from(row) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                tracing::warn!("Skipping stored message: {}", e);
                None
            }
        })
        .collect();
    history.reverse();
    Ok(history)
}

#[async_trait]
impl ChatStore for HttpChatStore {
    async fn store_message(&self, envelope: &ChatDispatchEnvelope) -> Result<(), ChatStoreError> {
        self.query(INSERT_SQL, insert_params(envelope)).await?;
        tracing::debug!(
            "Stored {} message from '{}'",
            envelope.scope.kind(),
            envelope.sender
        );
        Ok(())
    }

    async fn recent_messages(
        &self,
        identity: &Identity,
        limit: usize,
    ) -> Result<Vec<ChatDispatchEnvelope>, ChatStoreError> {
        let params = vec![json!(identity.as_str()), json!(identity.as_str()), json!(limit)];
        let rows = self.query(RECENT_SQL, params).await?;
        rows_to_history(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(scope: ChatScope) -> ChatDispatchEnvelope {
        ChatDispatchEnvelope::new(
            Identity::new("alice".to_string()).unwrap(),
            DisplayName::new("Alice".to_string()).unwrap(),
            scope,
            MessageBody::new("hi".to_string()).unwrap(),
            Timestamp::new(1234),
        )
    }

    #[test]
    fn test_insert_params_follow_column_order() {
        // テスト項目: INSERT のパラメータがカラム順に並ぶ
        // given (前提条件):
        let envelope = envelope(ChatScope::Direct {
            to: Identity::new("bob".to_string()).unwrap(),
        });

        // when (操作):
        let params = insert_params(&envelope);

        // then (期待する結果):
        assert_eq!(params.len(), 7);
        assert_eq!(params[0], json!(envelope.id.as_str()));
        assert_eq!(params[1], json!("direct"));
        assert_eq!(params[2], json!("bob"));
        assert_eq!(params[3], json!("alice"));
        assert_eq!(params[4], json!("Alice"));
        assert_eq!(params[5], json!("hi"));
        assert_eq!(params[6], json!(1234));
    }

    #[test]
    fn test_resent_envelope_reuses_its_id() {
        // テスト項目: 同じエンベロープの再送では同じ ID が使われ、INSERT は重複を無視する
        // given (前提条件):
        let envelope = envelope(ChatScope::Global);

        // when (操作):
        let first = insert_params(&envelope);
        let retry = insert_params(&envelope);

        // then (期待する結果):
        assert_eq!(first[0], retry[0]);
        assert!(INSERT_SQL.starts_with("INSERT OR IGNORE"));
    }

    #[test]
    fn test_global_message_has_null_target() {
        // テスト項目: 全体チャットの宛先は null で保存される
        // given (前提条件):
        let envelope = envelope(ChatScope::Global);

        // when (操作):
        let params = insert_params(&envelope);

        // then (期待する結果):
        assert_eq!(params[2], Value::Null);
    }

    #[test]
    fn test_rows_are_returned_oldest_first_and_invalid_rows_skipped() {
        // テスト項目: 取得した行は古い順に並び替えられ、不正な行は除外される
        // given (前提条件):
        let rows = json!([
            {"id": "msg_2", "sender_id": "bob", "sender_name": "Bob", "scope": "global", "target": null, "message": "second", "created_at": 20},
            {"id": "msg_x", "sender_id": "bob", "sender_name": "Bob", "scope": "weird", "target": null, "message": "broken", "created_at": 15},
            {"id": "msg_1", "sender_id": "alice", "sender_name": "Alice", "scope": "direct", "target": "bob", "message": "first", "created_at": 10}
        ]);

        // when (操作):
        let history = rows_to_history(rows).unwrap();

        // then (期待する結果):
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].body.as_str(), "first");
        assert_eq!(history[0].id.as_str(), "msg_1");
        assert_eq!(
            history[0].scope,
            ChatScope::Direct {
                to: Identity::new("bob".to_string()).unwrap()
            }
        );
        assert_eq!(history[1].body.as_str(), "second");
    }

    #[test]
    fn test_non_array_response_is_invalid() {
        // テスト項目: 配列以外のレスポンスは不正な応答として扱われる
        // given (前提条件):
        let body = json!({"changes": 1});

        // when (操作):
        let result = rows_to_history(body);

        // then (期待する結果):
        assert!(matches!(result, Err(ChatStoreError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_unreachable_store_reports_error() {
        // テスト項目: 接続できないストアへの保存はエラーとして返される
        // given (前提条件):
        let store = HttpChatStore::new(&HttpChatStoreConfig {
            base_url: "http://127.0.0.1:1/".to_string(),
            token: "secret".to_string(),
        })
        .unwrap();

        // when (操作):
        let result = store.store_message(&envelope(ChatScope::Global)).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ChatStoreError::Unreachable(_))));
    }
}
