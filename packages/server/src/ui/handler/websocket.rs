//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{ConnectedClient, ConnectionId, Handshake, bind_identity},
    ui::state::AppState,
    usecase::ConnectError,
};

use super::dispatch::dispatch;

/// Query parameters for WebSocket connection
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectQuery {
    pub token: Option<String>,
    pub display_name: Option<String>,
}

/// Token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

/// Handshake token, trimmed. The query parameter wins over the header;
/// a blank value counts as absent.
fn handshake_token(query_token: Option<String>, headers: &HeaderMap) -> Option<String> {
    let normalize = |token: String| {
        let token = token.trim();
        (!token.is_empty()).then(|| token.to_string())
    };
    query_token
        .and_then(normalize)
        .or_else(|| bearer_token(headers).and_then(normalize))
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    let connection_id = ConnectionId::generate();
    let handshake = Handshake {
        token: handshake_token(query.token, &headers),
        display_name: query.display_name,
    };
    let bound = bind_identity(&handshake, &connection_id);
    let is_guest = bound.is_guest();

    // Create a channel for this connection to receive events
    let (tx, rx) = mpsc::unbounded_channel();

    match state
        .connection_service
        .connect(connection_id, bound, tx)
        .await
    {
        Ok(client) => {
            let failed_state = state.clone();
            let failed_id = client.connection_id.clone();
            Ok(ws
                .on_failed_upgrade(move |e| {
                    tracing::warn!("WebSocket upgrade of '{}' failed: {}", failed_id, e);
                    tokio::spawn(async move {
                        failed_state.connection_service.disconnect(&failed_id).await;
                    });
                })
                .on_upgrade(move |socket| handle_socket(socket, state, client, is_guest, rx)))
        }
        Err(ConnectError::DuplicateIdentity(identity)) => {
            tracing::warn!(
                "Identity '{}' is already connected. Rejecting connection.",
                identity
            );
            Err(StatusCode::CONFLICT)
        }
        Err(e) => {
            tracing::error!("Failed to register connection: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Spawns a task that drains the connection's channel into the WebSocket sink.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    client: ConnectedClient,
    is_guest: bool,
    rx: mpsc::UnboundedReceiver<String>,
) {
    let (sender, mut receiver) = socket.split();
    let mut send_task = pusher_loop(rx, sender);

    state.connection_service.announce(&client, is_guest).await;

    let recv_state = state.clone();
    let recv_client = client.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!("WebSocket error from '{}': {}", recv_client.identity, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => dispatch(&recv_state, &recv_client, text.as_str()).await,
                Message::Close(_) => {
                    tracing::debug!("'{}' requested close", recv_client.identity);
                    break;
                }
                // Ping/pong is handled automatically by the WebSocket protocol
                _ => {}
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    state
        .connection_service
        .disconnect(&client.connection_id)
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_is_extracted() {
        // テスト項目: Authorization ヘッダーの Bearer トークンが取り出される
        // given (前提条件):
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer user-42"));

        // when (操作):
        let token = bearer_token(&headers);

        // then (期待する結果):
        assert_eq!(token, Some("user-42".to_string()));
    }

    #[test]
    fn test_query_and_header_tokens_are_normalized_alike() {
        // テスト項目: クエリと Authorization ヘッダーのトークンが同じように空白除去される
        // given (前提条件):
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer  bob"));

        // when (操作):
        let from_query = handshake_token(Some(" bob".to_string()), &HeaderMap::new());
        let from_header = handshake_token(None, &headers);

        // then (期待する結果):
        assert_eq!(from_query, Some("bob".to_string()));
        assert_eq!(from_header, Some("bob".to_string()));
    }

    #[test]
    fn test_blank_query_token_falls_back_to_header() {
        // テスト項目: 空白のクエリトークンは未指定扱いとなり、ヘッダーのトークンが使われる
        // given (前提条件):
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer carol"));

        // when (操作):
        let token = handshake_token(Some("  ".to_string()), &headers);

        // then (期待する結果):
        assert_eq!(token, Some("carol".to_string()));
        assert_eq!(handshake_token(None, &HeaderMap::new()), None);
    }

    #[test]
    fn test_non_bearer_authorization_is_ignored() {
        // テスト項目: Bearer 以外の Authorization ヘッダーは無視される
        // given (前提条件):
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));

        // when (操作):
        let token = bearer_token(&headers);

        // then (期待する結果):
        assert_eq!(token, None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
