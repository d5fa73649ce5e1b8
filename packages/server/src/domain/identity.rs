//! Identity Binder: turns handshake credentials into a connection identity.
//!
//! No verification happens here. A token is trusted verbatim because issuing
//! and validating tokens belongs to the external auth service; a missing token
//! degrades to a guest identity instead of rejecting the connection.

use super::value_object::{ConnectionId, DisplayName, Identity};

/// Prefix of identities handed to connections without a token.
pub const GUEST_PREFIX: &str = "guest_";

/// Number of connection-id characters appended to [`GUEST_PREFIX`].
pub const GUEST_SUFFIX_LEN: usize = 8;

/// Credentials presented at connection time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Handshake {
    pub token: Option<String>,
    pub display_name: Option<String>,
}

/// Result of binding a handshake to a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundIdentity {
    pub identity: Identity,
    pub display_name: DisplayName,
}

impl BoundIdentity {
    pub fn is_guest(&self) -> bool {
        self.identity.as_str().starts_with(GUEST_PREFIX)
    }
}

/// Bind a handshake to a stable identity. Never fails.
///
/// Tokens are trimmed whichever way they were presented. Blank tokens and
/// blank or invalid display names are treated as absent.
pub fn bind_identity(handshake: &Handshake, connection_id: &ConnectionId) -> BoundIdentity {
    let identity = handshake
        .token
        .as_deref()
        .and_then(|token| Identity::try_from(token.trim()).ok())
        .unwrap_or_else(|| Identity::guest(connection_id));

    let display_name = handshake
        .display_name
        .as_deref()
        .and_then(|name| DisplayName::try_from(name.trim()).ok())
        .unwrap_or_else(|| DisplayName::from(&identity));

    BoundIdentity {
        identity,
        display_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(id: &str) -> ConnectionId {
        ConnectionId::new(id.to_string()).unwrap()
    }

    #[test]
    fn test_token_becomes_identity_verbatim() {
        // テスト項目: トークンがそのままアイデンティティになる
        // given (前提条件):
        let handshake = Handshake {
            token: Some("user-42".to_string()),
            display_name: Some("Alice".to_string()),
        };

        // when (操作):
        let bound = bind_identity(&handshake, &connection("0123456789abcdef"));

        // then (期待する結果):
        assert_eq!(bound.identity.as_str(), "user-42");
        assert_eq!(bound.display_name.as_str(), "Alice");
        assert!(!bound.is_guest());
    }

    #[test]
    fn test_jwt_sized_token_becomes_identity_verbatim() {
        // テスト項目: JWT のような長いトークンもゲストに落とされずそのままアイデンティティになる
        // given (前提条件):
        let token = format!(
            "eyJhbGciOiJIUzI1NiJ9.{}.{}",
            "a".repeat(160),
            "s".repeat(43)
        );
        let handshake = Handshake {
            token: Some(token.clone()),
            display_name: None,
        };

        // when (操作):
        let bound = bind_identity(&handshake, &connection("0123456789abcdef"));

        // then (期待する結果):
        assert!(token.len() > 200);
        assert_eq!(bound.identity.as_str(), token);
        assert!(!bound.is_guest());
    }

    #[test]
    fn test_token_is_trimmed() {
        // テスト項目: 前後に空白があるトークンは空白を除いたアイデンティティになる
        // given (前提条件):
        let handshake = Handshake {
            token: Some(" bob ".to_string()),
            display_name: None,
        };

        // when (操作):
        let bound = bind_identity(&handshake, &connection("abc"));

        // then (期待する結果):
        assert_eq!(bound.identity.as_str(), "bob");
        assert_eq!(bound.display_name.as_str(), "bob");
    }

    #[test]
    fn test_missing_token_yields_guest_identity() {
        // テスト項目: トークンがない場合、接続 ID の先頭 8 文字からゲスト ID が生成される
        // given (前提条件):
        let handshake = Handshake::default();

        // when (操作):
        let bound = bind_identity(&handshake, &connection("9f8e7d6c-5b4a-3210"));

        // then (期待する結果):
        assert_eq!(bound.identity.as_str(), "guest_9f8e7d6c");
        assert_eq!(bound.display_name.as_str(), "guest_9f8e7d6c");
        assert!(bound.is_guest());
    }

    #[test]
    fn test_blank_token_is_treated_as_absent() {
        // テスト項目: 空白のトークンは未指定として扱われる
        // given (前提条件):
        let handshake = Handshake {
            token: Some("  ".to_string()),
            display_name: None,
        };

        // when (操作):
        let bound = bind_identity(&handshake, &connection("abc"));

        // then (期待する結果):
        assert_eq!(bound.identity.as_str(), "guest_abc");
    }

    #[test]
    fn test_display_name_defaults_to_identity() {
        // テスト項目: 表示名が未指定の場合はアイデンティティが使われる
        // given (前提条件):
        let handshake = Handshake {
            token: Some("bob".to_string()),
            display_name: Some("".to_string()),
        };

        // when (操作):
        let bound = bind_identity(&handshake, &connection("abc"));

        // then (期待する結果):
        assert_eq!(bound.display_name.as_str(), "bob");
    }
}
