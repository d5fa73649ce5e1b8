//! UseCase 層のエラー型

use thiserror::Error;

use crate::domain::{
    ConnectionId, GameError, GameId, Identity, RepositoryError, RoomError, RoomId,
};

/// 接続処理のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectError {
    #[error("identity '{0}' is already connected")]
    DuplicateIdentity(Identity),

    #[error(transparent)]
    Registry(RepositoryError),
}

/// ルーム参加のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoomJoinError {
    #[error("connection '{0}' is not registered")]
    NotConnected(ConnectionId),

    #[error(transparent)]
    Room(#[from] RoomError),
}

/// ゲーム参加のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JoinGameError {
    #[error("game '{0}' not found")]
    NotFound(GameId),

    #[error(transparent)]
    Join(#[from] RoomJoinError),
}

/// パドル操作のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GameActionError {
    #[error("game '{0}' not found")]
    NotFound(GameId),

    #[error(transparent)]
    Rejected(#[from] GameError),
}

/// ダイレクトメッセージのエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectMessageError {
    #[error("connection '{0}' is not registered")]
    NotConnected(ConnectionId),

    #[error("'{0}' is offline")]
    TargetOffline(Identity),
}

/// ルームチャットのエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoomChatError {
    #[error("connection '{0}' is not registered")]
    NotConnected(ConnectionId),

    #[error("room '{0}' not found")]
    RoomNotFound(RoomId),
}

/// 全体チャットのエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GlobalChatError {
    #[error("connection '{0}' is not registered")]
    NotConnected(ConnectionId),
}

/// フレンド申請のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FriendRequestError {
    #[error("connection '{0}' is not registered")]
    NotConnected(ConnectionId),

    #[error("'{0}' is offline")]
    TargetOffline(Identity),
}

/// 管理者向け統計取得のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServerStatsError {
    #[error("connection '{0}' is not registered")]
    NotConnected(ConnectionId),

    #[error("'{0}' is not an administrator")]
    NotAdmin(Identity),
}
