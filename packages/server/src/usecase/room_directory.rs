//! UseCase: Room Directory
//!
//! ルームへの参加・退出を管理する。1 つの接続が同時に所属できるルームは 1 つだけ。
//!
//! - `game` ルームでは先着 2 人がプレイヤー、3 人目以降は観戦者になる
//! - プレイヤーとして参加した接続は Game Session Engine に着席を依頼する。
//!   エンジンに拒否された場合は観戦者に降格する（エラーにはしない）
//! - ルームはプレイヤーと観戦者の両方が空になった時に削除される

use std::sync::Arc;

use rallyhub_shared::time::Clock;
use tokio::sync::Mutex;

use crate::{
    domain::{
        ConnectedClient, ConnectionId, ConnectionRepository, GameId, GameSession, GameSettings,
        Role, Room, RoomId, RoomKind, RoomMember, RoomRepository, Side, Timestamp,
    },
    infrastructure::dto::websocket::{GameSnapshotDto, RoomSnapshotDto, ServerEvent},
};

use super::{
    broadcast::Broadcaster,
    error::{JoinGameError, RoomJoinError},
    game_engine::GameEngine,
};

/// ルーム参加の結果
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome {
    pub room: Room,
    pub role: Role,
    pub side: Option<Side>,
}

/// Room Directory のユースケース
pub struct RoomDirectory {
    connections: Arc<dyn ConnectionRepository>,
    rooms: Arc<dyn RoomRepository>,
    engine: Arc<GameEngine>,
    broadcaster: Arc<Broadcaster>,
    clock: Arc<dyn Clock>,
    // 参加・退出は複数のリポジトリにまたがるため、ここで直列化する
    membership: Mutex<()>,
}

impl RoomDirectory {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        rooms: Arc<dyn RoomRepository>,
        engine: Arc<GameEngine>,
        broadcaster: Arc<Broadcaster>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            connections,
            rooms,
            engine,
            broadcaster,
            clock,
            membership: Mutex::new(()),
        }
    }

    /// ルームに参加する。既に別のルームにいる場合は先に退出する
    pub async fn join(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
        kind: RoomKind,
    ) -> Result<JoinOutcome, RoomJoinError> {
        let outcome = self.enter(connection_id, room_id, kind).await?;
        self.start_if_seated(&outcome).await;
        Ok(outcome)
    }

    /// 現在のルームから退出する。退出したルームの ID を返す
    pub async fn leave(&self, connection_id: &ConnectionId) -> Option<RoomId> {
        let _guard = self.membership.lock().await;
        let client = self.connections.get(connection_id).await?;
        let room_id = client.current_room.clone()?;
        self.depart(&client, &room_id).await;
        self.broadcaster
            .to_connection(
                connection_id,
                &ServerEvent::RoomLeft {
                    room_id: room_id.to_string(),
                },
            )
            .await;
        Some(room_id)
    }

    /// 切断時の退出。呼び出し側はルーム ID を知らなくてよい
    pub async fn remove_by_connection(&self, connection_id: &ConnectionId) {
        let _guard = self.membership.lock().await;
        let Some(client) = self.connections.get(connection_id).await else {
            return;
        };
        if let Some(room_id) = client.current_room.clone() {
            self.depart(&client, &room_id).await;
        }
    }

    /// 新しいゲームを作成し、作成者をそのゲームルームに参加させる
    pub async fn create_game(
        &self,
        connection_id: &ConnectionId,
        settings: GameSettings,
    ) -> Result<(GameSession, JoinOutcome), RoomJoinError> {
        let client = self
            .connections
            .get(connection_id)
            .await
            .ok_or_else(|| RoomJoinError::NotConnected(connection_id.clone()))?;

        let session = self.engine.create_session(&client.identity, settings).await;
        self.broadcaster
            .to_connection(
                connection_id,
                &ServerEvent::GameCreated {
                    game_id: session.id.to_string(),
                    settings: session.settings,
                },
            )
            .await;

        let outcome = self
            .join(connection_id, &session.id.room_id(), RoomKind::Game)
            .await?;
        Ok((session, outcome))
    }

    /// 既存のゲームに参加する（席が空いていればプレイヤー、なければ観戦者）
    pub async fn join_game(
        &self,
        connection_id: &ConnectionId,
        game_id: &GameId,
    ) -> Result<JoinOutcome, JoinGameError> {
        if self.engine.snapshot(game_id).await.is_none() {
            return Err(JoinGameError::NotFound(game_id.clone()));
        }

        let outcome = self
            .enter(connection_id, &game_id.room_id(), RoomKind::Game)
            .await?;

        if let Some(session) = self.engine.snapshot(game_id).await {
            self.broadcaster
                .to_connection(
                    connection_id,
                    &ServerEvent::GameJoined {
                        game_id: game_id.to_string(),
                        role: outcome.role,
                        side: outcome.side,
                        game: GameSnapshotDto::from(&session),
                    },
                )
                .await;
        }

        self.start_if_seated(&outcome).await;
        Ok(outcome)
    }

    async fn enter(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
        kind: RoomKind,
    ) -> Result<JoinOutcome, RoomJoinError> {
        let _guard = self.membership.lock().await;
        let client = self
            .connections
            .get(connection_id)
            .await
            .ok_or_else(|| RoomJoinError::NotConnected(connection_id.clone()))?;

        if client.current_room.as_ref() == Some(room_id) {
            if let Some(room) = self.rooms.get(room_id).await {
                return Ok(self.rejoin_current(&client, room).await);
            }
        }
        if let Some(previous) = client.current_room.clone() {
            self.depart(&client, &previous).await;
        }

        let member = RoomMember::new(
            connection_id.clone(),
            client.identity.clone(),
            client.display_name.clone(),
            self.now(),
        );
        let (mut role, mut room) = self.rooms.join(room_id, kind, member).await?;
        let mut side = None;

        if room.kind == RoomKind::Game && role == Role::Player {
            let game_id = GameId::from(room_id);
            match self
                .engine
                .seat(&game_id, &client.identity, &client.display_name, connection_id)
                .await
            {
                Ok(seat) => {
                    side = Some(seat.side);
                    if room.associated_session.is_none() {
                        match self.rooms.set_session(room_id, game_id.clone()).await {
                            Ok(()) => room.associated_session = Some(game_id),
                            Err(e) => tracing::warn!("Failed to link game to room: {}", e),
                        }
                    }
                }
                Err(e) => {
                    tracing::info!(
                        "'{}' joins room '{}' as spectator: {}",
                        client.identity,
                        room_id,
                        e
                    );
                    if let Some(demoted) = self.rooms.demote(room_id, connection_id).await {
                        room = demoted;
                    }
                    role = Role::Spectator;
                }
            }
        }

        self.connections
            .set_room(connection_id, Some((room_id.clone(), role)))
            .await;
        tracing::info!(
            "'{}' joined room '{}' ({}) as {:?}",
            client.identity,
            room_id,
            room.kind.as_str(),
            role
        );

        self.announce(connection_id, &room, role, side).await;
        Ok(JoinOutcome { room, role, side })
    }

    async fn rejoin_current(&self, client: &ConnectedClient, room: Room) -> JoinOutcome {
        let role = room
            .role_of(&client.connection_id)
            .unwrap_or(Role::Spectator);
        let side = match role {
            Role::Player => self
                .engine
                .snapshot(&GameId::from(&room.id))
                .await
                .and_then(|s| s.side_of(&client.identity)),
            Role::Spectator => None,
        };
        self.broadcaster
            .to_connection(
                &client.connection_id,
                &ServerEvent::RoomJoined {
                    room: RoomSnapshotDto::from(&room),
                    role,
                    side,
                },
            )
            .await;
        JoinOutcome { room, role, side }
    }

    /// ルームからメンバーを外し、ゲームの席を解放し、残りのメンバーに通知する
    async fn depart(&self, client: &ConnectedClient, room_id: &RoomId) {
        let connection_id = &client.connection_id;
        self.connections.set_room(connection_id, None).await;
        let Some(departure) = self.rooms.leave(room_id, connection_id).await else {
            return;
        };
        tracing::info!("'{}' left room '{}'", client.identity, room_id);

        let game_id = GameId::from(room_id);
        if departure.kind == RoomKind::Game && departure.role == Role::Player {
            self.engine.release(&game_id, &client.identity).await;
        }

        match departure.room {
            Some(room) => {
                self.broadcaster
                    .to_room(
                        room_id,
                        &ServerEvent::RoomUpdate {
                            room: RoomSnapshotDto::from(&room),
                        },
                    )
                    .await;
            }
            None => {
                tracing::info!("Room '{}' deleted (empty)", room_id);
                if departure.kind == RoomKind::Game {
                    self.engine.discard_abandoned(&game_id).await;
                }
            }
        }
    }

    async fn announce(
        &self,
        connection_id: &ConnectionId,
        room: &Room,
        role: Role,
        side: Option<Side>,
    ) {
        let snapshot = RoomSnapshotDto::from(room);
        self.broadcaster
            .to_connection(
                connection_id,
                &ServerEvent::RoomJoined {
                    room: snapshot.clone(),
                    role,
                    side,
                },
            )
            .await;
        self.broadcaster
            .to_room(&room.id, &ServerEvent::RoomUpdate { room: snapshot })
            .await;
    }

    async fn start_if_seated(&self, outcome: &JoinOutcome) {
        if outcome.side.is_some() {
            self.engine
                .start_if_ready(&GameId::from(&outcome.room.id))
                .await;
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }
}
