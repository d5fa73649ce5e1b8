//! Conversion logic between DTOs and domain entities.

use rallyhub_shared::time::timestamp_to_rfc3339;

use crate::domain::{
    ChatDispatchEnvelope, ConnectedClient, GameSession, GameSettings, PaddleDirection, Room,
    RoomMember, Role, Timestamp,
};
use crate::infrastructure::dto::{http, websocket as dto};

fn rfc3339(timestamp: Timestamp) -> String {
    timestamp_to_rfc3339(timestamp.value())
}

// ========================================
// DTO → Domain
// ========================================

impl From<dto::GameActionKind> for PaddleDirection {
    fn from(kind: dto::GameActionKind) -> Self {
        match kind {
            dto::GameActionKind::PaddleUp => PaddleDirection::Up,
            dto::GameActionKind::PaddleDown => PaddleDirection::Down,
        }
    }
}

impl From<dto::GameSettingsDto> for GameSettings {
    fn from(dto: dto::GameSettingsDto) -> Self {
        GameSettings::sanitized(dto.max_score, dto.paddle_speed, dto.ball_speed)
    }
}

// ========================================
// Domain → DTO
// ========================================

impl From<&ConnectedClient> for dto::UserDto {
    fn from(client: &ConnectedClient) -> Self {
        Self {
            identity: client.identity.to_string(),
            display_name: client.display_name.to_string(),
            connected_at: rfc3339(client.connected_at),
            current_room: client.current_room.as_ref().map(ToString::to_string),
            is_playing: client.is_playing,
        }
    }
}

impl From<&RoomMember> for dto::RoomMemberDto {
    fn from(member: &RoomMember) -> Self {
        Self {
            identity: member.identity.to_string(),
            display_name: member.display_name.to_string(),
            joined_at: rfc3339(member.joined_at),
        }
    }
}

impl From<&Room> for dto::RoomSnapshotDto {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.to_string(),
            kind: room.kind,
            players: room.players.iter().map(Into::into).collect(),
            spectators: room.spectators.iter().map(Into::into).collect(),
            associated_session: room.associated_session.as_ref().map(ToString::to_string),
            created_at: rfc3339(room.created_at),
        }
    }
}

impl From<&Room> for http::RoomSummaryDto {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.to_string(),
            kind: room.kind,
            player_count: room.players.len(),
            spectator_count: room.spectators.len(),
            associated_session: room.associated_session.as_ref().map(ToString::to_string),
            created_at: rfc3339(room.created_at),
        }
    }
}

impl From<&Room> for http::RoomDetailDto {
    fn from(room: &Room) -> Self {
        let member = |m: &RoomMember, role: Role| http::RoomMemberDetailDto {
            identity: m.identity.to_string(),
            display_name: m.display_name.to_string(),
            role,
            joined_at: rfc3339(m.joined_at),
        };
        Self {
            id: room.id.to_string(),
            kind: room.kind,
            members: room
                .players
                .iter()
                .map(|m| member(m, Role::Player))
                .chain(room.spectators.iter().map(|m| member(m, Role::Spectator)))
                .collect(),
            associated_session: room.associated_session.as_ref().map(ToString::to_string),
            created_at: rfc3339(room.created_at),
        }
    }
}

impl From<&GameSession> for dto::ScoreDto {
    fn from(session: &GameSession) -> Self {
        Self {
            left: session.paddles.left.score,
            right: session.paddles.right.score,
        }
    }
}

impl From<&GameSession> for dto::GameSnapshotDto {
    fn from(session: &GameSession) -> Self {
        Self {
            id: session.id.to_string(),
            status: session.status,
            host: session.host.to_string(),
            settings: session.settings,
            players: session
                .players
                .iter()
                .map(|p| dto::GamePlayerDto {
                    identity: p.identity.to_string(),
                    display_name: p.display_name.to_string(),
                    side: p.side,
                    connected: p.connection_id.is_some(),
                })
                .collect(),
            ball: session.ball,
            paddles: session.paddles,
            field: session.field,
            score: session.into(),
            winner: session.winner,
            paused_by: session.paused_by.as_ref().map(ToString::to_string),
            created_at: rfc3339(session.created_at),
            started_at: session.started_at.map(rfc3339),
            finished_at: session.finished_at.map(rfc3339),
        }
    }
}

impl From<&ChatDispatchEnvelope> for dto::ChatMessageDto {
    fn from(envelope: &ChatDispatchEnvelope) -> Self {
        Self {
            id: envelope.id.to_string(),
            from: envelope.sender.to_string(),
            from_display_name: envelope.sender_display_name.to_string(),
            scope: envelope.scope.kind().to_string(),
            target: envelope.scope.target().map(str::to_string),
            body: envelope.body.as_str().to_string(),
            sent_at: envelope.sent_at.value(),
            timestamp: rfc3339(envelope.sent_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ChatScope, ConnectionId, DisplayName, GameId, Identity, MessageBody, RoomId, RoomKind,
    };

    fn member(name: &str) -> RoomMember {
        RoomMember::new(
            ConnectionId::new(format!("conn-{}", name)).unwrap(),
            Identity::new(name.to_string()).unwrap(),
            DisplayName::new(name.to_uppercase()).unwrap(),
            Timestamp::new(0),
        )
    }

    #[test]
    fn test_settings_dto_is_sanitized() {
        // テスト項目: 受信した設定値はサニタイズされてドメインに変換される
        // given (前提条件):
        let dto = dto::GameSettingsDto {
            max_score: Some(500),
            paddle_speed: Some(50.0),
            ball_speed: None,
        };

        // when (操作):
        let settings: GameSettings = dto.into();

        // then (期待する結果):
        assert_eq!(settings.max_score, GameSettings::default().max_score);
        assert_eq!(settings.paddle_speed, 50.0);
    }

    #[test]
    fn test_room_detail_lists_players_then_spectators() {
        // テスト項目: ルーム詳細はプレイヤー、観戦者の順に役割付きで並ぶ
        // given (前提条件):
        let mut room = Room::new(
            RoomId::new("g1".to_string()).unwrap(),
            RoomKind::Game,
            Timestamp::new(0),
        );
        room.join(member("alice")).unwrap();
        room.join(member("bob")).unwrap();
        room.join(member("carol")).unwrap();
        room.associated_session = Some(GameId::new("g1".to_string()).unwrap());

        // when (操作):
        let detail: http::RoomDetailDto = (&room).into();

        // then (期待する結果):
        let roles: Vec<(&str, Role)> = detail
            .members
            .iter()
            .map(|m| (m.identity.as_str(), m.role))
            .collect();
        assert_eq!(
            roles,
            vec![
                ("alice", Role::Player),
                ("bob", Role::Player),
                ("carol", Role::Spectator)
            ]
        );
        assert_eq!(detail.associated_session.as_deref(), Some("g1"));
        assert_eq!(detail.created_at, "1970-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_direct_envelope_to_dto_carries_target() {
        // テスト項目: ダイレクトメッセージの宛先が DTO に含まれる
        // given (前提条件):
        let envelope = ChatDispatchEnvelope::new(
            Identity::new("alice".to_string()).unwrap(),
            DisplayName::new("Alice".to_string()).unwrap(),
            ChatScope::Direct {
                to: Identity::new("bob".to_string()).unwrap(),
            },
            MessageBody::new("hey".to_string()).unwrap(),
            Timestamp::new(1500),
        );

        // when (操作):
        let message: dto::ChatMessageDto = (&envelope).into();

        // then (期待する結果):
        assert_eq!(message.scope, "direct");
        assert_eq!(message.target.as_deref(), Some("bob"));
        assert_eq!(message.from_display_name, "Alice");
        assert_eq!(message.sent_at, 1500);
        assert_eq!(message.id, envelope.id.as_str());
    }
}
