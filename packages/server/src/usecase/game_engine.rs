//! UseCase: Game Session Engine
//!
//! セッションの生成・着席・開始・ティック・終了・一時停止を管理する。
//! セッションの状態を変更するのはこのエンジンだけで、Room Directory や
//! Chat Router はエンジンの操作を呼び出すのみ。
//!
//! ## ティックループ
//!
//! `Start` ごとに 1 本のタスクを起動し、固定間隔で `GameSession::step` を呼ぶ。
//! 各ループは開始時の世代番号を持ち、ティックの先頭で
//! `GameSession::is_driven_by` を確認する。状態が `playing` でなくなるか、
//! 新しい世代のループが開始されると次のティックで終了する。

use std::{ops::ControlFlow, sync::Arc};

use rallyhub_shared::time::Clock;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::{
    config::GameEngineConfig,
    domain::{
        ConnectionId, DisplayName, GameError, GameId, GameSession, GameSessionRepository,
        GameSettings, GameStatus, Identity, PaddleDirection, Release, Seat, SharedGameSession,
        Side, Timestamp,
    },
    infrastructure::dto::websocket::{GameSnapshotDto, ServerEvent},
};

use super::{broadcast::Broadcaster, error::GameActionError};

/// Game Session Engine のユースケース
pub struct GameEngine {
    sessions: Arc<dyn GameSessionRepository>,
    broadcaster: Arc<Broadcaster>,
    clock: Arc<dyn Clock>,
    config: GameEngineConfig,
}

impl GameEngine {
    pub fn new(
        sessions: Arc<dyn GameSessionRepository>,
        broadcaster: Arc<Broadcaster>,
        clock: Arc<dyn Clock>,
        config: GameEngineConfig,
    ) -> Self {
        Self {
            sessions,
            broadcaster,
            clock,
            config,
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    /// 新しいセッションを `waiting` 状態で作成する
    pub async fn create_session(&self, host: &Identity, settings: GameSettings) -> GameSession {
        let session = GameSession::new(GameId::generate(), host.clone(), settings, self.now());
        let shared = self.sessions.insert(session).await;
        let session = shared.lock().await.clone();
        tracing::info!(
            "Game '{}' created by '{}' (maxScore={})",
            session.id,
            host,
            session.settings.max_score
        );
        session
    }

    /// プレイヤーを着席させる。セッションがなければデフォルト設定で作成する
    pub async fn seat(
        &self,
        game_id: &GameId,
        identity: &Identity,
        display_name: &DisplayName,
        connection_id: &ConnectionId,
    ) -> Result<Seat, GameError> {
        let shared = match self.sessions.get(game_id).await {
            Some(shared) => shared,
            None => {
                let session = GameSession::new(
                    game_id.clone(),
                    identity.clone(),
                    GameSettings::default(),
                    self.now(),
                );
                tracing::info!("Game '{}' created on first join by '{}'", game_id, identity);
                self.sessions.insert(session).await
            }
        };

        let mut session = shared.lock().await;
        let seat = session.seat(identity.clone(), display_name.clone(), connection_id.clone())?;
        tracing::info!(
            "'{}' seated on the {} side of game '{}'{}",
            identity,
            seat.side,
            game_id,
            if seat.rejoined { " (rejoined)" } else { "" }
        );
        Ok(seat)
    }

    /// 両プレイヤーが揃っていれば開始（または再開）してティックループを起動する
    pub async fn start_if_ready(self: &Arc<Self>, game_id: &GameId) -> bool {
        let Some(shared) = self.sessions.get(game_id).await else {
            return false;
        };

        let (generation, event) = {
            let mut session = shared.lock().await;
            if !session.can_start() {
                return false;
            }
            let resumed = session.started_at.is_some();
            let generation = session.start(self.now());
            let event = ServerEvent::GameStarted {
                game_id: game_id.to_string(),
                resumed,
                game: GameSnapshotDto::from(&*session),
            };
            (generation, event)
        };

        tracing::info!("Game '{}' started (generation {})", game_id, generation);
        self.broadcaster.to_room(&game_id.room_id(), &event).await;
        self.spawn_tick_loop(game_id.clone(), shared, generation);
        true
    }

    /// パドル入力を適用し、更新後の状態を即座にルームへ配信する
    pub async fn apply_paddle_input(
        &self,
        game_id: &GameId,
        identity: &Identity,
        direction: PaddleDirection,
        magnitude: f64,
    ) -> Result<Side, GameActionError> {
        let shared = self
            .sessions
            .get(game_id)
            .await
            .ok_or_else(|| GameActionError::NotFound(game_id.clone()))?;

        let (side, event) = {
            let mut session = shared.lock().await;
            let side = session.apply_paddle_input(identity, direction, magnitude)?;
            (side, self.state_update(&session))
        };

        self.broadcaster.to_room(&game_id.room_id(), &event).await;
        Ok(side)
    }

    /// プレイヤーがゲームルームを退出した
    pub async fn release(&self, game_id: &GameId, identity: &Identity) -> Release {
        let Some(shared) = self.sessions.get(game_id).await else {
            return Release::NotParticipant;
        };

        let (release, event) = {
            let mut session = shared.lock().await;
            let release = session.release(identity);
            let event = (release == Release::Paused).then(|| Self::paused_event(&session, identity));
            (release, event)
        };

        if let Some(event) = event {
            tracing::info!("Game '{}' paused: '{}' left the room", game_id, identity);
            self.broadcaster.to_room(&game_id.room_id(), &event).await;
        }
        release
    }

    /// 切断したアイデンティティが参加している進行中のセッションを一時停止する
    ///
    /// 一時停止したセッションの ID を返す。
    pub async fn handle_disconnect(&self, identity: &Identity) -> Vec<GameId> {
        let mut paused = Vec::new();

        for game_id in self.sessions.ids().await {
            let Some(shared) = self.sessions.get(&game_id).await else {
                continue;
            };
            let event = {
                let mut session = shared.lock().await;
                if !session.is_participant(identity) {
                    continue;
                }
                session
                    .disconnect(identity)
                    .then(|| Self::paused_event(&session, identity))
            };
            if let Some(event) = event {
                tracing::info!("Game '{}' paused: '{}' disconnected", game_id, identity);
                self.broadcaster.to_room(&game_id.room_id(), &event).await;
                paused.push(game_id);
            }
        }

        paused
    }

    /// ルームが空になったセッションを破棄する（終了済みは猶予期間後に破棄）
    pub async fn discard_abandoned(&self, game_id: &GameId) {
        let Some(shared) = self.sessions.get(game_id).await else {
            return;
        };
        if shared.lock().await.status == GameStatus::Finished {
            return;
        }
        if self.sessions.remove(game_id).await.is_some() {
            tracing::info!("Game '{}' discarded (room abandoned)", game_id);
        }
    }

    pub async fn snapshot(&self, game_id: &GameId) -> Option<GameSession> {
        let shared = self.sessions.get(game_id).await?;
        let session = shared.lock().await;
        Some(session.clone())
    }

    /// テーブル内の全セッションのスナップショット（ID 順）
    pub async fn snapshots(&self) -> Vec<GameSession> {
        let mut ids = self.sessions.ids().await;
        ids.sort();
        let mut sessions = Vec::with_capacity(ids.len());
        for game_id in ids {
            if let Some(session) = self.snapshot(&game_id).await {
                sessions.push(session);
            }
        }
        sessions
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.count().await
    }

    fn spawn_tick_loop(self: &Arc<Self>, game_id: GameId, shared: SharedGameSession, generation: u64) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = time::interval(engine.config.tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;
            let mut last_tick = Instant::now();

            loop {
                interval.tick().await;
                let now = Instant::now();
                let dt = now.duration_since(last_tick).as_secs_f64();
                last_tick = now;

                if engine.tick(&game_id, &shared, generation, dt).await.is_break() {
                    break;
                }
            }
            tracing::debug!(
                "Tick loop of game '{}' stopped (generation {})",
                game_id,
                generation
            );
        });
    }

    async fn tick(
        self: &Arc<Self>,
        game_id: &GameId,
        shared: &SharedGameSession,
        generation: u64,
        dt: f64,
    ) -> ControlFlow<()> {
        // 既に破棄されたセッションは片付け済みとして扱う
        match self.sessions.get(game_id).await {
            Some(current) if Arc::ptr_eq(&current, shared) => {}
            _ => return ControlFlow::Break(()),
        }

        let (event, finished) = {
            let mut session = shared.lock().await;
            if !session.is_driven_by(generation) {
                return ControlFlow::Break(());
            }
            let outcome = session.step(dt);
            if let Some(side) = outcome.scored {
                tracing::debug!(
                    "Game '{}': {} scores ({}-{})",
                    game_id,
                    side,
                    session.paddles.left.score,
                    session.paddles.right.score
                );
            }
            tracing::trace!("Game '{}' tick dt={:.4}: {:?}", game_id, dt, outcome);

            if outcome.match_point {
                match session.finish(self.now()) {
                    Some(winner) => (Self::finished_event(&session, winner), true),
                    None => return ControlFlow::Break(()),
                }
            } else {
                (self.state_update(&session), false)
            }
        };

        self.broadcaster.to_room(&game_id.room_id(), &event).await;

        if finished {
            tracing::info!("Game '{}' finished", game_id);
            self.schedule_eviction(game_id.clone());
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }

    fn schedule_eviction(self: &Arc<Self>, game_id: GameId) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            time::sleep(engine.config.finished_grace).await;
            if engine.sessions.remove(&game_id).await.is_some() {
                tracing::info!("Game '{}' evicted", game_id);
            }
        });
    }

    fn state_update(&self, session: &GameSession) -> ServerEvent {
        ServerEvent::GameStateUpdate {
            game_id: session.id.to_string(),
            status: session.status,
            ball: session.ball,
            paddles: session.paddles,
            timestamp: self.clock.now_millis(),
        }
    }

    fn paused_event(session: &GameSession, identity: &Identity) -> ServerEvent {
        let display_name = session
            .player(identity)
            .map(|p| p.display_name.to_string())
            .unwrap_or_else(|| identity.to_string());
        ServerEvent::GamePaused {
            game_id: session.id.to_string(),
            identity: identity.to_string(),
            display_name,
        }
    }

    fn finished_event(session: &GameSession, winner: Side) -> ServerEvent {
        ServerEvent::GameFinished {
            game_id: session.id.to_string(),
            winner_side: winner,
            winner: session.player_on(winner).map(|p| p.identity.to_string()),
            score: session.into(),
            game: session.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        domain::{GameStatus, RoomKind, RoomMember, RoomRepository},
        usecase::test_support::{
            Harness, NOW, connection_id, drain, fast_engine_config, identity, wait_for,
        },
    };

    async fn enter_room(h: &Harness, room: &str, name: &str) {
        h.rooms
            .join(
                &GameId::new(room.to_string()).unwrap().room_id(),
                RoomKind::Game,
                RoomMember::new(
                    connection_id(name),
                    identity(name),
                    DisplayName::new(name.to_string()).unwrap(),
                    Timestamp::new(NOW),
                ),
            )
            .await
            .unwrap();
    }

    async fn seat(h: &Harness, game: &GameId, name: &str) -> Result<Seat, GameError> {
        h.engine
            .seat(
                game,
                &identity(name),
                &DisplayName::new(name.to_string()).unwrap(),
                &connection_id(name),
            )
            .await
    }

    fn game_id(id: &str) -> GameId {
        GameId::new(id.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_seat_creates_session_and_assigns_sides() {
        // テスト項目: 最初の着席でセッションが作成され、左・右の順に割り当てられる
        // given (前提条件):
        let h = Harness::new(fast_engine_config());
        let g1 = game_id("g1");

        // when (操作):
        let left = seat(&h, &g1, "alice").await.unwrap();
        let right = seat(&h, &g1, "bob").await.unwrap();
        let third = seat(&h, &g1, "carol").await;

        // then (期待する結果):
        assert_eq!(left.side, Side::Left);
        assert_eq!(right.side, Side::Right);
        assert_eq!(third, Err(GameError::SessionFull(g1.clone())));
        let session = h.engine.snapshot(&g1).await.unwrap();
        assert_eq!(session.host, identity("alice"));
        assert_eq!(session.status, GameStatus::Waiting);
    }

    #[tokio::test]
    async fn test_start_broadcasts_started_then_state_updates() {
        // テスト項目: 開始するとルームに game_started が届き、続いて状態更新が届く
        // given (前提条件):
        let h = Harness::new(fast_engine_config());
        let g1 = game_id("g1");
        let (_, mut alice_rx) = h.connect("alice").await;
        let (_, _bob_rx) = h.connect("bob").await;
        enter_room(&h, "g1", "alice").await;
        enter_room(&h, "g1", "bob").await;
        seat(&h, &g1, "alice").await.unwrap();
        seat(&h, &g1, "bob").await.unwrap();

        // when (操作):
        let started = h.engine.start_if_ready(&g1).await;

        // then (期待する結果):
        assert!(started);
        let event = wait_for(&mut alice_rx, "game_started").await;
        assert_eq!(event["resumed"], false);
        assert_eq!(event["game"]["status"], "playing");
        let update = wait_for(&mut alice_rx, "game_state_update").await;
        assert_eq!(update["gameId"], "g1");
        assert!(!h.engine.start_if_ready(&g1).await);
    }

    #[tokio::test]
    async fn test_start_requires_two_players() {
        // テスト項目: プレイヤーが 1 人の間は開始しない
        // given (前提条件):
        let h = Harness::new(fast_engine_config());
        let g1 = game_id("g1");
        seat(&h, &g1, "alice").await.unwrap();

        // when (操作):
        let started = h.engine.start_if_ready(&g1).await;

        // then (期待する結果):
        assert!(!started);
    }

    #[tokio::test]
    async fn test_match_finishes_once_and_is_evicted_after_grace() {
        // テスト項目: 最初の得点で maxScore に達すると一度だけ終了し、猶予期間後に破棄される
        // given (前提条件):
        let h = Harness::new(fast_engine_config());
        let host = identity("alice");
        let session = h
            .engine
            .create_session(&host, GameSettings::sanitized(Some(1), None, Some(3000.0)))
            .await;
        let game = session.id.clone();
        let (_, mut alice_rx) = h.connect("alice").await;
        enter_room(&h, game.as_str(), "alice").await;
        enter_room(&h, game.as_str(), "bob").await;
        seat(&h, &game, "alice").await.unwrap();
        seat(&h, &game, "bob").await.unwrap();

        // when (操作):
        h.engine.start_if_ready(&game).await;
        let finished = wait_for(&mut alice_rx, "game_finished").await;

        // then (期待する結果):
        // the opening serve travels right and misses the centred right paddle
        assert_eq!(finished["winnerSide"], "left");
        assert_eq!(finished["winner"], "alice");
        assert_eq!(finished["score"]["left"], 1);
        assert_eq!(finished["game"]["status"], "finished");

        tokio::time::sleep(Duration::from_millis(40)).await;
        let later = drain(&mut alice_rx);
        assert!(
            later.iter().all(|e| e["type"] != "game_finished"),
            "game_finished must be sent exactly once"
        );
        assert!(h.engine.snapshot(&game).await.is_some());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(h.engine.snapshot(&game).await.is_none());
        assert_eq!(h.engine.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_disconnect_pauses_and_freezes_simulation() {
        // テスト項目: 進行中にプレイヤーが切断すると一時停止し、以降ボールは動かない
        // given (前提条件):
        let h = Harness::new(fast_engine_config());
        let g1 = game_id("g1");
        let (_, mut alice_rx) = h.connect("alice").await;
        enter_room(&h, "g1", "alice").await;
        enter_room(&h, "g1", "bob").await;
        seat(&h, &g1, "alice").await.unwrap();
        seat(&h, &g1, "bob").await.unwrap();
        h.engine.start_if_ready(&g1).await;
        wait_for(&mut alice_rx, "game_state_update").await;

        // when (操作):
        let paused = h.engine.handle_disconnect(&identity("bob")).await;

        // then (期待する結果):
        assert_eq!(paused, vec![g1.clone()]);
        let event = wait_for(&mut alice_rx, "game_paused").await;
        assert_eq!(event["identity"], "bob");

        let frozen = h.engine.snapshot(&g1).await.unwrap();
        assert_eq!(frozen.status, GameStatus::Paused);
        tokio::time::sleep(Duration::from_millis(40)).await;
        let later = h.engine.snapshot(&g1).await.unwrap();
        assert_eq!(later.ball, frozen.ball);
        assert_eq!(later.paddles, frozen.paddles);
    }

    #[tokio::test]
    async fn test_rejoin_resumes_paused_match() {
        // テスト項目: 切断したプレイヤーが再着席すると再開され、resumed=true が通知される
        // given (前提条件):
        let h = Harness::new(fast_engine_config());
        let g1 = game_id("g1");
        let (_, mut alice_rx) = h.connect("alice").await;
        enter_room(&h, "g1", "alice").await;
        seat(&h, &g1, "alice").await.unwrap();
        seat(&h, &g1, "bob").await.unwrap();
        h.engine.start_if_ready(&g1).await;
        h.engine.handle_disconnect(&identity("bob")).await;

        // when (操作):
        let seat = seat(&h, &g1, "bob").await.unwrap();
        let resumed = h.engine.start_if_ready(&g1).await;

        // then (期待する結果):
        assert!(seat.rejoined);
        assert!(resumed);
        let event = wait_for(&mut alice_rx, "game_started").await;
        let event = if event["resumed"] == true {
            event
        } else {
            wait_for(&mut alice_rx, "game_started").await
        };
        assert_eq!(event["resumed"], true);
        assert_eq!(
            h.engine.snapshot(&g1).await.unwrap().status,
            GameStatus::Playing
        );
    }

    #[tokio::test]
    async fn test_paddle_input_broadcasts_state_immediately() {
        // テスト項目: パドル入力は次のティックを待たずにルームへ配信される
        // given (前提条件):
        let h = Harness::new(fast_engine_config());
        let g1 = game_id("g1");
        let (_, mut alice_rx) = h.connect("alice").await;
        enter_room(&h, "g1", "alice").await;
        seat(&h, &g1, "alice").await.unwrap();

        // when (操作):
        let side = h
            .engine
            .apply_paddle_input(&g1, &identity("alice"), PaddleDirection::Up, 1.0)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(side, Side::Left);
        let events = drain(&mut alice_rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["type"], "game_state_update");
        assert_eq!(events[0]["paddles"]["left"]["y"], 150.0);
    }

    #[tokio::test]
    async fn test_paddle_input_errors() {
        // テスト項目: 存在しないゲームと参加者以外の入力はエラーになる
        // given (前提条件):
        let h = Harness::new(fast_engine_config());
        let g1 = game_id("g1");
        seat(&h, &g1, "alice").await.unwrap();

        // when (操作):
        let unknown = h
            .engine
            .apply_paddle_input(&game_id("nope"), &identity("alice"), PaddleDirection::Up, 1.0)
            .await;
        let stranger = h
            .engine
            .apply_paddle_input(&g1, &identity("mallory"), PaddleDirection::Down, 1.0)
            .await;

        // then (期待する結果):
        assert_eq!(unknown, Err(GameActionError::NotFound(game_id("nope"))));
        assert_eq!(
            stranger,
            Err(GameActionError::Rejected(GameError::NotParticipant(
                identity("mallory")
            )))
        );
    }

    #[tokio::test]
    async fn test_discard_abandoned_keeps_finished_sessions() {
        // テスト項目: 放棄されたセッションは破棄されるが、終了済みは猶予期間まで残る
        // given (前提条件):
        let h = Harness::new(fast_engine_config());
        let waiting = game_id("w1");
        seat(&h, &waiting, "alice").await.unwrap();
        let done = game_id("f1");
        seat(&h, &done, "bob").await.unwrap();
        h.sessions
            .get(&done)
            .await
            .unwrap()
            .lock()
            .await
            .finish(Timestamp::new(NOW));

        // when (操作):
        h.engine.discard_abandoned(&waiting).await;
        h.engine.discard_abandoned(&done).await;

        // then (期待する結果):
        assert!(h.engine.snapshot(&waiting).await.is_none());
        assert!(h.engine.snapshot(&done).await.is_some());
    }
}
