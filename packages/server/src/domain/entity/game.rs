//! GameSession entity: authoritative Pong simulation and match lifecycle.
//!
//! ```text
//! waiting --(2nd player seated)--> playing --(score reaches max)--> finished
//! playing --(player disconnects)--> paused --(participant rejoins)--> playing
//! ```
//!
//! Coordinates are field units with the origin at the top-left corner and y
//! growing downwards. Ball velocity is expressed in units per second and every
//! tick advances by the elapsed simulated time, so trajectories do not depend
//! on how regularly ticks are scheduled.

use serde::Serialize;

use crate::domain::{
    error::GameError,
    value_object::{ConnectionId, DisplayName, GameId, Identity, PaddleDirection, Side, Timestamp},
};

pub const FIELD_WIDTH: f64 = 800.0;
pub const FIELD_HEIGHT: f64 = 600.0;
pub const PADDLE_HEIGHT: f64 = 100.0;
pub const PADDLE_WIDTH: f64 = 10.0;
/// Distance between a goal line and the back of its paddle.
pub const PADDLE_INSET: f64 = 20.0;
/// Longest step a single tick may simulate (seconds).
pub const MAX_TICK_SECONDS: f64 = 0.1;

/// Direction of the opening serve, scaled to `ball_speed`.
const SERVE_DIRECTION: (f64, f64) = (5.0, 3.0);

pub const DEFAULT_MAX_SCORE: u32 = 11;
pub const MAX_MAX_SCORE: u32 = 100;
pub const DEFAULT_PADDLE_SPEED: f64 = 100.0;
pub const DEFAULT_BALL_SPEED: f64 = 350.0;

/// Match settings chosen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    pub max_score: u32,
    /// Paddle displacement per input (units).
    pub paddle_speed: f64,
    /// Ball speed (units per second).
    pub ball_speed: f64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            max_score: DEFAULT_MAX_SCORE,
            paddle_speed: DEFAULT_PADDLE_SPEED,
            ball_speed: DEFAULT_BALL_SPEED,
        }
    }
}

impl GameSettings {
    /// Build settings from optional client values, falling back to defaults
    /// for anything missing or out of range.
    pub fn sanitized(
        max_score: Option<u32>,
        paddle_speed: Option<f64>,
        ball_speed: Option<f64>,
    ) -> Self {
        let positive = |v: Option<f64>, default: f64| {
            v.filter(|s| s.is_finite() && *s > 0.0).unwrap_or(default)
        };
        Self {
            max_score: max_score
                .filter(|s| (1..=MAX_MAX_SCORE).contains(s))
                .unwrap_or(DEFAULT_MAX_SCORE),
            paddle_speed: positive(paddle_speed, DEFAULT_PADDLE_SPEED),
            ball_speed: positive(ball_speed, DEFAULT_BALL_SPEED),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Playing,
    Paused,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ball {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

impl Ball {
    fn serve(field: &Field, speed: f64) -> Self {
        let (dx, dy) = SERVE_DIRECTION;
        let norm = (dx * dx + dy * dy).sqrt();
        Self {
            x: field.width / 2.0,
            y: field.height / 2.0,
            vx: dx / norm * speed,
            vy: dy / norm * speed,
        }
    }

    fn recenter(&mut self, field: &Field) {
        self.x = field.width / 2.0;
        self.y = field.height / 2.0;
        self.vx = -self.vx;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Paddle {
    /// Top edge of the paddle.
    pub y: f64,
    pub score: u32,
}

impl Paddle {
    fn centered(field: &Field) -> Self {
        Self {
            y: (field.height - PADDLE_HEIGHT) / 2.0,
            score: 0,
        }
    }

    fn covers(&self, y: f64) -> bool {
        y >= self.y && y <= self.y + PADDLE_HEIGHT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Paddles {
    pub left: Paddle,
    pub right: Paddle,
}

impl Paddles {
    pub fn get(&self, side: Side) -> &Paddle {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn get_mut(&mut self, side: Side) -> &mut Paddle {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Field {
    pub width: f64,
    pub height: f64,
}

impl Default for Field {
    fn default() -> Self {
        Self {
            width: FIELD_WIDTH,
            height: FIELD_HEIGHT,
        }
    }
}

impl Field {
    fn left_face(&self) -> f64 {
        PADDLE_INSET + PADDLE_WIDTH
    }

    fn right_face(&self) -> f64 {
        self.width - PADDLE_INSET - PADDLE_WIDTH
    }

    /// Highest allowed paddle top edge.
    pub fn paddle_max_y(&self) -> f64 {
        self.height - PADDLE_HEIGHT
    }
}

/// A participant bound to one paddle.
///
/// `connection_id` is `None` while the participant is disconnected.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GamePlayer {
    pub identity: Identity,
    pub display_name: DisplayName,
    pub side: Side,
    pub connection_id: Option<ConnectionId>,
}

/// Result of seating an identity in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seat {
    pub side: Side,
    /// The identity already held this seat (reconnect).
    pub rejoined: bool,
}

/// What happened to a session when a participant left its room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Waiting session: the seat is free again.
    SeatFreed,
    /// Running match: paused until the participant comes back.
    Paused,
    /// Paused or finished session: the participant is only marked offline.
    Detached,
    NotParticipant,
}

/// Observable effects of one simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickOutcome {
    pub advanced: bool,
    pub wall_bounce: bool,
    pub paddle_contact: Option<Side>,
    pub scored: Option<Side>,
    /// A side has reached `max_score`; the caller must end the match.
    pub match_point: bool,
}

/// One match.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    pub id: GameId,
    pub status: GameStatus,
    pub host: Identity,
    pub settings: GameSettings,
    pub players: Vec<GamePlayer>,
    pub ball: Ball,
    pub paddles: Paddles,
    pub field: Field,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    pub winner: Option<Side>,
    pub paused_by: Option<Identity>,
    #[serde(skip)]
    loop_generation: u64,
}

impl GameSession {
    pub fn new(id: GameId, host: Identity, settings: GameSettings, created_at: Timestamp) -> Self {
        let field = Field::default();
        Self {
            id,
            status: GameStatus::Waiting,
            host,
            settings,
            players: Vec::with_capacity(2),
            ball: Ball::serve(&field, settings.ball_speed),
            paddles: Paddles {
                left: Paddle::centered(&field),
                right: Paddle::centered(&field),
            },
            field,
            created_at,
            started_at: None,
            finished_at: None,
            winner: None,
            paused_by: None,
            loop_generation: 0,
        }
    }

    /// Seat an identity: left if nobody is seated yet, otherwise the free side.
    pub fn seat(
        &mut self,
        identity: Identity,
        display_name: DisplayName,
        connection_id: ConnectionId,
    ) -> Result<Seat, GameError> {
        if self.status == GameStatus::Finished {
            return Err(GameError::Finished(self.id.clone()));
        }

        if let Some(player) = self.players.iter_mut().find(|p| p.identity == identity) {
            player.connection_id = Some(connection_id);
            return Ok(Seat {
                side: player.side,
                rejoined: true,
            });
        }

        if self.players.len() >= 2 {
            return Err(GameError::SessionFull(self.id.clone()));
        }

        let side = match self.players.first() {
            None => Side::Left,
            Some(seated) => seated.side.opposite(),
        };
        self.players.push(GamePlayer {
            identity,
            display_name,
            side,
            connection_id: Some(connection_id),
        });
        Ok(Seat {
            side,
            rejoined: false,
        })
    }

    /// Both seats are taken by connected participants and the match can run.
    pub fn can_start(&self) -> bool {
        matches!(self.status, GameStatus::Waiting | GameStatus::Paused)
            && self.players.len() == 2
            && self.players.iter().all(|p| p.connection_id.is_some())
    }

    /// Switch to `playing` and return the generation the new tick loop must carry.
    pub fn start(&mut self, now: Timestamp) -> u64 {
        self.status = GameStatus::Playing;
        self.started_at.get_or_insert(now);
        self.paused_by = None;
        self.loop_generation += 1;
        self.loop_generation
    }

    /// Whether a tick loop started with `generation` still drives this session.
    pub fn is_driven_by(&self, generation: u64) -> bool {
        self.status == GameStatus::Playing && self.loop_generation == generation
    }

    /// Advance the simulation by `dt` seconds (capped at [`MAX_TICK_SECONDS`]).
    ///
    /// Does nothing unless the session is `playing`.
    pub fn step(&mut self, dt: f64) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if self.status != GameStatus::Playing {
            return outcome;
        }
        outcome.advanced = true;

        let dt = if dt.is_finite() {
            dt.clamp(0.0, MAX_TICK_SECONDS)
        } else {
            0.0
        };
        let field = self.field;
        let prev_x = self.ball.x;
        let ball = &mut self.ball;
        ball.x += ball.vx * dt;
        ball.y += ball.vy * dt;

        if ball.y <= 0.0 && ball.vy < 0.0 {
            ball.y = (-ball.y).min(field.height);
            ball.vy = -ball.vy;
            outcome.wall_bounce = true;
        } else if ball.y >= field.height && ball.vy > 0.0 {
            ball.y = (2.0 * field.height - ball.y).max(0.0);
            ball.vy = -ball.vy;
            outcome.wall_bounce = true;
        }

        let left_face = field.left_face();
        let right_face = field.right_face();
        if ball.vx < 0.0
            && prev_x >= left_face
            && ball.x < left_face
            && self.paddles.left.covers(ball.y)
        {
            ball.x = 2.0 * left_face - ball.x;
            ball.vx = -ball.vx;
            outcome.paddle_contact = Some(Side::Left);
        } else if ball.vx > 0.0
            && prev_x <= right_face
            && ball.x > right_face
            && self.paddles.right.covers(ball.y)
        {
            ball.x = 2.0 * right_face - ball.x;
            ball.vx = -ball.vx;
            outcome.paddle_contact = Some(Side::Right);
        } else if ball.x <= 0.0 {
            outcome.scored = Some(Side::Right);
        } else if ball.x >= field.width {
            outcome.scored = Some(Side::Left);
        }

        if let Some(side) = outcome.scored {
            self.paddles.get_mut(side).score += 1;
            self.ball.recenter(&field);
        }

        outcome.match_point = self.leading_score() >= self.settings.max_score;
        outcome
    }

    fn leading_score(&self) -> u32 {
        self.paddles.left.score.max(self.paddles.right.score)
    }

    /// Move the paddle of `identity` by `magnitude` × `paddle_speed`.
    ///
    /// `magnitude` is clamped to `[0, 1]`. The paddle's top edge always stays
    /// within `[0, field.height - PADDLE_HEIGHT]`.
    pub fn apply_paddle_input(
        &mut self,
        identity: &Identity,
        direction: PaddleDirection,
        magnitude: f64,
    ) -> Result<Side, GameError> {
        let side = self
            .side_of(identity)
            .ok_or_else(|| GameError::NotParticipant(identity.clone()))?;
        if !matches!(self.status, GameStatus::Waiting | GameStatus::Playing) {
            return Err(GameError::NotActive(self.id.clone()));
        }

        let magnitude = if magnitude.is_finite() {
            magnitude.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let max_y = self.field.paddle_max_y();
        let delta = direction.sign() * self.settings.paddle_speed * magnitude;
        let paddle = self.paddles.get_mut(side);
        paddle.y = (paddle.y + delta).clamp(0.0, max_y);
        Ok(side)
    }

    /// End the match. Returns the winning side, or `None` if it already ended.
    pub fn finish(&mut self, now: Timestamp) -> Option<Side> {
        if self.status == GameStatus::Finished {
            return None;
        }
        let winner = if self.paddles.left.score >= self.paddles.right.score {
            Side::Left
        } else {
            Side::Right
        };
        self.status = GameStatus::Finished;
        self.finished_at = Some(now);
        self.winner = Some(winner);
        Some(winner)
    }

    /// Mark a participant as disconnected. Pauses a running match.
    ///
    /// Returns `true` when this call paused the match.
    pub fn disconnect(&mut self, identity: &Identity) -> bool {
        let Some(player) = self.players.iter_mut().find(|p| &p.identity == identity) else {
            return false;
        };
        player.connection_id = None;
        if self.status == GameStatus::Playing {
            self.status = GameStatus::Paused;
            self.paused_by = Some(identity.clone());
            true
        } else {
            false
        }
    }

    /// A participant left the game room without disconnecting.
    pub fn release(&mut self, identity: &Identity) -> Release {
        if !self.is_participant(identity) {
            return Release::NotParticipant;
        }
        match self.status {
            GameStatus::Waiting => {
                self.players.retain(|p| &p.identity != identity);
                Release::SeatFreed
            }
            GameStatus::Playing => {
                self.disconnect(identity);
                Release::Paused
            }
            GameStatus::Paused | GameStatus::Finished => {
                self.disconnect(identity);
                Release::Detached
            }
        }
    }

    pub fn side_of(&self, identity: &Identity) -> Option<Side> {
        self.player(identity).map(|p| p.side)
    }

    pub fn player(&self, identity: &Identity) -> Option<&GamePlayer> {
        self.players.iter().find(|p| &p.identity == identity)
    }

    pub fn player_on(&self, side: Side) -> Option<&GamePlayer> {
        self.players.iter().find(|p| p.side == side)
    }

    pub fn is_participant(&self, identity: &Identity) -> bool {
        self.player(identity).is_some()
    }
}
