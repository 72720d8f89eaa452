use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, warn};

use crate::{
    models::{
        game::{
            CapturedPieces, Color, EndReason, Game, GameResult, GameStatus, RatingChange,
            TimeControl,
        },
        move_request::MoveRequest,
        user::User,
    },
    repositories::{
        errors::{
            game_repository_errors::GameRepositoryError,
            user_repository_errors::UserRepositoryError,
        },
        game_repository::GameRepository,
        user_repository::{RatingUpdate, UserRepository},
    },
    services::{
        chess_service::{Position, PositionFlags, Termination},
        errors::game_session_service_errors::GameSessionServiceError,
        rating_service::{update_ratings, Outcome},
        session_registry::{LiveSession, SessionRegistry, SessionState},
    },
};

/// Attempts to open a usable session before giving up. A session only
/// becomes unusable when a commit fails, after which it is rebuilt.
const SESSION_ATTEMPTS: usize = 3;

const HISTORY_LIMIT: usize = 50;

/// Everything a client needs to render a game from scratch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameSnapshot {
    pub game_id: String,
    pub player_white_id: String,
    pub player_black_id: String,
    pub time_control: TimeControl,
    pub fen: String,
    pub turn: Color,
    #[serde(flatten)]
    pub flags: PositionFlags,
    pub move_history: Vec<String>,
    pub captured_pieces: CapturedPieces,
    pub time_remaining_white: u64,
    pub time_remaining_black: u64,
    pub status: GameStatus,
    pub end_reason: Option<EndReason>,
    pub result: GameResult,
    pub winner: Option<String>,
    pub rating_change: Option<RatingChange>,
    pub draw_offer: Option<Color>,
}

impl GameSnapshot {
    fn of(game: &Game, position: &Position, draw_offer: Option<Color>) -> Self {
        GameSnapshot {
            game_id: game.game_id.clone(),
            player_white_id: game.player_white_id.clone(),
            player_black_id: game.player_black_id.clone(),
            time_control: game.time_control,
            fen: position.fen(),
            turn: position.side_to_move(),
            flags: position.flags(),
            move_history: game.move_history.clone(),
            captured_pieces: game.captured_pieces.clone(),
            time_remaining_white: game.time_remaining_white,
            time_remaining_black: game.time_remaining_black,
            status: game.status,
            end_reason: game.end_reason,
            result: game.result,
            winner: game.winner.clone(),
            rating_change: game.rating_change,
            draw_offer,
        }
    }

    fn from_state(state: &SessionState) -> Self {
        GameSnapshot::of(&state.game, &state.position, state.draw_offer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameOver {
    pub winner: Option<String>,
    pub winner_color: Option<Color>,
    pub reason: EndReason,
    pub result: GameResult,
    pub rating_change: Option<RatingChange>,
    pub game: GameSnapshot,
}

impl GameOver {
    fn from_state(state: &SessionState) -> Option<Self> {
        let game = &state.game;
        let reason = game.end_reason?;
        if !game.is_completed() {
            return None;
        }
        Some(GameOver {
            winner: game.winner.clone(),
            winner_color: game.winner.as_deref().and_then(|w| game.color_of(w)),
            reason,
            result: game.result,
            rating_change: game.rating_change,
            game: GameSnapshot::from_state(state),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveOutcome {
    pub san: String,
    pub uci: String,
    pub mover: Color,
    pub captured: Option<String>,
    pub snapshot: GameSnapshot,
    pub game_over: Option<GameOver>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResignOutcome {
    pub resigned: Color,
    pub game_over: GameOver,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClockOutcome {
    pub time_remaining_white: u64,
    pub time_remaining_black: u64,
    pub game_over: Option<GameOver>,
}

/// Authoritative game logic for live sessions: turn order, move validation,
/// draw offers, clocks and completion with rating updates.
pub struct GameSessionService {
    registry: Arc<SessionRegistry>,
    games: Arc<dyn GameRepository + Send + Sync>,
    users: Arc<dyn UserRepository + Send + Sync>,
}

impl GameSessionService {
    pub fn new(
        registry: Arc<SessionRegistry>,
        games: Arc<dyn GameRepository + Send + Sync>,
        users: Arc<dyn UserRepository + Send + Sync>,
    ) -> Self {
        GameSessionService {
            registry,
            games,
            users,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Registers `user_id` as connected to the game and returns the full
    /// snapshot. Completed games are served straight from the stored record.
    pub async fn join(
        &self,
        game_id: &str,
        user_id: &str,
    ) -> Result<GameSnapshot, GameSessionServiceError> {
        match self.open(game_id).await {
            Ok((session, state)) => {
                if !state.game.is_participant(user_id) {
                    return Err(GameSessionServiceError::Unauthorized);
                }
                if session.add_participant(user_id) {
                    info!("User {} joined game {}", user_id, game_id);
                }
                Ok(GameSnapshot::from_state(&state))
            }
            Err(GameSessionServiceError::GameNotActive) => {
                self.stored_snapshot(game_id, user_id).await
            }
            Err(e) => Err(e),
        }
    }

    /// Full snapshot for a participant, without changing connection state.
    pub async fn snapshot(
        &self,
        game_id: &str,
        user_id: &str,
    ) -> Result<GameSnapshot, GameSessionServiceError> {
        match self.open(game_id).await {
            Ok((_, state)) => {
                if !state.game.is_participant(user_id) {
                    return Err(GameSessionServiceError::Unauthorized);
                }
                Ok(GameSnapshot::from_state(&state))
            }
            Err(GameSessionServiceError::GameNotActive) => {
                self.stored_snapshot(game_id, user_id).await
            }
            Err(e) => Err(e),
        }
    }

    /// Drops `user_id` from the session's participants. A completed session
    /// with nobody left is evicted right away.
    pub fn leave(&self, game_id: &str, user_id: &str) {
        if let Some(session) = self.registry.get(game_id) {
            session.remove_participant(user_id);
            if session.is_completed() && !session.has_participants() {
                self.registry.discard(&session);
            }
        }
    }

    /// The caller's active and completed games, most recently updated first.
    pub async fn history(&self, user_id: &str) -> Result<Vec<Game>, GameSessionServiceError> {
        Ok(self.games.find_games_for_user(user_id, HISTORY_LIMIT).await?)
    }

    /// The stored record of a game, readable by its two players only.
    pub async fn game_record(
        &self,
        game_id: &str,
        user_id: &str,
    ) -> Result<Game, GameSessionServiceError> {
        let game = self
            .games
            .get_game(game_id)
            .await?
            .ok_or(GameSessionServiceError::GameNotFound)?;
        if !game.is_participant(user_id) {
            return Err(GameSessionServiceError::Unauthorized);
        }
        Ok(game)
    }

    pub async fn make_move(
        &self,
        game_id: &str,
        user_id: &str,
        request: &MoveRequest,
    ) -> Result<MoveOutcome, GameSessionServiceError> {
        let (session, mut state) = self.open(game_id).await?;
        let color = Self::active_color(&state, user_id)?;
        if state.position.side_to_move() != color {
            return Err(GameSessionServiceError::NotYourTurn);
        }

        let applied = state.position.apply(request)?;

        let mut next = state.game.clone();
        next.move_history.push(applied.san.clone());
        next.fen_board = applied.position.fen();
        if let Some(piece) = &applied.captured {
            next.captured_pieces.record(color, piece);
        }

        let ending = match applied.position.termination() {
            Some(Termination::Checkmate) => Some((EndReason::Checkmate, Some(color))),
            Some(Termination::Stalemate) => Some((EndReason::Stalemate, None)),
            Some(_) => Some((EndReason::Draw, None)),
            None => None,
        };
        if let Some((reason, winner)) = ending {
            self.finish(&mut next, reason, winner).await?;
        }

        self.commit(&session, &mut state, next, Some(applied.position))
            .await?;
        state.draw_offer = None;
        debug!(
            "Game {}: {} played {} ({})",
            game_id, color, applied.san, applied.uci
        );

        let game_over = self.after_completion(&session, &state).await;
        Ok(MoveOutcome {
            san: applied.san,
            uci: applied.uci,
            mover: color,
            captured: applied.captured,
            snapshot: GameSnapshot::from_state(&state),
            game_over,
        })
    }

    pub async fn resign(
        &self,
        game_id: &str,
        user_id: &str,
    ) -> Result<ResignOutcome, GameSessionServiceError> {
        let (session, mut state) = self.open(game_id).await?;
        let color = Self::active_color(&state, user_id)?;

        let mut next = state.game.clone();
        self.finish(&mut next, EndReason::Resignation, Some(color.opponent()))
            .await?;
        self.commit(&session, &mut state, next, None).await?;
        info!("Game {}: {} resigned", game_id, color);

        let game_over = self
            .after_completion(&session, &state)
            .await
            .ok_or(GameSessionServiceError::GameNotActive)?;
        Ok(ResignOutcome {
            resigned: color,
            game_over,
        })
    }

    /// Records a draw offer from the requester. Nothing is persisted.
    pub async fn offer_draw(
        &self,
        game_id: &str,
        user_id: &str,
    ) -> Result<Color, GameSessionServiceError> {
        let (_, mut state) = self.open(game_id).await?;
        let color = Self::active_color(&state, user_id)?;
        state.draw_offer = Some(color);
        debug!("Game {}: {} offered a draw", game_id, color);
        Ok(color)
    }

    pub async fn accept_draw(
        &self,
        game_id: &str,
        user_id: &str,
    ) -> Result<GameOver, GameSessionServiceError> {
        let (session, mut state) = self.open(game_id).await?;
        let color = Self::active_color(&state, user_id)?;
        if state.draw_offer != Some(color.opponent()) {
            return Err(GameSessionServiceError::NoDrawOffer);
        }

        let mut next = state.game.clone();
        self.finish(&mut next, EndReason::Draw, None).await?;
        self.commit(&session, &mut state, next, None).await?;
        state.draw_offer = None;
        info!("Game {}: draw agreed", game_id);

        self.after_completion(&session, &state)
            .await
            .ok_or(GameSessionServiceError::GameNotActive)
    }

    /// Clears the opponent's pending offer and returns the color that made it.
    pub async fn decline_draw(
        &self,
        game_id: &str,
        user_id: &str,
    ) -> Result<Color, GameSessionServiceError> {
        let (_, mut state) = self.open(game_id).await?;
        let color = Self::active_color(&state, user_id)?;
        if state.draw_offer != Some(color.opponent()) {
            return Err(GameSessionServiceError::NoDrawOffer);
        }
        state.draw_offer = None;
        Ok(color.opponent())
    }

    /// Applies a client clock report. Remaining time never increases; a side
    /// reaching zero loses on time within this call.
    pub async fn update_clock(
        &self,
        game_id: &str,
        user_id: &str,
        white_seconds: u64,
        black_seconds: u64,
    ) -> Result<ClockOutcome, GameSessionServiceError> {
        let (session, mut state) = self.open(game_id).await?;
        Self::active_color(&state, user_id)?;

        let mut next = state.game.clone();
        next.time_remaining_white = next.time_remaining_white.min(white_seconds);
        next.time_remaining_black = next.time_remaining_black.min(black_seconds);

        let flagged = match (next.time_remaining_white, next.time_remaining_black) {
            (0, 0) => Some(state.position.side_to_move()),
            (0, _) => Some(Color::White),
            (_, 0) => Some(Color::Black),
            _ => None,
        };
        if let Some(loser) = flagged {
            self.finish(&mut next, EndReason::Timeout, Some(loser.opponent()))
                .await?;
            info!("Game {}: {} ran out of time", game_id, loser);
        }

        if next != state.game {
            self.commit(&session, &mut state, next, None).await?;
        }

        let game_over = self.after_completion(&session, &state).await;
        Ok(ClockOutcome {
            time_remaining_white: state.game.time_remaining_white,
            time_remaining_black: state.game.time_remaining_black,
            game_over,
        })
    }

    /// Locks a usable session for the game, rebuilding it if the cached one
    /// was invalidated by a failed commit.
    async fn open(
        &self,
        game_id: &str,
    ) -> Result<(Arc<LiveSession>, OwnedMutexGuard<SessionState>), GameSessionServiceError>
    {
        for _ in 0..SESSION_ATTEMPTS {
            let session = self.registry.get_or_create(game_id).await?;
            let state = session.lock().await;
            if !state.invalidated {
                session.touch();
                return Ok((session, state));
            }
            drop(state);
            self.registry.discard(&session);
        }
        Err(GameSessionServiceError::RepositoryError(
            GameRepositoryError::VersionConflict,
        ))
    }

    async fn stored_snapshot(
        &self,
        game_id: &str,
        user_id: &str,
    ) -> Result<GameSnapshot, GameSessionServiceError> {
        let game = self
            .games
            .get_game(game_id)
            .await?
            .ok_or(GameSessionServiceError::GameNotFound)?;
        if !game.is_participant(user_id) {
            return Err(GameSessionServiceError::Unauthorized);
        }
        let position = Position::from_fen(&game.fen_board)?;
        Ok(GameSnapshot::of(&game, &position, None))
    }

    /// The requester's color, provided the game still accepts actions.
    fn active_color(state: &SessionState, user_id: &str) -> Result<Color, GameSessionServiceError> {
        let color = state
            .game
            .color_of(user_id)
            .ok_or(GameSessionServiceError::Unauthorized)?;
        if state.game.status != GameStatus::Active {
            return Err(GameSessionServiceError::GameNotActive);
        }
        Ok(color)
    }

    /// Completes `game` and freezes the rating change into it, so both are
    /// written by the same commit. A player without a user record completes
    /// the game unrated; any other lookup failure aborts the action.
    async fn finish(
        &self,
        game: &mut Game,
        reason: EndReason,
        winner: Option<Color>,
    ) -> Result<(), GameSessionServiceError> {
        if !game.complete(reason, winner) {
            return Ok(());
        }
        let outcome = match winner {
            Some(Color::White) => Outcome::WhiteWins,
            Some(Color::Black) => Outcome::BlackWins,
            None => Outcome::Draw,
        };
        match self.rating_change(game, outcome).await {
            Ok(change) => game.rating_change = Some(change),
            Err(e @ GameSessionServiceError::NoRatingData(_)) => warn!(
                "Game {} completes without a rating change: {}",
                game.game_id, e
            ),
            Err(e) => return Err(e),
        }
        Ok(())
    }

    async fn rating_change(
        &self,
        game: &Game,
        outcome: Outcome,
    ) -> Result<RatingChange, GameSessionServiceError> {
        let white = self.rated_user(&game.player_white_id).await?;
        let black = self.rated_user(&game.player_black_id).await?;

        let (white_after, black_after) = update_ratings(white.rating, black.rating, outcome);
        Ok(RatingChange {
            white_before: white.rating,
            white_after,
            black_before: black.rating,
            black_after,
        })
    }

    async fn rated_user(&self, user_id: &str) -> Result<User, GameSessionServiceError> {
        self.users.get_user_by_id(user_id).await.map_err(|e| match e {
            UserRepositoryError::NotFound => {
                GameSessionServiceError::NoRatingData(user_id.to_string())
            }
            other => GameSessionServiceError::UserRepositoryError(other),
        })
    }

    /// Persists `next` as the new version of the game and only then swaps it
    /// into the session. A failed write invalidates the session so the next
    /// access replays the stored record.
    async fn commit(
        &self,
        session: &Arc<LiveSession>,
        state: &mut SessionState,
        mut next: Game,
        position: Option<Position>,
    ) -> Result<(), GameSessionServiceError> {
        let expected = state.game.version;
        next.version = expected + 1;
        next.updated_at = Utc::now();

        let mut written = self.games.update_game(&next, expected).await;
        if let Err(e) = &written {
            if *e != GameRepositoryError::VersionConflict {
                warn!("Retrying commit for game {}: {}", next.game_id, e);
                written = self.games.update_game(&next, expected).await;
            }
        }

        if let Err(e) = written {
            error!("Commit for game {} failed: {}", next.game_id, e);
            state.invalidated = true;
            self.registry.discard(session);
            return Err(e.into());
        }

        state.game = next;
        if let Some(position) = position {
            state.position = position;
        }
        Ok(())
    }

    /// Runs once per game, right after the completing commit: applies both
    /// rating changes together and marks the session for eviction. Changes
    /// are applied as deltas so games finishing at once never overwrite
    /// each other's result.
    async fn after_completion(
        &self,
        session: &LiveSession,
        state: &SessionState,
    ) -> Option<GameOver> {
        let game_over = GameOver::from_state(state)?;
        if session.is_completed() {
            return Some(game_over);
        }
        session.mark_completed();
        info!(
            "Game {} completed: {:?} ({:?})",
            state.game.game_id, game_over.result, game_over.reason
        );

        if let Some(change) = state.game.rating_change {
            let updates = [
                RatingUpdate {
                    user_id: state.game.player_white_id.clone(),
                    delta: change.white_after - change.white_before,
                },
                RatingUpdate {
                    user_id: state.game.player_black_id.clone(),
                    delta: change.black_after - change.black_before,
                },
            ];
            if let Err(e) = self.users.update_ratings(&updates).await {
                error!(
                    "Rating update for game {} failed: {}",
                    state.game.game_id, e
                );
            }
        }
        Some(game_over)
    }
}
