use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Clock budget handed to both sides of an unlimited game.
pub const UNLIMITED_TIME_SECONDS: u64 = 999_999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opponent(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeControlKind {
    #[serde(rename = "10min")]
    TenMinutes,
    #[serde(rename = "30min")]
    ThirtyMinutes,
    #[serde(rename = "60min")]
    SixtyMinutes,
    #[serde(rename = "custom")]
    Custom,
    #[serde(rename = "unlimited")]
    Unlimited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeControl {
    #[serde(rename = "type")]
    pub kind: TimeControlKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes: Option<u32>,
}

impl TimeControl {
    pub fn new(kind: TimeControlKind) -> Self {
        TimeControl {
            kind,
            minutes: None,
        }
    }

    pub fn custom(minutes: u32) -> Self {
        TimeControl {
            kind: TimeControlKind::Custom,
            minutes: Some(minutes),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match (self.kind, self.minutes) {
            (TimeControlKind::Custom, None) | (TimeControlKind::Custom, Some(0)) => {
                Err("Custom time control requires a positive number of minutes".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Two time controls pair in matchmaking only when they are the same type
    /// and, for custom controls, the same number of minutes.
    pub fn matches(&self, other: &TimeControl) -> bool {
        if self.kind != other.kind {
            return false;
        }
        self.kind != TimeControlKind::Custom || self.minutes == other.minutes
    }

    pub fn initial_seconds(&self) -> u64 {
        match self.kind {
            TimeControlKind::TenMinutes => 10 * 60,
            TimeControlKind::ThirtyMinutes => 30 * 60,
            TimeControlKind::SixtyMinutes => 60 * 60,
            TimeControlKind::Custom => u64::from(self.minutes.unwrap_or(0)) * 60,
            TimeControlKind::Unlimited => UNLIMITED_TIME_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    Checkmate,
    Resignation,
    Timeout,
    Draw,
    Stalemate,
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameResult {
    White,
    Black,
    Draw,
    Ongoing,
    Abandoned,
}

/// Pieces taken by each side, in capture order. `white` holds the black
/// pieces white has captured and vice versa.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedPieces {
    pub white: Vec<String>,
    pub black: Vec<String>,
}

impl CapturedPieces {
    pub fn record(&mut self, capturer: Color, piece: &str) {
        match capturer {
            Color::White => self.white.push(piece.to_string()),
            Color::Black => self.black.push(piece.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingChange {
    pub white_before: i32,
    pub white_after: i32,
    pub black_before: i32,
    pub black_after: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub game_id: String,
    pub player_white_id: String,
    pub player_black_id: String,
    pub time_control: TimeControl,
    pub move_history: Vec<String>,
    pub fen_board: String,
    pub time_remaining_white: u64,
    pub time_remaining_black: u64,
    pub status: GameStatus,
    pub end_reason: Option<EndReason>,
    pub result: GameResult,
    pub winner: Option<String>,
    pub captured_pieces: CapturedPieces,
    pub rating_change: Option<RatingChange>,
    pub version: u64,
    pub creation_time: DateTime<Utc>,
    /// Time of the last committed change.
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Game {
    /// A game that is immediately playable, as created by a match or an
    /// accepted challenge.
    pub fn new_active(white_id: &str, black_id: &str, time_control: TimeControl) -> Self {
        let now = Utc::now();
        let budget = time_control.initial_seconds();
        Game {
            game_id: Uuid::new_v4().to_string(),
            player_white_id: white_id.to_string(),
            player_black_id: black_id.to_string(),
            time_control,
            move_history: vec![],
            fen_board: STARTING_FEN.to_string(),
            time_remaining_white: budget,
            time_remaining_black: budget,
            status: GameStatus::Active,
            end_reason: None,
            result: GameResult::Ongoing,
            winner: None,
            captured_pieces: CapturedPieces::default(),
            rating_change: None,
            version: 0,
            creation_time: now,
            updated_at: now,
            started_at: Some(now),
            ended_at: None,
        }
    }

    /// Assigns colors with a fair coin flip and returns the color `first_id`
    /// ended up with.
    pub fn with_random_colors(
        first_id: &str,
        second_id: &str,
        time_control: TimeControl,
    ) -> (Self, Color) {
        if rand::thread_rng().gen_bool(0.5) {
            (Game::new_active(first_id, second_id, time_control), Color::White)
        } else {
            (Game::new_active(second_id, first_id, time_control), Color::Black)
        }
    }

    pub fn color_of(&self, user_id: &str) -> Option<Color> {
        if self.player_white_id == user_id {
            Some(Color::White)
        } else if self.player_black_id == user_id {
            Some(Color::Black)
        } else {
            None
        }
    }

    pub fn player_id(&self, color: Color) -> &str {
        match color {
            Color::White => &self.player_white_id,
            Color::Black => &self.player_black_id,
        }
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.color_of(user_id).is_some()
    }

    pub fn is_completed(&self) -> bool {
        self.status == GameStatus::Completed
    }

    /// Moves the game to its terminal state. A game that is already
    /// completed is left untouched and `false` is returned.
    pub fn complete(&mut self, reason: EndReason, winner: Option<Color>) -> bool {
        if self.is_completed() {
            return false;
        }
        self.status = GameStatus::Completed;
        self.end_reason = Some(reason);
        self.winner = winner.map(|color| self.player_id(color).to_string());
        self.result = match winner {
            Some(Color::White) => GameResult::White,
            Some(Color::Black) => GameResult::Black,
            None if reason == EndReason::Abandoned => GameResult::Abandoned,
            None => GameResult::Draw,
        };
        self.ended_at = Some(Utc::now());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_new_active_game_fields() {
        let game = Game::new_active("white", "black", TimeControl::new(TimeControlKind::TenMinutes));

        assert_eq!(game.fen_board, STARTING_FEN);
        assert_eq!(game.player_white_id, "white");
        assert_eq!(game.player_black_id, "black");
        assert!(game.move_history.is_empty());
        assert_eq!(game.status, GameStatus::Active);
        assert_eq!(game.result, GameResult::Ongoing);
        assert!(game.winner.is_none());
        assert_eq!(game.time_remaining_white, 600);
        assert_eq!(game.time_remaining_black, 600);
        assert_eq!(game.version, 0);
        assert!(game.started_at.is_some());
    }

    #[test]
    fn test_game_id_uniqueness() {
        let tc = TimeControl::new(TimeControlKind::Unlimited);
        let a = Game::new_active("p1", "p2", tc);
        let b = Game::new_active("p1", "p2", tc);

        assert_ne!(a.game_id, b.game_id);
    }

    #[test_case(TimeControl::new(TimeControlKind::TenMinutes), 600)]
    #[test_case(TimeControl::new(TimeControlKind::ThirtyMinutes), 1800)]
    #[test_case(TimeControl::new(TimeControlKind::SixtyMinutes), 3600)]
    #[test_case(TimeControl::custom(15), 900)]
    #[test_case(TimeControl::new(TimeControlKind::Unlimited), UNLIMITED_TIME_SECONDS)]
    fn test_initial_seconds(time_control: TimeControl, expected: u64) {
        assert_eq!(time_control.initial_seconds(), expected);
    }

    #[test]
    fn test_time_control_matching() {
        let ten = TimeControl::new(TimeControlKind::TenMinutes);
        let thirty = TimeControl::new(TimeControlKind::ThirtyMinutes);

        assert!(ten.matches(&ten));
        assert!(!ten.matches(&thirty));
        assert!(TimeControl::custom(5).matches(&TimeControl::custom(5)));
        assert!(!TimeControl::custom(5).matches(&TimeControl::custom(7)));
    }

    #[test]
    fn test_custom_time_control_requires_minutes() {
        let missing = TimeControl {
            kind: TimeControlKind::Custom,
            minutes: None,
        };

        assert!(missing.validate().is_err());
        assert!(TimeControl::custom(0).validate().is_err());
        assert!(TimeControl::custom(3).validate().is_ok());
    }

    #[test]
    fn test_random_colors_report_first_players_color() {
        for _ in 0..20 {
            let (game, color) =
                Game::with_random_colors("a", "b", TimeControl::new(TimeControlKind::TenMinutes));
            assert_eq!(game.player_id(color), "a");
            assert_eq!(game.player_id(color.opponent()), "b");
        }
    }

    #[test]
    fn test_complete_is_idempotent() {
        let mut game = Game::new_active("w", "b", TimeControl::new(TimeControlKind::TenMinutes));

        assert!(game.complete(EndReason::Checkmate, Some(Color::Black)));
        let first = game.clone();
        assert!(!game.complete(EndReason::Resignation, Some(Color::White)));

        assert_eq!(game, first);
        assert_eq!(game.winner.as_deref(), Some("b"));
        assert_eq!(game.result, GameResult::Black);
        assert_eq!(game.end_reason, Some(EndReason::Checkmate));
        assert!(game.ended_at.is_some());
    }

    #[test]
    fn test_complete_without_winner_is_draw() {
        let mut game = Game::new_active("w", "b", TimeControl::new(TimeControlKind::TenMinutes));

        game.complete(EndReason::Stalemate, None);

        assert_eq!(game.result, GameResult::Draw);
        assert!(game.winner.is_none());
    }

    #[test]
    fn test_color_of() {
        let game = Game::new_active("w", "b", TimeControl::new(TimeControlKind::TenMinutes));

        assert_eq!(game.color_of("w"), Some(Color::White));
        assert_eq!(game.color_of("b"), Some(Color::Black));
        assert_eq!(game.color_of("x"), None);
    }

    #[test]
    fn test_enum_serialization() {
        assert_eq!(serde_json::to_string(&GameStatus::Completed).unwrap(), "\"completed\"");
        assert_eq!(serde_json::to_string(&EndReason::Resignation).unwrap(), "\"resignation\"");
        assert_eq!(
            serde_json::to_string(&TimeControl::new(TimeControlKind::TenMinutes)).unwrap(),
            "{\"type\":\"10min\"}"
        );

        let custom: TimeControl = serde_json::from_str("{\"type\":\"custom\",\"minutes\":12}").unwrap();
        assert_eq!(custom, TimeControl::custom(12));
    }

    #[test]
    fn test_game_serialization_roundtrip() {
        let game = Game::new_active("w", "b", TimeControl::custom(3));

        let serialized = serde_json::to_string(&game).unwrap();
        assert!(serialized.contains("\"fen_board\""));
        assert!(serialized.contains("\"captured_pieces\""));

        let deserialized: Game = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, game);
    }
}
