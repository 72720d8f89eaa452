use chess::{BitBoard, Board, BoardStatus, ChessMove, MoveGen, Piece, Square, EMPTY};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::{
    models::{game::Color, move_request::MoveRequest},
    services::errors::chess_service_errors::ChessServiceError,
};

/// Half-moves without a capture or pawn move after which the game is drawn.
const FIFTY_MOVE_HALFMOVES: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    ThreefoldRepetition,
    FiftyMoveRule,
}

/// Check and termination flags of a position, as sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PositionFlags {
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_stalemate: bool,
    pub is_draw: bool,
    pub is_game_over: bool,
}

/// A chess position together with the move counters and position history
/// the rules engine itself does not track.
#[derive(Clone)]
pub struct Position {
    board: Board,
    halfmove_clock: u32,
    fullmove_number: u32,
    history: Vec<u64>,
}

#[derive(Debug, Clone)]
pub struct AppliedMove {
    pub position: Position,
    pub san: String,
    pub uci: String,
    pub mover: Color,
    /// Lowercase letter of the piece taken by this move, if any.
    pub captured: Option<String>,
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Position").field("fen", &self.fen()).finish()
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::new()
    }
}

impl Position {
    pub fn new() -> Self {
        let board = Board::default();
        Position {
            board,
            halfmove_clock: 0,
            fullmove_number: 1,
            history: vec![board.get_hash()],
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, ChessServiceError> {
        let board = Board::from_str(fen)
            .map_err(|e| ChessServiceError::InvalidPosition(format!("Invalid FEN: {}", e)))?;
        let fields: Vec<&str> = fen.split_whitespace().collect();
        let halfmove_clock = fields.get(4).and_then(|s| s.parse().ok()).unwrap_or(0);
        let fullmove_number = fields.get(5).and_then(|s| s.parse().ok()).unwrap_or(1);
        Ok(Position {
            board,
            halfmove_clock,
            fullmove_number,
            history: vec![board.get_hash()],
        })
    }

    /// Rebuilds a position from the initial setup by applying `moves` in
    /// order. The same move list always yields the same position.
    pub fn replay(moves: &[String]) -> Result<Self, ChessServiceError> {
        let mut position = Position::new();
        for (index, notation) in moves.iter().enumerate() {
            position = position
                .apply(&MoveRequest::Notation(notation.clone()))
                .map_err(|e| {
                    ChessServiceError::InvalidPosition(format!(
                        "Stored move {} ({}) cannot be replayed: {}",
                        index + 1,
                        notation,
                        e
                    ))
                })?
                .position;
        }
        Ok(position)
    }

    pub fn fen(&self) -> String {
        let board_fen = format!("{}", self.board);
        let placement: Vec<&str> = board_fen.split_whitespace().take(4).collect();
        format!(
            "{} {} {}",
            placement.join(" "),
            self.halfmove_clock,
            self.fullmove_number
        )
    }

    pub fn side_to_move(&self) -> Color {
        from_board_color(self.board.side_to_move())
    }

    pub fn is_check(&self) -> bool {
        *self.board.checkers() != EMPTY
    }

    pub fn is_checkmate(&self) -> bool {
        self.board.status() == BoardStatus::Checkmate
    }

    pub fn is_stalemate(&self) -> bool {
        self.board.status() == BoardStatus::Stalemate
    }

    pub fn is_insufficient_material(&self) -> bool {
        insufficient_material(&self.board)
    }

    pub fn is_threefold_repetition(&self) -> bool {
        let current = self.board.get_hash();
        self.history.iter().filter(|h| **h == current).count() >= 3
    }

    pub fn is_fifty_move_draw(&self) -> bool {
        self.halfmove_clock >= FIFTY_MOVE_HALFMOVES
    }

    /// Draw by stalemate or by rule.
    pub fn is_draw(&self) -> bool {
        matches!(
            self.termination(),
            Some(Termination::Stalemate)
                | Some(Termination::InsufficientMaterial)
                | Some(Termination::ThreefoldRepetition)
                | Some(Termination::FiftyMoveRule)
        )
    }

    /// The first ending condition that holds, checked in the order
    /// checkmate, stalemate, insufficient material, repetition, fifty moves.
    pub fn termination(&self) -> Option<Termination> {
        match self.board.status() {
            BoardStatus::Checkmate => return Some(Termination::Checkmate),
            BoardStatus::Stalemate => return Some(Termination::Stalemate),
            BoardStatus::Ongoing => {}
        }
        if self.is_insufficient_material() {
            Some(Termination::InsufficientMaterial)
        } else if self.is_threefold_repetition() {
            Some(Termination::ThreefoldRepetition)
        } else if self.is_fifty_move_draw() {
            Some(Termination::FiftyMoveRule)
        } else {
            None
        }
    }

    pub fn flags(&self) -> PositionFlags {
        let termination = self.termination();
        PositionFlags {
            is_check: self.is_check(),
            is_checkmate: termination == Some(Termination::Checkmate),
            is_stalemate: termination == Some(Termination::Stalemate),
            is_draw: self.is_draw(),
            is_game_over: termination.is_some(),
        }
    }

    /// Legal moves in coordinate notation (for UI hints).
    pub fn legal_moves(&self) -> Vec<String> {
        MoveGen::new_legal(&self.board).map(uci_of).collect()
    }

    /// Validates `request` against the position and returns the resulting
    /// position. `self` is left untouched.
    pub fn apply(&self, request: &MoveRequest) -> Result<AppliedMove, ChessServiceError> {
        if self.termination().is_some() {
            return Err(ChessServiceError::GameOver(
                "Game is already over".to_string(),
            ));
        }

        let chess_move = self.resolve(request)?;
        let mover = self.side_to_move();
        let piece = self.board.piece_on(chess_move.get_source()).ok_or_else(|| {
            ChessServiceError::IllegalMove("No piece on the source square".to_string())
        })?;
        let captured = captured_piece(&self.board, chess_move, piece);
        let san = san_of(&self.board, chess_move);

        let board = self.board.make_move_new(chess_move);
        let halfmove_clock = if piece == Piece::Pawn || captured.is_some() {
            0
        } else {
            self.halfmove_clock + 1
        };
        let fullmove_number = match mover {
            Color::Black => self.fullmove_number + 1,
            Color::White => self.fullmove_number,
        };
        let mut history = self.history.clone();
        history.push(board.get_hash());

        Ok(AppliedMove {
            position: Position {
                board,
                halfmove_clock,
                fullmove_number,
                history,
            },
            san,
            uci: uci_of(chess_move),
            mover,
            captured: captured.map(|p| piece_letter(p).to_ascii_lowercase().to_string()),
        })
    }

    fn resolve(&self, request: &MoveRequest) -> Result<ChessMove, ChessServiceError> {
        match request {
            MoveRequest::Squares {
                from,
                to,
                promotion,
            } => self.resolve_squares(from, to, promotion.as_deref()),
            MoveRequest::Notation(text) => self.resolve_notation(text),
        }
    }

    fn resolve_squares(
        &self,
        from: &str,
        to: &str,
        promotion: Option<&str>,
    ) -> Result<ChessMove, ChessServiceError> {
        let from_sq = Square::from_str(from)
            .map_err(|_| ChessServiceError::ValidationError("Invalid from square".to_string()))?;
        let to_sq = Square::from_str(to)
            .map_err(|_| ChessServiceError::ValidationError("Invalid to square".to_string()))?;

        let promotion = match promotion {
            Some(p) => Some(parse_promotion(p)?),
            None if self.is_promotion_square(from_sq, to_sq) => Some(Piece::Queen),
            None => None,
        };

        let chess_move = ChessMove::new(from_sq, to_sq, promotion);
        if MoveGen::new_legal(&self.board).any(|m| m == chess_move) {
            Ok(chess_move)
        } else {
            Err(ChessServiceError::IllegalMove(
                "Move is not legal".to_string(),
            ))
        }
    }

    fn resolve_notation(&self, text: &str) -> Result<ChessMove, ChessServiceError> {
        let normalized = normalize_san(text);
        if normalized.is_empty() {
            return Err(ChessServiceError::ValidationError(
                "Move notation cannot be empty".to_string(),
            ));
        }

        if (normalized.len() == 4 || normalized.len() == 5) && normalized.is_ascii() {
            let from = &normalized[0..2];
            let to = &normalized[2..4];
            if Square::from_str(from).is_ok() && Square::from_str(to).is_ok() {
                let promotion = normalized.get(4..5);
                return self.resolve_squares(from, to, promotion);
            }
        }

        MoveGen::new_legal(&self.board)
            .find(|m| {
                let san = normalize_san(&san_of(&self.board, *m));
                san == normalized || san.replace('=', "") == normalized
            })
            .ok_or_else(|| ChessServiceError::IllegalMove(format!("{} is not legal", text)))
    }

    fn is_promotion_square(&self, from: Square, to: Square) -> bool {
        self.board.piece_on(from) == Some(Piece::Pawn)
            && (to.get_rank().to_index() == 0 || to.get_rank().to_index() == 7)
    }
}

fn from_board_color(color: chess::Color) -> Color {
    match color {
        chess::Color::White => Color::White,
        chess::Color::Black => Color::Black,
    }
}

fn parse_promotion(piece: &str) -> Result<Piece, ChessServiceError> {
    match piece.to_ascii_lowercase().as_str() {
        "q" => Ok(Piece::Queen),
        "r" => Ok(Piece::Rook),
        "b" => Ok(Piece::Bishop),
        "n" => Ok(Piece::Knight),
        _ => Err(ChessServiceError::ValidationError(
            "Invalid promotion piece".to_string(),
        )),
    }
}

fn piece_letter(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'P',
        Piece::Knight => 'N',
        Piece::Bishop => 'B',
        Piece::Rook => 'R',
        Piece::Queen => 'Q',
        Piece::King => 'K',
    }
}

fn file_char(square: Square) -> char {
    (b'a' + square.get_file().to_index() as u8) as char
}

fn rank_char(square: Square) -> char {
    (b'1' + square.get_rank().to_index() as u8) as char
}

fn uci_of(chess_move: ChessMove) -> String {
    let mut uci = format!("{}{}", chess_move.get_source(), chess_move.get_dest());
    if let Some(promotion) = chess_move.get_promotion() {
        uci.push(piece_letter(promotion).to_ascii_lowercase());
    }
    uci
}

/// Strips check and annotation suffixes and accepts zeros for castling.
fn normalize_san(text: &str) -> String {
    let trimmed = text
        .trim()
        .trim_end_matches(|c: char| matches!(c, '+' | '#' | '!' | '?'));
    trimmed.replace("0-0-0", "O-O-O").replace("0-0", "O-O")
}

fn captured_piece(board: &Board, chess_move: ChessMove, mover: Piece) -> Option<Piece> {
    match board.piece_on(chess_move.get_dest()) {
        Some(piece) => Some(piece),
        // en passant: a pawn changing file onto an empty square
        None if mover == Piece::Pawn
            && chess_move.get_source().get_file() != chess_move.get_dest().get_file() =>
        {
            Some(Piece::Pawn)
        }
        None => None,
    }
}

/// Standard algebraic notation of a legal move in `board`.
fn san_of(board: &Board, chess_move: ChessMove) -> String {
    let source = chess_move.get_source();
    let dest = chess_move.get_dest();
    let piece = match board.piece_on(source) {
        Some(piece) => piece,
        None => return uci_of(chess_move),
    };

    let file_distance =
        (source.get_file().to_index() as i32 - dest.get_file().to_index() as i32).abs();
    let mut san = if piece == Piece::King && file_distance == 2 {
        if dest.get_file().to_index() > source.get_file().to_index() {
            "O-O".to_string()
        } else {
            "O-O-O".to_string()
        }
    } else {
        let is_capture = captured_piece(board, chess_move, piece).is_some();
        let mut san = String::new();
        if piece == Piece::Pawn {
            if is_capture {
                san.push(file_char(source));
                san.push('x');
            }
            san.push_str(&dest.to_string());
            if let Some(promotion) = chess_move.get_promotion() {
                san.push('=');
                san.push(piece_letter(promotion));
            }
        } else {
            san.push(piece_letter(piece));
            san.push_str(&disambiguation(board, chess_move, piece));
            if is_capture {
                san.push('x');
            }
            san.push_str(&dest.to_string());
        }
        san
    };

    let next = board.make_move_new(chess_move);
    if next.status() == BoardStatus::Checkmate {
        san.push('#');
    } else if *next.checkers() != EMPTY {
        san.push('+');
    }
    san
}

fn disambiguation(board: &Board, chess_move: ChessMove, piece: Piece) -> String {
    let source = chess_move.get_source();
    let rivals: Vec<Square> = MoveGen::new_legal(board)
        .filter(|m| {
            m.get_dest() == chess_move.get_dest()
                && m.get_source() != source
                && board.piece_on(m.get_source()) == Some(piece)
        })
        .map(|m| m.get_source())
        .collect();

    if rivals.is_empty() {
        return String::new();
    }
    let shares_file = rivals.iter().any(|s| s.get_file() == source.get_file());
    let shares_rank = rivals.iter().any(|s| s.get_rank() == source.get_rank());
    if !shares_file {
        file_char(source).to_string()
    } else if !shares_rank {
        rank_char(source).to_string()
    } else {
        source.to_string()
    }
}

fn insufficient_material(board: &Board) -> bool {
    let heavy: BitBoard =
        *board.pieces(Piece::Pawn) | *board.pieces(Piece::Rook) | *board.pieces(Piece::Queen);
    if heavy != EMPTY {
        return false;
    }

    let knights = board.pieces(Piece::Knight).popcnt();
    let bishops = *board.pieces(Piece::Bishop);
    if knights + bishops.popcnt() <= 1 {
        return true;
    }
    if knights > 0 {
        return false;
    }

    // Only bishops left: drawn when they all stand on one square color.
    let mut shades =
        bishops.map(|sq| (sq.get_file().to_index() + sq.get_rank().to_index()) % 2);
    match shades.next() {
        Some(first) => shades.all(|shade| shade == first),
        None => true,
    }
}
