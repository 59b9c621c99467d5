use std::fmt::Display;

use lazy_static::lazy_static;
use regex::Regex;

use crate::kalah::{Board, Move, ParseBoardError, Player};

lazy_static! {
    // <side> <elapsed O ms> <elapsed X ms> <time limit ms> <kgp board>
    static ref TOKEN_REGEX: Regex = Regex::new(
        r"^\s*(?P<side>[OX])\s+(?P<elapsed_o>\d+)\s+(?P<elapsed_x>\d+)\s+(?P<limit>\d+)\s+(?P<board><[^>]*>)\s*$"
    )
    .expect("position token regex is valid");
}

/*====================================================================================================================*/

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsePositionError {
    Syntax(String),
    Board(ParseBoardError),
}

impl Display for ParsePositionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParsePositionError::Syntax(token) => write!(f, "malformed position \"{}\"", token),
            ParsePositionError::Board(err) => write!(f, "malformed position: {}", err),
        }
    }
}

impl std::error::Error for ParsePositionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParsePositionError::Syntax(_) => None,
            ParsePositionError::Board(err) => Some(err),
        }
    }
}

impl From<ParseBoardError> for ParsePositionError {
    fn from(err: ParseBoardError) -> Self {
        ParsePositionError::Board(err)
    }
}

/*====================================================================================================================*/

/// Classification of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// game running, the given player is about to move
    Valid(Player),
    Win(Player),
    /// the given player used up their time
    Timeout(Player),
    Draw,
    Invalid,
}

impl Status {
    pub fn is_valid(&self) -> bool {
        matches!(self, Status::Valid(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Win(_) | Status::Timeout(_) | Status::Draw)
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Valid(player) => write!(f, "{} about to move", player),
            Status::Win(player) => write!(f, "{} won", player),
            Status::Timeout(player) => write!(f, "{} exceeded the time limit and lost", player),
            Status::Draw => write!(f, "Game ended in a draw"),
            Status::Invalid => write!(f, "Invalid position"),
        }
    }
}

/*====================================================================================================================*/

/// The complete state that travels over the broadcast channel: board, side to move and clocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    board: Board,
    to_move: Player,

    // indexed by Player::index
    elapsed_ms: [u64; 2],
    // 0 means unlimited
    time_limit_ms: u64,
}

impl Position {
    pub fn new(h: u8, s: u16, time_limit_ms: u64) -> Self {
        Position {
            board: Board::new(h, s),
            to_move: Player::White,
            elapsed_ms: [0, 0],
            time_limit_ms,
        }
    }

    pub fn from_token(token: &str) -> Result<Self, ParsePositionError> {
        let captures = TOKEN_REGEX
            .captures(token)
            .ok_or_else(|| ParsePositionError::Syntax(token.to_owned()))?;

        let number = |name: &str| {
            captures[name]
                .parse::<u64>()
                .map_err(|_| ParsePositionError::Syntax(token.to_owned()))
        };

        let to_move = captures["side"]
            .chars()
            .next()
            .and_then(Player::from_symbol)
            .ok_or_else(|| ParsePositionError::Syntax(token.to_owned()))?;

        Ok(Position {
            board: Board::from_kgp(&captures["board"])?,
            to_move,
            elapsed_ms: [number("elapsed_o")?, number("elapsed_x")?],
            time_limit_ms: number("limit")?,
        })
    }

    /// Replace this position with the one encoded in `token`. Left untouched if the token is malformed.
    pub fn load_token(&mut self, token: &str) -> Result<(), ParsePositionError> {
        *self = Position::from_token(token)?;
        Ok(())
    }

    pub fn to_token(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.to_move,
            self.elapsed_ms[0],
            self.elapsed_ms[1],
            self.time_limit_ms,
            self.board.to_kgp()
        )
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn to_move(&self) -> Player {
        self.to_move
    }

    pub fn elapsed_ms(&self, player: Player) -> u64 {
        self.elapsed_ms[player.index()]
    }

    pub fn status(&self) -> Status {
        if self.time_limit_ms > 0 {
            for player in [Player::White, Player::Black] {
                if self.elapsed_ms(player) > self.time_limit_ms {
                    return Status::Timeout(player);
                }
            }
        }

        if self.board.total_seeds() == 0 {
            return Status::Invalid;
        }

        if !self.board.has_legal_move() {
            let (white, black) = self.board.final_scores();

            return match white.cmp(&black) {
                std::cmp::Ordering::Greater => Status::Win(Player::White),
                std::cmp::Ordering::Less => Status::Win(Player::Black),
                std::cmp::Ordering::Equal => Status::Draw,
            };
        }

        Status::Valid(self.to_move)
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        self.board.legal_moves(self.to_move)
    }

    /// Board flipped so that the player to move is White.
    pub fn board_for_mover(&self) -> Board {
        let mut board = self.board.clone();
        if self.to_move == Player::Black {
            board.flip_board();
        }
        board
    }

    pub fn play_move(&mut self, move_: Move, elapsed_ms: u64) {
        debug_assert_eq!(move_.player(), self.to_move, "move by the wrong player");

        let clock = &mut self.elapsed_ms[self.to_move.index()];
        *clock = clock.saturating_add(elapsed_ms);

        let bonus_move = self.board.apply_move(move_);

        if !bonus_move {
            self.to_move = !self.to_move;
        }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.board)?;
        write!(
            f,
            "{} to move (O: {} ms, X: {} ms)",
            self.to_move, self.elapsed_ms[0], self.elapsed_ms[1]
        )
    }
}

/*====================================================================================================================*/

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{ParsePositionError, Position, Status};
    use crate::kalah::{Move, Player};

    #[test]
    fn test_token_round_trip() {
        let token = "X 1200 3400 60000 <3, 1, 2, 0, 4, 4, 3, 3, 3>";

        let position = Position::from_token(token).unwrap();

        assert_eq!(position.to_move(), Player::Black);
        assert_eq!(position.elapsed_ms(Player::White), 1200);
        assert_eq!(position.elapsed_ms(Player::Black), 3400);
        assert_eq!(position.board().our_houses(), &[0, 4, 4]);
        assert_eq!(position.to_token(), token);
    }

    #[test]
    fn test_initial_position() {
        let position = Position::new(6, 4, 0);

        assert_eq!(position.to_token(), "O 0 0 0 <6, 0, 0, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4>");
        assert_eq!(position.status(), Status::Valid(Player::White));
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(matches!(
            Position::from_token("garbage"),
            Err(ParsePositionError::Syntax(_))
        ));
        assert!(matches!(
            Position::from_token("Z 0 0 0 <1, 0, 0, 1, 1>"),
            Err(ParsePositionError::Syntax(_))
        ));
        assert!(matches!(
            Position::from_token("O 0 0 0 <2, 0, 0, 1, 1>"),
            Err(ParsePositionError::Board(_))
        ));
    }

    #[test]
    fn test_load_token_keeps_position_on_error() {
        let mut position = Position::new(3, 3, 0);
        let before = position.clone();

        assert!(position.load_token("O 0 0 0 <nope>").is_err());
        assert_eq!(position, before);

        position.load_token("X 0 0 0 <1, 0, 0, 1, 1>").unwrap();
        assert_eq!(position.to_move(), Player::Black);
    }

    #[test]
    fn test_status() {
        let status = |token: &str| Position::from_token(token).unwrap().status();

        assert_eq!(status("X 0 0 0 <2, 0, 0, 1, 1, 1, 1>"), Status::Valid(Player::Black));
        assert_eq!(status("O 0 0 0 <2, 6, 3, 0, 0, 1, 1>"), Status::Win(Player::White));
        assert_eq!(status("O 0 0 0 <2, 1, 3, 0, 0, 0, 0>"), Status::Win(Player::Black));
        // houses still count towards the final score
        assert_eq!(status("X 0 0 0 <2, 4, 3, 0, 0, 0, 1>"), Status::Draw);
        assert_eq!(status("O 0 0 0 <2, 0, 0, 0, 0, 0, 0>"), Status::Invalid);
        assert_eq!(status("O 5001 0 5000 <2, 0, 0, 1, 1, 1, 1>"), Status::Timeout(Player::White));
        assert_eq!(status("O 10 5001 5000 <2, 0, 0, 1, 1, 1, 1>"), Status::Timeout(Player::Black));
        // no limit
        assert_eq!(status("O 99999 0 0 <2, 0, 0, 1, 1, 1, 1>"), Status::Valid(Player::White));
    }

    #[test]
    fn test_play_move() {
        let mut position = Position::new(6, 4, 0);

        // bonus move: White keeps the turn
        position.play_move(Move::new(2, Player::White), 150);
        assert_eq!(position.to_move(), Player::White);
        assert_eq!(position.elapsed_ms(Player::White), 150);

        position.play_move(Move::new(0, Player::White), 50);
        assert_eq!(position.to_move(), Player::Black);
        assert_eq!(position.elapsed_ms(Player::White), 200);
        assert_eq!(position.elapsed_ms(Player::Black), 0);

        position.play_move(Move::new(5, Player::Black), 70);
        assert_eq!(position.to_move(), Player::White);
        assert_eq!(position.elapsed_ms(Player::Black), 70);
    }

    #[test]
    fn test_play_move_clock_saturates() {
        let mut position = Position::from_token("O 18446744073709551615 0 0 <2, 0, 0, 1, 1, 1, 1>").unwrap();

        position.play_move(Move::new(0, Player::White), 250);

        assert_eq!(position.elapsed_ms(Player::White), u64::MAX);
        assert_eq!(position.to_token(), "X 18446744073709551615 0 0 <2, 0, 0, 0, 2, 1, 1>");
    }

    #[test]
    fn test_board_for_mover() {
        let position = Position::from_token("X 0 0 0 <2, 1, 2, 3, 4, 5, 6>").unwrap();

        let board = position.board_for_mover();

        assert_eq!(board.our_houses(), &[5, 6]);
        assert_eq!(board.our_store, 2);
        assert_eq!(position.legal_moves(), vec![Move::new(0, Player::Black), Move::new(1, Player::Black)]);
    }
}
