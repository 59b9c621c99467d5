mod board;
mod position;
pub mod valuation;

pub use board::{Board, Move, ParseBoardError, Player};
pub use position::{ParsePositionError, Position};
pub use valuation::{Valuation, ValuationFn};
