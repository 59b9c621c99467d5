mod evaluator;
mod minimax;
mod simple;

use std::fmt::Display;
use std::str::FromStr;

pub use evaluator::{Evaluator, RotatingEvaluator};
pub use minimax::MinimaxSearch;
pub use simple::{FirstMoveSearch, RandomSearch};

use crate::kalah::{Move, Position};

pub trait SearchEngine {
    fn name(&self) -> &'static str;

    /// Best move for the player to move in `position`, or `None` if there is no legal move. Blocks until done.
    fn best_move(&mut self, position: &Position, evaluator: &dyn Evaluator) -> Option<Move>;
}

/*====================================================================================================================*/

// search depth used when none is given
const DEFAULT_DEPTH: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    FirstMove,
    Random,
    AlphaBeta,
    Minimax,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [Strategy::FirstMove, Strategy::Random, Strategy::AlphaBeta, Strategy::Minimax];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::FirstMove => "first-move",
            Strategy::Random => "random",
            Strategy::AlphaBeta => "alpha-beta",
            Strategy::Minimax => "minimax",
        }
    }

    /// Depth the engine is built with; 0 picks the default.
    pub fn effective_depth(depth: u32) -> u32 {
        if depth == 0 {
            DEFAULT_DEPTH
        } else {
            depth
        }
    }

    pub fn create(&self, depth: u32) -> Box<dyn SearchEngine> {
        let depth = Strategy::effective_depth(depth);

        match self {
            Strategy::FirstMove => Box::new(FirstMoveSearch),
            Strategy::Random => Box::new(RandomSearch),
            Strategy::AlphaBeta => Box::new(MinimaxSearch::new(depth, true)),
            Strategy::Minimax => Box::new(MinimaxSearch::new(depth, false)),
        }
    }

    /// One line per strategy, for the help text.
    pub fn listing() -> String {
        Strategy::ALL
            .iter()
            .enumerate()
            .map(|(i, strategy)| {
                let default = if *strategy == Strategy::default() { " (default)" } else { "" };
                format!("{:>2} : {}{}", i, strategy.name(), default)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::AlphaBeta
    }
}

impl Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// accepts the strategy's number or its name
impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let by_index = s.parse::<usize>().ok().and_then(|i| Strategy::ALL.get(i).copied());

        by_index
            .or_else(|| Strategy::ALL.iter().copied().find(|strategy| strategy.name() == s))
            .ok_or_else(|| format!("unknown strategy \"{}\"", s))
    }
}

/*====================================================================================================================*/
