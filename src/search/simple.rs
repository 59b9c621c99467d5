use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::kalah::{Move, Position};
use crate::search::{Evaluator, SearchEngine};

/// always picks the first available move
/// useful for performance tests since, unlike RandomSearch, it's deterministic
pub struct FirstMoveSearch;

impl SearchEngine for FirstMoveSearch {
    fn name(&self) -> &'static str {
        "first-move"
    }

    fn best_move(&mut self, position: &Position, _evaluator: &dyn Evaluator) -> Option<Move> {
        position.legal_moves().first().copied()
    }
}

pub struct RandomSearch;

impl SearchEngine for RandomSearch {
    fn name(&self) -> &'static str {
        "random"
    }

    fn best_move(&mut self, position: &Position, _evaluator: &dyn Evaluator) -> Option<Move> {
        position.legal_moves().choose(&mut thread_rng()).copied()
    }
}

/*====================================================================================================================*/
