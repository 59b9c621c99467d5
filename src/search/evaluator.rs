use crate::kalah::valuation::{seed_diff_valuation, store_diff_valuation};
use crate::kalah::{Board, Valuation, ValuationFn};

pub trait Evaluator {
    fn name(&self) -> &str;

    /// Value of `board` from the perspective of its White side.
    fn evaluate(&self, board: &Board) -> Valuation;

    /// Switch to the next heuristic.
    fn rotate(&mut self);
}

/*====================================================================================================================*/

/// Cycles through a fixed list of heuristics, so consecutive moves are not all judged the same way.
pub struct RotatingEvaluator {
    heuristics: Vec<(&'static str, ValuationFn)>,
    current: usize,
}

impl RotatingEvaluator {
    pub fn new(heuristics: Vec<(&'static str, ValuationFn)>) -> Self {
        assert!(!heuristics.is_empty(), "Evaluator needs at least one heuristic");

        RotatingEvaluator { heuristics, current: 0 }
    }
}

impl Default for RotatingEvaluator {
    fn default() -> Self {
        RotatingEvaluator::new(vec![
            ("store difference", store_diff_valuation),
            ("seed difference", seed_diff_valuation),
        ])
    }
}

impl Evaluator for RotatingEvaluator {
    fn name(&self) -> &str {
        self.heuristics[self.current].0
    }

    fn evaluate(&self, board: &Board) -> Valuation {
        (self.heuristics[self.current].1)(board)
    }

    fn rotate(&mut self) {
        self.current = (self.current + 1) % self.heuristics.len();
    }
}

/*====================================================================================================================*/

#[cfg(test)]
mod tests {
    use super::{Evaluator, RotatingEvaluator};
    use crate::kalah::{Board, Valuation};

    #[test]
    fn test_rotation_cycles() {
        let mut evaluator = RotatingEvaluator::default();

        assert_eq!(evaluator.name(), "store difference");
        evaluator.rotate();
        assert_eq!(evaluator.name(), "seed difference");
        evaluator.rotate();
        assert_eq!(evaluator.name(), "store difference");
    }

    #[test]
    fn test_rotation_changes_valuation() {
        // equal stores, but we hold all the seeds in our houses
        let board = Board::from_kgp("<2, 1, 1, 3, 3, 1, 0>").unwrap();
        let mut evaluator = RotatingEvaluator::default();

        assert_eq!(evaluator.evaluate(&board), Valuation::NonTerminal { value: 0.0 });
        evaluator.rotate();
        assert!(evaluator.evaluate(&board) > Valuation::NonTerminal { value: 0.5 });
    }
}
