use std::time::Instant;

use log::debug;

use crate::kalah::{Board, Move, Player, Position, Valuation};
use crate::search::{Evaluator, SearchEngine};

/// Depth-limited negamax. The board is always searched from the mover's side (White); bonus moves keep the
/// perspective and don't use up depth.
pub struct MinimaxSearch {
    max_depth: u32,
    alpha_beta_prune: bool,

    nodes_visited: u64,
}

impl MinimaxSearch {
    pub fn new(max_depth: u32, alpha_beta_prune: bool) -> Self {
        MinimaxSearch {
            max_depth,
            alpha_beta_prune,
            nodes_visited: 0,
        }
    }

    fn minimax(
        &mut self,
        evaluator: &dyn Evaluator,
        board: &Board,
        remaining_depth: u32,
        alpha: Valuation,
        beta: Valuation,
    ) -> Valuation {
        self.nodes_visited += 1;

        if remaining_depth == 0 || !board.has_legal_move() {
            return evaluator.evaluate(board);
        }

        // immediate win for Black
        let mut best_value = Valuation::TerminalBlackWin { plies: 0 };
        let mut alpha = alpha;

        for move_ in board.legal_moves(Player::White) {
            let value = self.child_value(evaluator, board, move_, remaining_depth, alpha, beta);

            if value > best_value {
                best_value = value;
            }

            if self.alpha_beta_prune {
                if value > alpha {
                    alpha = value;
                }

                if value >= beta {
                    // beta cutoff, return early
                    return best_value;
                }
            }
        }

        best_value
    }

    // value of playing move_ on board, from our perspective
    fn child_value(
        &mut self,
        evaluator: &dyn Evaluator,
        board: &Board,
        move_: Move,
        remaining_depth: u32,
        alpha: Valuation,
        beta: Valuation,
    ) -> Valuation {
        let mut next_board = board.clone();
        let bonus_move = next_board.apply_move(move_);

        // the child's values are one ply shorter than ours, so shift the window accordingly
        let (alpha, beta) = (alpha.decrease_plies(), beta.decrease_plies());

        let value = if bonus_move {
            self.minimax(evaluator, &next_board, remaining_depth, alpha, beta)
        } else {
            // opponent move: flip board, alpha, beta to their perspective and flip returned value to ours
            next_board.flip_board();
            -self.minimax(evaluator, &next_board, remaining_depth - 1, -beta, -alpha)
        };

        value.increase_plies()
    }
}

impl SearchEngine for MinimaxSearch {
    fn name(&self) -> &'static str {
        if self.alpha_beta_prune {
            "alpha-beta"
        } else {
            "minimax"
        }
    }

    fn best_move(&mut self, position: &Position, evaluator: &dyn Evaluator) -> Option<Move> {
        let board = position.board_for_mover();

        if !board.has_legal_move() {
            return None;
        }

        let start_t = Instant::now();
        self.nodes_visited = 0;

        let mut best: Option<(Move, Valuation)> = None;
        let mut alpha = Valuation::TerminalBlackWin { plies: 0 };
        let beta = Valuation::TerminalWhiteWin { plies: 0 };

        for move_ in board.legal_moves(Player::White) {
            let value = self.child_value(evaluator, &board, move_, self.max_depth.max(1), alpha, beta);

            if best.map_or(true, |(_, best_value)| value > best_value) {
                best = Some((move_, value));
            }

            if self.alpha_beta_prune && value > alpha {
                alpha = value;
            }
        }

        let (best_move, best_value) = best?;

        let secs = start_t.elapsed().as_secs_f64();
        debug!(
            "{} search: depth {}, {} nodes, {:.2e} nps, best value {:?} ({})",
            self.name(),
            self.max_depth,
            self.nodes_visited,
            self.nodes_visited as f64 / secs.max(1e-9),
            best_value,
            evaluator.name()
        );

        Some(best_move.with_player(position.to_move()))
    }
}

/*====================================================================================================================*/

#[cfg(test)]
mod tests {
    use super::MinimaxSearch;
    use crate::kalah::{Move, Player, Position};
    use crate::search::{Evaluator, RotatingEvaluator, SearchEngine};

    #[test]
    fn test_alpha_beta_agrees_with_minimax() {
        let evaluator = RotatingEvaluator::default();

        for token in [
            "O 0 0 0 <6, 0, 0, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4>",
            "X 0 0 0 <4, 3, 5, 0, 2, 6, 1, 3, 0, 4, 2>",
            "O 0 0 0 <3, 7, 2, 1, 0, 5, 2, 2, 0>",
        ] {
            let position = Position::from_token(token).unwrap();

            for depth in 1..=4 {
                let mut minimax = MinimaxSearch::new(depth, false);
                let mut alpha_beta = MinimaxSearch::new(depth, true);

                let minimax_move = minimax.best_move(&position, &evaluator).unwrap();
                let alpha_beta_move = alpha_beta.best_move(&position, &evaluator).unwrap();

                // both pick the first of the best moves, so they have to agree exactly
                assert_eq!(minimax_move, alpha_beta_move, "{} at depth {}", token, depth);
                assert!(alpha_beta.nodes_visited <= minimax.nodes_visited);
            }
        }
    }

    #[test]
    fn test_takes_capture() {
        // moving the single seed of house 0 captures the 7 seeds opposite house 1
        let position = Position::from_token("O 0 0 0 <3, 0, 0, 1, 0, 2, 3, 7, 4>").unwrap();
        let evaluator = RotatingEvaluator::default();

        let move_ = MinimaxSearch::new(1, true).best_move(&position, &evaluator);

        assert_eq!(move_, Some(Move::new(0, Player::White)));
    }

    #[test]
    fn test_move_belongs_to_mover() {
        let position = Position::from_token("X 0 0 0 <2, 0, 0, 1, 1, 0, 3>").unwrap();
        let evaluator = RotatingEvaluator::default();

        let move_ = MinimaxSearch::new(3, true).best_move(&position, &evaluator).unwrap();

        assert_eq!(move_.player(), Player::Black);
        assert!(position.legal_moves().contains(&move_));
    }

    #[test]
    fn test_no_move_in_finished_game() {
        let position = Position::from_token("O 0 0 0 <2, 5, 3, 0, 0, 0, 0>").unwrap();
        let evaluator = RotatingEvaluator::default();

        assert_eq!(MinimaxSearch::new(3, true).best_move(&position, &evaluator), None);
        assert_eq!(evaluator.name(), "store difference");
    }
}
