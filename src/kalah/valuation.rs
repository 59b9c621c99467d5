use std::cmp::Ordering;

use crate::kalah::Board;

pub type ValuationFn = fn(&Board) -> Valuation;

/*====================================================================================================================*/

/// Value of a board from White's perspective.
///
/// `value` is never NaN, which makes `NonTerminal` valuations totally ordered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Valuation {
    NonTerminal { value: f32 },
    TerminalWhiteWin { plies: u32 },
    TerminalBlackWin { plies: u32 },
    TerminalDraw { plies: u32 },
}

impl Valuation {
    pub fn increase_plies(self) -> Valuation {
        use Valuation::{NonTerminal, TerminalBlackWin, TerminalDraw, TerminalWhiteWin};

        match self {
            NonTerminal { .. } => self,
            TerminalWhiteWin { plies } => TerminalWhiteWin { plies: plies + 1 },
            TerminalBlackWin { plies } => TerminalBlackWin { plies: plies + 1 },
            TerminalDraw { plies } => TerminalDraw { plies: plies + 1 },
        }
    }

    pub fn decrease_plies(self) -> Valuation {
        use Valuation::{NonTerminal, TerminalBlackWin, TerminalDraw, TerminalWhiteWin};

        match self {
            NonTerminal { .. } => self,
            TerminalWhiteWin { plies } => TerminalWhiteWin { plies: plies.saturating_sub(1) },
            TerminalBlackWin { plies } => TerminalBlackWin { plies: plies.saturating_sub(1) },
            TerminalDraw { plies } => TerminalDraw { plies: plies.saturating_sub(1) },
        }
    }

    // coarse bucket: Black wins < everything uncertain < White wins
    fn rank(&self) -> i8 {
        match self {
            Valuation::TerminalBlackWin { .. } => -1,
            Valuation::NonTerminal { .. } | Valuation::TerminalDraw { .. } => 0,
            Valuation::TerminalWhiteWin { .. } => 1,
        }
    }
}

impl Eq for Valuation {}

/// flip the player perspective of the valuation
impl std::ops::Neg for Valuation {
    type Output = Valuation;

    fn neg(self) -> Self::Output {
        use Valuation::{NonTerminal, TerminalBlackWin, TerminalDraw, TerminalWhiteWin};

        match self {
            NonTerminal { value } => NonTerminal { value: -value },
            TerminalWhiteWin { plies } => TerminalBlackWin { plies },
            TerminalBlackWin { plies } => TerminalWhiteWin { plies },
            TerminalDraw { plies } => TerminalDraw { plies },
        }
    }
}

impl PartialOrd for Valuation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// compare valuations from the perspective of White
impl Ord for Valuation {
    fn cmp(&self, other: &Self) -> Ordering {
        use Valuation::{NonTerminal, TerminalBlackWin, TerminalDraw, TerminalWhiteWin};

        let by_rank = self.rank().cmp(&other.rank());
        if by_rank != Ordering::Equal {
            return by_rank;
        }

        // a draw is worth exactly as much as an even position, however far away it is
        match (self, other) {
            (NonTerminal { value: v1 }, NonTerminal { value: v2 }) => cmp_values(*v1, *v2),
            (NonTerminal { value }, TerminalDraw { .. }) => cmp_values(*value, 0.0),
            (TerminalDraw { .. }, NonTerminal { value }) => cmp_values(0.0, *value),
            (TerminalDraw { .. }, TerminalDraw { .. }) => Ordering::Equal,
            // sooner wins are better
            (TerminalWhiteWin { plies: p1 }, TerminalWhiteWin { plies: p2 }) => p2.cmp(p1),
            // later losses are better: the opponent might still blunder
            (TerminalBlackWin { plies: p1 }, TerminalBlackWin { plies: p2 }) => p1.cmp(p2),
            _ => unreachable!("valuations of equal rank"),
        }
    }
}

// unlike total_cmp, 0.0 and -0.0 compare equal, which keeps negation order-reversing
fn cmp_values(v1: f32, v2: f32) -> Ordering {
    v1.partial_cmp(&v2).unwrap_or(Ordering::Equal)
}

/*====================================================================================================================*/

// game over: the player with more seeds wins, no matter what the heuristic says
fn terminal_valuation(board: &Board) -> Valuation {
    let (our_score, their_score) = board.final_scores();

    match our_score.cmp(&their_score) {
        Ordering::Greater => Valuation::TerminalWhiteWin { plies: 0 },
        Ordering::Less => Valuation::TerminalBlackWin { plies: 0 },
        Ordering::Equal => Valuation::TerminalDraw { plies: 0 },
    }
}

pub fn store_diff_valuation(board: &Board) -> Valuation {
    if !board.has_legal_move() {
        return terminal_valuation(board);
    }

    let total_seeds = board.total_seeds() as f32;
    let score = board.our_store as f32 - board.their_store as f32;

    Valuation::NonTerminal {
        value: score / total_seeds,
    }
}

pub fn seed_diff_valuation(board: &Board) -> Valuation {
    // small bonus on stored seeds: they can't be captured anymore
    const EPS: f32 = 1e-5;

    if !board.has_legal_move() {
        return terminal_valuation(board);
    }

    let our_houses_sum = board.our_houses().iter().sum::<u16>() as f32;
    let their_houses_sum = board.their_houses().iter().sum::<u16>() as f32;

    let total_seeds = board.total_seeds() as f32;
    let score = ((1.0 + EPS) * board.our_store as f32 + our_houses_sum)
        - ((1.0 + EPS) * board.their_store as f32 + their_houses_sum);

    Valuation::NonTerminal {
        value: score / total_seeds,
    }
}

/*====================================================================================================================*/
