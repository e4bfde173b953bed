use log::{error, trace};
use rand::{Rng, rngs::StdRng};

use crate::{
    moves::Move,
    store::{BoardId, PieceKind, Store},
};

/// Score for capturing the opposing king. Remaining depth is added on top
/// so a faster forced win outranks a slower one.
pub const WIN: i32 = 10_000_000;

/// Below any reachable score, and safely negatable (`-i32::MIN` is not).
const SCORE_MIN: i32 = -i32::MAX;

#[derive(Debug)]
pub struct SearchOutcome {
    /// None only when the side to move has no pseudo-legal moves at all.
    pub best: Option<Move>,
    pub score: i32,
    /// Moves applied over the whole subtree, ordering prepasses included.
    pub nodes: u64,
}

impl Store {
    /// Pick a move for one side by searching `difficulty` plies ahead. The
    /// board is mutated and restored in place; persistent state is
    /// unchanged on return.
    pub fn suggest_move(&mut self, b: BoardId, difficulty: u8, whites_turn: bool, rng: &mut StdRng) -> SearchOutcome {
        let outcome = self.search_ply(b, difficulty, whites_turn, SCORE_MIN, i32::MAX, rng);
        trace!(
            "search at depth {difficulty} evaluated {} nodes, score {}",
            outcome.nodes, outcome.score
        );
        outcome
    }

    /// One ply of negamax with alpha-beta bounds (`min_score`, `max_score`).
    /// Candidates are taken in circular order from a random starting offset
    /// so equal-scored moves do not always resolve the same way.
    fn search_ply(
        &mut self,
        b: BoardId,
        depth: u8,
        whites_turn: bool,
        mut min_score: i32,
        max_score: i32,
        rng: &mut StdRng,
    ) -> SearchOutcome {
        let saved_stack_pos = self.move_stack_pos(b);
        self.find_all_moves(b, whites_turn);
        let num_moves = self.move_stack_pos(b) - saved_stack_pos;
        let mut best: Option<Move> = None;
        let mut best_score = SCORE_MIN;
        let mut nodes: u64 = 0;
        if num_moves == 0 {
            self.set_move_stack_pos(b, saved_stack_pos);
            return SearchOutcome {
                best,
                score: best_score,
                nodes,
            };
        }
        let rand_start = rng.gen_range(0..num_moves);
        if depth > 2 {
            // A cheap shallow search finds a likely-best move; starting the
            // scan there makes the alpha-beta cutoff bite much earlier.
            let hint = self.search_ply(b, depth - 2, whites_turn, min_score, max_score, rng);
            nodes += hint.nodes;
            if let Some(guess) = hint.best {
                let guess_index = self.find_move_index(b, guess, saved_stack_pos);
                let displaced = self.move_at(b, saved_stack_pos + rand_start);
                self.set_move_at(b, saved_stack_pos + rand_start, guess);
                self.set_move_at(b, guess_index, displaced);
            }
        }
        for i in 0..num_moves {
            let mut move_index = i + rand_start;
            if move_index >= num_moves {
                move_index -= num_moves;
            }
            let mv = self.move_at(b, saved_stack_pos + move_index);
            let target = self.piece_at(b, mv.to_row, mv.to_col);
            self.apply_move(b, mv);
            nodes += 1;
            let score;
            if !target.is_null() && self.piece_kind(target) == PieceKind::King {
                // Taking the king ends the game; no point looking further.
                score = WIN + depth as i32;
            } else if depth > 0 {
                let child = self.search_ply(b, depth - 1, !whites_turn, -max_score, -min_score, rng);
                nodes += child.nodes;
                score = -child.score;
            } else {
                score = if whites_turn {
                    self.white_score(b) - self.black_score(b)
                } else {
                    self.black_score(b) - self.white_score(b)
                };
            }
            self.undo_last_move(b);
            if score > best_score {
                best_score = score;
                best = Some(mv);
                if min_score < best_score {
                    min_score = best_score;
                    if min_score >= max_score {
                        // The opponent already has a refutation elsewhere;
                        // nothing in this subtree can matter.
                        break;
                    }
                }
            }
        }
        self.set_move_stack_pos(b, saved_stack_pos);
        SearchOutcome {
            best,
            score: best_score,
            nodes,
        }
    }

    /// Locate a move within this ply's candidate range.
    fn find_move_index(&self, b: BoardId, mv: Move, range_start: u32) -> u32 {
        for i in range_start..self.move_stack_pos(b) {
            if self.move_at(b, i) == mv {
                return i;
            }
        }
        error!("ordering hint {mv} is not among this ply's candidates");
        panic!("ordering hint is not among this ply's candidates");
    }
}
