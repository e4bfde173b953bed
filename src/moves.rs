use std::fmt;

use log::error;
use regex::Regex;

use crate::{
    board::piece_kind_name,
    store::{BoardId, PieceId, PieceKind, Store},
};

/// A half-move. Rows and columns are 0-based from white's bottom-left
/// corner, so "d2 d4" is (1, 3) to (3, 3).
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Move {
    pub from_row: u8,
    pub from_col: u8,
    pub to_row: u8,
    pub to_col: u8,
}

impl Move {
    pub fn new(from_row: u8, from_col: u8, to_row: u8, to_col: u8) -> Move {
        Move {
            from_row,
            from_col,
            to_row,
            to_col,
        }
    }

    /// Parse coordinate text of the form `d2 d4`. Anything else is the
    /// caller's problem to re-prompt for.
    pub fn parse(text: &str) -> Option<Move> {
        let pattern = Regex::new(r"^([a-h])([1-8])\s([a-h])([1-8])$").unwrap();
        let captures = pattern.captures(text)?;
        let coord = |i: usize, base: u8| captures[i].as_bytes()[0] - base;
        Some(Move {
            from_col: coord(1, b'a'),
            from_row: coord(2, b'1'),
            to_col: coord(3, b'a'),
            to_row: coord(4, b'1'),
        })
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} {}{}",
            (b'a' + self.from_col) as char,
            self.from_row + 1,
            (b'a' + self.to_col) as char,
            self.to_row + 1
        )
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Move({self})")
    }
}

/// Everything needed to reverse one applied move exactly.
#[derive(Clone, Copy, Default)]
pub struct UndoRecord {
    pub mv: Move,
    /// The captured piece, or null.
    pub target: PieceId,
    pub queened_pawn: bool,
    pub first_move: bool,
}

impl Store {
    /// A king sliding two columns is a castle; nothing else moves a king
    /// that far sideways.
    fn is_castling(&self, p: PieceId, mv: Move) -> bool {
        self.piece_kind(p) == PieceKind::King && (mv.from_col as i16 - mv.to_col as i16).abs() >= 2
    }

    /// Move the rook past the king to complete a castle.
    fn finish_castling(&mut self, b: BoardId, mv: Move) {
        let rook = if mv.to_col == 6 {
            self.piece_at(b, mv.from_row, 7)
        } else if mv.to_col == 2 {
            self.piece_at(b, mv.from_row, 0)
        } else {
            error!("castling move to column {} is not a castle destination", mv.to_col);
            panic!("illegal castling");
        };
        debug_assert!(
            !rook.is_null() && self.piece_kind(rook) == PieceKind::Rook && self.piece_never_moved(rook)
        );
        self.lift_piece(b, self.piece_row(rook), self.piece_col(rook));
        if mv.to_col == 6 {
            self.place_piece(b, rook, mv.to_row, 5);
        } else {
            self.place_piece(b, rook, mv.to_row, 3);
        }
        self.set_piece_never_moved(rook, false);
    }

    /// Put the rook back in its corner while unwinding a castle.
    fn finish_undo_castling(&mut self, b: BoardId, mv: Move) {
        let (rook, orig_col) = if mv.to_col == 6 {
            (self.piece_at(b, mv.from_row, 5), 7)
        } else {
            (self.piece_at(b, mv.from_row, 3), 0)
        };
        debug_assert!(
            !rook.is_null() && self.piece_kind(rook) == PieceKind::Rook && !self.piece_never_moved(rook)
        );
        let row = self.piece_row(rook);
        let col = self.piece_col(rook);
        self.lift_piece(b, row, col);
        self.place_piece(b, rook, row, orig_col);
        self.set_piece_never_moved(rook, true);
    }

    /// Mutate the board in place: remove any captured piece, relocate the
    /// mover (queening a pawn that reaches the far rank), shuffle the rook
    /// on a castle, clear the mover's never-moved flag, and push an undo
    /// record that reverses all of it.
    pub fn apply_move(&mut self, b: BoardId, mv: Move) {
        let piece = self.piece_at(b, mv.from_row, mv.from_col);
        debug_assert!(!piece.is_null(), "no piece on the source square");
        self.lift_piece(b, mv.from_row, mv.from_col);
        let target = self.piece_at(b, mv.to_row, mv.to_col);
        if !target.is_null() {
            self.lift_piece(b, mv.to_row, mv.to_col);
        }
        let mut queened_pawn = false;
        let far_rank = if self.piece_white(piece) { 7 } else { 0 };
        if self.piece_kind(piece) == PieceKind::Pawn && mv.to_row == far_rank {
            // Promotion always queens; no choice is offered.
            self.set_piece_kind(piece, PieceKind::Queen);
            queened_pawn = true;
        }
        self.place_piece(b, piece, mv.to_row, mv.to_col);
        if self.is_castling(piece, mv) {
            self.finish_castling(b, mv);
        }
        let first_move = self.piece_never_moved(piece);
        self.set_piece_never_moved(piece, false);
        let pos = self.undo_pos(b);
        if pos == self.num_undos(b) {
            let num = self.num_undos(b);
            self.resize_undos(b, num * 2);
        }
        self.set_undo_at(
            b,
            pos,
            UndoRecord {
                mv,
                target,
                queened_pawn,
                first_move,
            },
        );
        self.set_undo_pos(b, pos + 1);
    }

    /// Pop the most recent undo record and reverse each of its effects in
    /// the opposite order, restoring the board exactly.
    pub fn undo_last_move(&mut self, b: BoardId) {
        let pos = self.undo_pos(b) - 1;
        let undo = self.undo_at(b, pos);
        self.set_undo_pos(b, pos);
        let mv = undo.mv;
        let piece = self.piece_at(b, mv.to_row, mv.to_col);
        debug_assert!(!piece.is_null() && piece != undo.target);
        self.lift_piece(b, mv.to_row, mv.to_col);
        if self.is_castling(piece, mv) {
            self.finish_undo_castling(b, mv);
        }
        if undo.queened_pawn {
            self.set_piece_kind(piece, PieceKind::Pawn);
        }
        self.place_piece(b, piece, mv.from_row, mv.from_col);
        if undo.first_move {
            self.set_piece_never_moved(piece, true);
        }
        if !undo.target.is_null() {
            self.place_piece(b, undo.target, mv.to_row, mv.to_col);
        }
    }

    /// Describe a move for the transcript, e.g. "pawn from d2 to d4".
    pub fn describe_move(&self, b: BoardId, mv: Move) -> String {
        let piece = self.piece_at(b, mv.from_row, mv.from_col);
        format!(
            "{} from {}{} to {}{}",
            piece_kind_name(self.piece_kind(piece)),
            (b'a' + mv.from_col) as char,
            mv.from_row + 1,
            (b'a' + mv.to_col) as char,
            mv.to_row + 1
        )
    }
}
