use crate::{
    board::{COLS, ROWS},
    moves::Move,
    store::{BoardId, PieceId, PieceKind, Store},
};

const KNIGHT_DELTAS: [(i8, i8); 8] = [(-2, -1), (-2, 1), (-1, -2), (-1, 2), (1, -2), (1, 2), (2, -1), (2, 1)];
const KING_DELTAS: [(i8, i8); 8] = [(-1, -1), (-1, 0), (-1, 1), (0, -1), (0, 1), (1, -1), (1, 0), (1, 1)];

const ROOK_DIRECTIONS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

#[inline]
fn on_board(row: i8, col: i8) -> bool {
    row >= 0 && row < ROWS as i8 && col >= 0 && col < COLS as i8
}

#[inline]
fn moves_to_same_square(mv: Move) -> bool {
    mv.from_row == mv.to_row && mv.from_col == mv.to_col
}

/// Step the from square one square closer to the to square.
fn step_towards_destination(mut mv: Move) -> Move {
    if mv.from_col < mv.to_col {
        mv.from_col += 1;
    } else if mv.from_col > mv.to_col {
        mv.from_col -= 1;
    }
    if mv.from_row < mv.to_row {
        mv.from_row += 1;
    } else if mv.from_row > mv.to_row {
        mv.from_row -= 1;
    }
    mv
}

impl Store {
    fn spaces_empty_between(&self, b: BoardId, mv: Move) -> bool {
        let mut mv = step_towards_destination(mv);
        while !moves_to_same_square(mv) {
            if !self.square_empty(b, mv.from_row, mv.from_col) {
                return false;
            }
            mv = step_towards_destination(mv);
        }
        true
    }

    /// Push a candidate onto the board's move stack, doubling the heap run
    /// when the stack reaches its end.
    fn push_move(&mut self, b: BoardId, from_row: u8, from_col: u8, to_row: u8, to_col: u8) {
        let stack_pos = self.move_stack_pos(b);
        if stack_pos == self.num_moves(b) {
            let num = self.num_moves(b);
            self.resize_moves(b, num * 2);
        }
        self.set_move_at(b, stack_pos, Move::new(from_row, from_col, to_row, to_col));
        self.set_move_stack_pos(b, stack_pos + 1);
    }

    fn find_pawn_moves(&mut self, b: BoardId, p: PieceId) {
        let white = self.piece_white(p);
        let row = self.piece_row(p);
        let col = self.piece_col(p);
        let one_row = if white { row + 1 } else { row - 1 };
        if (white && row == 1) || (!white && row == 6) {
            let two_rows = if white { row + 2 } else { row - 2 };
            if self.square_empty(b, one_row, col) && self.square_empty(b, two_rows, col) {
                self.push_move(b, row, col, two_rows, col);
            }
        }
        if self.square_empty(b, one_row, col) {
            self.push_move(b, row, col, one_row, col);
        }
        if col > 0 {
            let target = self.piece_at(b, one_row, col - 1);
            if !target.is_null() && self.piece_white(target) != white {
                self.push_move(b, row, col, one_row, col - 1);
            }
        }
        if col < COLS - 1 {
            let target = self.piece_at(b, one_row, col + 1);
            if !target.is_null() && self.piece_white(target) != white {
                self.push_move(b, row, col, one_row, col + 1);
            }
        }
    }

    /// Walk outward in one direction, pushing moves until the board edge, a
    /// friendly piece, or a capture ends the ray.
    fn try_ray(&mut self, b: BoardId, p: PieceId, row_delta: i8, col_delta: i8) {
        let white = self.piece_white(p);
        let orig_row = self.piece_row(p);
        let orig_col = self.piece_col(p);
        let mut row = orig_row as i8 + row_delta;
        let mut col = orig_col as i8 + col_delta;
        while on_board(row, col) {
            let target = self.piece_at(b, row as u8, col as u8);
            if target.is_null() || self.piece_white(target) != white {
                self.push_move(b, orig_row, orig_col, row as u8, col as u8);
            }
            if !target.is_null() {
                return;
            }
            row += row_delta;
            col += col_delta;
        }
    }

    fn try_deltas(&mut self, b: BoardId, p: PieceId, deltas: &[(i8, i8)]) {
        let row = self.piece_row(p);
        let col = self.piece_col(p);
        for (row_delta, col_delta) in deltas {
            let to_row = row as i8 + row_delta;
            let to_col = col as i8 + col_delta;
            if on_board(to_row, to_col) {
                let target = self.piece_at(b, to_row as u8, to_col as u8);
                if target.is_null() || self.piece_white(target) != self.piece_white(p) {
                    self.push_move(b, row, col, to_row as u8, to_col as u8);
                }
            }
        }
    }

    fn find_king_moves(&mut self, b: BoardId, p: PieceId) {
        self.try_deltas(b, p, &KING_DELTAS);
        if !self.piece_never_moved(p) {
            return;
        }
        debug_assert!(self.piece_col(p) == 4);
        let row = self.piece_row(p);
        // Castling: both the king and the corner rook must be unmoved with
        // the squares between them empty. The king's path is not checked
        // for attacks.
        let rook = self.piece_at(b, row, 7);
        if !rook.is_null()
            && self.piece_never_moved(rook)
            && self.square_empty(b, row, 5)
            && self.square_empty(b, row, 6)
        {
            self.push_move(b, row, 4, row, 6);
        }
        let rook = self.piece_at(b, row, 0);
        if !rook.is_null()
            && self.piece_never_moved(rook)
            && self.square_empty(b, row, 3)
            && self.square_empty(b, row, 2)
            && self.square_empty(b, row, 1)
        {
            self.push_move(b, row, 4, row, 2);
        }
    }

    /// Push every pseudo-legal move for one piece onto the board's move
    /// stack. Whether the mover's own king is left hanging is not this
    /// function's concern.
    pub fn find_piece_moves(&mut self, b: BoardId, p: PieceId) {
        match self.piece_kind(p) {
            PieceKind::Pawn => self.find_pawn_moves(b, p),
            PieceKind::Rook => {
                for (dr, dc) in ROOK_DIRECTIONS {
                    self.try_ray(b, p, dr, dc);
                }
            }
            PieceKind::Knight => self.try_deltas(b, p, &KNIGHT_DELTAS),
            PieceKind::Bishop => {
                for (dr, dc) in BISHOP_DIRECTIONS {
                    self.try_ray(b, p, dr, dc);
                }
            }
            PieceKind::Queen => {
                for (dr, dc) in ROOK_DIRECTIONS {
                    self.try_ray(b, p, dr, dc);
                }
                for (dr, dc) in BISHOP_DIRECTIONS {
                    self.try_ray(b, p, dr, dc);
                }
            }
            PieceKind::King => self.find_king_moves(b, p),
        }
    }

    /// Generate candidates for every in-play piece of one side. Callers are
    /// expected to save the move stack pointer first and restore it when
    /// they are done with this batch.
    pub fn find_all_moves(&mut self, b: BoardId, white: bool) {
        let mut p = self.first_piece(b);
        while !p.is_null() {
            if self.piece_in_play(p) && self.piece_white(p) == white {
                self.find_piece_moves(b, p);
            }
            p = self.next_board_piece(p);
        }
    }

    fn pawn_move_legal(&self, b: BoardId, p: PieceId, mv: Move, target: PieceId) -> bool {
        if target.is_null() {
            // Without a capture a pawn only moves straight ahead.
            if mv.from_col != mv.to_col {
                return false;
            }
            if self.piece_white(p) {
                if mv.from_row + 1 == mv.to_row {
                    return true;
                }
                return mv.from_row == 1 && mv.to_row == 3 && self.square_empty(b, 2, mv.from_col);
            }
            if mv.from_row == mv.to_row + 1 {
                return true;
            }
            return mv.from_row == 6 && mv.to_row == 4 && self.square_empty(b, 5, mv.from_col);
        }
        // Captures go one square diagonally forward.
        if mv.from_col != mv.to_col + 1 && mv.from_col + 1 != mv.to_col {
            return false;
        }
        if self.piece_white(p) {
            mv.from_row + 1 == mv.to_row
        } else {
            mv.from_row == mv.to_row + 1
        }
    }

    fn rook_move_legal(&self, b: BoardId, mv: Move) -> bool {
        if mv.from_row != mv.to_row && mv.from_col != mv.to_col {
            return false;
        }
        self.spaces_empty_between(b, mv)
    }

    fn knight_move_legal(&self, mv: Move) -> bool {
        let row_dist = (mv.to_row as i8 - mv.from_row as i8).abs();
        let col_dist = (mv.to_col as i8 - mv.from_col as i8).abs();
        (row_dist == 1 && col_dist == 2) || (row_dist == 2 && col_dist == 1)
    }

    fn bishop_move_legal(&self, b: BoardId, mv: Move) -> bool {
        if mv.from_row as i8 - mv.from_col as i8 != mv.to_row as i8 - mv.to_col as i8
            && mv.from_row + mv.from_col != mv.to_row + mv.to_col
        {
            return false;
        }
        self.spaces_empty_between(b, mv)
    }

    fn queen_move_legal(&self, b: BoardId, mv: Move) -> bool {
        if mv.from_row != mv.to_row
            && mv.from_col != mv.to_col
            && mv.from_row as i8 - mv.from_col as i8 != mv.to_row as i8 - mv.to_col as i8
            && mv.from_row + mv.from_col != mv.to_row + mv.to_col
        {
            return false;
        }
        self.spaces_empty_between(b, mv)
    }

    fn king_move_legal(&self, b: BoardId, p: PieceId, mv: Move) -> bool {
        let row_dist = (mv.to_row as i8 - mv.from_row as i8).abs();
        let col_dist = (mv.to_col as i8 - mv.from_col as i8).abs();
        if row_dist <= 1 && col_dist <= 1 {
            return true;
        }
        // Two columns over on the home rank can only be a castle attempt.
        if !self.piece_never_moved(p)
            || mv.from_row != mv.to_row
            || !self.spaces_empty_between(b, mv)
            || (mv.from_row != 0 && mv.from_row != 7)
        {
            return false;
        }
        let rook = if mv.to_col == 6 {
            self.piece_at(b, mv.from_row, 7)
        } else if mv.to_col == 2 {
            self.piece_at(b, mv.from_row, 0)
        } else {
            return false;
        };
        !rook.is_null() && self.piece_never_moved(rook)
    }

    fn piece_can_make_move(&self, b: BoardId, p: PieceId, mv: Move, target: PieceId) -> bool {
        match self.piece_kind(p) {
            PieceKind::Pawn => self.pawn_move_legal(b, p, mv, target),
            PieceKind::Rook => self.rook_move_legal(b, mv),
            PieceKind::Knight => self.knight_move_legal(mv),
            PieceKind::Bishop => self.bishop_move_legal(b, mv),
            PieceKind::Queen => self.queen_move_legal(b, mv),
            PieceKind::King => self.king_move_legal(b, p, mv),
        }
    }

    /// Legality check for a driver-supplied move: the source must hold a
    /// piece of the moving side, the destination must not hold a friendly
    /// piece, and the piece's movement rules must allow it.
    pub fn move_valid(&self, b: BoardId, mv: Move, whites_move: bool) -> bool {
        if moves_to_same_square(mv) {
            return false;
        }
        let piece = self.piece_at(b, mv.from_row, mv.from_col);
        if piece.is_null() || self.piece_white(piece) != whites_move {
            return false;
        }
        let target = self.piece_at(b, mv.to_row, mv.to_col);
        if !target.is_null() && self.piece_white(target) == self.piece_white(piece) {
            return false;
        }
        self.piece_can_make_move(b, piece, mv, target)
    }
}

#[cfg(test)]
mod movegen_tests {
    use super::*;

    fn generated_moves(store: &mut Store, b: BoardId, white: bool) -> Vec<Move> {
        let saved = store.move_stack_pos(b);
        store.find_all_moves(b, white);
        let moves = (saved..store.move_stack_pos(b)).map(|i| store.move_at(b, i)).collect();
        store.set_move_stack_pos(b, saved);
        moves
    }

    #[test]
    pub fn twenty_moves_from_the_starting_position() {
        let mut store = Store::new();
        let b = store.create_board(true);

        let white_moves = generated_moves(&mut store, b, true);
        assert_eq!(white_moves.len(), 20);
        let pawn_moves = white_moves.iter().filter(|m| m.from_row == 1).count();
        assert_eq!(pawn_moves, 16);
        let knight_moves = white_moves.iter().filter(|m| m.from_row == 0).count();
        assert_eq!(knight_moves, 4);
        // No castling: the back rank is full.
        assert!(!white_moves.contains(&Move::new(0, 4, 0, 6)));
        assert!(!white_moves.contains(&Move::new(0, 4, 0, 2)));

        assert_eq!(generated_moves(&mut store, b, false).len(), 20);
    }

    #[test]
    pub fn pawn_moves_and_captures() {
        let mut store = Store::new();
        let b = store.create_empty_board(true);
        let pawn = store.create_piece(b, PieceKind::Pawn, true, 1, 3);
        store.create_piece(b, PieceKind::Knight, false, 2, 2);
        store.create_piece(b, PieceKind::Knight, false, 2, 4);
        store.create_piece(b, PieceKind::Knight, true, 2, 5);

        let moves = generated_moves(&mut store, b, true);
        let pawn_moves: Vec<&Move> = moves.iter().filter(|m| m.from_col == 3).collect();
        assert_eq!(pawn_moves.len(), 4);
        assert!(pawn_moves.contains(&&Move::new(1, 3, 2, 3)));
        assert!(pawn_moves.contains(&&Move::new(1, 3, 3, 3)));
        assert!(pawn_moves.contains(&&Move::new(1, 3, 2, 2)));
        assert!(pawn_moves.contains(&&Move::new(1, 3, 2, 4)));

        // A blocker one square ahead kills both pushes.
        store.create_piece(b, PieceKind::Bishop, false, 2, 3);
        let moves = generated_moves(&mut store, b, true);
        let pawn_pushes: Vec<&Move> = moves
            .iter()
            .filter(|m| m.from_col == 3 && m.from_row == 1 && m.to_col == 3)
            .collect();
        assert!(pawn_pushes.is_empty());
        assert!(store.piece_in_play(pawn));
    }

    #[test]
    pub fn double_push_blocked_on_far_square() {
        let mut store = Store::new();
        let b = store.create_empty_board(true);
        store.create_piece(b, PieceKind::Pawn, false, 6, 0);
        store.create_piece(b, PieceKind::Rook, true, 4, 0);

        let moves = generated_moves(&mut store, b, false);
        assert_eq!(moves, vec![Move::new(6, 0, 5, 0)]);
    }

    #[test]
    pub fn rook_rays_stop_at_pieces() {
        let mut store = Store::new();
        let b = store.create_empty_board(true);
        store.create_piece(b, PieceKind::Rook, true, 3, 3);
        store.create_piece(b, PieceKind::Pawn, true, 3, 6);
        store.create_piece(b, PieceKind::Pawn, false, 5, 3);

        let moves = generated_moves(&mut store, b, true);
        let rook_moves: Vec<&Move> = moves.iter().filter(|m| m.from_row == 3 && m.from_col == 3).collect();
        // Up: 2 squares including the capture. Down: 3. Left: 3. Right: 2,
        // stopping short of the friendly pawn.
        assert_eq!(rook_moves.len(), 10);
        assert!(rook_moves.contains(&&Move::new(3, 3, 5, 3)));
        assert!(!rook_moves.contains(&&Move::new(3, 3, 6, 3)));
        assert!(rook_moves.contains(&&Move::new(3, 3, 3, 5)));
        assert!(!rook_moves.contains(&&Move::new(3, 3, 3, 6)));
    }

    #[test]
    pub fn knight_moves_from_corner_and_center() {
        let mut store = Store::new();
        let b = store.create_empty_board(true);
        store.create_piece(b, PieceKind::Knight, true, 0, 0);
        assert_eq!(generated_moves(&mut store, b, true).len(), 2);

        let mut store = Store::new();
        let b = store.create_empty_board(true);
        store.create_piece(b, PieceKind::Knight, true, 3, 3);
        assert_eq!(generated_moves(&mut store, b, true).len(), 8);
    }

    #[test]
    pub fn castling_generated_only_when_allowed() {
        let mut store = Store::new();
        let b = store.create_empty_board(true);
        let king = store.create_piece(b, PieceKind::King, true, 0, 4);
        store.set_white_king(b, king);
        store.create_piece(b, PieceKind::Rook, true, 0, 7);
        store.create_piece(b, PieceKind::Rook, true, 0, 0);

        let moves = generated_moves(&mut store, b, true);
        assert!(moves.contains(&Move::new(0, 4, 0, 6)));
        assert!(moves.contains(&Move::new(0, 4, 0, 2)));

        // A piece between king and rook blocks that side only.
        let bishop = store.create_piece(b, PieceKind::Bishop, true, 0, 5);
        let moves = generated_moves(&mut store, b, true);
        assert!(!moves.contains(&Move::new(0, 4, 0, 6)));
        assert!(moves.contains(&Move::new(0, 4, 0, 2)));
        store.lift_piece(b, 0, 5);
        store.remove_piece(b, bishop);

        // A king that has moved, even back to its home square, cannot castle.
        store.apply_move(b, Move::new(0, 4, 0, 5));
        store.apply_move(b, Move::new(0, 5, 0, 4));
        let moves = generated_moves(&mut store, b, true);
        assert!(!moves.contains(&Move::new(0, 4, 0, 6)));
        assert!(!moves.contains(&Move::new(0, 4, 0, 2)));
    }

    #[test]
    pub fn move_valid_agrees_with_the_rules() {
        let mut store = Store::new();
        let b = store.create_board(true);

        assert!(store.move_valid(b, Move::parse("d2 d4").unwrap(), true));
        assert!(store.move_valid(b, Move::parse("b1 c3").unwrap(), true));
        assert!(store.move_valid(b, Move::parse("e7 e5").unwrap(), false));

        // Wrong side.
        assert!(!store.move_valid(b, Move::parse("d2 d4").unwrap(), false));
        // Empty source.
        assert!(!store.move_valid(b, Move::parse("d4 d5").unwrap(), true));
        // Friendly destination.
        assert!(!store.move_valid(b, Move::parse("a1 a2").unwrap(), true));
        // Blocked rook.
        assert!(!store.move_valid(b, Move::parse("a1 a5").unwrap(), true));
        // Pawns do not capture straight ahead: plant a black pawn on d3.
        store.create_piece(b, PieceKind::Pawn, false, 2, 3);
        assert!(!store.move_valid(b, Move::parse("d2 d3").unwrap(), true));
        assert!(store.move_valid(b, Move::parse("e2 d3").unwrap(), true));
        assert!(store.move_valid(b, Move::parse("c2 d3").unwrap(), true));
        // A move from a square to itself is never valid.
        assert!(!store.move_valid(b, Move::new(1, 3, 1, 3), true));
    }

    #[test]
    pub fn move_valid_accepts_castling_shape() {
        let mut store = Store::new();
        let b = store.create_empty_board(true);
        let king = store.create_piece(b, PieceKind::King, true, 0, 4);
        store.set_white_king(b, king);
        store.create_piece(b, PieceKind::Rook, true, 0, 7);

        assert!(store.move_valid(b, Move::new(0, 4, 0, 6), true));
        // No rook on the queenside corner.
        assert!(!store.move_valid(b, Move::new(0, 4, 0, 2), true));
    }
}
