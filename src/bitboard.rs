use anyhow::{anyhow, ensure, Result};

use crate::{HEIGHT, WIDTH};

mod static_masks {
    use crate::{HEIGHT, WIDTH};

    pub const fn bottom_row() -> u64 {
        let mut mask = 0;
        let mut column = 0;
        while column < WIDTH {
            mask |= 1 << (column * (HEIGHT + 1));
            column += 1;
        }
        mask
    }
    pub const fn full_board() -> u64 {
        bottom_row() * ((1 << HEIGHT as u64) - 1)
    }
}

/// One of the two players.
///
/// `First` owns every stone placed when the total stone count was even, so it
/// is always `First`'s turn on an empty board. Which physical player (human,
/// machine, red, yellow...) maps to which side is entirely the caller's
/// business; the engine only ever reasons about "the side to move".
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Side {
    First,
    Second,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Side::First => Side::Second,
            Side::Second => Side::First,
        }
    }
}

/// A Connect 4 position packed into two `u64` masks.
///
/// Each column occupies `HEIGHT + 1` bits, low bit at the bottom row; the
/// extra sentinel bit above each column keeps shift-based alignment checks
/// from bleeding into the neighbouring column and makes
/// `player_mask + board_mask` a unique key for any reachable position.
/// `player_mask` always holds the stones of the side to move; emptiness is
/// the absence of a bit in `board_mask`, never a stored third state.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct BitBoard {
    // stones of the side to move
    player_mask: u64,
    // all stones
    board_mask: u64,
    num_moves: usize,
}

impl BitBoard {
    pub fn new() -> Self {
        Self {
            player_mask: 0,
            board_mask: 0,
            num_moves: 0,
        }
    }

    /// Builds a position by replaying a string of 1-indexed column digits.
    ///
    /// Sequences that play into a full column or keep playing after a win are
    /// rejected, so the solver never starts from a decided position.
    pub fn from_moves<S: AsRef<str>>(moves: S) -> Result<Self> {
        let mut board = Self::new();

        for column_char in moves.as_ref().chars() {
            match column_char.to_digit(10).map(|c| c as usize) {
                Some(column @ 1..=WIDTH) => {
                    let column = column - 1;
                    if !board.playable(column) {
                        return Err(anyhow!("Invalid move, column {} full", column + 1));
                    }
                    if board.check_winning_move(column) {
                        return Err(anyhow!("Invalid position, game is over"));
                    }
                    board.play(board.move_bitmap(column));
                }
                _ => return Err(anyhow!("could not parse '{}' as a valid move", column_char)),
            }
        }
        Ok(board)
    }

    pub fn from_masks(player_mask: u64, board_mask: u64, num_moves: usize) -> Self {
        Self {
            player_mask,
            board_mask,
            num_moves,
        }
    }

    pub fn top_mask(column: usize) -> u64 {
        1 << (column * (HEIGHT + 1) + (HEIGHT - 1))
    }

    pub fn bottom_mask(column: usize) -> u64 {
        1 << (column * (HEIGHT + 1))
    }

    pub fn column_mask(column: usize) -> u64 {
        ((1 << HEIGHT) - 1) << (column * (HEIGHT + 1))
    }

    /// The single-bit move landing in `column` at its current fill level.
    pub fn move_bitmap(&self, column: usize) -> u64 {
        (self.board_mask + Self::bottom_mask(column)) & Self::column_mask(column)
    }

    pub fn num_moves(&self) -> usize {
        self.num_moves
    }

    pub fn number_of_stones(&self) -> usize {
        self.num_moves
    }

    pub fn is_full(&self) -> bool {
        self.num_moves == WIDTH * HEIGHT
    }

    pub fn side_to_move(&self) -> Side {
        if self.num_moves % 2 == 0 {
            Side::First
        } else {
            Side::Second
        }
    }

    pub fn playable(&self, column: usize) -> bool {
        Self::top_mask(column) & self.board_mask == 0
    }

    /// The cell contents at `(column, row)`, row 0 at the bottom.
    pub fn cell_at(&self, column: usize, row: usize) -> Option<Side> {
        let bit = 1 << (column * (HEIGHT + 1) + row);
        if self.board_mask & bit == 0 {
            None
        } else if self.player_mask & bit != 0 {
            Some(self.side_to_move())
        } else {
            Some(self.side_to_move().other())
        }
    }

    /// Applies a committed move for `side`, returning the successor position.
    ///
    /// The receiver is never mutated: callers replace their held value on
    /// success and keep the original on rejection. Playing out of turn or
    /// into a full column is rejected.
    pub fn play_checked(&self, column: usize, side: Side) -> Result<Self> {
        ensure!(
            column < WIDTH,
            "column {} out of range, columns are 0 to {}",
            column,
            WIDTH - 1
        );
        ensure!(
            side == self.side_to_move(),
            "it is not {:?}'s turn to move",
            side
        );
        ensure!(self.playable(column), "column {} is full", column + 1);

        let mut next = *self;
        next.play(self.move_bitmap(column));
        Ok(next)
    }

    /// Unchecked single-bit move application, the search hot path.
    pub(crate) fn play(&mut self, move_bitmap: u64) {
        // hand the stones to the previous player and switch sides
        self.player_mask ^= self.board_mask;
        self.board_mask |= move_bitmap;
        self.num_moves += 1;
    }

    /// Would dropping a stone in `column` win for the side to move?
    pub fn check_winning_move(&self, column: usize) -> bool {
        Self::has_alignment(self.player_mask | self.move_bitmap(column))
    }

    /// Does `side` already have four in a row on the board?
    pub fn has_won(&self, side: Side) -> bool {
        let mask = if side == self.side_to_move() {
            self.player_mask
        } else {
            self.player_mask ^ self.board_mask
        };
        Self::has_alignment(mask)
    }

    // four in a row anywhere in the mask, via pairs of runs of 2
    fn has_alignment(mask: u64) -> bool {
        // horizontal
        let mut m = mask & (mask >> (HEIGHT + 1));
        if m & (m >> (2 * (HEIGHT + 1))) != 0 {
            return true;
        }

        // diagonal /
        m = mask & (mask >> HEIGHT);
        if m & (m >> (2 * HEIGHT)) != 0 {
            return true;
        }

        // diagonal \
        m = mask & (mask >> (HEIGHT + 2));
        if m & (m >> (2 * (HEIGHT + 2))) != 0 {
            return true;
        }

        // vertical
        m = mask & (mask >> 1);
        m & (m >> 2) != 0
    }

    /// Bitmap of every column's next free cell.
    pub fn possible_moves(&self) -> u64 {
        (self.board_mask + static_masks::bottom_row()) & static_masks::full_board()
    }

    /// Possible moves that don't hand the opponent a win on the reply.
    ///
    /// Zero means every move loses: either the opponent holds two immediate
    /// threats, or the only safe cell sits directly below one of them.
    pub fn non_losing_moves(&self) -> u64 {
        let mut possible_moves = self.possible_moves();
        let opponent_winning_positions = self.opponent_winning_positions();
        let forced_moves = possible_moves & opponent_winning_positions;

        if forced_moves != 0 {
            // two or more forced cells can't all be covered in one move
            if forced_moves & (forced_moves - 1) != 0 {
                return 0;
            } else {
                possible_moves = forced_moves
            }
        }
        // never play directly below an opponent's winning cell
        possible_moves & !(opponent_winning_positions >> 1)
    }

    // open cells that would complete an alignment for the opponent
    fn opponent_winning_positions(&self) -> u64 {
        self.winning_positions(self.player_mask ^ self.board_mask)
    }

    // open cells completing an alignment for the given stone mask
    fn winning_positions(&self, mask: u64) -> u64 {
        // vertical: the cell above a run of 3
        let mut r = (mask << 1) & (mask << 2) & (mask << 3);

        // horizontal
        let mut p = (mask << (HEIGHT + 1)) & (mask << (2 * (HEIGHT + 1)));
        // right end of a run of 3
        r |= p & (mask << (3 * (HEIGHT + 1)));
        // the hole in O O _ O
        r |= p & (mask >> (HEIGHT + 1));

        p = (mask >> (HEIGHT + 1)) & (mask >> (2 * (HEIGHT + 1)));
        // left end of a run of 3
        r |= p & (mask >> (3 * (HEIGHT + 1)));
        // the hole in O _ O O
        r |= p & (mask << (HEIGHT + 1));

        // diagonal /
        p = (mask << HEIGHT) & (mask << (2 * HEIGHT));
        r |= p & (mask << (3 * HEIGHT));
        r |= p & (mask >> HEIGHT);

        p = (mask >> HEIGHT) & (mask >> (2 * HEIGHT));
        r |= p & (mask >> (3 * HEIGHT));
        r |= p & (mask << HEIGHT);

        // diagonal \
        p = (mask << (HEIGHT + 2)) & (mask << (2 * (HEIGHT + 2)));
        r |= p & (mask << (3 * (HEIGHT + 2)));
        r |= p & (mask >> (HEIGHT + 2));

        p = (mask >> (HEIGHT + 2)) & (mask >> (2 * (HEIGHT + 2)));
        r |= p & (mask >> (3 * (HEIGHT + 2)));
        r |= p & (mask << (HEIGHT + 2));

        r & (static_masks::full_board() ^ self.board_mask)
    }

    /// Ordering heuristic: how many alignments would this move leave open?
    pub fn move_score(&self, candidate: u64) -> i32 {
        self.winning_positions(self.player_mask | candidate)
            .count_ones() as i32
    }

    /// Canonical transposition key.
    ///
    /// Adding the two masks sets each column's bit just above its top stone,
    /// which recovers the column heights, so the sum losslessly collapses the
    /// pair into one integer: positions reached by different move orders but
    /// holding identical stones map to the same key.
    pub fn key(&self) -> u64 {
        self.player_mask + self.board_mask
    }
}

impl Default for BitBoard {
    fn default() -> Self {
        Self::new()
    }
}
