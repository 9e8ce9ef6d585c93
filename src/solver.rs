//! An agent to solve the game of Connect 4

use rayon::prelude::*;

use crate::{bitboard::*, transposition_table::*, HEIGHT, WIDTH};

use std::cmp::Ordering;

/// The minimum possible score of a position
pub const MIN_SCORE: i32 = -((WIDTH * HEIGHT) as i32) / 2 + 3;
/// The maximum possible score of a postion
pub const MAX_SCORE: i32 = ((WIDTH * HEIGHT) as i32 + 1) / 2 - 3;

struct MoveSorter {
    size: usize,
    // move bitmap, column and heuristic score
    moves: [(u64, usize, i32); WIDTH],
}

impl MoveSorter {
    pub fn new() -> Self {
        Self {
            size: 0,
            moves: [(0, 0, 0); WIDTH],
        }
    }
    pub fn push(&mut self, new_move: u64, column: usize, score: i32) {
        let mut pos = self.size;
        self.size += 1;
        while pos != 0 && self.moves[pos - 1].2 > score {
            self.moves[pos] = self.moves[pos - 1];
            pos -= 1;
        }
        self.moves[pos] = (new_move, column, score);
    }
}

impl Iterator for MoveSorter {
    type Item = (u64, usize);

    fn next(&mut self) -> Option<Self::Item> {
        match self.size {
            0 => None,
            _ => {
                self.size -= 1;
                Some((self.moves[self.size].0, self.moves[self.size].1))
            }
        }
    }
}

/// Returns a slice ordering the columns from the middle outwards, as
/// the middle columns are often better moves
pub const fn move_order() -> [usize; WIDTH] {
    let mut move_order = [0; WIDTH];
    let mut i = 0;
    while i < WIDTH {
        move_order[i] = (WIDTH / 2) + (i % 2) * (i / 2 + 1) - (1 - i % 2) * (i / 2);
        i += 1;
    }
    move_order
}

/// How much of the game tree a solve call is asked to resolve.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SolveMode {
    /// Prove only the sign of the score: win, loss or draw for the side to
    /// move. Stops as soon as the sign is known.
    Weak,
    /// Converge on the exact score with iterative null-window probes.
    Strong,
}

/// The game-theoretic verdict attached to a [`Solution`].
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Outcome {
    /// An exhaustive search proved the game drawn.
    Draw,
    /// A forced win was proven without narrowing down its distance
    /// (weak solving).
    Win(Side),
    /// A forced win, `plies` moves from the solved position to the final
    /// stone.
    Mate { winner: Side, plies: usize },
    /// The depth budget ran out before anything was proven.
    Unproven,
}

/// What a solve call hands back to its caller.
///
/// `column` is `None` only for a full board, where there is nothing left to
/// choose. The caller owns the result outright; the solver keeps no reference
/// to it.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Solution {
    pub column: Option<usize>,
    pub score: i32,
    pub outcome: Outcome,
    pub nodes_searched: usize,
}

/// An agent to solve Connect 4 positions
///
/// # Notes
/// This agent uses a classical game tree search with various optimisations to
/// find the mathematically best move(s) in any position, thus 'solving' the game
///
/// # Position Scoring
/// A position is scored by how far a forced win is from the start of the game for either player.
/// If the first player wins with their final placed tile (their 21st tile in a 7x6 board)
/// the score is 1, or -1 if the the second player wins with their final tile. Earlier wins
/// have scores further from 0, up to 18/-18, where a player wins with their 4th tile. A drawn
/// position has a score of 0.
///
/// Searches whose depth budget does not cover the remaining game return 0
/// where nothing was proven within the horizon; any nonzero score is a proof
/// even then, since horizon cutoffs only ever contribute 0.
pub struct Solver<T: Table = TranspositionTable> {
    board: BitBoard,

    /// The number of nodes searched by this `Solver` so far (for diagnostics only)
    pub node_count: usize,
    table: T,
    // depth-limited searches must not mix their truncated values into the table
    table_enabled: bool,
}

impl Solver {
    /// Creates a new `Solver` from a bitboard
    pub fn new(board: BitBoard) -> Self {
        Self::with_table(board, TranspositionTable::new())
    }
}

impl<T: Table> Solver<T> {
    /// Creates a new `Solver` from a bitboard with a given transposition
    /// table, which may be shared with or recycled from other solvers
    pub fn with_table(board: BitBoard, table: T) -> Self {
        Self {
            board,
            node_count: 0,
            table,
            table_enabled: true,
        }
    }

    /// Calculates the best move of the current position within `depth` plies
    ///
    /// See [Position Scoring] for the meaning of the returned score.
    ///
    /// [Position Scoring]: #position-scoring
    pub fn solve(&mut self, depth: usize, mode: SolveMode) -> Solution {
        self.drive(depth, mode, None, true)
    }

    /// Like [`Self::solve`], seeding the first null-window probe of a strong
    /// solve from a prior score guess (MTD-f style). A good guess, such as
    /// the score of the previous move, cuts the number of probes; a bad one
    /// only costs extra probes, never correctness.
    pub fn solve_with_guess(&mut self, depth: usize, guess: i32) -> Solution {
        self.drive(depth, SolveMode::Strong, Some(guess), true)
    }

    /// Like [`Self::solve`], logging narrowing progress to stdout
    pub fn solve_verbose(&mut self, depth: usize, mode: SolveMode) -> Solution {
        self.drive(depth, mode, None, false)
    }

    fn drive(
        &mut self,
        depth: usize,
        mode: SolveMode,
        guess: Option<i32>,
        silent: bool,
    ) -> Solution {
        let moves = self.board.num_moves();

        // a full board is terminal, there is nothing to search or choose
        if self.board.is_full() {
            return Solution {
                column: None,
                score: 0,
                outcome: Outcome::Draw,
                nodes_searched: 0,
            };
        }

        let start_nodes = self.node_count;

        // a win available this ply is exact in every mode
        for &column in move_order().iter() {
            if self.board.playable(column) && self.board.check_winning_move(column) {
                self.node_count += 1;
                return Solution {
                    column: Some(column),
                    score: ((WIDTH * HEIGHT + 1 - moves) / 2) as i32,
                    outcome: Outcome::Mate {
                        winner: self.board.side_to_move(),
                        plies: 1,
                    },
                    nodes_searched: self.node_count - start_nodes,
                };
            }
        }

        let remaining = WIDTH * HEIGHT - moves;
        let depth = depth.max(1).min(remaining);
        self.table_enabled = depth == remaining;

        let (score, column, sign_only) = match mode {
            SolveMode::Weak => {
                // is the score above zero?
                let (high, best_high) = self.top_level_search(0, 1, depth);
                if high > 0 {
                    (high, best_high, true)
                } else {
                    // no: below, or exactly zero?
                    let (low, best_low) = self.top_level_search(-1, 0, depth);
                    (if low < 0 { low } else { 0 }, best_low, low < 0)
                }
            }
            SolveMode::Strong => {
                let min = -((WIDTH * HEIGHT - moves) as i32) / 2;
                let max = (WIDTH * HEIGHT + 1 - moves) as i32 / 2;
                let (score, column) = self.narrow(min, max, depth, guess, silent);
                (score, column, false)
            }
        };

        let outcome = if score != 0 {
            let winner = if score > 0 {
                self.board.side_to_move()
            } else {
                self.board.side_to_move().other()
            };
            if sign_only {
                Outcome::Win(winner)
            } else {
                Outcome::Mate {
                    winner,
                    plies: self.plies_to_end(score),
                }
            }
        } else if self.table_enabled {
            Outcome::Draw
        } else {
            Outcome::Unproven
        };

        Solution {
            column: Some(column),
            score,
            outcome,
            nodes_searched: self.node_count - start_nodes,
        }
    }

    /// Iteratively narrows `[min, max]` around the true score with
    /// null-window probes, returning the score and the best move
    ///
    /// Probing a single value proves only "above" or "below", which is far
    /// cheaper than one wide-window search; the transposition table absorbs
    /// most of the re-searching between probes.
    fn narrow(
        &mut self,
        mut min: i32,
        mut max: i32,
        depth: usize,
        mut guess: Option<i32>,
        silent: bool,
    ) -> (i32, usize) {
        let mut next_move = WIDTH;

        while min < max {
            let mut mid = min + (max - min) / 2;
            // probe shallow wins and losses before the middling scores
            if mid <= 0 && min / 2 < mid {
                mid = min / 2
            } else if mid >= 0 && max / 2 > mid {
                mid = max / 2
            }
            // the caller's guess overrides the first probe only
            if let Some(seed) = guess.take() {
                mid = seed.max(min).min(max - 1);
            }

            if !silent {
                println!(
                    "Search window: ({}, {}], uncertainty: {}",
                    mid,
                    mid + 1,
                    max - min
                );
            }

            // whether the true score is above or below mid, not its value
            let (r, best_move) = self.top_level_search(mid, mid + 1, depth);
            next_move = best_move;

            if r <= mid {
                // actual score <= mid
                max = r
            } else {
                // actual score > mid
                min = r;
            }
        }
        // min and max have met on the score
        (min, next_move)
    }

    /// Performs a top-level search, tracking the best root move
    ///
    /// Returns the score of the position and the calculated best move
    fn top_level_search(&mut self, mut alpha: i32, beta: i32, depth: usize) -> (i32, usize) {
        self.node_count += 1;

        // check for a win for the current player on this move
        for column in 0..WIDTH {
            if self.board.playable(column) && self.board.check_winning_move(column) {
                return (
                    ((WIDTH * HEIGHT + 1 - self.board.num_moves()) / 2) as i32,
                    column,
                );
            }
        }

        // a loss two plies out may not be claimed inside a one-ply budget
        if depth < 2 {
            return (0, self.first_playable());
        }

        // look for moves that don't give the opponent a next turn win
        let non_losing_moves = self.board.non_losing_moves();
        if non_losing_moves == 0 {
            // all moves lose, resist from the centre outwards
            return (
                -((WIDTH * HEIGHT - self.board.num_moves()) as i32) / 2,
                self.first_playable(),
            );
        }

        let mut moves = MoveSorter::new();
        for i in (0..WIDTH).rev() {
            let column = move_order()[i];
            let candidate = non_losing_moves & BitBoard::column_mask(column);
            if candidate != 0 {
                moves.push(candidate, column, self.board.move_score(candidate))
            }
        }

        // search the next level of the tree and keep track of the best move;
        // starting below the score floor so the first child always registers
        let mut best_score = MIN_SCORE - 1;
        let mut best_move = self.first_playable();
        for (move_bitmap, column) in moves {
            let mut next = self.board;
            next.play(move_bitmap);
            // the search window is flipped for the other player
            let score = -self.negamax(next, -beta, -alpha, depth - 1);
            // if the actual score is better than beta, we can prune the tree
            // because the other player will not pick this branch
            if score >= beta {
                return (score, column);
            }
            if score > alpha {
                alpha = score;
            }
            if score > best_score {
                best_score = score;
                best_move = column;
            }
        }

        (alpha, best_move)
    }

    /// Performs game tree search below the root
    ///
    /// Returns the score of the position (see [Position Scoring])
    ///
    /// [Position Scoring]: #position-scoring
    fn negamax(&mut self, board: BitBoard, mut alpha: i32, mut beta: i32, depth: usize) -> i32 {
        self.node_count += 1;

        // check for next-move win for current player
        for column in 0..WIDTH {
            if board.playable(column) && board.check_winning_move(column) {
                return ((WIDTH * HEIGHT + 1 - board.num_moves()) / 2) as i32;
            }
        }

        // the horizon: nothing proven within the depth budget
        if depth < 2 {
            return 0;
        }

        // look for moves that don't give the opponent a next turn win
        let non_losing_moves = board.non_losing_moves();
        if non_losing_moves == 0 {
            // covers the full board too, where the loss formula gives the draw score
            return -((WIDTH * HEIGHT - board.num_moves()) as i32) / 2;
        }

        // upper bound of the score, a win on our next turn at the earliest
        let mut max = ((WIDTH * HEIGHT - 1 - board.num_moves()) / 2) as i32;

        // try to fetch an upper/lower bound of the score from the transposition table
        let key = board.key();
        if self.table_enabled {
            let value = self.table.get(key) as i32;
            if value != 0 {
                if value > MAX_SCORE - MIN_SCORE + 1 {
                    // lower bound
                    let min = value + 2 * MIN_SCORE - MAX_SCORE - 2;
                    if alpha < min {
                        alpha = min;
                        if alpha >= beta {
                            // prune the exploration
                            return alpha;
                        }
                    }
                } else {
                    // upper bound
                    let upper = value + MIN_SCORE - 1;
                    if max > upper {
                        max = upper;
                    }
                }
            }
        }
        if beta > max {
            // clamp beta to the calculated upper bound
            beta = max;
            // if the upper bound is lower than alpha, we can prune the exploration
            if alpha >= beta {
                return beta;
            };
        }

        let mut moves = MoveSorter::new();
        // reversing move order to put edges first reduces the amount of sorting
        // as these moves are worse on average
        for i in (0..WIDTH).rev() {
            let column = move_order()[i];
            let candidate = non_losing_moves & BitBoard::column_mask(column);
            if candidate != 0 {
                moves.push(candidate, column, board.move_score(candidate))
            }
        }

        // search the next level of the tree
        for (move_bitmap, _column) in moves {
            let mut next = board;
            next.play(move_bitmap);
            // the search window is flipped for the other player
            let score = -self.negamax(next, -beta, -alpha, depth - 1);
            // if a child node's score is better than beta, we can prune the tree
            // here because a perfect opponent will not pick this branch
            if score >= beta {
                if self.table_enabled {
                    // save a lower bound of the score
                    self.table
                        .set(key, (score + MAX_SCORE - 2 * MIN_SCORE + 2) as u8);
                }
                return score;
            }
            if score > alpha {
                alpha = score;
            }
        }

        if self.table_enabled {
            // offset of one to prevent putting a 0, which represents an empty entry
            self.table.set(key, (alpha - MIN_SCORE + 1) as u8);
        }
        alpha
    }

    // the centre-most legal column, the deterministic fallback when every
    // move is equally hopeless
    fn first_playable(&self) -> usize {
        move_order()
            .iter()
            .copied()
            .find(|&column| self.board.playable(column))
            .unwrap_or(WIDTH)
    }

    /// Converts an exact nonzero score to the number of plies between this
    /// position and the final stone of the forced win; a zero score maps to
    /// the number of plies left to fill the board.
    pub fn plies_to_end(&self, score: i32) -> usize {
        let moves = self.board.num_moves();
        match score.cmp(&0) {
            Ordering::Equal => WIDTH * HEIGHT - moves,
            _ => {
                // parity of the stone count on the winner's final turn
                let winner_parity = if score > 0 { moves % 2 } else { (moves + 1) % 2 };
                let stones_at_end = WIDTH * HEIGHT + 1 - 2 * score.abs() as usize + winner_parity;
                stones_at_end - moves
            }
        }
    }
}

impl<T: Table> std::ops::Deref for Solver<T> {
    type Target = BitBoard;

    fn deref(&self) -> &Self::Target {
        &self.board
    }
}

/// Scores every legal column of `board` independently, one worker per column,
/// all sharing one lock-free transposition table.
///
/// Each entry is the exact score of the position after playing that column,
/// negated back to the perspective of the side to move at `board`; `None`
/// marks a full column. Scores are exact values, so the result does not
/// depend on worker scheduling.
pub fn analyze(board: BitBoard, depth: usize) -> Vec<Option<i32>> {
    let table = SharedTranspositionTable::new();
    (0..WIDTH)
        .into_par_iter()
        .map(|column| {
            if !board.playable(column) {
                return None;
            }
            if board.check_winning_move(column) {
                return Some(((WIDTH * HEIGHT + 1 - board.num_moves()) / 2) as i32);
            }
            let bitmap = board.move_bitmap(column);
            let mut next = board;
            next.play(bitmap);
            let mut solver = Solver::with_table(next, table.clone());
            let result = solver.solve(depth.saturating_sub(1), SolveMode::Strong);
            Some(-result.score)
        })
        .collect()
}

/// The best column of an [`analyze`] result, ties broken centre-out.
pub fn best_column(scores: &[Option<i32>]) -> Option<usize> {
    let mut best: Option<(usize, i32)> = None;
    for &column in move_order().iter() {
        if let Some(score) = scores.get(column).copied().flatten() {
            match best {
                Some((_, leader)) if leader >= score => {}
                _ => best = Some((column, score)),
            }
        }
    }
    best.map(|(column, _)| column)
}
