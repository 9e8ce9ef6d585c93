#[cfg(test)]
pub mod test {
    use anyhow::Result;

    use crate::transposition_table::TABLE_MAX_SIZE;
    use crate::{
        analyze, best_column, move_order, BitBoard, Outcome, SharedTranspositionTable, Side,
        SolveMode, Solver, Table, TranspositionTable, HEIGHT, WIDTH,
    };

    #[test]
    pub fn board_mechanics() -> Result<()> {
        let board = BitBoard::new();
        assert_eq!(board.number_of_stones(), 0);
        assert_eq!(board.side_to_move(), Side::First);
        for column in 0..WIDTH {
            assert!(board.playable(column));
        }

        let board = board.play_checked(3, Side::First)?;
        assert_eq!(board.number_of_stones(), 1);
        assert_eq!(board.side_to_move(), Side::Second);
        assert_eq!(board.cell_at(3, 0), Some(Side::First));
        assert_eq!(board.cell_at(3, 1), None);

        // the original value is untouched by a rejected move
        assert!(board.play_checked(3, Side::First).is_err());
        assert!(board.play_checked(WIDTH, Side::Second).is_err());
        assert_eq!(board.number_of_stones(), 1);

        let board = BitBoard::from_moves("222222")?;
        assert!(!board.playable(1));
        assert!(board.playable(0));
        Ok(())
    }

    #[test]
    pub fn move_string_rejections() {
        assert!(BitBoard::from_moves("4x4").is_err());
        assert!(BitBoard::from_moves("448").is_err());
        assert!(BitBoard::from_moves("440").is_err());
        // seventh move plays into a full column
        assert!(BitBoard::from_moves("2222222").is_err());
        // the game is over after the fourth stone in column 1
        assert!(BitBoard::from_moves("1212121").is_err());
    }

    #[test]
    pub fn win_recognition() -> Result<()> {
        let mut board = BitBoard::new();
        for &(column, side) in &[
            (0, Side::First),
            (1, Side::Second),
            (0, Side::First),
            (1, Side::Second),
            (0, Side::First),
            (1, Side::Second),
            (0, Side::First),
        ] {
            board = board.play_checked(column, side)?;
        }
        assert!(board.has_won(Side::First));
        assert!(!board.has_won(Side::Second));

        // three on the bottom row threaten both ends
        let board = BitBoard::from_moves("445566")?;
        assert!(board.check_winning_move(2));
        assert!(board.check_winning_move(6));
        assert!(!board.check_winning_move(0));

        // a rising diagonal completed by dropping into column 4
        let board = BitBoard::from_moves("1223433445")?;
        assert!(board.check_winning_move(3));
        Ok(())
    }

    #[test]
    pub fn keys_collapse_transpositions() -> Result<()> {
        let a = BitBoard::from_moves("1122")?;
        let b = BitBoard::from_moves("2211")?;
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), BitBoard::from_moves("1133")?.key());
        Ok(())
    }

    #[test]
    pub fn centre_out_move_order() {
        assert_eq!(move_order(), [3, 2, 4, 1, 5, 0, 6]);
    }

    #[test]
    pub fn mate_in_one() -> Result<()> {
        let mut solver = Solver::new(BitBoard::from_moves("112233")?);
        let solution = solver.solve(WIDTH * HEIGHT, SolveMode::Strong);

        assert_eq!(solution.column, Some(3));
        assert_eq!(solution.score, 18);
        assert_eq!(
            solution.outcome,
            Outcome::Mate {
                winner: Side::First,
                plies: 1
            }
        );

        // with two winning columns the more central one is preferred
        let mut solver = Solver::new(BitBoard::from_moves("445566")?);
        let solution = solver.solve(WIDTH * HEIGHT, SolveMode::Strong);
        assert_eq!(solution.column, Some(2));
        assert_eq!(solution.score, 18);
        Ok(())
    }

    #[test]
    pub fn unavoidable_loss() -> Result<()> {
        // player 1 threatens both ends of 2-3-4, player 2 can only delay
        let board = BitBoard::from_moves("27374")?;

        let mut solver = Solver::new(board);
        let strong = solver.solve(WIDTH * HEIGHT, SolveMode::Strong);
        assert_eq!(strong.score, -18);
        assert_eq!(
            strong.outcome,
            Outcome::Mate {
                winner: Side::First,
                plies: 2
            }
        );
        assert_eq!(strong.column, Some(3));

        let mut solver = Solver::new(board);
        let weak = solver.solve(WIDTH * HEIGHT, SolveMode::Weak);
        assert_eq!(weak.score, -18);
        assert_eq!(weak.outcome, Outcome::Win(Side::First));
        assert_eq!(weak.column, Some(3));
        Ok(())
    }

    #[test]
    pub fn guess_does_not_change_the_score() -> Result<()> {
        let board = BitBoard::from_moves("27374")?;

        let plain = Solver::new(board).solve(WIDTH * HEIGHT, SolveMode::Strong);
        for guess in [-18, 0, 15].iter() {
            let seeded = Solver::new(board).solve_with_guess(WIDTH * HEIGHT, *guess);
            assert_eq!(seeded.score, plain.score);
            assert_eq!(seeded.outcome, plain.outcome);
        }
        Ok(())
    }

    #[test]
    pub fn transpositions_solve_identically() -> Result<()> {
        let a = Solver::new(BitBoard::from_moves("1122")?).solve(6, SolveMode::Strong);
        let b = Solver::new(BitBoard::from_moves("2211")?).solve(6, SolveMode::Strong);
        assert_eq!(a.score, b.score);
        assert_eq!(a.outcome, b.outcome);
        Ok(())
    }

    #[test]
    pub fn mirrored_positions_solve_identically() -> Result<()> {
        let left = Solver::new(BitBoard::from_moves("443")?).solve(8, SolveMode::Strong);
        let right = Solver::new(BitBoard::from_moves("445")?).solve(8, SolveMode::Strong);
        assert_eq!(left.score, right.score);
        Ok(())
    }

    #[test]
    pub fn shallow_search_stays_honest() -> Result<()> {
        // nothing can be proven about this position four plies out
        let mut solver = Solver::new(BitBoard::from_moves("1")?);
        let solution = solver.solve(4, SolveMode::Strong);

        assert_eq!(solution.score, 0);
        assert_eq!(solution.outcome, Outcome::Unproven);
        let column = solution.column.unwrap();
        assert!(solver.playable(column));
        Ok(())
    }

    // a full-board colouring with no four in a row for either player:
    // colour(column, row) = (column + row / 2) % 2
    fn drawn_tiling() -> (u64, u64) {
        let mut colour_zero = 0u64;
        let mut full = 0u64;
        for column in 0..WIDTH {
            for row in 0..HEIGHT {
                let bit = 1u64 << (column * (HEIGHT + 1) + row);
                full |= bit;
                if (column + row / 2) % 2 == 0 {
                    colour_zero |= bit;
                }
            }
        }
        (colour_zero, full)
    }

    #[test]
    pub fn full_board_is_a_draw() {
        let (colour_zero, full) = drawn_tiling();
        let board = BitBoard::from_masks(colour_zero, full, WIDTH * HEIGHT);

        assert!(board.is_full());
        assert!(!board.has_won(Side::First));
        assert!(!board.has_won(Side::Second));

        let solution = Solver::new(board).solve(WIDTH * HEIGHT, SolveMode::Strong);
        assert_eq!(solution.column, None);
        assert_eq!(solution.score, 0);
        assert_eq!(solution.outcome, Outcome::Draw);
    }

    #[test]
    pub fn one_move_left_draw() {
        // the tiling minus its top-right cell, player 2 to fill it
        let (colour_zero, full) = drawn_tiling();
        let last_cell = 1u64 << (6 * (HEIGHT + 1) + 5);
        let board = BitBoard::from_masks(full ^ colour_zero, full ^ last_cell, WIDTH * HEIGHT - 1);

        assert_eq!(board.side_to_move(), Side::Second);
        assert!(!board.check_winning_move(6));

        let solution = Solver::new(board).solve(WIDTH * HEIGHT, SolveMode::Strong);
        assert_eq!(solution.column, Some(6));
        assert_eq!(solution.score, 0);
        assert_eq!(solution.outcome, Outcome::Draw);
    }

    #[test]
    pub fn table_stores_and_evicts() {
        let mut table = TranspositionTable::new();
        assert_eq!(table.get(42), 0);

        table.set(42, 7);
        assert_eq!(table.get(42), 7);

        // a colliding key evicts the previous entry rather than lying
        let colliding = 42 + TABLE_MAX_SIZE as u64;
        table.set(colliding, 9);
        assert_eq!(table.get(colliding), 9);
        assert_eq!(table.get(42), 0);
    }

    #[test]
    pub fn shared_table_carries_bounds_across_solves() {
        // the drawn tiling with the top two rows of the middle four
        // columns still open: a real endgame search with transpositions
        let (colour_zero, full) = drawn_tiling();
        let mut open = 0u64;
        for column in 2..=5 {
            for row in 4..HEIGHT {
                open |= 1 << (column * (HEIGHT + 1) + row);
            }
        }
        let board_mask = full ^ open;
        let board = BitBoard::from_masks(colour_zero & board_mask, board_mask, WIDTH * HEIGHT - 8);
        let table = SharedTranspositionTable::new();

        let mut solver = Solver::with_table(board, table.clone());
        let cold = solver.solve(WIDTH * HEIGHT, SolveMode::Strong);

        // a fresh solver over a clone of the table sees the proved bounds
        let mut solver = Solver::with_table(board, table.clone());
        let warm = solver.solve(WIDTH * HEIGHT, SolveMode::Strong);

        assert_eq!(warm.score, cold.score);
        assert_eq!(warm.outcome, cold.outcome);
        assert!(warm.nodes_searched < cold.nodes_searched);
    }

    #[test]
    pub fn shared_table_clones_share_storage() {
        let mut table = SharedTranspositionTable::new();
        assert_eq!(table.get(99), 0);

        table.set(99, 5);
        let clone = table.clone();
        assert_eq!(clone.get(99), 5);

        let colliding = 99 + TABLE_MAX_SIZE as u64;
        assert_eq!(table.get(colliding), 0);
    }

    // the first player wins the empty board with their last stone, starting
    // in the centre; far too slow for every test run, so run it on demand
    // with `cargo test full_game_search -- --ignored`
    #[test]
    #[ignore]
    pub fn full_game_search() {
        use std::time::Instant;

        let mut solver = Solver::new(BitBoard::new());
        let start_time = Instant::now();
        let solution = solver.solve(WIDTH * HEIGHT, SolveMode::Strong);
        let time = start_time.elapsed();

        println!(
            "Full game search\n Time: {:.6}s, No. of positions: {}, kpos/s: {}",
            time.as_secs_f64(),
            solution.nodes_searched,
            solution.nodes_searched as f64 / (1000.0 * time.as_secs_f64())
        );

        assert_eq!(solution.score, 1);
        assert_eq!(solution.column, Some(3));
        assert_eq!(
            solution.outcome,
            Outcome::Mate {
                winner: Side::First,
                plies: 41
            }
        );
    }

    #[test]
    pub fn analyze_finds_the_winning_column() -> Result<()> {
        let board = BitBoard::from_moves("112233")?;
        let scores = analyze(board, 6);

        assert_eq!(scores.len(), WIDTH);
        assert_eq!(scores[3], Some(18));
        assert_eq!(best_column(&scores), Some(3));
        Ok(())
    }

    #[test]
    pub fn analyze_skips_full_columns() -> Result<()> {
        let board = BitBoard::from_moves("222222")?;
        let scores = analyze(board, 2);

        assert_eq!(scores[1], None);
        assert!(scores[0].is_some());
        assert!(best_column(&scores).is_some());
        Ok(())
    }
}
