use anyhow::{anyhow, Context, Result};
use indicatif::*;
use rayon::prelude::*;

use std::fs::File;
use std::io::{stdin, stdout, BufRead, BufReader, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use c4solver::*;

mod gameboard;
use gameboard::*;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("bench") => {
            let path = args
                .get(2)
                .ok_or_else(|| anyhow!("usage: c4solver bench <file> [depth]"))?;
            let depth = match args.get(3) {
                Some(depth) => depth
                    .parse::<usize>()
                    .with_context(|| format!("could not parse '{}' as a search depth", depth))?,
                None => WIDTH * HEIGHT,
            };
            bench(path, depth)
        }
        Some(other) => Err(anyhow!("unknown subcommand '{}'", other)),
        None => play(),
    }
}

/// Picks a search depth by how far along the game is; early positions are
/// by far the most expensive to search, so they get the shallowest budget
fn depth_policy(stones: usize) -> usize {
    if stones > 16 {
        25
    } else if stones > 6 {
        19
    } else {
        13
    }
}

fn play() -> Result<()> {
    let mut board = GameBoard::new();
    // clones of the shared table alias one store, so every AI move
    // starts from the bounds the previous solves already proved
    let transposition_table = SharedTranspositionTable::new();
    // seed each strong solve with the score of the previous one
    let mut last_score: Option<i32> = None;

    let stdin = stdin();

    println!("Welcome to Connect 4\n");

    let mut ai_players = (false, false);

    // choose AI control of player 1
    loop {
        let mut buffer = String::new();
        print!("Is player 1 AI controlled? y/n: ");
        stdout().flush().expect("failed to flush to stdout!");
        stdin.read_line(&mut buffer)?;
        match buffer.to_lowercase().chars().next() {
            Some(_letter @ 'y') => {
                ai_players.0 = true;
                break;
            }
            Some(_letter @ 'n') => break,
            _ => println!("Unknown answer given"),
        }
    }

    // choose AI control of player 2
    loop {
        let mut buffer = String::new();
        print!("Is player 2 AI controlled? y/n: ");
        stdout().flush().expect("failed to flush to stdout!");
        stdin.read_line(&mut buffer)?;
        match buffer.to_lowercase().chars().next() {
            Some(_letter @ 'y') => {
                ai_players.1 = true;
                break;
            }
            Some(_letter @ 'n') => break,
            _ => println!("Unknown answer given"),
        }
    }

    // game loop
    loop {
        board.display().expect("Failed to draw board!");

        match board.state {
            GameState::Playing => {
                let side = board.board.side_to_move();
                let ai_turn = match side {
                    Side::First => ai_players.0,
                    Side::Second => ai_players.1,
                };

                let next_move = if ai_turn {
                    println!("AI is thinking...");
                    stdout().flush().expect("Failed to flush to stdout!");

                    // slow down play if both players are AI
                    if ai_players == (true, true) {
                        std::thread::sleep(std::time::Duration::new(3, 0));
                    }

                    let mut solver = Solver::with_table(board.board, transposition_table.clone());

                    let depth = depth_policy(board.board.number_of_stones());
                    let start = Instant::now();
                    let solution = match last_score {
                        Some(guess) => solver.solve_with_guess(depth, guess),
                        // no previous score to seed from: show the narrowing
                        None => solver.solve_verbose(depth, SolveMode::Strong),
                    };
                    let elapsed = start.elapsed();
                    last_score = Some(solution.score);

                    report_outcome(&solution);
                    println!(
                        "Searched {} nodes in {:.2}s ({:.0} knps)",
                        solution.nodes_searched,
                        elapsed.as_secs_f64(),
                        solution.nodes_searched as f64 / elapsed.as_secs_f64() / 1000.0
                    );

                    let best_move = solution
                        .column
                        .expect("a playable position always has a best column");
                    println!("Best move: {}", best_move + 1);
                    best_move + 1

                // human player
                } else {
                    print!("Move input > ");
                    stdout().flush().expect("Failed to flush to stdout!");
                    let mut input_str = String::new();
                    stdin.read_line(&mut input_str)?;

                    match input_str.trim().parse::<usize>() {
                        Err(_) => {
                            println!("Invalid number: {}", input_str);
                            continue;
                        }
                        Ok(column) => column,
                    }
                };

                if let Err(err) = board.play_checked(next_move) {
                    println!("{}", err);
                    // try the move again
                    continue;
                }
            }

            // end states
            GameState::FirstWin => {
                println!("Player 1 wins!");
                break;
            }
            GameState::SecondWin => {
                println!("Player 2 wins!");
                break;
            }
            GameState::Draw => {
                println!("Draw!");
                break;
            }
        }
    }
    println!("Game record: {}", board.game);
    Ok(())
}

fn report_outcome(solution: &Solution) {
    match solution.outcome {
        Outcome::Mate { winner, plies } => {
            let player = match winner {
                Side::First => 1,
                Side::Second => 2,
            };
            let move_string = if plies == 1 { "move" } else { "moves" };
            println!(
                "Player {} can force a win in {} {}.",
                player, plies, move_string
            );
        }
        Outcome::Win(winner) => {
            let player = match winner {
                Side::First => 1,
                Side::Second => 2,
            };
            println!("Player {} can force a win.", player);
        }
        Outcome::Draw => println!("Best play from here is a draw."),
        Outcome::Unproven => println!("No forced result found within the search depth."),
    }
}

/// Solves every "moves score" line of a test-set file in parallel over one
/// shared transposition table, checking scores where the file supplies them
fn bench(path: &str, depth: usize) -> Result<()> {
    let file = File::open(path).with_context(|| format!("could not open '{}'", path))?;

    let mut positions = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let mut fields = line.split_whitespace();
        let moves = match fields.next() {
            Some(moves) => moves.to_string(),
            None => continue,
        };
        let expected = fields
            .next()
            .map(|score| score.parse::<i32>())
            .transpose()
            .with_context(|| format!("bad score in line '{}'", line))?;
        positions.push((BitBoard::from_moves(&moves)?, moves, expected));
    }

    let progress = ProgressBar::new(positions.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("Solving: {bar:40.cyan/blue} {pos}/{len} ~{eta} remaining")
            .progress_chars("█▓▒░  "),
    );

    let table = SharedTranspositionTable::new();
    let total_nodes = AtomicUsize::new(0);
    let start = Instant::now();

    let results: Vec<(String, i32, Option<i32>)> = positions
        .par_iter()
        .map(|(board, moves, expected)| {
            let mut solver = Solver::with_table(*board, table.clone());
            let solution = solver.solve(depth, SolveMode::Strong);
            total_nodes.fetch_add(solution.nodes_searched, Ordering::Relaxed);
            progress.inc(1);
            (moves.clone(), solution.score, *expected)
        })
        .collect();
    progress.finish();

    let elapsed = start.elapsed();
    let nodes = total_nodes.load(Ordering::Relaxed);

    let mut mismatches = 0usize;
    for (moves, score, expected) in &results {
        if let Some(expected) = expected {
            if score != expected {
                mismatches += 1;
                println!("MISMATCH {}: got {}, expected {}", moves, score, expected);
            }
        }
    }

    println!(
        "Solved {} positions in {:.2}s: {} nodes ({:.0} knps), {} mismatches",
        results.len(),
        elapsed.as_secs_f64(),
        nodes,
        nodes as f64 / elapsed.as_secs_f64() / 1000.0,
        mismatches
    );

    Ok(())
}
