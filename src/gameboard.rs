use anyhow::{ensure, Result};
use crossterm::{
    cursor::MoveTo,
    style::{style, Attribute, Color, PrintStyledContent},
    QueueableCommand,
};

use std::io::{stdout, Write};

use c4solver::{BitBoard, Side, HEIGHT, WIDTH};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum GameState {
    Playing,
    FirstWin,
    SecondWin,
    Draw,
}

/// A game in progress: the bitboard plus the move history needed to
/// replay or report it.
#[derive(Clone)]
pub struct GameBoard {
    pub board: BitBoard,
    pub game: String,
    pub state: GameState,
}

impl GameBoard {
    pub fn new() -> Self {
        Self {
            board: BitBoard::new(),
            game: String::new(),
            state: GameState::Playing,
        }
    }

    /// Plays a 1-indexed column for the side to move, rejecting out-of-range
    /// and full columns without altering the game
    pub fn play_checked(&mut self, column_one_indexed: usize) -> Result<GameState> {
        ensure!(
            (1..=WIDTH).contains(&column_one_indexed),
            "Invalid move, column {} out of range. Columns must be between 1 and {}",
            column_one_indexed,
            WIDTH
        );
        let side = self.board.side_to_move();
        let next = self.board.play_checked(column_one_indexed - 1, side)?;

        self.state = if next.has_won(side) {
            match side {
                Side::First => GameState::FirstWin,
                Side::Second => GameState::SecondWin,
            }
        } else if next.is_full() {
            GameState::Draw
        } else {
            GameState::Playing
        };
        self.board = next;
        self.game.push_str(&column_one_indexed.to_string());

        Ok(self.state)
    }

    pub fn display(&self) -> Result<()> {
        let mut stdout = stdout();

        let cols: String = (1..=WIDTH).map(|x| x.to_string()).collect();
        stdout.queue(PrintStyledContent(style(cols + "\n")))?;
        for _ in 0..HEIGHT {
            stdout.queue(PrintStyledContent(style("\n")))?;
        }
        stdout.flush()?;

        let (origin_x, origin_y) = crossterm::cursor::position()?;

        for row in 0..HEIGHT {
            for column in 0..WIDTH {
                let (pos_x, pos_y) = (origin_x + column as u16, origin_y - row as u16);

                stdout
                    .queue(MoveTo(pos_x, pos_y))?
                    .queue(PrintStyledContent(
                        style("O")
                            .attribute(Attribute::Bold)
                            .on(Color::DarkBlue)
                            .with(match self.board.cell_at(column, row) {
                                Some(Side::First) => Color::Red,
                                Some(Side::Second) => Color::Yellow,
                                None => Color::DarkBlue,
                            }),
                    ))?;
            }
        }
        stdout
            .queue(MoveTo(origin_x + WIDTH as u16, origin_y))?
            .queue(PrintStyledContent(style("\n")))?;
        stdout.flush()?;
        Ok(())
    }
}
