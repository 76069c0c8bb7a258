//! Shared display utilities for rendering animal shogi state in the terminal
//!
//! Provides colorized, human-readable output for boards, reserves, and actions.

use animal_shogi_engine::{
    column_of, row_of, square_at, Action, Color, Piece, Square, State, HAND_KINDS, NUM_COLS,
    NUM_ROWS, RESERVE_PIECES,
};

// ANSI color codes
pub const BLACK_SIDE: &str = "\x1b[93m"; // first player: yellow
pub const WHITE_SIDE: &str = "\x1b[96m"; // second player: cyan
pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub fn color_code(color: Color) -> &'static str {
    match color {
        Color::Black => BLACK_SIDE,
        Color::White => WHITE_SIDE,
    }
}

pub fn color_name(color: Color) -> &'static str {
    match color {
        Color::Black => "Black",
        Color::White => "White",
    }
}

/// One letter per piece; the first player's pieces print in upper case.
pub fn piece_char(piece: Piece) -> char {
    match piece {
        Piece::Empty => '.',
        Piece::BlackChick => 'C',
        Piece::BlackGiraffe => 'G',
        Piece::BlackElephant => 'E',
        Piece::BlackLion => 'L',
        Piece::BlackHen => 'H',
        Piece::WhiteChick => 'c',
        Piece::WhiteGiraffe => 'g',
        Piece::WhiteElephant => 'e',
        Piece::WhiteLion => 'l',
        Piece::WhiteHen => 'h',
    }
}

pub fn piece_name(piece: Piece) -> &'static str {
    match piece {
        Piece::Empty => "empty",
        Piece::BlackChick | Piece::WhiteChick => "Chick",
        Piece::BlackGiraffe | Piece::WhiteGiraffe => "Giraffe",
        Piece::BlackElephant | Piece::WhiteElephant => "Elephant",
        Piece::BlackLion | Piece::WhiteLion => "Lion",
        Piece::BlackHen | Piece::WhiteHen => "Hen",
    }
}

fn display_piece(piece: Piece) -> String {
    match piece.owner() {
        Some(owner) => format!("{}{}{}", color_code(owner), piece_char(piece), RESET),
        None => format!("{}.{}", DIM, RESET),
    }
}

/// Coordinate name: columns a-c, rows 1-4 (e.g. square 5 is "b2").
pub fn square_name(sq: Square) -> String {
    format!("{}{}", (b'a' + column_of(sq)) as char, row_of(sq) + 1)
}

/// Render the board with White's camp on top, plus both reserves.
pub fn display_board(state: &State) -> String {
    let mut out = String::new();
    out.push_str(&format!("    {}a b c{}\n", DIM, RESET));
    for row in 0..NUM_ROWS as u8 {
        out.push_str(&format!("  {}{}{} ", DIM, row + 1, RESET));
        for col in 0..NUM_COLS as u8 {
            let piece = state.board[square_at(col, row) as usize];
            out.push_str(&display_piece(piece));
            out.push(' ');
        }
        out.push('\n');
    }
    out.push_str(&format!(
        "  reserves  {}Black:{} {}  {}White:{} {}\n",
        BLACK_SIDE,
        RESET,
        format_hand(state, Color::Black),
        WHITE_SIDE,
        RESET,
        format_hand(state, Color::White),
    ));
    out.push_str(&format!("  to move: {}\n", color_name(state.turn)));
    out
}

fn format_hand(state: &State, color: Color) -> String {
    let mut parts = Vec::new();
    for slot in 0..HAND_KINDS / 2 {
        let idx = 3 * color.index() + slot;
        let count = state.hand[idx];
        if count > 0 {
            parts.push(format!("{}x{}", piece_char(RESERVE_PIECES[idx]), count));
        }
    }
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(" ")
    }
}

/// Format an action for display
pub fn format_action(action: &Action) -> String {
    match *action {
        Action::Move {
            from,
            to,
            piece,
            captured,
            promote,
        } => {
            let mut text = format!("{} {}-{}", piece_name(piece), square_name(from), square_name(to));
            if captured != Piece::Empty {
                text.push_str(&format!(" takes {}", piece_name(captured)));
            }
            if promote {
                text.push_str(" promotes");
            }
            text
        }
        Action::Drop { piece, to } => {
            format!("{} dropped at {}", piece_name(piece), square_name(to))
        }
    }
}
