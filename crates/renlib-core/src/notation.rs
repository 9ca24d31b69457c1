//! # Coordinate Notation
//!
//! Text forms of moves used by the move and SGF entry boxes:
//!
//! - letter + row: `a1`..`o15`, column `'a' + x`, row `15 - y`; `PASS`
//! - SGF point: two lowercase letters, column then row, no row inversion
//!
//! Parsers scan free text and ignore anything that is not a move.

use crate::primitives::BOARD_SIZE;
use crate::Coord;

const SGF_HEADER: &str = "(;GM[1]SZ[15]";

/// Letter + row form of a coordinate, or `PASS`.
#[must_use]
pub fn to_notation(coord: Coord) -> String {
    if coord.is_pass() {
        return "PASS".to_string();
    }
    let column = char::from(b'a'.wrapping_add(coord.x as u8));
    format!("{}{}", column, BOARD_SIZE as i32 - i32::from(coord.y))
}

/// Parse one letter + row token (`h8`, `O15`, `PASS`).
#[must_use]
pub fn parse_notation(token: &str) -> Option<Coord> {
    let token = token.trim();
    if token.eq_ignore_ascii_case("pass") {
        return Some(Coord::PASS);
    }
    let mut chars = token.chars();
    let column = chars.next()?.to_ascii_lowercase();
    if !('a'..='o').contains(&column) {
        return None;
    }
    let row: usize = chars.as_str().parse().ok()?;
    if !(1..=BOARD_SIZE).contains(&row) {
        return None;
    }
    Some(Coord::new(
        (column as u8 - b'a') as i8,
        (BOARD_SIZE - row) as i8,
    ))
}

/// SGF point of an on-board coordinate; empty for a pass.
#[must_use]
pub fn to_sgf_point(coord: Coord) -> String {
    if !coord.on_board() {
        return String::new();
    }
    let mut point = String::with_capacity(2);
    point.push(char::from(b'a' + coord.x as u8));
    point.push(char::from(b'a' + coord.y as u8));
    point
}

/// Parse a two-letter SGF point. An empty point is a pass.
#[must_use]
pub fn parse_sgf_point(point: &str) -> Option<Coord> {
    let bytes = point.trim().as_bytes();
    match bytes {
        [] => Some(Coord::PASS),
        [x, y] => {
            let x = x.to_ascii_lowercase().checked_sub(b'a')?;
            let y = y.to_ascii_lowercase().checked_sub(b'a')?;
            let coord = Coord::new(x as i8, y as i8);
            coord.on_board().then_some(coord)
        }
        _ => None,
    }
}

/// Minimal SGF game record of a move list, black first.
#[must_use]
pub fn moves_to_sgf(moves: &[Coord]) -> String {
    if moves.is_empty() {
        return format!("{})", SGF_HEADER);
    }
    let mut out = String::from(SGF_HEADER);
    out.push('\n');
    for (ply, &coord) in moves.iter().enumerate() {
        let color = if ply % 2 == 0 { 'B' } else { 'W' };
        out.push(';');
        out.push(color);
        out.push('[');
        out.push_str(&to_sgf_point(coord));
        out.push(']');
    }
    out.push(')');
    out
}

/// Concatenated letter + row form, as shown in the move box.
#[must_use]
pub fn moves_to_notation(moves: &[Coord]) -> String {
    moves.iter().map(|&c| to_notation(c)).collect()
}

/// Every `[a-o](1[0-5]|[1-9])` token in `text`, case-insensitive.
///
/// Two-digit rows are preferred, so `a15` is one move and `a16` is `a1`.
#[must_use]
pub fn parse_move_list(text: &str) -> Vec<Coord> {
    let bytes = text.as_bytes();
    let mut moves = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let column = bytes[i].to_ascii_lowercase();
        if !(b'a'..=b'o').contains(&column) {
            i += 1;
            continue;
        }
        let first = bytes.get(i + 1).copied();
        let second = bytes.get(i + 2).copied();
        let (row, len) = match (first, second) {
            (Some(b'1'), Some(d @ b'0'..=b'5')) => (10 + usize::from(d - b'0'), 3),
            (Some(d @ b'1'..=b'9'), _) => (usize::from(d - b'0'), 2),
            _ => {
                i += 1;
                continue;
            }
        };
        moves.push(Coord::new(
            (column - b'a') as i8,
            (BOARD_SIZE - row) as i8,
        ));
        i += len;
    }
    moves
}

/// Every `;B[xy]` / `;W[xy]` move in `text`, case-insensitive.
#[must_use]
pub fn parse_sgf_moves(text: &str) -> Vec<Coord> {
    let bytes = text.as_bytes();
    let mut moves = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let window = &bytes[i..];
        let is_move = window.len() >= 6
            && window[0] == b';'
            && matches!(window[1].to_ascii_uppercase(), b'B' | b'W')
            && window[2] == b'['
            && window[5] == b']';
        if is_move {
            let x = window[3].to_ascii_lowercase();
            let y = window[4].to_ascii_lowercase();
            if (b'a'..=b'o').contains(&x) && (b'a'..=b'o').contains(&y) {
                moves.push(Coord::new((x - b'a') as i8, (y - b'a') as i8));
                i += 6;
                continue;
            }
        }
        i += 1;
    }
    moves
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notation_corners() {
        assert_eq!(to_notation(Coord::new(0, 14)), "a1");
        assert_eq!(to_notation(Coord::new(14, 0)), "o15");
        assert_eq!(to_notation(Coord::new(7, 7)), "h8");
        assert_eq!(to_notation(Coord::PASS), "PASS");
    }

    #[test]
    fn parse_notation_accepts_case_and_pass() {
        assert_eq!(parse_notation("H8"), Some(Coord::new(7, 7)));
        assert_eq!(parse_notation("pass"), Some(Coord::PASS));
        assert_eq!(parse_notation("p1"), None);
        assert_eq!(parse_notation("a16"), None);
        assert_eq!(parse_notation("a0"), None);
    }

    #[test]
    fn sgf_points() {
        assert_eq!(to_sgf_point(Coord::new(7, 7)), "hh");
        assert_eq!(to_sgf_point(Coord::PASS), "");
        assert_eq!(parse_sgf_point("hh"), Some(Coord::new(7, 7)));
        assert_eq!(parse_sgf_point(""), Some(Coord::PASS));
        assert_eq!(parse_sgf_point("zz"), None);
    }

    #[test]
    fn sgf_record() {
        assert_eq!(moves_to_sgf(&[]), "(;GM[1]SZ[15])");
        assert_eq!(
            moves_to_sgf(&[Coord::new(7, 7), Coord::new(8, 6), Coord::PASS]),
            "(;GM[1]SZ[15]\n;B[hh];W[ig];B[])"
        );
    }

    #[test]
    fn move_list_scan() {
        assert_eq!(
            parse_move_list("h8 I9, j10x"),
            vec![Coord::new(7, 7), Coord::new(8, 6), Coord::new(9, 5)]
        );
        assert_eq!(parse_move_list("a15"), vec![Coord::new(0, 0)]);
        assert_eq!(parse_move_list("a16"), vec![Coord::new(0, 14)]);
        assert!(parse_move_list("zz p3").is_empty());
    }

    #[test]
    fn sgf_scan() {
        let moves = parse_sgf_moves("(;GM[1]SZ[15]\n;B[hh];w[IG];B[zz];W[aa])");
        assert_eq!(moves, vec![Coord::new(7, 7), Coord::new(8, 6), Coord::new(0, 0)]);
    }

    #[test]
    fn display_uses_notation() {
        assert_eq!(Coord::new(7, 7).to_string(), "h8");
    }
}
