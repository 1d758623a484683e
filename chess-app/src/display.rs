//! 文本显示
//!
//! 拉取式：前台循环按渲染帧从会话取快照，变化时重绘。
//! 棋盘图形渲染不在本程序范围内，这里只输出侧栏信息。

use chess_session::{Color, GameStatus, LinkState, SessionSnapshot};

/// 打印当前对局概览
pub fn print_snapshot(snap: &SessionSnapshot) {
    let white = snap.white_name.as_deref().unwrap_or("?");
    let black = snap.black_name.as_deref().unwrap_or("?");

    println!();
    println!("White: {}    Black: {}", white, black);

    if let Some(line) = status_line(snap.status) {
        println!("{}", line);
    }
    if !snap.status.is_terminal() {
        let to_play = match snap.turn {
            Color::White => white,
            Color::Black => black,
        };
        println!("{} to Play", to_play);
    }
    if snap.link == LinkState::Down {
        println!("Connection lost - moves no longer synchronize.");
    }
    if let Some(last) = snap.plies.last() {
        println!("Last move: {}", last.describe());
    }
}

/// 打印完整走法列表
pub fn print_moves(snap: &SessionSnapshot) {
    if snap.plies.is_empty() {
        println!("No moves yet.");
        return;
    }
    for (i, ply) in snap.plies.iter().enumerate() {
        println!("{:3}. {}", i + 1, ply.describe());
    }
}

fn status_line(status: GameStatus) -> Option<&'static str> {
    match status {
        GameStatus::Normal => None,
        GameStatus::Check => Some("Check!"),
        GameStatus::Checkmate => Some("Checkmate!"),
        GameStatus::Stalemate => Some("Stalemate!"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_lines() {
        assert_eq!(status_line(GameStatus::Normal), None);
        assert_eq!(status_line(GameStatus::Check), Some("Check!"));
        assert_eq!(status_line(GameStatus::Checkmate), Some("Checkmate!"));
        assert_eq!(status_line(GameStatus::Stalemate), Some("Stalemate!"));
    }
}
