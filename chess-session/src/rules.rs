//! 规则引擎适配层
//!
//! 对 `chess` crate 的一层薄封装：合法性判断、走法应用、终局判定。
//! 会话核心只通过这里与棋盘打交道，从不自行推导行棋规则。

use chess::{Board, BoardStatus, ChessMove, File, Piece, Rank, Square};
use serde::{Deserialize, Serialize};

use protocol::UciMove;

use crate::party::Color;

/// 棋子种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    /// 显示名（穷举匹配，新增种类时编译器强制补全）
    pub fn label(&self) -> &'static str {
        match self {
            PieceKind::Pawn => "Pawn",
            PieceKind::Knight => "Knight",
            PieceKind::Bishop => "Bishop",
            PieceKind::Rook => "Rook",
            PieceKind::Queen => "Queen",
            PieceKind::King => "King",
        }
    }

    fn from_engine(piece: Piece) -> Self {
        match piece {
            Piece::Pawn => PieceKind::Pawn,
            Piece::Knight => PieceKind::Knight,
            Piece::Bishop => PieceKind::Bishop,
            Piece::Rook => PieceKind::Rook,
            Piece::Queen => PieceKind::Queen,
            Piece::King => PieceKind::King,
        }
    }
}

/// 对局状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    /// 对局进行中
    Normal,
    /// 将军
    Check,
    /// 将死
    Checkmate,
    /// 逼和
    Stalemate,
}

impl GameStatus {
    /// 对局是否已终结
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameStatus::Checkmate | GameStatus::Stalemate)
    }
}

/// 规则引擎适配器
pub struct Rules;

impl Rules {
    /// 初始局面
    pub fn initial_board() -> Board {
        Board::default()
    }

    /// 将 UCI 走法文本转换为引擎走法
    pub fn to_engine_move(mv: &UciMove) -> ChessMove {
        let from = Self::to_engine_square(mv.from.file, mv.from.rank);
        let to = Self::to_engine_square(mv.to.file, mv.to.rank);
        let promotion = mv.promotion.map(|p| match p {
            'q' => Piece::Queen,
            'r' => Piece::Rook,
            'b' => Piece::Bishop,
            // 编解码层已限定为 q/r/b/n
            _ => Piece::Knight,
        });
        ChessMove::new(from, to, promotion)
    }

    fn to_engine_square(file: char, rank: char) -> Square {
        let file = File::from_index((file as u8 - b'a') as usize);
        let rank = Rank::from_index((rank as u8 - b'1') as usize);
        Square::make_square(rank, file)
    }

    /// 走法在当前局面下是否合法
    pub fn is_legal(board: &Board, mv: ChessMove) -> bool {
        board.legal(mv)
    }

    /// 应用走法，返回新局面（输入局面不变）
    pub fn apply(board: &Board, mv: ChessMove) -> Board {
        board.make_move_new(mv)
    }

    /// 查询格子上的棋子种类
    pub fn piece_at(board: &Board, square: Square) -> Option<PieceKind> {
        board.piece_on(square).map(PieceKind::from_engine)
    }

    /// 当前局面的对局状态
    pub fn status(board: &Board) -> GameStatus {
        match board.status() {
            BoardStatus::Checkmate => GameStatus::Checkmate,
            BoardStatus::Stalemate => GameStatus::Stalemate,
            BoardStatus::Ongoing => {
                if board.checkers().popcnt() > 0 {
                    GameStatus::Check
                } else {
                    GameStatus::Normal
                }
            }
        }
    }

    /// 当前轮到哪一方
    pub fn to_move(board: &Board) -> Color {
        match board.side_to_move() {
            chess::Color::White => Color::White,
            chess::Color::Black => Color::Black,
        }
    }
}
