//! 走法消息编解码
//!
//! 线上格式为单条 UTF-8 文本帧 `"<玩家名>:<UCI走法>"`，
//! 例如 `"Player1:e2e4"`、`"Player2:e7e8q"`（升变）。
//! 无长度前缀、无序号、无校验和，编解码本身无状态。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

/// 帧内分隔符
const SEPARATOR: char = ':';

/// 棋盘坐标（列 a-h + 行 1-8）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    /// 列字符，'a'..='h'
    pub file: char,
    /// 行字符，'1'..='8'
    pub rank: char,
}

impl Coord {
    /// 从两个字符解析坐标
    pub fn new(file: char, rank: char) -> Option<Self> {
        if ('a'..='h').contains(&file) && ('1'..='8').contains(&rank) {
            Some(Self { file, rank })
        } else {
            None
        }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file, self.rank)
    }
}

/// UCI 坐标记法走法
///
/// 四字符为普通走法（`e2e4`），五字符带升变字母（`e7e8q`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UciMove {
    pub from: Coord,
    pub to: Coord,
    /// 升变目标棋子：q/r/b/n
    pub promotion: Option<char>,
}

impl UciMove {
    pub fn new(from: Coord, to: Coord, promotion: Option<char>) -> Self {
        Self {
            from,
            to,
            promotion,
        }
    }
}

impl FromStr for UciMove {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        let chars: Vec<char> = s.chars().collect();
        if chars.len() != 4 && chars.len() != 5 {
            return Err(ProtocolError::malformed(format!(
                "move text must be 4 or 5 chars, got {:?}",
                s
            )));
        }

        let from = Coord::new(chars[0], chars[1])
            .ok_or_else(|| ProtocolError::malformed(format!("invalid from-square in {:?}", s)))?;
        let to = Coord::new(chars[2], chars[3])
            .ok_or_else(|| ProtocolError::malformed(format!("invalid to-square in {:?}", s)))?;

        let promotion = match chars.get(4) {
            None => None,
            Some(&c) if matches!(c, 'q' | 'r' | 'b' | 'n') => Some(c),
            Some(&c) => {
                return Err(ProtocolError::malformed(format!(
                    "invalid promotion letter {:?} in {:?}",
                    c, s
                )));
            }
        };

        Ok(Self {
            from,
            to,
            promotion,
        })
    }
}

impl fmt::Display for UciMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(p) = self.promotion {
            write!(f, "{}", p)?;
        }
        Ok(())
    }
}

/// 一条走法消息：走棋方名字 + UCI 走法
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveFrame {
    /// 走棋方显示名
    pub mover: String,
    /// 走法
    pub mv: UciMove,
}

impl MoveFrame {
    pub fn new(mover: impl Into<String>, mv: UciMove) -> Self {
        Self {
            mover: mover.into(),
            mv,
        }
    }

    /// 编码为文本帧
    pub fn encode(&self) -> String {
        format!("{}{}{}", self.mover, SEPARATOR, self.mv)
    }

    /// 从文本帧解码
    ///
    /// 按最后一个分隔符拆分，玩家名中含 `:` 时仍可解码。
    pub fn decode(text: &str) -> Result<Self> {
        let (mover, move_text) = text
            .rsplit_once(SEPARATOR)
            .ok_or_else(|| ProtocolError::malformed(format!("missing separator in {:?}", text)))?;

        if mover.is_empty() {
            return Err(ProtocolError::malformed("empty mover name"));
        }

        let mv = move_text.trim_end_matches(['\r', '\n']).parse()?;

        Ok(Self {
            mover: mover.to_string(),
            mv,
        })
    }
}

impl fmt::Display for MoveFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uci(s: &str) -> UciMove {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_plain_move() {
        let mv = uci("e2e4");
        assert_eq!(mv.from, Coord::new('e', '2').unwrap());
        assert_eq!(mv.to, Coord::new('e', '4').unwrap());
        assert_eq!(mv.promotion, None);
        assert_eq!(mv.to_string(), "e2e4");
    }

    #[test]
    fn test_parse_promotion_move() {
        let mv = uci("e7e8q");
        assert_eq!(mv.promotion, Some('q'));
        assert_eq!(mv.to_string(), "e7e8q");
    }

    #[test]
    fn test_parse_rejects_bad_text() {
        assert!("".parse::<UciMove>().is_err());
        assert!("e2".parse::<UciMove>().is_err());
        assert!("e2e9".parse::<UciMove>().is_err());
        assert!("i2e4".parse::<UciMove>().is_err());
        assert!("e2e4x".parse::<UciMove>().is_err());
        assert!("e2e4e5".parse::<UciMove>().is_err());
    }

    #[test]
    fn test_frame_round_trip() {
        let frame = MoveFrame::new("Player1", uci("g1f3"));
        let encoded = frame.encode();
        assert_eq!(encoded, "Player1:g1f3");

        let decoded = MoveFrame::decode(&encoded).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_frame_round_trip_promotion() {
        let frame = MoveFrame::new("白方", uci("a7a8n"));
        let decoded = MoveFrame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded.mover, "白方");
        assert_eq!(decoded.mv.to_string(), "a7a8n");
    }

    #[test]
    fn test_decode_mover_with_colon() {
        // 名字里带冒号时按最后一个分隔符拆分
        let decoded = MoveFrame::decode("a:b:e2e4").unwrap();
        assert_eq!(decoded.mover, "a:b");
        assert_eq!(decoded.mv.to_string(), "e2e4");
    }

    #[test]
    fn test_decode_rejects_missing_separator() {
        assert!(matches!(
            MoveFrame::decode("e2e4"),
            Err(ProtocolError::MalformedFrame { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_empty_mover() {
        assert!(MoveFrame::decode(":e2e4").is_err());
    }

    #[test]
    fn test_decode_rejects_bad_move_body() {
        assert!(MoveFrame::decode("Player1:banana").is_err());
        assert!(MoveFrame::decode("Player1:").is_err());
    }

    #[test]
    fn test_decode_tolerates_trailing_newline() {
        let decoded = MoveFrame::decode("Player1:e2e4\n").unwrap();
        assert_eq!(decoded.mv.to_string(), "e2e4");
    }
}
