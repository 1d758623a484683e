//! 对局参与方定义

use std::fmt;

use serde::{Deserialize, Serialize};

/// 持久层发放的参与方 ID
pub type PartyId = u64;

/// 阵营颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    /// 白方（先手）
    White,
    /// 黑方（后手）
    Black,
}

impl Color {
    /// 获取对方阵营
    pub fn opponent(&self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "White"),
            Color::Black => write!(f, "Black"),
        }
    }
}

/// 会话角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// 主机方：监听并接受对手连接，执白先行
    Host,
    /// 加入方：连接主机，执黑
    Joiner,
    /// 观战方：只读镜像，不参与行棋
    Observer,
}

impl Role {
    /// 角色对应的执棋颜色
    pub fn color(&self) -> Option<Color> {
        match self {
            Role::Host => Some(Color::White),
            Role::Joiner => Some(Color::Black),
            Role::Observer => None,
        }
    }
}

/// 对局参与方
///
/// 显示名在会话开始时确定，此后不变。
#[derive(Debug, Clone)]
pub struct Party {
    pub name: String,
    pub color: Option<Color>,
    /// 持久层发放的 ID（持久层不可用时为 None）
    pub id: Option<PartyId>,
}

impl Party {
    pub fn new(name: impl Into<String>, color: Option<Color>, id: Option<PartyId>) -> Self {
        Self {
            name: name.into(),
            color,
            id,
        }
    }

    /// 观战方（无名、无色）
    pub fn observer() -> Self {
        Self {
            name: String::new(),
            color: None,
            id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opponent() {
        assert_eq!(Color::White.opponent(), Color::Black);
        assert_eq!(Color::Black.opponent(), Color::White);
    }

    #[test]
    fn test_role_colors() {
        assert_eq!(Role::Host.color(), Some(Color::White));
        assert_eq!(Role::Joiner.color(), Some(Color::Black));
        assert_eq!(Role::Observer.color(), None);
    }
}
