//! 错误类型定义

use thiserror::Error;

use protocol::ProtocolError;

/// 会话错误类型
#[derive(Error, Debug)]
pub enum SessionError {
    /// 不是本方回合（本地提交被回合状态机拒绝）
    #[error("Not your turn")]
    NotYourTurn,

    /// 规则引擎拒绝的走法（本地提交）
    #[error("Illegal move: {uci}")]
    IllegalMove { uci: String },

    /// 协议失步：收到的远端走法与本地棋盘不一致
    #[error("Protocol desync: {reason}")]
    Desync { reason: String },

    /// 传输层错误
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl SessionError {
    /// 构造失步错误
    pub fn desync(reason: impl Into<String>) -> Self {
        SessionError::Desync {
            reason: reason.into(),
        }
    }
}

/// 会话操作结果类型
pub type Result<T> = std::result::Result<T, SessionError>;
