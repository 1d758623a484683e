//! 协议常量定义

use std::time::Duration;

/// 主机默认监听端口
pub const DEFAULT_PORT: u16 = 5555;

/// 消息帧最大大小（单次 recv 缓冲区大小）
pub const MAX_FRAME_SIZE: usize = 1024;

/// 玩家名最大长度
pub const MAX_NAME_LEN: usize = 32;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);
