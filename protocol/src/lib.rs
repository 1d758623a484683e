//! 局域网国际象棋共享协议库
//!
//! 包含:
//! - 走法文本与坐标解析 (UciMove, Coord)
//! - 走法消息编解码 (MoveFrame)
//! - 传输层抽象 (Connector, Connection, Listener traits)
//! - 文本帧读写 (FrameReader, FrameWriter)

mod codec;
mod constants;
mod error;
mod transport;

pub use codec::{Coord, MoveFrame, UciMove};
pub use constants::*;
pub use error::{ProtocolError, Result};
pub use transport::{
    Connection, Connector, FrameReader, FrameWriter, Listener, NetworkConfig, TcpConnection,
    TcpConnector, TcpListener,
};
