//! 传输层抽象
//!
//! 提供 Connector/Connection/Listener traits 使会话层与具体传输实现解耦。
//! 帧边界依赖传输层行为：一次 send 即一帧，一次 recv 读取即一帧
//! （消息均远小于缓冲区大小，不做长度前缀）。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::constants::{CONNECT_TIMEOUT, DEFAULT_PORT, MAX_FRAME_SIZE};
use crate::error::{ProtocolError, Result};

/// 网络配置
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub host: String,
    pub port: u16,
}

impl NetworkConfig {
    /// 拼接为 `host:port` 地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// 连接抽象 trait（核心抽象，用于会话层）
#[async_trait]
pub trait Connection: Send + Sync {
    /// 发送一帧文本
    async fn send_frame(&mut self, text: &str) -> Result<()>;

    /// 接收一帧文本
    async fn recv_frame(&mut self) -> Result<String>;

    /// 关闭连接
    async fn close(&mut self) -> Result<()>;

    /// 获取远端地址
    fn peer_addr(&self) -> Option<String>;
}

/// 连接器 trait（加入方/观战方使用）
#[async_trait]
pub trait Connector: Send + Sync {
    type Conn: Connection;

    /// 建立连接
    async fn connect(&self, addr: &str) -> Result<Self::Conn>;
}

/// 监听器 trait（主机方使用）
#[async_trait]
pub trait Listener: Send + Sync + Sized {
    type Conn: Connection;

    /// 绑定地址
    async fn bind(addr: &str) -> Result<Self>;

    /// 接受连接
    async fn accept(&mut self) -> Result<Self::Conn>;

    /// 获取本地地址
    fn local_addr(&self) -> Option<String>;
}

// ============================================================================
// TCP 实现
// ============================================================================

/// TCP 连接器
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Conn = TcpConnection;

    async fn connect(&self, addr: &str) -> Result<Self::Conn> {
        let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| ProtocolError::ConnectionTimeout)?
            .map_err(ProtocolError::Io)?;

        tracing::debug!("connected to {}", addr);
        TcpConnection::from_stream(stream)
    }
}

/// TCP 连接
pub struct TcpConnection {
    reader: FrameReader<OwnedReadHalf>,
    writer: FrameWriter<OwnedWriteHalf>,
    peer_addr: Option<String>,
}

impl TcpConnection {
    /// 从 TcpStream 创建（主机方接受连接后使用）
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr().ok().map(|a| a.to_string());
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: FrameReader::new(read_half),
            writer: FrameWriter::new(write_half),
            peer_addr,
        })
    }

    /// 分离读写端（接收循环持有读端，发送路径持有写端）
    pub fn split(self) -> (FrameReader<OwnedReadHalf>, FrameWriter<OwnedWriteHalf>) {
        (self.reader, self.writer)
    }
}

#[async_trait]
impl Connection for TcpConnection {
    async fn send_frame(&mut self, text: &str) -> Result<()> {
        self.writer.write_frame(text).await
    }

    async fn recv_frame(&mut self) -> Result<String> {
        self.reader.read_frame().await
    }

    async fn close(&mut self) -> Result<()> {
        // TCP 连接在 drop 时自动关闭
        Ok(())
    }

    fn peer_addr(&self) -> Option<String> {
        self.peer_addr.clone()
    }
}

/// TCP 监听器
pub struct TcpListener {
    listener: tokio::net::TcpListener,
}

#[async_trait]
impl Listener for TcpListener {
    type Conn = TcpConnection;

    async fn bind(addr: &str) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(ProtocolError::Io)?;
        Ok(Self { listener })
    }

    async fn accept(&mut self) -> Result<Self::Conn> {
        let (stream, addr) = self.listener.accept().await.map_err(ProtocolError::Io)?;
        tracing::debug!("accepted connection from {}", addr);
        TcpConnection::from_stream(stream)
    }

    fn local_addr(&self) -> Option<String> {
        self.listener.local_addr().ok().map(|a| a.to_string())
    }
}

// ============================================================================
// 文本帧读写
// ============================================================================

/// 帧读取器
pub struct FrameReader<R> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R: AsyncRead + Unpin + Send> FrameReader<R> {
    /// 创建新的帧读取器
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: vec![0u8; MAX_FRAME_SIZE],
        }
    }

    /// 读取一帧文本
    ///
    /// 阻塞直到对端发来数据；读到 0 字节说明对端关闭。
    pub async fn read_frame(&mut self) -> Result<String> {
        let n = self
            .reader
            .read(&mut self.buffer[..])
            .await
            .map_err(ProtocolError::Io)?;

        if n == 0 {
            return Err(ProtocolError::ConnectionClosed);
        }

        String::from_utf8(self.buffer[..n].to_vec())
            .map_err(|_| ProtocolError::malformed("frame is not valid UTF-8"))
    }
}

/// 帧写入器
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> FrameWriter<W> {
    /// 创建新的帧写入器
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// 写入一帧文本
    pub async fn write_frame(&mut self, text: &str) -> Result<()> {
        let payload = text.as_bytes();
        if payload.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: payload.len(),
                max: MAX_FRAME_SIZE,
            });
        }

        self.writer.write_all(payload).await?;
        self.writer.flush().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MoveFrame;

    #[tokio::test]
    async fn test_tcp_frame_exchange() {
        // 启动监听
        let mut listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // 客户端连接
        let client_handle = tokio::spawn(async move {
            let connector = TcpConnector;
            let mut conn = connector.connect(&addr).await.unwrap();

            conn.send_frame("Player2:e7e5").await.unwrap();

            let text = conn.recv_frame().await.unwrap();
            let frame = MoveFrame::decode(&text).unwrap();
            assert_eq!(frame.mover, "Player1");
            assert_eq!(frame.mv.to_string(), "e2e4");
        });

        // 服务端接受连接
        let mut conn = listener.accept().await.unwrap();

        let text = conn.recv_frame().await.unwrap();
        let frame = MoveFrame::decode(&text).unwrap();
        assert_eq!(frame.mover, "Player2");
        assert_eq!(frame.mv.to_string(), "e7e5");

        conn.send_frame("Player1:e2e4").await.unwrap();

        client_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_read_after_peer_close() {
        let mut listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client_handle = tokio::spawn(async move {
            let connector = TcpConnector;
            let conn = connector.connect(&addr).await.unwrap();
            drop(conn);
        });

        let mut conn = listener.accept().await.unwrap();
        client_handle.await.unwrap();

        let result = conn.recv_frame().await;
        assert!(matches!(result, Err(ProtocolError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let mut listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let connector = TcpConnector;
        let mut conn = connector.connect(&addr).await.unwrap();
        let _server_conn = listener.accept().await.unwrap();

        let huge = "x".repeat(MAX_FRAME_SIZE + 1);
        let result = conn.send_frame(&huge).await;
        assert!(matches!(result, Err(ProtocolError::FrameTooLarge { .. })));
    }
}
