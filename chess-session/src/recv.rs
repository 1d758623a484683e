//! 接收循环
//!
//! 每个会话启动一次、从不重启的后台任务：阻塞读取一帧，解码后
//! 经回合状态机应用，主机方再转发给观战方。读失败、解码失败、
//! 应用失败都使循环永久终止并把会话标记为连接中断。
//! 本设计没有重同步机制，不在分叉的棋盘上继续对局。

use std::sync::Arc;

use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use protocol::{FrameReader, MoveFrame, ProtocolError};

use crate::negotiate::ObserverRegistry;
use crate::session::Session;

/// 启动接收循环
///
/// `shutdown` 被通知后任务立即退出，调用方应在进程结束前等待
/// 返回的 `JoinHandle`，不留孤儿任务。
pub fn spawn_receive_loop(
    session: Arc<Session>,
    reader: FrameReader<OwnedReadHalf>,
    observers: Option<Arc<ObserverRegistry>>,
    shutdown: Arc<Notify>,
) -> JoinHandle<()> {
    tokio::spawn(run(session, reader, observers, shutdown))
}

async fn run(
    session: Arc<Session>,
    mut reader: FrameReader<OwnedReadHalf>,
    observers: Option<Arc<ObserverRegistry>>,
    shutdown: Arc<Notify>,
) {
    loop {
        let text = tokio::select! {
            _ = shutdown.notified() => {
                tracing::debug!("receive loop shutting down");
                return;
            }
            result = reader.read_frame() => match result {
                Ok(text) => text,
                Err(ProtocolError::ConnectionClosed) => {
                    session.mark_link_down("peer closed the connection");
                    return;
                }
                Err(e) => {
                    session.mark_link_down(&format!("read failed: {}", e));
                    return;
                }
            }
        };

        let frame = match MoveFrame::decode(&text) {
            Ok(frame) => frame,
            Err(e) => {
                session.mark_link_down(&format!("malformed frame {:?}: {}", text, e));
                return;
            }
        };

        match session.apply_remote(&frame) {
            Ok(applied) => {
                tracing::info!("move received: {}", applied.record.describe());
                if let Some(registry) = &observers {
                    registry.broadcast(&text).await;
                }
            }
            Err(e) => {
                session.mark_link_down(&format!("cannot apply remote move: {}", e));
                return;
            }
        }
    }
}
