//! 会话协商
//!
//! 主机方绑定监听端口、接受唯一的加入方（主机执白、加入方执黑）；
//! 加入方与观战方向已知地址发起连接。加入方就位后，主机继续接受的
//! 连接一律按观战方处理：只收镜像帧，不参与行棋。
//! 传输建立失败是致命错误，进程不应带着半截连接进入对局。

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::task::JoinHandle;

use protocol::{
    Connection, Connector, FrameWriter, Listener, NetworkConfig, TcpConnection, TcpConnector,
    TcpListener, MAX_NAME_LEN,
};

use crate::party::{Party, PartyId, Role};
use crate::storage::GameStore;

/// 观战连接注册表（主机方持有）
///
/// 每个已应用的走法帧都尽力转发给所有观战方，写失败的连接直接丢弃。
pub struct ObserverRegistry {
    writers: tokio::sync::Mutex<Vec<FrameWriter<OwnedWriteHalf>>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self {
            writers: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    /// 登记一个观战连接的写端
    pub async fn add(&self, writer: FrameWriter<OwnedWriteHalf>) {
        self.writers.lock().await.push(writer);
    }

    /// 当前观战连接数
    pub async fn count(&self) -> usize {
        self.writers.lock().await.len()
    }

    /// 向所有观战方转发一帧
    pub async fn broadcast(&self, text: &str) {
        let mut writers = self.writers.lock().await;
        let mut kept = Vec::with_capacity(writers.len());
        for mut writer in writers.drain(..) {
            match writer.write_frame(text).await {
                Ok(()) => kept.push(writer),
                Err(e) => tracing::warn!("dropping observer connection: {}", e),
            }
        }
        *writers = kept;
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// 协商结果
pub struct Negotiated {
    pub connection: TcpConnection,
    pub local: Party,
    /// 主机方持有的观战注册表
    pub observers: Option<Arc<ObserverRegistry>>,
    /// 主机方的观战接受任务，会话结束时中止
    pub observer_task: Option<JoinHandle<()>>,
}

/// 会话协商器
pub struct Negotiator {
    config: NetworkConfig,
    store: Arc<dyn GameStore>,
}

impl Negotiator {
    pub fn new(config: NetworkConfig, store: Arc<dyn GameStore>) -> Self {
        Self { config, store }
    }

    /// 主机方第一步：绑定监听端口
    pub async fn bind(&self) -> Result<HostEndpoint> {
        let addr = format!("0.0.0.0:{}", self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("无法绑定监听地址 {}", addr))?;

        Ok(HostEndpoint {
            listener,
            store: self.store.clone(),
        })
    }

    /// 加入方：连接主机，执黑
    pub async fn join(&self, name: &str) -> Result<Negotiated> {
        validate_name(name)?;
        let addr = self.config.addr();
        let connection = TcpConnector
            .connect(&addr)
            .await
            .with_context(|| format!("无法连接主机 {}", addr))?;
        tracing::info!("Connected to host at {}", addr);

        let id = register_local(&*self.store, name);
        Ok(Negotiated {
            connection,
            local: Party::new(name, Role::Joiner.color(), id),
            observers: None,
            observer_task: None,
        })
    }

    /// 观战方：连接主机，只读镜像
    pub async fn observe(&self) -> Result<Negotiated> {
        let addr = self.config.addr();
        let connection = TcpConnector
            .connect(&addr)
            .await
            .with_context(|| format!("无法连接主机 {}", addr))?;
        tracing::info!("Observing game at {}", addr);

        Ok(Negotiated {
            connection,
            local: Party::observer(),
            observers: None,
            observer_task: None,
        })
    }
}

/// 已绑定的主机端点
pub struct HostEndpoint {
    listener: TcpListener,
    store: Arc<dyn GameStore>,
}

impl HostEndpoint {
    /// 实际监听地址
    pub fn local_addr(&self) -> Option<String> {
        self.listener.local_addr()
    }

    /// 接受唯一的加入方；此后的入站连接由后台任务按观战方收编
    pub async fn accept_joiner(mut self, name: &str) -> Result<Negotiated> {
        validate_name(name)?;
        tracing::info!("Waiting for a joiner to connect...");

        let connection = self
            .listener
            .accept()
            .await
            .context("接受加入方连接失败")?;
        tracing::info!(
            "Joiner connected from {}",
            connection.peer_addr().unwrap_or_default()
        );

        let id = register_local(&*self.store, name);

        let observers = Arc::new(ObserverRegistry::new());
        let observer_task = spawn_observer_accept(self.listener, observers.clone());

        Ok(Negotiated {
            connection,
            local: Party::new(name, Role::Host.color(), id),
            observers: Some(observers),
            observer_task: Some(observer_task),
        })
    }
}

/// 注册本地参与方（持久层故障降级为无 ID，对局照常进行）
fn register_local(store: &dyn GameStore, name: &str) -> Option<PartyId> {
    match store.register_party(name) {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!("failed to register local party: {e:#}");
            None
        }
    }
}

/// 校验玩家名
fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        anyhow::bail!("玩家名不能为空");
    }
    if name.chars().count() > MAX_NAME_LEN {
        anyhow::bail!("玩家名不能超过 {} 个字符", MAX_NAME_LEN);
    }
    Ok(())
}

/// 加入方就位后继续接受观战连接
fn spawn_observer_accept(
    mut listener: TcpListener,
    registry: Arc<ObserverRegistry>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok(connection) => {
                    tracing::info!(
                        "Observer connected from {}",
                        connection.peer_addr().unwrap_or_default()
                    );
                    // 丢弃读端：观战方不提交走法，发来的任何数据都被忽略
                    let (_reader, writer) = connection.split();
                    registry.add(writer).await;
                }
                Err(e) => {
                    tracing::warn!("observer accept failed: {}", e);
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::party::Color;
    use crate::storage::MemoryStore;
    use protocol::Connection;
    use std::time::Duration;

    fn negotiator_on(port: u16) -> Negotiator {
        let config = NetworkConfig {
            host: "127.0.0.1".to_string(),
            port,
        };
        Negotiator::new(config, Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_host_join_negotiation() {
        let host_side = negotiator_on(0);
        let endpoint = host_side.bind().await.unwrap();
        let addr = endpoint.local_addr().unwrap();
        let port: u16 = addr.rsplit(':').next().unwrap().parse().unwrap();

        let join_handle = tokio::spawn(async move {
            let joiner_side = negotiator_on(port);
            joiner_side.join("Player2").await.unwrap()
        });

        let hosted = endpoint.accept_joiner("Player1").await.unwrap();
        let joined = join_handle.await.unwrap();

        assert_eq!(hosted.local.color, Some(Color::White));
        assert_eq!(hosted.local.name, "Player1");
        assert!(hosted.local.id.is_some());
        assert!(hosted.observers.is_some());

        assert_eq!(joined.local.color, Some(Color::Black));
        assert!(joined.observer_task.is_none());
    }

    #[tokio::test]
    async fn test_observer_receives_broadcast() {
        let host_side = negotiator_on(0);
        let endpoint = host_side.bind().await.unwrap();
        let addr = endpoint.local_addr().unwrap();
        let port: u16 = addr.rsplit(':').next().unwrap().parse().unwrap();

        let join_handle = tokio::spawn(async move {
            let joiner_side = negotiator_on(port);
            joiner_side.join("Player2").await.unwrap()
        });
        let hosted = endpoint.accept_joiner("Player1").await.unwrap();
        let _joined = join_handle.await.unwrap();

        // 观战方在加入方之后连接
        let observer_side = negotiator_on(port);
        let mut observed = observer_side.observe().await.unwrap();
        assert_eq!(observed.local.color, None);

        // 等待主机的观战接受任务完成登记
        let registry = hosted.observers.unwrap();
        for _ in 0..100 {
            if registry.count().await == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(registry.count().await, 1);

        registry.broadcast("Player1:e2e4").await;
        let text = tokio::time::timeout(Duration::from_secs(5), observed.connection.recv_frame())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(text, "Player1:e2e4");

        if let Some(task) = hosted.observer_task {
            task.abort();
        }
    }

    #[tokio::test]
    async fn test_join_refused_when_no_host() {
        // 端口 1 上不应有监听者
        let joiner_side = negotiator_on(1);
        let result = joiner_side.join("Player2").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let host_side = negotiator_on(0);
        let endpoint = host_side.bind().await.unwrap();
        assert!(endpoint.accept_joiner("  ").await.is_err());
    }
}
