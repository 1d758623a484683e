mod display;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Notify;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chess_session::{
    spawn_receive_loop, GameStore, JsonGameStore, LinkState, MemoryStore, Negotiated, Negotiator,
    ObserverRegistry, Session, SessionError,
};
use protocol::{FrameWriter, NetworkConfig, UciMove, DEFAULT_PORT};

/// LAN chess: host a game, join one, or watch as an observer
#[derive(Parser)]
#[command(name = "lan-chess")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Host a game and wait for an opponent (plays White)
    Host {
        /// Port to listen on
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Your display name
        #[arg(long)]
        name: String,
    },
    /// Join a hosted game (plays Black)
    Join {
        /// Host address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Host port
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Your display name
        #[arg(long)]
        name: String,
    },
    /// Watch a hosted game without playing
    Observe {
        /// Host address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Host port
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lan_chess=info".parse()?)
                .add_directive("chess_session=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    // 持久层不可用时退化为内存记录，不影响对局
    let store: Arc<dyn GameStore> = match JsonGameStore::new() {
        Ok(store) => {
            info!("game log: {:?}", store.path());
            Arc::new(store)
        }
        Err(e) => {
            warn!("game log unavailable, falling back to in-memory ledger: {e:#}");
            Arc::new(MemoryStore::new())
        }
    };

    let negotiated = match &cli.command {
        Command::Host { port, name } => {
            let config = NetworkConfig {
                host: "0.0.0.0".to_string(),
                port: *port,
            };
            let negotiator = Negotiator::new(config, store.clone());
            let endpoint = negotiator.bind().await?;
            info!("Hosting on {}", endpoint.local_addr().unwrap_or_default());
            endpoint.accept_joiner(name).await?
        }
        Command::Join { host, port, name } => {
            let config = NetworkConfig {
                host: host.clone(),
                port: *port,
            };
            Negotiator::new(config, store.clone()).join(name).await?
        }
        Command::Observe { host, port } => {
            let config = NetworkConfig {
                host: host.clone(),
                port: *port,
            };
            Negotiator::new(config, store.clone()).observe().await?
        }
    };

    run_session(negotiated, store).await
}

/// 前台循环：读取用户输入，按渲染帧拉取快照
async fn run_session(negotiated: Negotiated, store: Arc<dyn GameStore>) -> Result<()> {
    let Negotiated {
        connection,
        local,
        observers,
        observer_task,
    } = negotiated;

    let session = Arc::new(Session::new(local, store));
    let (reader, mut writer) = connection.split();

    let shutdown = Arc::new(Notify::new());
    let recv_task = spawn_receive_loop(session.clone(), reader, observers.clone(), shutdown.clone());

    println!("Type moves in UCI form (e.g. e2e4), 'moves' for the move list, 'quit' to exit.");
    display::print_snapshot(&session.snapshot());

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut render = tokio::time::interval(Duration::from_millis(500));
    // 上次渲染的指纹：账本长度 + 连接状态
    let mut last_rendered = (0usize, false);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "" => {}
                    "quit" => break,
                    "moves" => display::print_moves(&session.snapshot()),
                    input => {
                        handle_move_input(&session, &mut writer, observers.as_ref(), input).await;
                    }
                }
            }
            _ = render.tick() => {
                let snap = session.snapshot();
                let fingerprint = (snap.plies.len(), snap.link == LinkState::Down);
                if fingerprint != last_rendered {
                    last_rendered = fingerprint;
                    display::print_snapshot(&snap);
                }
            }
        }

        if session.snapshot().status.is_terminal() {
            println!("Game over.");
            break;
        }
    }

    // 会话收尾：通知接收循环退出并等待，不留后台任务
    shutdown.notify_one();
    let _ = recv_task.await;
    if let Some(task) = observer_task {
        task.abort();
    }
    info!("session closed");
    Ok(())
}

/// 处理一条走法输入
async fn handle_move_input(
    session: &Arc<Session>,
    writer: &mut FrameWriter<OwnedWriteHalf>,
    observers: Option<&Arc<ObserverRegistry>>,
    input: &str,
) {
    let mv: UciMove = match input.parse() {
        Ok(mv) => mv,
        Err(e) => {
            println!("Invalid move format: {}", e);
            return;
        }
    };

    match session.submit_local(mv) {
        Ok(applied) => {
            // 尽力而为发送：失败只记日志，本地对局不中断
            if let Err(e) = writer.write_frame(&applied.wire_text).await {
                tracing::error!("failed to send move: {}", e);
            }
            if let Some(registry) = observers {
                registry.broadcast(&applied.wire_text).await;
            }
            display::print_snapshot(&session.snapshot());
        }
        Err(SessionError::NotYourTurn) => {
            // 非本方回合的输入直接忽略，不改动任何状态
            tracing::debug!("input ignored: not your turn");
        }
        Err(SessionError::IllegalMove { .. }) => {
            println!("Illegal move!");
        }
        Err(e) => {
            println!("Move rejected: {}", e);
        }
    }
}
