//! 局域网国际象棋会话核心
//!
//! 包含:
//! - 参与方与角色模型 (Party, Role, Color)
//! - 规则引擎适配层 (Rules, GameStatus, PieceKind)
//! - 回合状态机与会话状态 (Session, SessionSnapshot)
//! - 走法账本 (MoveLedger, PlyRecord)
//! - 会话协商 (Negotiator, HostEndpoint, ObserverRegistry)
//! - 接收循环 (spawn_receive_loop)
//! - 对局持久化 (GameStore, JsonGameStore, MemoryStore)

mod error;
mod ledger;
mod negotiate;
mod party;
mod recv;
mod rules;
mod session;
mod storage;

pub use error::{Result, SessionError};
pub use ledger::{MoveLedger, PlyRecord};
pub use negotiate::{HostEndpoint, Negotiated, Negotiator, ObserverRegistry};
pub use party::{Color, Party, PartyId, Role};
pub use recv::spawn_receive_loop;
pub use rules::{GameStatus, PieceKind, Rules};
pub use session::{AppliedPly, LinkState, Session, SessionSnapshot};
pub use storage::{GameStore, JsonGameStore, MemoryStore};
