//! 会话状态与回合状态机
//!
//! `Session` 是两个进程各自持有的权威本地视图：棋盘、回合旗标、
//! 走法账本和参与方名册集中在一把锁后面。前台任务（本地提交）
//! 和接收循环（远端走法）都只通过 `submit_local` / `apply_remote`
//! 两个入口变更状态，棋盘更新、旗标翻转、账本追加在同一临界区内完成，
//! 杜绝迟到的本地提交与重复入站帧交错的竞争。

use std::sync::{Arc, Mutex, MutexGuard};

use chess::{Board, ChessMove};

use protocol::{MoveFrame, UciMove};

use crate::error::{Result, SessionError};
use crate::ledger::{MoveLedger, PlyRecord};
use crate::party::{Color, Party, PartyId};
use crate::rules::{GameStatus, Rules};
use crate::storage::GameStore;

/// 连接状态
///
/// 接收路径一旦出错即永久 `Down`，本设计不做重连。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Live,
    Down,
}

/// 一次成功应用的半回合
#[derive(Debug, Clone)]
pub struct AppliedPly {
    pub record: PlyRecord,
    /// 发送路径使用的线上文本
    pub wire_text: String,
    /// 应用后的对局状态
    pub status: GameStatus,
}

/// 按颜色绑定的参与方名册
#[derive(Debug, Default)]
struct Roster {
    white: Option<(String, Option<PartyId>)>,
    black: Option<(String, Option<PartyId>)>,
}

impl Roster {
    fn get(&self, color: Color) -> Option<&(String, Option<PartyId>)> {
        match color {
            Color::White => self.white.as_ref(),
            Color::Black => self.black.as_ref(),
        }
    }

    fn bind(&mut self, color: Color, name: String, id: Option<PartyId>) {
        let slot = match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        };
        *slot = Some((name, id));
    }
}

/// 锁内的会话状态
struct SessionState {
    board: Board,
    turn: Color,
    ledger: MoveLedger,
    roster: Roster,
    link: LinkState,
}

/// 显示层快照（拉取式，每渲染帧取一次）
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub board: Board,
    pub turn: Color,
    pub status: GameStatus,
    pub link: LinkState,
    pub white_name: Option<String>,
    pub black_name: Option<String>,
    pub plies: Vec<PlyRecord>,
}

/// 对局会话
pub struct Session {
    local: Party,
    store: Arc<dyn GameStore>,
    state: Mutex<SessionState>,
}

impl Session {
    /// 创建会话，回合旗标初始为白方
    pub fn new(local: Party, store: Arc<dyn GameStore>) -> Self {
        let mut roster = Roster::default();
        if let Some(color) = local.color {
            roster.bind(color, local.name.clone(), local.id);
        }

        Self {
            local,
            store,
            state: Mutex::new(SessionState {
                board: Rules::initial_board(),
                turn: Color::White,
                ledger: MoveLedger::new(),
                roster,
                link: LinkState::Live,
            }),
        }
    }

    /// 本地参与方
    pub fn local_party(&self) -> &Party {
        &self.local
    }

    /// 提交本地走法
    ///
    /// 观战方与非本方回合的提交返回 `NotYourTurn`；
    /// 规则引擎拒绝的走法返回 `IllegalMove`。两种拒绝都不改动任何状态，
    /// 也不产生网络流量。
    pub fn submit_local(&self, mv: UciMove) -> Result<AppliedPly> {
        let local_color = self.local.color.ok_or(SessionError::NotYourTurn)?;

        let applied = {
            let mut st = self.lock();
            if st.turn != local_color {
                return Err(SessionError::NotYourTurn);
            }

            let engine_mv = Rules::to_engine_move(&mv);
            if !Rules::is_legal(&st.board, engine_mv) {
                return Err(SessionError::IllegalMove {
                    uci: mv.to_string(),
                });
            }

            Self::apply_ply(&mut st, engine_mv, mv, self.local.name.clone())
        };

        self.persist(self.local.id, &applied.record.uci);
        Ok(applied)
    }

    /// 应用远端走法（接收循环调用）
    ///
    /// 入站帧在轮到本方时到达、走棋方名字与名册矛盾、或走法在本地棋盘上
    /// 不合法，都说明两侧视图已经分叉，返回 `Desync` 且不追加任何记录。
    pub fn apply_remote(&self, frame: &MoveFrame) -> Result<AppliedPly> {
        let (applied, party_id) = {
            let mut st = self.lock();
            let expected = st.turn;

            if self.local.color == Some(expected) {
                return Err(SessionError::desync(format!(
                    "frame from {:?} arrived while the local side is to move",
                    frame.mover
                )));
            }

            if let Some((bound, _)) = st.roster.get(expected) {
                if *bound != frame.mover {
                    return Err(SessionError::desync(format!(
                        "move from {:?} but {:?} is to move",
                        frame.mover, bound
                    )));
                }
            }

            let engine_mv = Rules::to_engine_move(&frame.mv);
            if !Rules::is_legal(&st.board, engine_mv) {
                return Err(SessionError::desync(format!(
                    "move {} from {:?} is illegal against the local board",
                    frame.mv, frame.mover
                )));
            }

            // 首次出现的远端名字绑定到当前行棋颜色并注册到持久层
            let party_id = match st.roster.get(expected) {
                Some((_, id)) => *id,
                None => {
                    let id = match self.store.register_party(&frame.mover) {
                        Ok(id) => Some(id),
                        Err(e) => {
                            tracing::warn!("failed to register remote party: {e:#}");
                            None
                        }
                    };
                    st.roster.bind(expected, frame.mover.clone(), id);
                    id
                }
            };

            let applied = Self::apply_ply(&mut st, engine_mv, frame.mv, frame.mover.clone());
            (applied, party_id)
        };

        self.persist(party_id, &applied.record.uci);
        Ok(applied)
    }

    /// 棋盘更新 + 旗标翻转 + 账本追加，单一临界区内的唯一变更点
    fn apply_ply(
        st: &mut SessionState,
        engine_mv: ChessMove,
        mv: UciMove,
        mover: String,
    ) -> AppliedPly {
        let next = Rules::apply(&st.board, engine_mv);
        let piece = Rules::piece_at(&next, engine_mv.get_dest());

        st.board = next;
        st.turn = st.turn.opponent();

        let record = PlyRecord {
            mover: mover.clone(),
            piece,
            from: mv.from.to_string(),
            to: mv.to.to_string(),
            uci: mv.to_string(),
        };
        st.ledger.append(record.clone());

        AppliedPly {
            wire_text: MoveFrame::new(mover, mv).encode(),
            status: Rules::status(&st.board),
            record,
        }
    }

    fn persist(&self, party_id: Option<PartyId>, uci: &str) {
        let Some(id) = party_id else { return };
        if let Err(e) = self.store.record_ply(id, uci) {
            tracing::warn!("failed to record ply: {e:#}");
        }
    }

    /// 标记连接中断（接收循环终止前调用）
    pub fn mark_link_down(&self, reason: &str) {
        let mut st = self.lock();
        if st.link == LinkState::Live {
            tracing::error!("link down: {}", reason);
            st.link = LinkState::Down;
        }
    }

    /// 连接是否已中断
    pub fn is_link_down(&self) -> bool {
        self.lock().link == LinkState::Down
    }

    /// 显示层快照
    pub fn snapshot(&self) -> SessionSnapshot {
        let st = self.lock();
        SessionSnapshot {
            board: st.board,
            turn: st.turn,
            status: Rules::status(&st.board),
            link: st.link,
            white_name: st.roster.get(Color::White).map(|(n, _)| n.clone()),
            black_name: st.roster.get(Color::Black).map(|(n, _)| n.clone()),
            plies: st.ledger.snapshot(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
