//! 走法账本
//!
//! 按时间顺序只追加的半回合记录，显示层消费其快照，
//! 持久层可选地跟随写入。追加后不可修改、不可重排。

use serde::{Deserialize, Serialize};

use crate::rules::PieceKind;

/// 一个半回合的记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlyRecord {
    /// 走棋方显示名
    pub mover: String,
    /// 走动的棋子（落点处的棋子，升变时为升变后的棋子）
    pub piece: Option<PieceKind>,
    /// 起始格
    pub from: String,
    /// 目标格
    pub to: String,
    /// 原始 UCI 走法文本
    pub uci: String,
}

impl PlyRecord {
    /// 按 `"<玩家> (<棋子>): <起> to <止>"` 格式描述
    pub fn describe(&self) -> String {
        let piece = self.piece.map(|p| p.label()).unwrap_or("Unknown");
        format!("{} ({}): {} to {}", self.mover, piece, self.from, self.to)
    }
}

/// 走法账本
#[derive(Debug, Default)]
pub struct MoveLedger {
    entries: Vec<PlyRecord>,
}

impl MoveLedger {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// 追加一条记录（唯一的变更入口）
    pub fn append(&mut self, record: PlyRecord) {
        self.entries.push(record);
    }

    /// 已记录的半回合数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 只读快照（一致前缀，不暴露半成品记录）
    pub fn snapshot(&self) -> Vec<PlyRecord> {
        self.entries.clone()
    }
}
