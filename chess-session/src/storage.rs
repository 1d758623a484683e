//! 对局持久化
//!
//! 提供参与方注册与走法落盘。持久层故障不影响对局进行：
//! 调用方记录警告后继续，账本退化为纯内存。

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::party::PartyId;

/// 持久层抽象
pub trait GameStore: Send + Sync {
    /// 注册参与方，返回其 ID
    fn register_party(&self, display_name: &str) -> Result<PartyId>;

    /// 记录一个半回合
    fn record_ply(&self, party_id: PartyId, uci: &str) -> Result<()>;

    /// 按 ID 查询显示名
    fn lookup_display_name(&self, party_id: PartyId) -> Option<String>;
}

/// 参与方行
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PartyRow {
    id: PartyId,
    name: String,
}

/// 走法行
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PlyRow {
    party_id: PartyId,
    uci: String,
    at: DateTime<Utc>,
}

/// 单局对局日志
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GameLog {
    started_at: DateTime<Utc>,
    parties: Vec<PartyRow>,
    moves: Vec<PlyRow>,
}

impl GameLog {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            parties: Vec::new(),
            moves: Vec::new(),
        }
    }
}

/// JSON 文件存储
///
/// 每个会话一个日志文件，每次追加后整体重写。
pub struct JsonGameStore {
    path: PathBuf,
    log: Mutex<GameLog>,
}

impl JsonGameStore {
    /// 在默认数据目录下创建存储
    pub fn new() -> Result<Self> {
        let games_dir = default_games_dir()?;
        Self::in_dir(games_dir)
    }

    /// 在指定目录下创建存储
    pub fn in_dir(dir: PathBuf) -> Result<Self> {
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("无法创建存储目录: {:?}", dir))?;
        }

        let log = GameLog::new();
        let filename = log.started_at.format("%Y%m%d_%H%M%S.json").to_string();
        let path = dir.join(filename);

        let store = Self {
            path,
            log: Mutex::new(log),
        };
        store.flush()?;
        Ok(store)
    }

    /// 日志文件路径
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        let log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        let json = serde_json::to_string_pretty(&*log).context("序列化对局日志失败")?;
        fs::write(&self.path, json)
            .with_context(|| format!("写入文件失败: {:?}", self.path))?;
        Ok(())
    }
}

impl GameStore for JsonGameStore {
    fn register_party(&self, display_name: &str) -> Result<PartyId> {
        let id = {
            let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
            let id = log.parties.len() as PartyId + 1;
            log.parties.push(PartyRow {
                id,
                name: display_name.to_string(),
            });
            id
        };
        self.flush()?;
        Ok(id)
    }

    fn record_ply(&self, party_id: PartyId, uci: &str) -> Result<()> {
        {
            let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
            log.moves.push(PlyRow {
                party_id,
                uci: uci.to_string(),
                at: Utc::now(),
            });
        }
        self.flush()
    }

    fn lookup_display_name(&self, party_id: PartyId) -> Option<String> {
        let log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        log.parties
            .iter()
            .find(|p| p.id == party_id)
            .map(|p| p.name.clone())
    }
}

/// 内存存储（持久层不可用时的退化实现，也用于测试）
pub struct MemoryStore {
    log: Mutex<GameLog>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            log: Mutex::new(GameLog::new()),
        }
    }

    /// 已记录的走法数
    pub fn move_count(&self) -> usize {
        let log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        log.moves.len()
    }

    /// 按顺序取出所有 (参与方 ID, 走法) 对
    pub fn moves(&self) -> Vec<(PartyId, String)> {
        let log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        log.moves
            .iter()
            .map(|m| (m.party_id, m.uci.clone()))
            .collect()
    }
}

impl GameStore for MemoryStore {
    fn register_party(&self, display_name: &str) -> Result<PartyId> {
        let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        let id = log.parties.len() as PartyId + 1;
        log.parties.push(PartyRow {
            id,
            name: display_name.to_string(),
        });
        Ok(id)
    }

    fn record_ply(&self, party_id: PartyId, uci: &str) -> Result<()> {
        let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        log.moves.push(PlyRow {
            party_id,
            uci: uci.to_string(),
            at: Utc::now(),
        });
        Ok(())
    }

    fn lookup_display_name(&self, party_id: PartyId) -> Option<String> {
        let log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        log.parties
            .iter()
            .find(|p| p.id == party_id)
            .map(|p| p.name.clone())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// 获取跨平台存储目录
fn default_games_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().context("无法获取应用数据目录")?;
    Ok(data_dir.join("lan-chess").join("games"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (JsonGameStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonGameStore::in_dir(temp_dir.path().to_path_buf()).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_register_and_lookup() {
        let (store, _temp_dir) = create_test_store();

        let id1 = store.register_party("Player1").unwrap();
        let id2 = store.register_party("Player2").unwrap();
        assert_ne!(id1, id2);

        assert_eq!(store.lookup_display_name(id1).as_deref(), Some("Player1"));
        assert_eq!(store.lookup_display_name(id2).as_deref(), Some("Player2"));
        assert_eq!(store.lookup_display_name(999), None);
    }

    #[test]
    fn test_record_ply_persists_to_disk() {
        let (store, _temp_dir) = create_test_store();

        let id1 = store.register_party("Player1").unwrap();
        let id2 = store.register_party("Player2").unwrap();
        store.record_ply(id1, "e2e4").unwrap();
        store.record_ply(id2, "e7e5").unwrap();

        // 直接读文件验证落盘内容
        let content = fs::read_to_string(store.path()).unwrap();
        let log: GameLog = serde_json::from_str(&content).unwrap();
        assert_eq!(log.parties.len(), 2);
        assert_eq!(log.moves.len(), 2);
        assert_eq!(log.moves[0].uci, "e2e4");
        assert_eq!(log.moves[0].party_id, id1);
        assert_eq!(log.moves[1].uci, "e7e5");
    }

    #[test]
    fn test_memory_store_fallback() {
        let store = MemoryStore::new();

        let id = store.register_party("Player1").unwrap();
        store.record_ply(id, "e2e4").unwrap();

        assert_eq!(store.lookup_display_name(id).as_deref(), Some("Player1"));
        assert_eq!(store.moves(), vec![(id, "e2e4".to_string())]);
    }
}
