//! 会话上下文持久化
//!
//! 每次运行开始时读取一次、结束时写入一次（按 session_id 区分），运行中不做读改写。
//! FileSessionStore：每个会话一个 JSON 文件；InMemorySessionStore：进程内 HashMap，测试与无目录配置时使用。

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};

use crate::core::AgentError;

/// 会话上下文：任意 JSON 对象
pub type SessionContext = Map<String, Value>;

pub trait SessionStore: Send + Sync {
    /// 读取会话上下文；不存在时返回 None
    fn load(&self, session_id: &str) -> Result<Option<SessionContext>, AgentError>;

    fn save(&self, session_id: &str, context: &SessionContext) -> Result<(), AgentError>;
}

/// 文件存储：`<dir>/<session_id>.json`
#[derive(Debug)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_session_id(session_id)))
    }
}

/// session_id 来自外部请求：字母数字与 '-' 原样保留，其余字节（包括 '_'）编码为 `_XX`。
/// 编码是单射的，不同 id 不会落到同一个文件；空 id 为 "_"。
fn encode_session_id(session_id: &str) -> String {
    if session_id.is_empty() {
        return "_".to_string();
    }
    let mut out = String::with_capacity(session_id.len());
    for b in session_id.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' {
            out.push(b as char);
        } else {
            out.push_str(&format!("_{:02X}", b));
        }
    }
    out
}

impl SessionStore for FileSessionStore {
    fn load(&self, session_id: &str) -> Result<Option<SessionContext>, AgentError> {
        let path = self.path_for(session_id);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)
            .map_err(|e| AgentError::Session(format!("read {}: {}", path.display(), e)))?;
        let value: Value = serde_json::from_str(&data)
            .map_err(|e| AgentError::Session(format!("parse {}: {}", path.display(), e)))?;
        match value {
            Value::Object(map) => Ok(Some(map)),
            _ => Ok(None),
        }
    }

    fn save(&self, session_id: &str, context: &SessionContext) -> Result<(), AgentError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| AgentError::Session(format!("create {}: {}", self.dir.display(), e)))?;
        let path = self.path_for(session_id);
        let data = serde_json::to_string_pretty(context)
            .map_err(|e| AgentError::Session(e.to_string()))?;
        std::fs::write(&path, data)
            .map_err(|e| AgentError::Session(format!("write {}: {}", path.display(), e)))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, SessionContext>>,
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, session_id: &str) -> Result<Option<SessionContext>, AgentError> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| AgentError::Session("session map poisoned".to_string()))?;
        Ok(sessions.get(session_id).cloned())
    }

    fn save(&self, session_id: &str, context: &SessionContext) -> Result<(), AgentError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| AgentError::Session("session map poisoned".to_string()))?;
        sessions.insert(session_id.to_string(), context.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("sessions"));
        assert!(store.load("s1").unwrap().is_none());

        let mut ctx = SessionContext::new();
        ctx.insert("last_analyzed_product".to_string(), json!({"from_react": true}));
        store.save("s1", &ctx).unwrap();

        let loaded = store.load("s1").unwrap().unwrap();
        assert_eq!(loaded["last_analyzed_product"]["from_react"], json!(true));
    }

    #[test]
    fn test_session_id_cannot_escape_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        store.save("../../etc/passwd", &SessionContext::new()).unwrap();
        assert!(dir.path().join("_2E_2E_2F_2E_2E_2Fetc_2Fpasswd.json").exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_similar_ids_keep_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        let mut alice = SessionContext::new();
        alice.insert("owner".to_string(), json!("alice"));
        store.save("shop.1", &alice).unwrap();

        assert!(store.load("shop_1").unwrap().is_none());
        assert!(store.load("shop 1").unwrap().is_none());
        assert_eq!(store.load("shop.1").unwrap().unwrap()["owner"], "alice");

        let mut bob = SessionContext::new();
        bob.insert("owner".to_string(), json!("bob"));
        store.save("shop_1", &bob).unwrap();
        assert_eq!(store.load("shop.1").unwrap().unwrap()["owner"], "alice");
        assert_eq!(store.load("shop_1").unwrap().unwrap()["owner"], "bob");
    }

    #[test]
    fn test_encoding_is_one_to_one() {
        assert_eq!(encode_session_id("shop-1"), "shop-1");
        assert_eq!(encode_session_id("shop_1"), "shop_5F1");
        assert_eq!(encode_session_id("shop.1"), "shop_2E1");
        assert_ne!(encode_session_id(""), encode_session_id("default"));
        // 已编码形式本身也不会与原 id 冲突
        assert_ne!(encode_session_id("_5F"), encode_session_id("_"));
    }

    #[test]
    fn test_in_memory_store() {
        let store = InMemorySessionStore::default();
        let mut ctx = SessionContext::new();
        ctx.insert("k".to_string(), json!(1));
        store.save("a", &ctx).unwrap();
        assert_eq!(store.load("a").unwrap().unwrap()["k"], json!(1));
        assert!(store.load("b").unwrap().is_none());
    }
}
