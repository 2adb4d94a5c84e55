//! Persistence for the message log and user directory.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

use fs2::FileExt;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::error::{ChatError, ChatResult};
use crate::message::Message;

/// Persistence boundary for the two chat collections.
///
/// All mutation goes through [`Store::append`], which must hold its critical
/// section across the whole read-modify-write so two concurrent posts cannot
/// clobber each other's snapshots. Reads of an absent or malformed resource
/// return the empty collection, never an error.
pub trait Store: Send + Sync {
    /// Load the message sequence in persisted (insertion) order.
    fn load_messages(&self) -> ChatResult<Vec<Message>>;
    /// Load the known display names in first-seen order.
    fn load_users(&self) -> ChatResult<Vec<String>>;
    /// Append a message and, on first sight, record its name.
    fn append(&self, msg: &Message) -> ChatResult<()>;
}

/// Store keeping `msg.json` and `users.json` under a data directory.
///
/// Writers take an exclusive advisory lock on a sibling `.lock` file for the
/// whole read-modify-write, then replace each snapshot atomically (temp file,
/// flush, rename). A reader observes either the pre- or post-write snapshot,
/// never a mix.
#[derive(Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Ensure the data directory exists.
    pub fn init(&self) -> ChatResult<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    fn messages_path(&self) -> PathBuf {
        self.root.join("msg.json")
    }

    fn users_path(&self) -> PathBuf {
        self.root.join("users.json")
    }

    /// Acquire the exclusive lock guarding both collections. The lock is
    /// released when the returned handle drops.
    fn lock(&self) -> ChatResult<fs::File> {
        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(self.root.join(".lock"))?;
        file.lock_exclusive()?;
        Ok(file)
    }

    /// Read a JSON array from `path`; absent or malformed data is empty.
    fn read_collection<T: DeserializeOwned>(path: &Path) -> Vec<T> {
        match fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    /// Replace a collection with a full snapshot: write to a temp file in the
    /// same directory, flush, then rename over the old file.
    fn write_collection<T: Serialize>(path: &Path, items: &[T]) -> ChatResult<()> {
        let parent = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
        serde_json::to_writer_pretty(&mut tmp, items)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| ChatError::Persistence(e.error))?;
        Ok(())
    }
}

impl Store for FileStore {
    fn load_messages(&self) -> ChatResult<Vec<Message>> {
        Ok(Self::read_collection(&self.messages_path()))
    }

    fn load_users(&self) -> ChatResult<Vec<String>> {
        Ok(Self::read_collection(&self.users_path()))
    }

    fn append(&self, msg: &Message) -> ChatResult<()> {
        let _guard = self.lock()?;
        let mut messages: Vec<Message> = Self::read_collection(&self.messages_path());
        messages.push(msg.clone());
        let mut users: Vec<String> = Self::read_collection(&self.users_path());
        if !users.iter().any(|u| u == &msg.name) {
            users.push(msg.name.clone());
        }
        Self::write_collection(&self.messages_path(), &messages)?;
        Self::write_collection(&self.users_path(), &users)?;
        debug!(id = %msg.id, total = messages.len(), "appended message");
        Ok(())
    }
}

/// In-memory store for tests and ephemeral embedding.
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<(Vec<Message>, Vec<String>)>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemStore {
    fn load_messages(&self) -> ChatResult<Vec<Message>> {
        Ok(self.inner.lock().unwrap_or_else(|e| e.into_inner()).0.clone())
    }

    fn load_users(&self) -> ChatResult<Vec<String>> {
        Ok(self.inner.lock().unwrap_or_else(|e| e.into_inner()).1.clone())
    }

    fn append(&self, msg: &Message) -> ChatResult<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.0.push(msg.clone());
        if !inner.1.iter().any(|u| u == &msg.name) {
            inner.1.push(msg.name.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn sample(id: &str, name: &str, ts: u64) -> Message {
        Message {
            id: id.into(),
            name: name.into(),
            text: "hi".into(),
            ts,
        }
    }

    #[test]
    fn missing_files_read_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        store.init().unwrap();
        assert!(store.load_messages().unwrap().is_empty());
        assert!(store.load_users().unwrap().is_empty());
    }

    #[test]
    fn malformed_files_read_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        store.init().unwrap();
        fs::write(dir.path().join("msg.json"), "{not json").unwrap();
        fs::write(dir.path().join("users.json"), "42").unwrap();
        assert!(store.load_messages().unwrap().is_empty());
        assert!(store.load_users().unwrap().is_empty());
    }

    #[test]
    fn append_persists_message_and_user() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        store.init().unwrap();
        store.append(&sample("a1", "alice", 1)).unwrap();
        store.append(&sample("a2", "alice", 2)).unwrap();
        store.append(&sample("a3", "bob", 3)).unwrap();
        let msgs = store.load_messages().unwrap();
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0].id, "a1");
        // user directory holds distinct names in first-seen order
        assert_eq!(store.load_users().unwrap(), vec!["alice", "bob"]);
    }

    #[test]
    fn append_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileStore::new(dir.path().to_path_buf());
            store.init().unwrap();
            store.append(&sample("a1", "alice", 1)).unwrap();
        }
        let store = FileStore::new(dir.path().to_path_buf());
        assert_eq!(store.load_messages().unwrap().len(), 1);
    }

    #[test]
    fn snapshot_files_are_json_arrays() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        store.init().unwrap();
        store.append(&sample("a1", "héloïse", 1)).unwrap();
        let data = fs::read_to_string(dir.path().join("msg.json")).unwrap();
        let parsed: Vec<Message> = serde_json::from_str(&data).unwrap();
        assert_eq!(parsed[0].name, "héloïse");
        let users = fs::read_to_string(dir.path().join("users.json")).unwrap();
        let parsed: Vec<String> = serde_json::from_str(&users).unwrap();
        assert_eq!(parsed, vec!["héloïse"]);
    }

    #[test]
    fn concurrent_appends_lose_nothing() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileStore::new(dir.path().to_path_buf()));
        store.init().unwrap();
        let mut handles = vec![];
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                store
                    .append(&sample(&format!("id{}", i), "alice", i))
                    .unwrap();
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        let msgs = store.load_messages().unwrap();
        assert_eq!(msgs.len(), 8);
        let ids: std::collections::HashSet<_> = msgs.iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids.len(), 8);
        assert_eq!(store.load_users().unwrap(), vec!["alice"]);
    }

    #[test]
    fn unwritable_root_surfaces_persistence_error() {
        let store = FileStore::new(PathBuf::from("/proc/egchat-no-such-dir"));
        let err = store.append(&sample("a1", "alice", 1)).unwrap_err();
        assert!(matches!(err, ChatError::Persistence(_)));
    }

    #[test]
    fn mem_store_matches_file_store_behavior() {
        let store = MemStore::new();
        store.append(&sample("a1", "alice", 1)).unwrap();
        store.append(&sample("a2", "alice", 2)).unwrap();
        assert_eq!(store.load_messages().unwrap().len(), 2);
        assert_eq!(store.load_users().unwrap(), vec!["alice"]);
    }
}
