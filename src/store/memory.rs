//! In-process `StateStore`: a `HashMap` behind a tokio `RwLock`.
//!
//! Used by tests and by `COACH_STORE=memory` for local runs. Nothing survives
//! a restart.

use std::collections::{BTreeSet, HashMap, VecDeque};

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::traits::StateStore;

#[derive(Debug, Clone)]
enum Entry {
    Value(String),
    Set(BTreeSet<String>),
    List(VecDeque<String>),
}

impl Entry {
    fn kind(&self) -> &'static str {
        match self {
            Entry::Value(_) => "string",
            Entry::Set(_) => "set",
            Entry::List(_) => "list",
        }
    }
}

fn wrong_kind(key: &str, found: &Entry, expected: &'static str) -> StoreError {
    StoreError::WrongKind {
        key: key.to_string(),
        found: found.kind(),
        expected,
    }
}

/// In-memory key/value store.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Translate a store glob into an anchored regex.
fn glob_to_regex(pattern: &str) -> Result<Regex, StoreError> {
    let mut re = String::from("^");
    let mut in_class = false;
    for c in pattern.chars() {
        match c {
            '*' if !in_class => re.push_str(".*"),
            '?' if !in_class => re.push('.'),
            '[' if !in_class => {
                in_class = true;
                re.push('[');
            }
            ']' if in_class => {
                in_class = false;
                re.push(']');
            }
            '-' | '^' if in_class => re.push(c),
            c if in_class => re.push_str(&regex::escape(&c.to_string())),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).map_err(|e| StoreError::Query(format!("invalid pattern {pattern}: {e}")))
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            None => Ok(None),
            Some(Entry::Value(v)) => Ok(Some(v.clone())),
            Some(other) => Err(wrong_kind(key, other, "string")),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), Entry::Value(value.to_string()));
        Ok(())
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
    ) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().await;
        let current = match entries.get(key) {
            None => None,
            Some(Entry::Value(v)) => Some(v.as_str()),
            Some(other) => return Err(wrong_kind(key, other, "string")),
        };
        if current != expected {
            return Ok(false);
        }
        entries.insert(key.to_string(), Entry::Value(value.to_string()));
        Ok(true)
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let re = glob_to_regex(pattern)?;
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries.keys().filter(|k| re.is_match(k)).cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Set(BTreeSet::new()));
        match entry {
            Entry::Set(set) => Ok(set.insert(member.to_string())),
            other => Err(wrong_kind(key, other, "set")),
        }
    }

    async fn set_card(&self, key: &str) -> Result<usize, StoreError> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            None => Ok(0),
            Some(Entry::Set(set)) => Ok(set.len()),
            Some(other) => Err(wrong_kind(key, other, "set")),
        }
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            None => Ok(Vec::new()),
            Some(Entry::Set(set)) => Ok(set.iter().cloned().collect()),
            Some(other) => Err(wrong_kind(key, other, "set")),
        }
    }

    async fn list_push(&self, key: &str, value: &str, keep: usize) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::List(VecDeque::new()));
        match entry {
            Entry::List(list) => {
                list.push_front(value.to_string());
                list.truncate(keep);
                Ok(())
            }
            other => Err(wrong_kind(key, other, "list")),
        }
    }

    async fn list_range(&self, key: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            None => Ok(Vec::new()),
            Some(Entry::List(list)) => Ok(list.iter().take(limit).cloned().collect()),
            Some(other) => Err(wrong_kind(key, other, "list")),
        }
    }
}
