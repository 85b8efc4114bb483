//! Hierarchical namespace nodes on top of redb.
//!
//! A node is addressed by its path segments and owns a unique 8-byte prefix.
//! Values belonging to a node are stored in `DATA` under keys starting with
//! that prefix; a node's own value sits at exactly the prefix.

use crate::error::{Error, Result};
use crate::schema::{DATA, KEY_NEXT_PREFIX, KV_U64, NODES};
use redb::{ReadableTable, Table, WriteTransaction};

const SEP: char = '\0';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    path: Vec<String>,
    prefix: u64,
}

impl Directory {
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn prefix(&self) -> u64 {
        self.prefix
    }

    /// Key of this node's own value.
    pub fn key(&self) -> [u8; 8] {
        self.prefix.to_be_bytes()
    }
}

pub fn display_path(path: &[&str]) -> String {
    path.join("/")
}

fn node_key(path: &[&str]) -> Result<String> {
    if path.is_empty() {
        return Err(Error::validation("empty namespace path"));
    }
    for seg in path {
        if seg.is_empty() || seg.contains(SEP) {
            return Err(Error::validation(format!(
                "invalid path segment {seg:?} in {}",
                display_path(path)
            )));
        }
    }
    Ok(path.join("\0"))
}

pub fn open<T>(nodes: &T, path: &[&str]) -> Result<Option<Directory>>
where
    T: ReadableTable<&'static str, u64>,
{
    let key = node_key(path)?;
    let prefix = nodes.get(key.as_str())?.map(|v| v.value());
    Ok(prefix.map(|prefix| Directory {
        path: path.iter().map(|s| s.to_string()).collect(),
        prefix,
    }))
}

pub fn exists<T>(nodes: &T, path: &[&str]) -> Result<bool>
where
    T: ReadableTable<&'static str, u64>,
{
    Ok(open(nodes, path)?.is_some())
}

/// Names of the immediate children of `path`, ascending.
pub fn list<T>(nodes: &T, path: &[&str]) -> Result<Vec<String>>
where
    T: ReadableTable<&'static str, u64>,
{
    let mut start = node_key(path)?;
    start.push(SEP);

    let mut out = Vec::new();
    for item in nodes.range(start.as_str()..)? {
        let (k, _) = item?;
        let k = k.value();
        let Some(rest) = k.strip_prefix(start.as_str()) else {
            break;
        };
        if !rest.contains(SEP) {
            out.push(rest.to_string());
        }
    }
    Ok(out)
}

/// Create the node at `path`, and any missing ancestors.
pub fn create(tx: &WriteTransaction, path: &[&str]) -> Result<Directory> {
    let key = node_key(path)?;
    let mut nodes = tx.open_table(NODES)?;
    let mut kv = tx.open_table(KV_U64)?;

    let present = nodes.get(key.as_str())?.is_some();
    if present {
        return Err(Error::AlreadyExists(display_path(path)));
    }

    for depth in 1..path.len() {
        let ancestor = node_key(&path[..depth])?;
        let present = nodes.get(ancestor.as_str())?.is_some();
        if !present {
            let id = next_prefix(&mut kv)?;
            nodes.insert(ancestor.as_str(), id)?;
            tracing::debug!(path = %display_path(&path[..depth]), prefix = id, "created ancestor node");
        }
    }

    let prefix = next_prefix(&mut kv)?;
    nodes.insert(key.as_str(), prefix)?;
    tracing::debug!(path = %display_path(path), prefix, "created node");

    Ok(Directory {
        path: path.iter().map(|s| s.to_string()).collect(),
        prefix,
    })
}

/// Remove `dir` and everything below it, including stored values.
/// Returns the number of nodes removed.
pub fn remove(tx: &WriteTransaction, dir: &Directory) -> Result<usize> {
    let path: Vec<&str> = dir.path.iter().map(|s| s.as_str()).collect();
    let key = node_key(&path)?;
    let mut below = key.clone();
    below.push(SEP);

    let mut nodes = tx.open_table(NODES)?;
    let mut data = tx.open_table(DATA)?;

    let present = nodes.get(key.as_str())?.is_some();
    if !present {
        return Err(Error::NotFound(display_path(&path)));
    }

    let mut doomed: Vec<(String, u64)> = Vec::new();
    for item in nodes.range(key.as_str()..)? {
        let (k, v) = item?;
        let k = k.value();
        if k != key && !k.starts_with(below.as_str()) {
            break;
        }
        doomed.push((k.to_string(), v.value()));
    }

    for (k, prefix) in &doomed {
        nodes.remove(k.as_str())?;
        clear_prefix(&mut data, *prefix)?;
    }

    tracing::debug!(path = %display_path(&path), removed = doomed.len(), "removed node");
    Ok(doomed.len())
}

fn clear_prefix(data: &mut Table<&'static [u8], &'static [u8]>, prefix: u64) -> Result<()> {
    let start = prefix.to_be_bytes();
    let mut keys: Vec<Vec<u8>> = Vec::new();
    for item in data.range(start.as_slice()..)? {
        let (k, _) = item?;
        let k = k.value();
        if !k.starts_with(&start) {
            break;
        }
        keys.push(k.to_vec());
    }
    for k in &keys {
        data.remove(k.as_slice())?;
    }
    Ok(())
}

fn next_prefix(kv: &mut Table<&'static str, u64>) -> Result<u64> {
    let next = kv.get(KEY_NEXT_PREFIX)?.map(|v| v.value()).unwrap_or(1);
    kv.insert(KEY_NEXT_PREFIX, next + 1)?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    #[test]
    fn create_open_list_remove() {
        let store = Store::in_memory().unwrap();

        store
            .transact(|tx| {
                create(tx, &["db", "d1", "t1"])?;
                create(tx, &["db", "d1", "t1", "scheme"])?;
                create(tx, &["db", "d1", "t0"])?;
                create(tx, &["db", "d2"])?;
                Ok(())
            })
            .unwrap();

        store
            .read(|tx| {
                let nodes = tx.open_table(NODES)?;
                assert!(exists(&nodes, &["db"])?);
                assert!(exists(&nodes, &["db", "d1"])?);
                assert_eq!(list(&nodes, &["db"])?, vec!["d1", "d2"]);
                assert_eq!(list(&nodes, &["db", "d1"])?, vec!["t0", "t1"]);
                assert!(list(&nodes, &["db", "d2"])?.is_empty());
                Ok(())
            })
            .unwrap();

        let t1 = store
            .read(|tx| {
                let nodes = tx.open_table(NODES)?;
                open(&nodes, &["db", "d1", "t1"])
            })
            .unwrap()
            .unwrap();
        let removed = store.transact(|tx| remove(tx, &t1)).unwrap();
        assert_eq!(removed, 2);

        store
            .read(|tx| {
                let nodes = tx.open_table(NODES)?;
                assert!(!exists(&nodes, &["db", "d1", "t1", "scheme"])?);
                assert_eq!(list(&nodes, &["db", "d1"])?, vec!["t0"]);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn create_twice_fails() {
        let store = Store::in_memory().unwrap();
        store.transact(|tx| create(tx, &["db", "x"]).map(|_| ())).unwrap();
        let err = store
            .transact(|tx| create(tx, &["db", "x"]).map(|_| ()))
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[test]
    fn prefixes_are_unique_and_values_cleared() {
        let store = Store::in_memory().unwrap();
        let (a, b) = store
            .transact(|tx| {
                let a = create(tx, &["n", "a"])?;
                let b = create(tx, &["n", "b"])?;
                let mut data = tx.open_table(DATA)?;
                data.insert(a.key().as_slice(), b"one".as_slice())?;
                data.insert(b.key().as_slice(), b"two".as_slice())?;
                Ok((a, b))
            })
            .unwrap();
        assert_ne!(a.prefix(), b.prefix());

        store.transact(|tx| remove(tx, &a)).unwrap();

        store
            .read(|tx| {
                let data = tx.open_table(DATA)?;
                assert!(data.get(a.key().as_slice())?.is_none());
                assert_eq!(data.get(b.key().as_slice())?.unwrap().value(), b"two");
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn rejects_bad_segments() {
        let store = Store::in_memory().unwrap();
        let err = store
            .transact(|tx| create(tx, &["db", ""]).map(|_| ()))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = store
            .transact(|tx| create(tx, &["db", "a\0b"]).map(|_| ()))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
