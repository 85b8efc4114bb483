use crate::codec::{put_u32, take_u32};
use crate::column::ColumnDef;
use crate::directory::Directory;
use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};

pub const SCHEME_VERSION: u32 = 1;

/// Column layout of one table.
///
/// `key` and `value` are indices into `cols`. Key columns keep PRIMARY KEY
/// declaration order, value columns keep declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableScheme {
    cols: Vec<ColumnDef>,
    key: Vec<usize>,
    value: Vec<usize>,
    name_map: HashMap<String, usize>,
    dir: Option<Directory>,
}

impl TableScheme {
    /// Build a scheme from columns in declaration order and the key columns'
    /// indices in PRIMARY KEY order.
    pub fn new(cols: Vec<ColumnDef>, key: Vec<usize>) -> Result<Self> {
        check_parts(&cols, &key).map_err(Error::Validation)?;
        Ok(Self::from_parts(cols, key))
    }

    fn from_parts(cols: Vec<ColumnDef>, key: Vec<usize>) -> Self {
        let mut tbl = Self {
            cols,
            key,
            value: Vec::new(),
            name_map: HashMap::new(),
            dir: None,
        };
        tbl.fill();
        tbl
    }

    /// Derive `is_key`, `pos` and `pos_col` for every column and rebuild the
    /// value list and name lookup. Idempotent.
    fn fill(&mut self) {
        for col in &mut self.cols {
            col.is_key = false;
        }
        for (i, &idx) in self.key.iter().enumerate() {
            let col = &mut self.cols[idx];
            col.is_key = true;
            col.pos = i as u32;
        }

        self.value.clear();
        self.name_map.clear();
        for (i, col) in self.cols.iter_mut().enumerate() {
            col.pos_col = i as u32;
            self.name_map.insert(col.name.clone(), i);
            if !col.is_key {
                col.pos = self.value.len() as u32;
                self.value.push(i);
            }
        }
    }

    pub fn cols(&self) -> &[ColumnDef] {
        &self.cols
    }

    pub fn key_indices(&self) -> &[usize] {
        &self.key
    }

    pub fn value_indices(&self) -> &[usize] {
        &self.value
    }

    pub fn key_columns(&self) -> impl Iterator<Item = &ColumnDef> + '_ {
        self.key.iter().map(|&i| &self.cols[i])
    }

    pub fn value_columns(&self) -> impl Iterator<Item = &ColumnDef> + '_ {
        self.value.iter().map(|&i| &self.cols[i])
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.name_map.get(name).map(|&i| &self.cols[i])
    }

    /// Namespace entry of the table, set when loaded from the store.
    pub fn dir(&self) -> Option<&Directory> {
        self.dir.as_ref()
    }

    pub(crate) fn set_dir(&mut self, dir: Directory) {
        self.dir = Some(dir);
    }

    /// Format v1 (all u32 big-endian):
    /// version, column count, columns (see `ColumnDef::encode`),
    /// key count, key column positions in PRIMARY KEY order
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(12 + self.cols.len() * 16 + self.key.len() * 4);
        put_u32(&mut out, SCHEME_VERSION);
        put_u32(&mut out, self.cols.len() as u32);
        for col in &self.cols {
            col.encode(&mut out);
        }
        put_u32(&mut out, self.key.len() as u32);
        for col in self.key_columns() {
            put_u32(&mut out, col.pos_col);
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (version, rest) = take_u32(bytes, "scheme version")?;
        match version {
            1 => Self::decode_v1(rest),
            _ => Err(Error::corrupt(format!("unknown scheme version: {version}"))),
        }
    }

    fn decode_v1(bytes: &[u8]) -> Result<Self> {
        let (n, mut rest) = take_u32(bytes, "column count")?;
        let mut cols = Vec::new();
        for _ in 0..n {
            let (col, r) = ColumnDef::decode(rest, 1)?;
            cols.push(col);
            rest = r;
        }

        let (k, mut rest) = take_u32(rest, "key count")?;
        let mut key = Vec::new();
        for _ in 0..k {
            let (idx, r) = take_u32(rest, "key index")?;
            key.push(idx as usize);
            rest = r;
        }

        if !rest.is_empty() {
            return Err(Error::corrupt(format!("{} trailing bytes", rest.len())));
        }
        check_parts(&cols, &key).map_err(Error::Corrupt)?;

        Ok(Self::from_parts(cols, key))
    }
}

fn check_parts(cols: &[ColumnDef], key: &[usize]) -> std::result::Result<(), String> {
    let mut names = HashSet::new();
    for col in cols {
        if !names.insert(col.name.as_str()) {
            return Err(format!("Multiple definition of identifier {}", col.name));
        }
    }
    if key.is_empty() {
        return Err("PRIMARY KEY not declared".to_string());
    }
    let mut seen = HashSet::new();
    for &idx in key {
        if idx >= cols.len() {
            return Err(format!(
                "key column index {idx} out of range ({} columns)",
                cols.len()
            ));
        }
        if !seen.insert(idx) {
            return Err(format!(
                "Duplicate definition {} referenced in PRIMARY KEY",
                cols[idx].name
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::put_bytes;
    use crate::column::DataType;

    /// Hand-built v1 blob; columns are (raw name, type code).
    fn blob(cols: &[(&[u8], u32)], key: &[u32]) -> Vec<u8> {
        let mut out = Vec::new();
        put_u32(&mut out, SCHEME_VERSION);
        put_u32(&mut out, cols.len() as u32);
        for (name, code) in cols {
            put_bytes(&mut out, name);
            put_u32(&mut out, *code);
        }
        put_u32(&mut out, key.len() as u32);
        for idx in key {
            put_u32(&mut out, *idx);
        }
        out
    }

    fn corrupt_message(bytes: &[u8]) -> String {
        match TableScheme::decode(bytes) {
            Err(Error::Corrupt(m)) => m,
            other => panic!("expected corrupt scheme, got {other:?}"),
        }
    }

    fn quote_scheme() -> TableScheme {
        let cols = vec![
            ColumnDef::new("sec", DataType::Int),
            ColumnDef::new("price", DataType::Double),
            ColumnDef::new("ts", DataType::Timestamp),
            ColumnDef::new("qty", DataType::BigInt),
        ];
        // PRIMARY KEY (ts, sec)
        TableScheme::new(cols, vec![2, 0]).unwrap()
    }

    #[test]
    fn fill_partitions_key_and_value() {
        let tbl = quote_scheme();

        let key: Vec<_> = tbl.key_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(key, vec!["ts", "sec"]);
        let value: Vec<_> = tbl.value_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(value, vec!["price", "qty"]);

        for (i, col) in tbl.key_columns().enumerate() {
            assert!(col.is_key);
            assert_eq!(col.pos, i as u32);
        }
        for (i, col) in tbl.value_columns().enumerate() {
            assert!(!col.is_key);
            assert_eq!(col.pos, i as u32);
        }
        for (i, col) in tbl.cols().iter().enumerate() {
            assert_eq!(col.pos_col, i as u32);
            assert_eq!(tbl.column(&col.name), Some(col));
        }
    }

    #[test]
    fn fill_is_idempotent() {
        let mut tbl = quote_scheme();
        let before = tbl.clone();
        tbl.fill();
        tbl.fill();
        assert_eq!(tbl, before);
    }

    #[test]
    fn wire_layout() {
        let cols = vec![
            ColumnDef::new("id", DataType::Int),
            ColumnDef::new("v", DataType::Text),
        ];
        let tbl = TableScheme::new(cols, vec![0]).unwrap();
        let expected: Vec<u8> = vec![
            0, 0, 0, 1, // version
            0, 0, 0, 2, // columns
            0, 0, 0, 2, b'i', b'd', 0, 0, 0, 3, //
            0, 0, 0, 1, b'v', 0, 0, 0, 9, //
            0, 0, 0, 1, // keys
            0, 0, 0, 0,
        ];
        assert_eq!(tbl.encode(), expected);
    }

    #[test]
    fn decode_restores_layout() {
        let tbl = quote_scheme();
        let back = TableScheme::decode(&tbl.encode()).unwrap();
        assert_eq!(back, tbl);
        assert_eq!(back.key_indices(), &[2, 0]);
        assert_eq!(back.value_indices(), &[1, 3]);
    }

    #[test]
    fn new_rejects_bad_keys() {
        let cols = || vec![ColumnDef::new("a", DataType::Int), ColumnDef::new("b", DataType::Int)];
        assert!(matches!(TableScheme::new(cols(), vec![]), Err(Error::Validation(_))));
        assert!(matches!(TableScheme::new(cols(), vec![2]), Err(Error::Validation(_))));
        assert!(matches!(TableScheme::new(cols(), vec![1, 1]), Err(Error::Validation(_))));
    }

    #[test]
    fn decode_rejects_malformed_input() {
        let good = quote_scheme().encode();

        // every strict prefix is truncated somewhere
        for len in 0..good.len() {
            assert!(
                matches!(TableScheme::decode(&good[..len]), Err(Error::Corrupt(_))),
                "prefix of {len} bytes decoded"
            );
        }

        let mut trailing = good.clone();
        trailing.push(0);
        assert!(matches!(TableScheme::decode(&trailing), Err(Error::Corrupt(_))));

        let mut bad_version = good.clone();
        bad_version[3] = 2;
        assert!(matches!(TableScheme::decode(&bad_version), Err(Error::Corrupt(_))));

        // last key index points past the columns
        let mut bad_key = good.clone();
        let last = bad_key.len() - 1;
        bad_key[last] = 9;
        assert!(matches!(TableScheme::decode(&bad_key), Err(Error::Corrupt(_))));

        // the hand-built blob itself is well formed
        assert!(TableScheme::decode(&blob(&[(b"a", 3), (b"b", 9)], &[1])).is_ok());

        assert_eq!(
            corrupt_message(&blob(&[(b"a", 3)], &[0, 0])),
            "Duplicate definition a referenced in PRIMARY KEY"
        );
        assert_eq!(
            corrupt_message(&blob(&[(b"a", 3)], &[])),
            "PRIMARY KEY not declared"
        );
        assert!(matches!(
            TableScheme::decode(&blob(&[(&[0xff], 3)], &[0])),
            Err(Error::Corrupt(_))
        ));
        assert_eq!(
            corrupt_message(&blob(&[(b"a", 3), (b"a", 9)], &[0])),
            "Multiple definition of identifier a"
        );
    }
}
