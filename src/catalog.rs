//! Database and table DDL over the namespace layer.
//!
//! Layout:
//! - database: `db/<db>`
//! - table: `db/<db>/<table>`
//! - scheme: `db/<db>/<table>/scheme`, value = encoded `TableScheme`

use crate::cache::SchemeCache;
use crate::column::{ColumnDef, DataType};
use crate::directory::{self, Directory};
use crate::error::{Error, Result};
use crate::scheme::TableScheme;
use crate::schema::{DATA, NODES};
use crate::stmt::{check_name, CreateTable, TableElement};
use crate::store::Store;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

const ROOT: &str = "db";
const SCHEME_NODE: &str = "scheme";

pub struct Catalog {
    store: Arc<Store>,
    cache: Arc<SchemeCache>,
}

impl Catalog {
    pub fn new(store: Arc<Store>) -> Self {
        Self::with_cache(store, Arc::new(SchemeCache::new()))
    }

    /// Share one cache between several catalogs over the same store.
    pub fn with_cache(store: Arc<Store>, cache: Arc<SchemeCache>) -> Self {
        Self { store, cache }
    }

    pub fn cache(&self) -> &SchemeCache {
        &self.cache
    }

    pub fn create_database(&self, db_name: &str) -> Result<()> {
        check_name("database", db_name)?;
        self.store.transact(|tx| {
            let exists = {
                let nodes = tx.open_table(NODES)?;
                directory::exists(&nodes, &[ROOT, db_name])?
            };
            if exists {
                return Err(Error::AlreadyExists(format!("Database {db_name}")));
            }
            directory::create(tx, &[ROOT, db_name])?;
            Ok(())
        })?;

        tracing::info!(db = db_name, "database created");
        Ok(())
    }

    pub fn list_databases(&self) -> Result<Vec<String>> {
        self.store.read(|tx| {
            let nodes = tx.open_table(NODES)?;
            directory::list(&nodes, &[ROOT])
        })
    }

    pub fn list_tables(&self, db_name: &str) -> Result<Vec<String>> {
        self.store.read(|tx| {
            let nodes = tx.open_table(NODES)?;
            if !directory::exists(&nodes, &[ROOT, db_name])? {
                return Err(Error::NotFound(format!("Database {db_name}")));
            }
            directory::list(&nodes, &[ROOT, db_name])
        })
    }

    /// Drops every table, each in its own transaction, then the database node.
    ///
    /// Not atomic across tables: on error, tables dropped so far stay dropped
    /// and the error of the failing table is returned.
    pub fn drop_database(&self, db_name: &str) -> Result<()> {
        let tables = self.list_tables(db_name)?;
        for tbl in &tables {
            self.drop_table(db_name, tbl)?;
        }

        let dir = self
            .store
            .read(|tx| {
                let nodes = tx.open_table(NODES)?;
                directory::open(&nodes, &[ROOT, db_name])
            })?
            .ok_or_else(|| Error::NotFound(format!("Database {db_name}")))?;
        self.store.transact(|tx| directory::remove(tx, &dir))?;
        self.cache.forget_database(db_name);

        tracing::info!(db = db_name, tables = tables.len(), "database dropped");
        Ok(())
    }

    /// `current_db` is the session's database. When set it takes precedence;
    /// the database part of a qualified table name is used only without it.
    pub fn create_table(&self, current_db: Option<&str>, stmt: &CreateTable) -> Result<()> {
        let db_name = match current_db.filter(|s| !s.is_empty()) {
            Some(db) => db,
            None => stmt.name.database.as_deref().filter(|s| !s.is_empty()).ok_or_else(|| {
                Error::validation(
                    "No database name has been specified. USE a database name, or explicitly specify databasename.tablename",
                )
            })?,
        };
        let tbl_name = stmt.name.table.as_str();
        check_name("database", db_name)?;
        check_name("table", tbl_name)?;

        let encoded_len = self.store.transact(|tx| {
            {
                let nodes = tx.open_table(NODES)?;
                if !directory::exists(&nodes, &[ROOT, db_name])? {
                    return Err(Error::NotFound(format!("Database {db_name}")));
                }
                if directory::exists(&nodes, &[ROOT, db_name, tbl_name])? {
                    return Err(Error::AlreadyExists(format!("Table {db_name}.{tbl_name}")));
                }
            }

            let scheme = build_scheme(&stmt.elements)?;
            let encoded = scheme.encode();

            let _table_dir = directory::create(tx, &[ROOT, db_name, tbl_name])?;
            let scheme_dir = directory::create(tx, &[ROOT, db_name, tbl_name, SCHEME_NODE])?;
            let mut data = tx.open_table(DATA)?;
            data.insert(scheme_dir.key().as_slice(), encoded.as_slice())?;
            Ok(encoded.len())
        })?;
        self.cache.forget(db_name, tbl_name);

        tracing::info!(db = db_name, table = tbl_name, "table created");
        tracing::trace!(db = db_name, table = tbl_name, bytes = encoded_len, "scheme written");
        Ok(())
    }

    /// Both namespace handles of a table: the table node and its scheme node.
    fn open_table(&self, db_name: &str, tbl_name: &str) -> Result<(Directory, Directory)> {
        self.store.read(|tx| {
            let nodes = tx.open_table(NODES)?;
            let table = directory::open(&nodes, &[ROOT, db_name, tbl_name])?
                .ok_or_else(|| Error::NotFound(format!("Table {db_name}.{tbl_name}")))?;
            let scheme = directory::open(&nodes, &[ROOT, db_name, tbl_name, SCHEME_NODE])?
                .ok_or_else(|| Error::NotFound(format!("Scheme of table {db_name}.{tbl_name}")))?;
            Ok((table, scheme))
        })
    }

    pub fn drop_table(&self, db_name: &str, tbl_name: &str) -> Result<()> {
        let (table_dir, scheme_dir) = self.open_table(db_name, tbl_name)?;
        self.store.transact(|tx| {
            {
                let mut data = tx.open_table(DATA)?;
                data.remove(scheme_dir.key().as_slice())?;
            }
            directory::remove(tx, &table_dir)?;
            Ok(())
        })?;
        self.cache.forget(db_name, tbl_name);

        tracing::info!(db = db_name, table = tbl_name, "table dropped");
        Ok(())
    }

    /// Persisted scheme bytes of a table, bypassing the cache.
    pub fn encoded_scheme(&self, db_name: &str, tbl_name: &str) -> Result<Vec<u8>> {
        let (_, scheme_dir) = self.open_table(db_name, tbl_name)?;
        self.read_scheme_bytes(&scheme_dir, db_name, tbl_name)
    }

    fn read_scheme_bytes(&self, scheme_dir: &Directory, db_name: &str, tbl_name: &str) -> Result<Vec<u8>> {
        self.store.read(|tx| {
            let data = tx.open_table(DATA)?;
            let bytes = data.get(scheme_dir.key().as_slice())?.map(|v| v.value().to_vec());
            bytes.ok_or_else(|| Error::NotFound(format!("Scheme of table {db_name}.{tbl_name}")))
        })
    }

    pub fn table_scheme(&self, db_name: &str, tbl_name: &str) -> Result<Arc<TableScheme>> {
        if let Some(scheme) = self.cache.get(db_name, tbl_name) {
            tracing::debug!(db = db_name, table = tbl_name, "scheme cache hit");
            return Ok(scheme);
        }
        tracing::debug!(db = db_name, table = tbl_name, "scheme cache miss");

        let (table_dir, scheme_dir) = self.open_table(db_name, tbl_name)?;
        let bytes = self.read_scheme_bytes(&scheme_dir, db_name, tbl_name)?;
        let mut scheme = TableScheme::decode(&bytes)?;
        scheme.set_dir(table_dir);

        let scheme = Arc::new(scheme);
        self.cache.insert(db_name, tbl_name, Arc::clone(&scheme));
        Ok(scheme)
    }

    pub fn forget(&self, db_name: &str, tbl_name: &str) {
        self.cache.forget(db_name, tbl_name);
    }
}

/// Validate column and key elements and build the scheme. Checks run in
/// declaration order and the first failure wins.
fn build_scheme(elements: &[TableElement]) -> Result<TableScheme> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut cols: Vec<ColumnDef> = Vec::new();
    let mut key_names: Option<&[String]> = None;

    for el in elements {
        match el {
            TableElement::PrimaryKey(names) => {
                if key_names.is_some() {
                    return Err(Error::validation("Duplicate PRIMARY KEY"));
                }
                key_names = Some(names);
            }
            TableElement::Column { name, type_name } => {
                if name.is_empty() {
                    return Err(Error::validation("empty column name"));
                }
                if positions.contains_key(name.as_str()) {
                    return Err(Error::validation(format!(
                        "Multiple definition of identifier {name}"
                    )));
                }
                let data_type = DataType::parse(type_name);
                if data_type == DataType::Unknown {
                    return Err(Error::validation(format!("Unknown type {type_name}")));
                }
                positions.insert(name.as_str(), cols.len());
                cols.push(ColumnDef::new(name.as_str(), data_type));
            }
        }
    }

    let mut key = Vec::new();
    let mut seen = HashSet::new();
    for k in key_names.unwrap_or_default() {
        let Some(&idx) = positions.get(k.as_str()) else {
            return Err(Error::validation(format!(
                "Unknown definition {k} referenced in PRIMARY KEY"
            )));
        };
        if !seen.insert(idx) {
            return Err(Error::validation(format!(
                "Duplicate definition {k} referenced in PRIMARY KEY"
            )));
        }
        key.push(idx);
    }
    if key.is_empty() {
        return Err(Error::validation("PRIMARY KEY not declared"));
    }

    TableScheme::new(cols, key)
}
