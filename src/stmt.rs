//! Already-parsed CREATE TABLE input, as handed over by the statement executor.

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    pub database: Option<String>,
    pub table: String,
}

impl TableName {
    /// `"table"` or `"db.table"`.
    pub fn parse(s: &str) -> Result<Self> {
        let (database, table) = match s.split_once('.') {
            Some((db, tbl)) => (Some(db.to_string()), tbl.to_string()),
            None => (None, s.to_string()),
        };
        if let Some(db) = &database {
            check_name("database", db)?;
        }
        check_name("table", &table)?;
        Ok(Self { database, table })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableElement {
    Column { name: String, type_name: String },
    PrimaryKey(Vec<String>),
}

impl TableElement {
    pub fn column(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        TableElement::Column {
            name: name.into(),
            type_name: type_name.into(),
        }
    }

    pub fn primary_key<S: Into<String>>(cols: impl IntoIterator<Item = S>) -> Self {
        TableElement::PrimaryKey(cols.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTable {
    pub name: TableName,
    pub elements: Vec<TableElement>,
}

/// Database and table names end up in namespace paths and in `"db.table"`
/// cache keys, so neither may contain `.` or NUL.
pub fn check_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::validation(format!("empty {kind} name")));
    }
    if name.contains('.') || name.contains('\0') {
        return Err(Error::validation(format!("invalid {kind} name {name:?}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_names() {
        let n = TableName::parse("d1.quotes").unwrap();
        assert_eq!(n.database.as_deref(), Some("d1"));
        assert_eq!(n.table, "quotes");

        let n = TableName::parse("quotes").unwrap();
        assert_eq!(n.database, None);

        assert!(TableName::parse("a.b.c").is_err());
        assert!(TableName::parse(".t").is_err());
        assert!(TableName::parse("").is_err());
    }
}
