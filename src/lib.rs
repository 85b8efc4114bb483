//! Database and table schemes for a table store on an ordered, transactional,
//! hierarchical key-value substrate.
//!
//! [`Catalog`] creates and drops databases and tables, persisting each table's
//! column layout as a versioned [`TableScheme`] blob next to its namespace node,
//! and serves decoded schemes through a [`SchemeCache`].

pub mod cache;
pub mod catalog;
pub mod codec;
pub mod column;
pub mod dbpath;
pub mod directory;
pub mod error;
pub mod scheme;
pub mod schema;
pub mod stmt;
pub mod store;

pub use cache::SchemeCache;
pub use catalog::Catalog;
pub use column::{ColumnDef, DataType};
pub use directory::Directory;
pub use error::{Error, Result};
pub use scheme::TableScheme;
pub use stmt::{CreateTable, TableElement, TableName};
pub use store::Store;
