use crate::codec::{put_bytes, put_u32, take_bytes, take_u32};
use crate::error::{Error, Result};
use std::fmt;

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Never stored; returned when a type name does not parse.
    Unknown = 0,
    TinyInt = 1,
    SmallInt = 2,
    Int = 3,
    BigInt = 4,
    Double = 5,
    Float = 6,
    Timestamp = 7,
    Boolean = 8,
    Text = 9,
}

impl DataType {
    /// Case-insensitive; anything unrecognized is `Unknown`.
    pub fn parse(s: &str) -> DataType {
        match s.to_ascii_uppercase().as_str() {
            "TINYINT" => DataType::TinyInt,
            "SMALLINT" => DataType::SmallInt,
            "INT" => DataType::Int,
            "BIGINT" => DataType::BigInt,
            "DOUBLE" => DataType::Double,
            "FLOAT" => DataType::Float,
            "TIMESTAMP" => DataType::Timestamp,
            "BOOLEAN" => DataType::Boolean,
            "TEXT" => DataType::Text,
            _ => DataType::Unknown,
        }
    }

    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(DataType::Unknown),
            1 => Some(DataType::TinyInt),
            2 => Some(DataType::SmallInt),
            3 => Some(DataType::Int),
            4 => Some(DataType::BigInt),
            5 => Some(DataType::Double),
            6 => Some(DataType::Float),
            7 => Some(DataType::Timestamp),
            8 => Some(DataType::Boolean),
            9 => Some(DataType::Text),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::Unknown => "UNKNOWN",
            DataType::TinyInt => "TINYINT",
            DataType::SmallInt => "SMALLINT",
            DataType::Int => "INT",
            DataType::BigInt => "BIGINT",
            DataType::Double => "DOUBLE",
            DataType::Float => "FLOAT",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Boolean => "BOOLEAN",
            DataType::Text => "TEXT",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// One column of a table scheme.
///
/// Only `name` and `data_type` are persisted. `is_key`, `pos_col` and `pos`
/// are derived by `TableScheme::fill` after construction or decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    pub is_key: bool,
    /// Index among all columns, in declaration order.
    pub pos_col: u32,
    /// Index within the key columns or the value columns.
    pub pos: u32,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            is_key: false,
            pos_col: 0,
            pos: 0,
        }
    }

    /// Format (no version of its own, embedded in the scheme format):
    /// u32 BE name length, name bytes, u32 BE type code
    pub fn encode(&self, out: &mut Vec<u8>) {
        put_bytes(out, self.name.as_bytes());
        put_u32(out, self.data_type.as_u32());
    }

    /// Decode one column and return the unconsumed rest of `bytes`.
    pub fn decode(bytes: &[u8], version: u32) -> Result<(Self, &[u8])> {
        match version {
            1 => Self::decode_v1(bytes),
            _ => Err(Error::corrupt(format!("unknown column format version: {version}"))),
        }
    }

    fn decode_v1(bytes: &[u8]) -> Result<(Self, &[u8])> {
        let (name, rest) = take_bytes(bytes, "column name")?;
        let name = std::str::from_utf8(name)
            .map_err(|e| Error::corrupt(format!("column name is not UTF-8: {e}")))?;
        if name.is_empty() {
            return Err(Error::corrupt("empty column name"));
        }

        let (code, rest) = take_u32(rest, "column type")?;
        let data_type = match DataType::from_u32(code) {
            Some(DataType::Unknown) | None => {
                return Err(Error::corrupt(format!(
                    "invalid type code {code} for column {name}"
                )));
            }
            Some(t) => t,
        };

        Ok((ColumnDef::new(name, data_type), rest))
    }
}
