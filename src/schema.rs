use redb::TableDefinition;

// namespace node path (segments joined by NUL) -> node prefix id
pub const NODES: TableDefinition<&str, u64> = TableDefinition::new("nodes");
pub const KV_U64: TableDefinition<&str, u64> = TableDefinition::new("kv_u64");
pub const KEY_NEXT_PREFIX: &str = "next_prefix";

// node prefix (u64 BE) + optional suffix -> value blob
pub const DATA: TableDefinition<&[u8], &[u8]> = TableDefinition::new("data");
