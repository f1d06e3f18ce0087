/// Longest accepted vendor identifier, in bytes.
pub const MAX_VENDOR_LEN: usize = 255;

/// Largest SQL statement the front-end will parse, in bytes.
pub const MAX_QUERY_LEN: usize = 64 * 1024;

/// Depth of the group-commit channel feeding the WAL writer.
pub const WAL_CHANNEL_DEPTH: usize = 4096;
