//! Security limits for decoding untrusted wire data.
//!
//! Every allocation made while parsing entity payloads is bounded by one of
//! these constants. They also cap what the encoder will emit, so a value
//! that would be rejected on the way back in fails fast on the way out.

/// Maximum byte length of an indexed string value. The store refuses to
/// index anything longer, so the codec rejects it at encode time.
pub const MAX_INDEXED_STRING_BYTES: usize = 1500;

/// Maximum byte length of a string payload.
pub const MAX_STRING_LEN: usize = 1 << 20;

/// Maximum byte length of a bytes payload (blobs, compressed text, pickled
/// and local-structured blobs).
pub const MAX_BLOB_LEN: usize = 1 << 20;

/// Maximum decompressed size of a zlib payload.
pub const MAX_DECOMPRESSED_LEN: usize = 4 << 20;

/// Maximum number of fields in one entity.
pub const MAX_PROPERTIES_PER_ENTITY: usize = 4096;

/// Maximum number of elements in a repeated value.
pub const MAX_ARRAY_LEN: usize = 4096;

/// Maximum byte length of a kind or wire field name.
pub const MAX_NAME_LEN: usize = 1024;

/// Maximum depth of nested entities (structured embedding, pickled trees).
pub const MAX_NESTING_DEPTH: usize = 16;

/// Maximum number of bytes in a varint (64-bit value).
pub const MAX_VARINT_BYTES: usize = 10;
