pub mod error;
pub mod key;
pub mod table_chunk;

#[cfg(test)]
pub mod test_utils;

pub use error::{AggWindowError, Code, Result};
pub use key::{GroupKey, KeyColumn};
pub use table_chunk::TableChunk;
