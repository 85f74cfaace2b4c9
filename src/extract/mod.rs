pub mod archive;
pub mod csv;
pub mod encoding;
pub mod source;

pub use self::csv::TransactionExtractor;
pub use self::encoding::{EncodingPolicy, TextEncoding};
