//! ARIB STD-B24に基づいた字幕のデータグループを読み込み、8単位符号をデコードするためのクレート。

#![deny(missing_docs)]

pub mod caption;
pub mod cursor;
pub mod drcs;
pub mod eight;
pub mod error;
pub mod lang;
pub mod session;
mod utils;

pub use caption::DataGroup;
pub use cursor::ByteCursor;
pub use drcs::DrcsCache;
pub use eight::decode::Decoder;
pub use error::{Error, Malformed, Result};
pub use session::Session;
