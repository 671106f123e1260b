//! 字幕データの読み取りで発生するエラー。

use std::io;

use arrayvec::ArrayVec;
use thiserror::Error;

/// [`Result`](std::result::Result)の別名。
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// 字幕データの読み取りやデコードで発生するエラー。
#[derive(Debug, Error)]
pub enum Error {
    /// 要求したバイト数より残りのバイト数が少ない。
    ///
    /// ストリームの終端に到達したことを示し、データの破損とは区別される。
    #[error("exhausted: wanted {wanted} bytes but only {available} available")]
    Exhausted {
        /// 要求したバイト数。
        wanted: usize,
        /// 実際に読み取れたバイト数。
        available: usize,
    },

    /// コンテナや符号列が壊れている。
    ///
    /// 呼び出し側は[`ByteCursor::resync`](crate::cursor::ByteCursor::resync)で
    /// 次のデータグループまで読み飛ばして再開できる。
    #[error("malformed container: {0}")]
    Malformed(#[from] Malformed),

    /// 構造としては認識できるが未対応の符号集合や制御符号。
    ///
    /// `len`バイトは既に読み取られているため、呼び出し側はそのまま次を読み取れる。
    #[error("unimplemented: {what} ({len} bytes skipped)")]
    Unimplemented {
        /// 未対応のものの名前。
        what: &'static str,
        /// 読み取り済みのバイト数。
        len: usize,
    },

    /// 実行中のマクロの符号列が壊れていた。
    ///
    /// マクロは破棄されており、入力からは何も読み取っていないため続けてデコードできる。
    #[error("macro aborted: {0}")]
    MacroAborted(Malformed),

    /// 下位の入力で発生したエラー。
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

/// [`Error::Malformed`]の詳細。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Malformed {
    /// 固定値であるべきバイトが一致しない。
    #[error("bad marker at {offset}: expected {expected:#04X}, found {found:#04X}")]
    BadMarker {
        /// ストリーム先頭からの位置。
        offset: u64,
        /// 期待した値。
        expected: u8,
        /// 実際の値。
        found: u8,
    },

    /// データユニット分離符号が`0x1F`ではない。
    #[error("bad unit separator {0:#04X}")]
    UnitSeparator(u8),

    /// 宣言された長さと実際に消費した長さが一致しない。
    #[error("length mismatch: declared {declared}, consumed {consumed}")]
    LengthMismatch {
        /// 宣言された長さ。
        declared: usize,
        /// 実際に消費した長さ。
        consumed: usize,
    },

    /// 解釈できないエスケープシーケンス。
    ///
    /// ESCに続いて読み取ったバイト列を保持する。
    #[error("unresolvable escape sequence {0:02X?}")]
    Escape(ArrayVec<u8, 4>),

    /// 図形符号であるべき位置に範囲外の値がある。
    #[error("byte {0:#04X} is not a graphic code")]
    GraphicCode(u8),

    /// マクロ定義の中で更にマクロ定義が始まった。
    #[error("nested macro definition")]
    NestedMacro,

    /// 長さで区切られた領域の途中で構造が終わっていない。
    #[error("structure truncated by its enclosing length")]
    Truncated,
}

impl Error {
    /// ストリームの終端に到達したことによるエラーであれば`true`を返す。
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Error::Exhausted { .. })
    }

    /// データの破損によるエラーであれば`true`を返す。
    #[inline]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Error::Malformed(_))
    }

    /// 未対応の符号によるエラーであれば`true`を返す。
    #[inline]
    pub fn is_unimplemented(&self) -> bool {
        matches!(self, Error::Unimplemented { .. })
    }

    /// 続けてデコードできるエラーであれば`true`を返す。
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Unimplemented { .. } | Error::MacroAborted(_))
    }

    /// 長さで区切られた領域内で発生した終端エラーを[`Malformed::Truncated`]に変換する。
    ///
    /// 外側の長さが既に読み取れている以上、その内側での終端はストリームの終わりではなく破損である。
    pub(crate) fn within_region(self) -> Error {
        match self {
            Error::Exhausted { .. } => Error::Malformed(Malformed::Truncated),
            e => e,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_predicates() {
        let e = Error::Exhausted {
            wanted: 2,
            available: 1,
        };
        assert!(e.is_exhausted());
        assert!(!e.is_malformed());

        let e = Error::from(Malformed::UnitSeparator(0x00));
        assert!(e.is_malformed());
        assert!(!e.is_unimplemented());

        let e = Error::Unimplemented {
            what: "MosaicA",
            len: 1,
        };
        assert!(e.is_unimplemented());
        assert!(e.is_recoverable());
        assert!(!e.is_exhausted());

        let e = Error::MacroAborted(Malformed::Truncated);
        assert!(e.is_recoverable());
        assert!(!e.is_malformed());
        assert!(!Error::from(Malformed::Truncated).is_recoverable());
    }

    #[test]
    fn test_within_region() {
        let e = Error::Exhausted {
            wanted: 3,
            available: 0,
        };
        assert_matches!(
            e.within_region(),
            Error::Malformed(Malformed::Truncated)
        );

        let e = Error::Unimplemented {
            what: "MosaicA",
            len: 1,
        };
        assert_matches!(e.within_region(), Error::Unimplemented { len: 1, .. });
    }

    #[test]
    fn test_display() {
        let e = Error::from(Malformed::BadMarker {
            offset: 1,
            expected: 0xFF,
            found: 0x00,
        });
        assert_eq!(
            e.to_string(),
            "malformed container: bad marker at 1: expected 0xFF, found 0x00"
        );
    }
}
