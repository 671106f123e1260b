//! 字幕管理データで使用される言語コード。

use std::fmt;
use std::io::Read;

use crate::cursor::ByteCursor;
use crate::error::Result;

/// ISO 639-2で規定される3文字の言語コード。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LangCode(pub [u8; 3]);

// ARIB TR-B14より。
impl LangCode {
    /// 日本語。
    pub const JPN: LangCode = LangCode(*b"jpn");
    /// 英語。
    pub const ENG: LangCode = LangCode(*b"eng");
    /// ドイツ語。
    pub const DEU: LangCode = LangCode(*b"deu");
    /// フランス語。
    pub const FRA: LangCode = LangCode(*b"fra");
    /// イタリア語。
    pub const ITA: LangCode = LangCode(*b"ita");
    /// ロシア語。
    pub const RUS: LangCode = LangCode(*b"rus");
    /// 中国語。
    pub const ZHO: LangCode = LangCode(*b"zho");
    /// 韓国語。
    pub const KOR: LangCode = LangCode(*b"kor");
    /// スペイン語。
    pub const SPA: LangCode = LangCode(*b"spa");
    /// 外国語。
    pub const ETC: LangCode = LangCode(*b"etc");

    /// `cursor`から3バイトの言語コードを読み取る。
    pub fn read<R: Read>(cursor: &mut ByteCursor<R>) -> Result<LangCode> {
        let mut code = [0; 3];
        cursor.read_exact(&mut code)?;
        if !code.is_ascii() {
            log::debug!("non-ASCII language code: {:02X?}", code);
        }
        Ok(LangCode(code))
    }

    /// ASCIIであれば文字列として返す。
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        if self.0.is_ascii() {
            std::str::from_utf8(&self.0).ok()
        } else {
            None
        }
    }
}

impl fmt::Display for LangCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0.escape_ascii(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read() {
        let mut cursor = ByteCursor::new(&b"jpnX"[..]);
        assert_eq!(LangCode::read(&mut cursor).unwrap(), LangCode::JPN);
        assert_eq!(cursor.position(), 3);
        assert!(LangCode::read(&mut cursor).unwrap_err().is_exhausted());
    }

    #[test]
    fn test_display() {
        assert_eq!(LangCode::ENG.to_string(), "eng");
        assert_eq!(LangCode(*b"a\xFFb").to_string(), "a\\xffb");
        assert_eq!(LangCode::ETC.as_str(), Some("etc"));
        assert_eq!(LangCode(*b"a\xFFb").as_str(), None);
    }
}
