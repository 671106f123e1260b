//! 複数のデータグループにまたがるデコードの状態。

use std::io::Read;

use crate::caption::DataGroup;
use crate::cursor::ByteCursor;
use crate::drcs::{DrcsCache, DrcsCharacter};
use crate::eight::decode::{self, Decoder};
use crate::error::Result;

/// [`Session`]の設定。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// 8単位符号のデコードに関する設定。
    pub decode: decode::Options,
    /// DRCSキャッシュの容量。
    pub drcs_capacity: usize,
    /// DRCSの定義を受け取るたびに`info`レベルでログを出力する。
    pub report_drcs: bool,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            decode: decode::Options::default(),
            drcs_capacity: DrcsCache::DEFAULT_CAPACITY,
            report_drcs: false,
        }
    }
}

/// 1本の字幕ストリームをデコードするための状態。
///
/// 符号の指示や定義されたマクロ、DRCSのキャッシュはデータグループをまたいで保持される。
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) decoder: Decoder,
    pub(crate) cache: DrcsCache,
    report_drcs: bool,
}

impl Session {
    /// `options`に従って`Session`を生成する。
    pub fn new(options: Options) -> Session {
        Session {
            decoder: Decoder::new(options.decode),
            cache: DrcsCache::with_capacity(options.drcs_capacity),
            report_drcs: options.report_drcs,
        }
    }

    /// 8単位符号のデコーダー。
    #[inline]
    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// 8単位符号のデコーダー。
    #[inline]
    pub fn decoder_mut(&mut self) -> &mut Decoder {
        &mut self.decoder
    }

    /// DRCSのキャッシュ。
    #[inline]
    pub fn cache(&self) -> &DrcsCache {
        &self.cache
    }

    /// DRCSのキャッシュ。
    #[inline]
    pub fn cache_mut(&mut self) -> &mut DrcsCache {
        &mut self.cache
    }

    /// `cursor`からデータグループを1つ読み取る。
    #[inline]
    pub fn read_data_group<R: Read>(&mut self, cursor: &mut ByteCursor<R>) -> Result<DataGroup> {
        DataGroup::read(cursor, self)
    }

    /// `cursor`の終端までデータグループを読み取るイテレーターを返す。
    ///
    /// 壊れたデータグループはエラーとして返した後、次のデータグループの先頭まで読み飛ばす。
    pub fn data_groups<'a, R: Read>(
        &'a mut self,
        cursor: &'a mut ByteCursor<R>,
    ) -> DataGroups<'a, R> {
        DataGroups {
            session: self,
            cursor,
            resync: false,
            done: false,
        }
    }

    /// DRCSの定義をキャッシュに登録する。
    ///
    /// 1つの符号に複数のパターンがある場合、最初のものだけを登録する。
    pub(crate) fn register_drcs(&mut self, chars: &[DrcsCharacter]) {
        for c in chars {
            let Some(glyph) = c.fonts.first() else {
                log::debug!("DRCS-{} {:04X} has no font", c.set, c.code);
                continue;
            };

            if self.report_drcs {
                log::info!(
                    "DRCS-{} {:04X}: {}x{} depth={} ({} fonts)",
                    c.set,
                    c.code,
                    glyph.width,
                    glyph.height,
                    glyph.depth,
                    c.fonts.len()
                );
            }
            self.cache.put(c.set, c.code, glyph.clone());
        }
    }
}

impl Default for Session {
    fn default() -> Session {
        Session::new(Options::default())
    }
}

/// [`Session::data_groups`]で返されるイテレーター。
pub struct DataGroups<'a, R> {
    session: &'a mut Session,
    cursor: &'a mut ByteCursor<R>,
    resync: bool,
    done: bool,
}

impl<'a, R: Read> Iterator for DataGroups<'a, R> {
    type Item = Result<DataGroup>;

    fn next(&mut self) -> Option<Result<DataGroup>> {
        if self.done {
            return None;
        }

        if std::mem::take(&mut self.resync) {
            match self.cursor.resync() {
                Ok(0) => {}
                Ok(skipped) => log::debug!("skipped {} bytes to the next data group", skipped),
                Err(e) if e.is_exhausted() => {
                    log::debug!("no more data group");
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }

        let start = self.cursor.position();
        match self.session.read_data_group(self.cursor) {
            Ok(group) => Some(Ok(group)),
            Err(e) if e.is_exhausted() && self.cursor.position() == start => {
                self.done = true;
                None
            }
            Err(e) if e.is_malformed() => {
                log::warn!("malformed data group at {}: {}", start, e);
                self.resync = true;
                Some(Err(e))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use hex_literal::hex;

    use crate::caption::tests::{data_group, data_unit, statement_data};
    use crate::caption::{DataUnitBody, GroupData};
    use crate::eight::char::{Character, StatementKind};
    use crate::error::{Error, Malformed};

    fn statement_group(body: &[u8]) -> Vec<u8> {
        data_group(0x04, &statement_data(&data_unit(0x20, body)))
    }

    fn statement_body(group: &DataGroup) -> &crate::caption::StatementBody {
        match &group.data.data_units()[0].body {
            DataUnitBody::StatementBody(sb) => sb,
            body => panic!("not a statement body: {:?}", body),
        }
    }

    #[test]
    fn test_data_groups() {
        let mut data = statement_group(&hex!("A2"));
        data.extend_from_slice(&hex!("80 00"));
        data.extend_from_slice(&statement_group(&hex!("A4")));

        let mut session = Session::default();
        let mut cursor = ByteCursor::new(&*data);
        let groups = session.data_groups(&mut cursor).collect::<Vec<_>>();
        assert_eq!(groups.len(), 3);
        assert_eq!(statement_body(groups[0].as_ref().unwrap()).text(), "あ");
        assert_matches!(
            &groups[1],
            Err(Error::Malformed(Malformed::BadMarker { found: 0x00, .. }))
        );
        assert_eq!(statement_body(groups[2].as_ref().unwrap()).text(), "い");
    }

    #[test]
    fn test_data_groups_truncated() {
        let mut data = statement_group(&hex!("A2"));
        data.extend_from_slice(&hex!("80 FF F0 04"));

        let mut session = Session::default();
        let mut cursor = ByteCursor::new(&*data);
        let mut groups = session.data_groups(&mut cursor);
        assert_matches!(groups.next(), Some(Ok(_)));
        assert_matches!(groups.next(), Some(Err(Error::Exhausted { .. })));
        assert_matches!(groups.next(), None);
    }

    #[test]
    fn test_state_persists() {
        let mut session = Session::default();

        // 1つ目の字幕文でG0に平仮名を指示する
        let data = statement_group(&hex!("1B 28 30"));
        session.read_data_group(&mut ByteCursor::new(&*data)).unwrap();

        let data = statement_group(&hex!("22"));
        let group = session.read_data_group(&mut ByteCursor::new(&*data)).unwrap();
        assert_eq!(statement_body(&group).text(), "あ");
    }

    #[test]
    fn test_reset_per_statement_body() {
        let mut session = Session::new(Options {
            decode: decode::Options::CAPTION.with_reset(decode::ResetPolicy::PerStatementBody),
            ..Options::default()
        });

        let data = statement_group(&hex!("1B 28 30"));
        session.read_data_group(&mut ByteCursor::new(&*data)).unwrap();

        // G0は漢字に戻っている
        let data = statement_group(&hex!("3B 7A"));
        let group = session.read_data_group(&mut ByteCursor::new(&*data)).unwrap();
        assert_matches!(
            statement_body(&group).statements[0].kind,
            StatementKind::Char(Character::Kanji(..))
        );
    }

    #[test]
    fn test_drcs_unit() {
        let mut session = Session::new(Options {
            report_drcs: true,
            ..Options::default()
        });

        // DRCS-1の0x21に2x2の1ビットパターン、2つ目のフォントは登録されない
        let drcs = hex!("01 4121 02 01 01 02 02 C0 11 01 02 02 00");
        let units = [
            data_unit(0x30, &drcs),
            data_unit(0x20, &hex!("1B 29 20 41 0E 21")),
        ]
        .concat();
        let mut data = data_group(0x04, &statement_data(&units));
        data.extend_from_slice(&statement_group(&hex!("21")));

        let mut cursor = ByteCursor::new(&*data);
        let group = session.read_data_group(&mut cursor).unwrap();
        let GroupData::Statement(sd) = &group.data else {
            panic!("not a statement");
        };
        let DataUnitBody::Drcs(chars) = &sd.data_units[0].body else {
            panic!("not DRCS");
        };
        assert_eq!(chars.len(), 1);
        assert_eq!((chars[0].set, chars[0].code), (1, 0x21));
        assert_eq!(chars[0].fonts.len(), 2);
        assert_eq!(session.cache().len(), 1);

        let glyph = session.cache_mut().get(1, 0x21).unwrap();
        assert_eq!(glyph.font_id, 0);
        assert_eq!(glyph.pixels(), Some(vec![1, 1, 0, 0]));

        let sb = match &sd.data_units[1].body {
            DataUnitBody::StatementBody(sb) => sb,
            body => panic!("not a statement body: {:?}", body),
        };
        let Some(StatementKind::Char(Character::Drcs(r))) = sb.statements.last().map(|s| &s.kind)
        else {
            panic!("not DRCS");
        };
        assert!(r.glyph.is_some());

        // 次のデータグループでも参照できる
        let group = session.read_data_group(&mut cursor).unwrap();
        assert_matches!(
            &statement_body(&group).statements[0].kind,
            StatementKind::Char(Character::Drcs(r)) if r.glyph.is_some()
        );
    }
}
