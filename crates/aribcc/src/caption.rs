//! ARIB STD-B24第一編で規定される字幕のデータグループ。

use std::fmt::{self, Write};
use std::io::Read;

use crate::cursor::{ByteCursor, DATA_GROUP_MARKER};
use crate::drcs::DrcsCharacter;
use crate::eight::char::{CharSize, Control, Statement, StatementKind, TimeControlMode};
use crate::eight::decode::ResetPolicy;
use crate::error::{Error, Malformed, Result};
use crate::lang::LangCode;
use crate::session::Session;
use crate::utils::bcd_to_u64;

/// データユニット分離符号。
pub const UNIT_SEPARATOR: u8 = 0x1F;

/// データグループ識別が字幕管理データを示していれば`true`を返す。
///
/// `group_id`はデータグループ識別とデータグループバージョンを合わせた1バイトの値で、
/// A組とB組のどちらの字幕管理データも`true`となる。
#[inline]
pub fn is_management_data(group_id: u8) -> bool {
    ((group_id >> 2) & !0x20) == 0
}

/// BCDで表された36ビットの時刻。
///
/// 上位から時・分・秒を2桁ずつ、ミリ秒を3桁持つ。
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// ミリ秒に変換する。
    ///
    /// BCDとして不正な桁がある場合は`None`を返す。
    pub fn to_millis(self) -> Option<u64> {
        let hour = bcd_to_u64((self.0 >> 28) & 0xFF, 2)?;
        let minute = bcd_to_u64((self.0 >> 20) & 0xFF, 2)?;
        let second = bcd_to_u64((self.0 >> 12) & 0xFF, 2)?;
        let milli = bcd_to_u64(self.0 & 0xFFF, 3)?;
        Some(((hour * 60 + minute) * 60 + second) * 1000 + milli)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Timestamp({:02X}:{:02X}:{:02X}.{:03X})",
            (self.0 >> 28) & 0xFF,
            (self.0 >> 20) & 0xFF,
            (self.0 >> 12) & 0xFF,
            self.0 & 0xFFF
        )
    }
}

/// 表示モード。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DisplayMode {
    /// 自動表示。
    AutoDisplay,
    /// 自動非表示。
    AutoHide,
    /// 選択表示。
    Selectable,
    /// 受信時特定条件自動表示／非表示。
    ///
    /// ただし記録再生時では未定義。
    MayDisplay,
}

impl DisplayMode {
    /// 2ビットの値から`DisplayMode`を生成する。
    ///
    /// 上位ビットは無視される。
    #[inline]
    pub fn from_bits(value: u8) -> DisplayMode {
        match value & 0b11 {
            0b00 => DisplayMode::AutoDisplay,
            0b01 => DisplayMode::AutoHide,
            0b10 => DisplayMode::Selectable,
            _ => DisplayMode::MayDisplay,
        }
    }
}

/// 字幕の表示形式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CaptionFormat {
    /// 標準密度の横書。
    StandardDensityHorz,
    /// 標準密度の縦書。
    StandardDensityVert,
    /// 高密度の横書。
    HighDensityHorz,
    /// 高密度の縦書。
    HighDensityVert,
    /// 欧文の横書き。
    WesternHorz,
    /// 1920x1080の横書。
    FhdHorz,
    /// 1920x1080の縦書。
    FhdVert,
    /// 960x540の横書。
    QhdHorz,
    /// 960x540の縦書。
    QhdVert,
    /// 1280x720の横書。
    HdHorz,
    /// 1280x720の縦書。
    HdVert,
    /// 720x480の横書。
    SdHorz,
    /// 720x480の縦書。
    SdVert,
    /// 不明。
    Unknown,
}

impl CaptionFormat {
    fn from_bits(value: u8) -> CaptionFormat {
        match value & 0x0F {
            0b0000 => CaptionFormat::StandardDensityHorz,
            0b0001 => CaptionFormat::StandardDensityVert,
            0b0010 => CaptionFormat::HighDensityHorz,
            0b0011 => CaptionFormat::HighDensityVert,
            0b0100 => CaptionFormat::WesternHorz,
            0b0110 => CaptionFormat::FhdHorz,
            0b0111 => CaptionFormat::FhdVert,
            0b1000 => CaptionFormat::QhdHorz,
            0b1001 => CaptionFormat::QhdVert,
            0b1100 => CaptionFormat::HdHorz,
            0b1101 => CaptionFormat::HdVert,
            0b1010 => CaptionFormat::SdHorz,
            0b1011 => CaptionFormat::SdVert,
            _ => CaptionFormat::Unknown,
        }
    }
}

/// 字幕の文字符号化方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CaptionCharCode {
    /// 8単位符号。
    EightBit,
    /// UCSを用いる符号化方式。
    UCS,
    /// 予備。
    Reserved,
}

/// 字幕のロールアップモード。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CaptionRollupMode {
    /// 非ロールアップ。
    NonRollup,
    /// ロールアップ。
    Rollup,
    /// 予約。
    Reserved,
}

/// 字幕管理データにおける言語。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionLanguage {
    /// 言語識別（3ビット）。
    pub language_tag: u8,

    /// 受信時の表示モード。
    pub dmf_recv: DisplayMode,
    /// 記録再生時の時の表示モード。
    pub dmf_playback: DisplayMode,
    /// 表示条件指定。
    pub dc: Option<u8>,
    /// 言語コード。
    pub lang_code: LangCode,
    /// 表示形式。
    pub format: CaptionFormat,
    /// 文字符号化方式。
    pub tcs: CaptionCharCode,
    /// ロールアップモード。
    pub rollup_mode: CaptionRollupMode,
}

impl CaptionLanguage {
    /// `cursor`から`CaptionLanguage`を読み取る。
    pub fn read<R: Read>(cursor: &mut ByteCursor<R>) -> Result<CaptionLanguage> {
        let b = cursor.read_u8()?;
        let language_tag = (b & 0b11100000) >> 5;
        let dmf_recv = DisplayMode::from_bits((b & 0b00001100) >> 2);
        let dmf_playback = DisplayMode::from_bits(b & 0b00000011);

        let dc = if dmf_recv == DisplayMode::MayDisplay && dmf_playback != DisplayMode::MayDisplay
        {
            Some(cursor.read_u8()?)
        } else {
            None
        };

        let lang_code = LangCode::read(cursor)?;

        let b = cursor.read_u8()?;
        let format = CaptionFormat::from_bits((b & 0b11110000) >> 4);
        let tcs = match (b & 0b00001100) >> 2 {
            0b00 => CaptionCharCode::EightBit,
            0b01 => CaptionCharCode::UCS,
            _ => CaptionCharCode::Reserved,
        };
        let rollup_mode = match b & 0b00000011 {
            0b00 => CaptionRollupMode::NonRollup,
            0b01 => CaptionRollupMode::Rollup,
            _ => CaptionRollupMode::Reserved,
        };

        Ok(CaptionLanguage {
            language_tag,
            dmf_recv,
            dmf_playback,
            dc,
            lang_code,
            format,
            tcs,
            rollup_mode,
        })
    }
}

/// 字幕本文。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementBody {
    /// デコードされた文。
    pub statements: Vec<Statement>,
    /// 未対応の文や壊れたマクロを読み飛ばした数。
    pub skipped: usize,
    /// 途中でデコードを打ち切った場合、その原因。
    pub aborted: Option<Malformed>,
}

impl StatementBody {
    /// データユニットの中身`data`を`session`の状態でデコードする。
    ///
    /// 未対応の文や壊れたマクロは読み飛ばし、入力の符号列が壊れている場合はそこまでの文を返す。
    pub fn read(data: &[u8], session: &mut Session) -> Result<StatementBody> {
        if session.decoder.options().reset == ResetPolicy::PerStatementBody {
            session.decoder.reset();
        }

        let mut cursor = ByteCursor::new(data);
        let mut statements = Vec::new();
        let mut skipped = 0;
        let mut aborted = None;
        while (cursor.position() as usize) < data.len() || session.decoder.has_pending_macro() {
            match session.decoder.decode(&mut cursor, &mut session.cache) {
                Ok(statement) => statements.push(statement),
                Err(Error::Unimplemented { what, len }) => {
                    log::debug!("skipped unimplemented {} ({} bytes)", what, len);
                    skipped += 1;
                }
                Err(Error::MacroAborted(m)) => {
                    log::debug!("skipped broken macro: {}", m);
                    skipped += 1;
                }
                Err(Error::Exhausted { .. }) | Err(Error::Malformed(Malformed::Truncated)) => {
                    log::debug!("statement body truncated at {}", cursor.position());
                    aborted = Some(Malformed::Truncated);
                    break;
                }
                Err(Error::Malformed(m)) => {
                    log::debug!("statement body aborted at {}: {}", cursor.position(), m);
                    aborted = Some(m);
                    break;
                }
                Err(e @ Error::Io(_)) => return Err(e),
            }
        }

        Ok(StatementBody {
            statements,
            skipped,
            aborted,
        })
    }

    /// 表示される文字を文字列にする。
    ///
    /// APRは改行に、SPは文字サイズに応じて半角または全角の空白になる。
    /// DRCSなど`char`にできない文字は置換文字になる。
    pub fn text(&self) -> String {
        let mut size = CharSize::Normal;
        let mut s = String::new();
        for statement in &self.statements {
            match &statement.kind {
                StatementKind::Char(c) => {
                    let _ = write!(s, "{}", c);
                }
                StatementKind::Control(Control::ActivePositionReturn) => s.push('\n'),
                StatementKind::Control(Control::Space) => {
                    s.push(if size.is_small() { ' ' } else { '\u{3000}' })
                }
                StatementKind::Control(Control::CharSize(cs)) => size = *cs,
                StatementKind::Control(_) => {}
            }
        }
        s
    }
}

/// データユニットの中身。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataUnitBody {
    /// 本文。
    StatementBody(StatementBody),
    /// DRCSの定義。
    Drcs(Vec<DrcsCharacter>),
    /// 解釈しないデータユニット。
    Opaque(Vec<u8>),
}

/// データユニット。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUnit {
    /// データユニットパラメータ。
    pub unit_type: u8,
    /// データユニットサイズ（24ビット）。
    pub data_unit_size: u32,
    /// 中身。
    pub body: DataUnitBody,
}

impl DataUnit {
    /// 本文。
    pub const STATEMENT_BODY: u8 = 0x20;
    /// 1バイトDRCS。
    pub const DRCS_SB: u8 = 0x30;
    /// 2バイトDRCS。
    pub const DRCS_DB: u8 = 0x31;

    /// 分離符号とヘッダを含めた、データユニット全体のバイト数を返す。
    #[inline]
    pub fn size(&self) -> usize {
        self.data_unit_size as usize + 5
    }

    /// `cursor`から`DataUnit`を読み取る。
    ///
    /// DRCSの定義は`session`のキャッシュに登録される。
    pub fn read<R: Read>(cursor: &mut ByteCursor<R>, session: &mut Session) -> Result<DataUnit> {
        let unit_separator = cursor.read_u8()?;
        if unit_separator != UNIT_SEPARATOR {
            return Err(Malformed::UnitSeparator(unit_separator).into());
        }

        let unit_type = cursor.read_u8()?;
        let data_unit_size = cursor.read_be_24()?;
        let data = cursor.read_bytes(data_unit_size as usize)?;

        let body = match unit_type {
            DataUnit::STATEMENT_BODY => {
                DataUnitBody::StatementBody(StatementBody::read(&data, session)?)
            }
            DataUnit::DRCS_SB | DataUnit::DRCS_DB => {
                let mut sub = ByteCursor::new(&*data);
                let chars = DrcsCharacter::read_all(&mut sub).map_err(Error::within_region)?;
                if (sub.position() as usize) < data.len() {
                    log::debug!(
                        "{} bytes left after DRCS definitions",
                        data.len() - sub.position() as usize
                    );
                }
                session.register_drcs(&chars);
                DataUnitBody::Drcs(chars)
            }
            _ => {
                log::trace!("opaque data unit {:02X} ({} bytes)", unit_type, data.len());
                DataUnitBody::Opaque(data)
            }
        };

        Ok(DataUnit {
            unit_type,
            data_unit_size,
            body,
        })
    }

    /// 合計が`loop_length`バイトになるまで`DataUnit`を読み取る。
    pub fn read_all<R: Read>(
        cursor: &mut ByteCursor<R>,
        loop_length: u32,
        session: &mut Session,
    ) -> Result<Vec<DataUnit>> {
        let declared = loop_length as usize;
        let mut consumed = 0;
        let mut data_units = Vec::new();
        while consumed < declared {
            let data_unit = DataUnit::read(cursor, session)?;
            consumed += data_unit.size();
            data_units.push(data_unit);
        }

        if consumed != declared {
            return Err(Malformed::LengthMismatch { declared, consumed }.into());
        }
        Ok(data_units)
    }
}

/// 字幕管理データ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionManagementData {
    /// 時刻制御モード。
    pub tmd: TimeControlMode,
    /// オフセット時刻。
    pub otm: Option<Timestamp>,
    /// 言語。
    pub languages: Vec<CaptionLanguage>,
    /// データユニットループ長。
    pub data_unit_loop_length: u32,
    /// データユニット。
    pub data_units: Vec<DataUnit>,
}

impl CaptionManagementData {
    /// `cursor`から`CaptionManagementData`を読み取る。
    pub fn read<R: Read>(
        cursor: &mut ByteCursor<R>,
        session: &mut Session,
    ) -> Result<CaptionManagementData> {
        let tmd = TimeControlMode::from_bits((cursor.read_u8()? & 0b11000000) >> 6);

        let otm = if tmd == TimeControlMode::OffsetTime {
            // 36ビットのOTMと4ビットの予約
            let mut buf = [0; 8];
            cursor.read_exact(&mut buf[3..])?;
            Some(Timestamp(u64::from_be_bytes(buf) >> 4))
        } else {
            None
        };

        let num_languages = cursor.read_u8()?;
        let languages = (0..num_languages)
            .map(|_| CaptionLanguage::read(cursor))
            .collect::<Result<Vec<_>>>()?;

        let data_unit_loop_length = cursor.read_be_24()?;
        let data_units = DataUnit::read_all(cursor, data_unit_loop_length, session)?;

        Ok(CaptionManagementData {
            tmd,
            otm,
            languages,
            data_unit_loop_length,
            data_units,
        })
    }
}

/// 字幕文データ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionStatementData {
    /// 時刻制御モード。
    pub tmd: TimeControlMode,
    /// 提示開始時刻。
    pub stm: Option<Timestamp>,
    /// データユニットループ長。
    pub data_unit_loop_length: u32,
    /// データユニット。
    pub data_units: Vec<DataUnit>,
}

impl CaptionStatementData {
    /// `cursor`から`CaptionStatementData`を読み取る。
    pub fn read<R: Read>(
        cursor: &mut ByteCursor<R>,
        session: &mut Session,
    ) -> Result<CaptionStatementData> {
        let tmd = TimeControlMode::from_bits((cursor.read_u8()? & 0b11000000) >> 6);

        let (stm, data_unit_loop_length) = match tmd {
            TimeControlMode::RealTime | TimeControlMode::OffsetTime => {
                // STMと予約、ループ長をまとめて8バイトで読み、下位32ビットをループ長とする
                let d = cursor.read_be_64()?;
                (Some(Timestamp(d >> 28)), (d & 0xFFFF_FFFF) as u32)
            }
            TimeControlMode::Free | TimeControlMode::Reserved => (None, cursor.read_be_24()?),
        };

        let data_units = DataUnit::read_all(cursor, data_unit_loop_length, session)?;

        Ok(CaptionStatementData {
            tmd,
            stm,
            data_unit_loop_length,
            data_units,
        })
    }
}

/// データグループデータ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupData {
    /// 字幕管理データ。
    Management(CaptionManagementData),
    /// 字幕文データ。
    Statement(CaptionStatementData),
}

impl GroupData {
    /// データユニットを返す。
    #[inline]
    pub fn data_units(&self) -> &[DataUnit] {
        match self {
            GroupData::Management(d) => &d.data_units,
            GroupData::Statement(d) => &d.data_units,
        }
    }
}

/// データグループ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataGroup {
    /// データグループ識別（6ビット）とデータグループバージョン（2ビット）。
    pub group_id: u8,
    /// データグループリンク番号。
    pub link_number: u8,
    /// 最終データグループリンク番号。
    pub last_link_number: u8,
    /// データグループサイズ。
    pub size: u16,
    /// データグループデータ。
    pub data: GroupData,
    /// CRC。ストリーム末尾で欠けている場合は`None`となる。
    ///
    /// 値の検証は行わない。
    pub crc: Option<u16>,
}

impl DataGroup {
    /// `cursor`から`DataGroup`を読み取る。
    ///
    /// 先頭の固定値が一致しない場合は、データグループサイズを読む前に[`Malformed::BadMarker`]を返す。
    pub fn read<R: Read>(cursor: &mut ByteCursor<R>, session: &mut Session) -> Result<DataGroup> {
        let start = cursor.position();
        for (i, &expected) in DATA_GROUP_MARKER.iter().enumerate() {
            let found = cursor.read_u8()?;
            if found != expected {
                return Err(Malformed::BadMarker {
                    offset: start + i as u64,
                    expected,
                    found,
                }
                .into());
            }
        }

        let group_id = cursor.read_u8()?;
        let link_number = cursor.read_u8()?;
        let last_link_number = cursor.read_u8()?;
        let size = cursor.read_be_16()?;
        let payload = cursor.read_bytes(size as usize)?;
        let crc = cursor.read_optional_crc()?;

        let mut sub = ByteCursor::new(&*payload);
        let data = if is_management_data(group_id) {
            CaptionManagementData::read(&mut sub, session).map(GroupData::Management)
        } else {
            CaptionStatementData::read(&mut sub, session).map(GroupData::Statement)
        }
        .map_err(Error::within_region)?;

        let consumed = sub.position() as usize;
        if consumed != payload.len() {
            return Err(Malformed::LengthMismatch {
                declared: payload.len(),
                consumed,
            }
            .into());
        }

        Ok(DataGroup {
            group_id,
            link_number,
            last_link_number,
            size,
            data,
            crc,
        })
    }

    /// データグループ識別（6ビット）を返す。
    #[inline]
    pub fn data_group_id(&self) -> u8 {
        self.group_id >> 2
    }

    /// データグループバージョン（2ビット）を返す。
    #[inline]
    pub fn version(&self) -> u8 {
        self.group_id & 0b11
    }

    /// 字幕管理データであれば`true`を返す。
    #[inline]
    pub fn is_management_data(&self) -> bool {
        is_management_data(self.group_id)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use hex_literal::hex;

    use crate::eight::char::{Character, GraphicCode};
    use crate::session;

    /// データユニットを組み立てる。
    pub fn data_unit(unit_type: u8, body: &[u8]) -> Vec<u8> {
        let mut unit = vec![UNIT_SEPARATOR, unit_type];
        unit.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
        unit.extend_from_slice(body);
        unit
    }

    /// TMDがフリーの字幕文データを組み立てる。
    pub fn statement_data(units: &[u8]) -> Vec<u8> {
        let mut payload = vec![0x3F];
        payload.extend_from_slice(&(units.len() as u32).to_be_bytes()[1..]);
        payload.extend_from_slice(units);
        payload
    }

    /// データグループを組み立てる。
    pub fn data_group(group_id: u8, payload: &[u8]) -> Vec<u8> {
        let mut group = DATA_GROUP_MARKER.to_vec();
        group.extend_from_slice(&[group_id, 0x00, 0x00]);
        group.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        group.extend_from_slice(payload);
        group.extend_from_slice(&[0xAB, 0xCD]);
        group
    }

    fn session() -> Session {
        Session::new(session::Options::default())
    }

    fn read(data: &[u8]) -> Result<DataGroup> {
        DataGroup::read(&mut ByteCursor::new(data), &mut session())
    }

    #[test]
    fn test_is_management_data() {
        for group_id in 0..=0xFF_u8 {
            let expected = matches!(group_id >> 2, 0x00 | 0x20);
            assert_eq!(is_management_data(group_id), expected, "{:02X}", group_id);
        }
    }

    #[test]
    fn test_data_unit_size() {
        for data_unit_size in [0, 1, 5, 0xFFFF, 0xFF_FFFF] {
            let unit = DataUnit {
                unit_type: 0x40,
                data_unit_size,
                body: DataUnitBody::Opaque(Vec::new()),
            };
            assert_eq!(unit.size(), data_unit_size as usize + 5);
        }

        let data = data_unit(0x40, &hex!("01 02 03"));
        let mut cursor = ByteCursor::new(&*data);
        let unit = DataUnit::read(&mut cursor, &mut session()).unwrap();
        assert_eq!(unit.size(), data.len());
        assert_eq!(unit.body, DataUnitBody::Opaque(vec![1, 2, 3]));
    }

    #[test]
    fn test_timestamp() {
        assert_eq!(Timestamp(0x0_01_2A_45_678).to_millis(), None);
        assert_eq!(Timestamp(0x0_01_23_45_678).to_millis(), Some(5_025_678));
        assert_eq!(Timestamp(0).to_millis(), Some(0));
        assert_eq!(
            format!("{:?}", Timestamp(0x0_01_23_45_678)),
            "Timestamp(01:23:45.678)"
        );
    }

    #[test]
    fn test_statement_group() {
        let body = hex!("3B 7A 1C 45 4A 0C");
        let data = data_group(0x04, &statement_data(&data_unit(0x20, &body)));
        let mut cursor = ByteCursor::new(&*data);
        let group = DataGroup::read(&mut cursor, &mut session()).unwrap();
        assert_eq!(cursor.position(), data.len() as u64);

        assert_eq!(group.data_group_id(), 1);
        assert_eq!(group.version(), 0);
        assert!(!group.is_management_data());
        assert_eq!(group.crc, Some(0xABCD));

        let GroupData::Statement(sd) = &group.data else {
            panic!("not a statement: {:?}", group.data);
        };
        assert_eq!(sd.tmd, TimeControlMode::Free);
        assert_eq!(sd.stm, None);
        assert_eq!(sd.data_unit_loop_length as usize, body.len() + 5);
        assert_eq!(sd.data_units.len(), 1);

        let DataUnitBody::StatementBody(sb) = &sd.data_units[0].body else {
            panic!("not a statement body");
        };
        assert_eq!(sb.statements.len(), 3);
        assert_eq!(
            sb.statements[0].as_char(),
            Some(&Character::Kanji(GraphicCode::new(0x3B), GraphicCode::new(0x7A)))
        );
        assert_eq!(
            sb.statements[1].as_control(),
            Some(&Control::ActivePositionSet { row: 5, col: 10 })
        );
        assert_eq!(sb.statements[2].as_control(), Some(&Control::ClearScreen));
        assert_eq!(
            sb.statements.iter().map(|s| s.len).sum::<usize>(),
            body.len()
        );
        assert_eq!(sb.aborted, None);
    }

    #[test]
    fn test_management_group() {
        let mut payload = hex!("BF 0000000000 02").to_vec();
        // 言語1：DMF=1101でDCあり
        payload.extend_from_slice(&hex!("2D 77 6A706E 95"));
        // 言語2
        payload.extend_from_slice(&hex!("00 656E67 01"));
        let unit = data_unit(0x40, &[]);
        payload.extend_from_slice(&(unit.len() as u32).to_be_bytes()[1..]);
        payload.extend_from_slice(&unit);

        // OTMは01:02:03.456
        payload[1..6].copy_from_slice(&hex!("0102034560"));

        let group = read(&data_group(0x80, &payload)).unwrap();
        assert!(group.is_management_data());
        let GroupData::Management(md) = &group.data else {
            panic!("not management data");
        };
        assert_eq!(md.tmd, TimeControlMode::OffsetTime);
        assert_eq!(md.otm, Some(Timestamp(0x0_01_02_03_456)));
        assert_eq!(md.otm.and_then(Timestamp::to_millis), Some(3_723_456));
        assert_eq!(md.languages.len(), 2);

        let lang = &md.languages[0];
        assert_eq!(lang.language_tag, 1);
        assert_eq!(lang.dmf_recv, DisplayMode::MayDisplay);
        assert_eq!(lang.dmf_playback, DisplayMode::AutoHide);
        assert_eq!(lang.dc, Some(0x77));
        assert_eq!(lang.lang_code, LangCode::JPN);
        assert_eq!(lang.format, CaptionFormat::QhdVert);
        assert_eq!(lang.tcs, CaptionCharCode::UCS);
        assert_eq!(lang.rollup_mode, CaptionRollupMode::Rollup);

        let lang = &md.languages[1];
        assert_eq!(lang.dc, None);
        assert_eq!(lang.lang_code, LangCode::ENG);
        assert_eq!(lang.format, CaptionFormat::StandardDensityHorz);
        assert_eq!(lang.tcs, CaptionCharCode::EightBit);

        assert_eq!(group.data.data_units().len(), 1);
    }

    #[test]
    fn test_realtime_stm() {
        let unit = data_unit(0x40, &hex!("AA"));
        let mut payload = hex!("40 0123456700000006").to_vec();
        payload.extend_from_slice(&unit);

        let group = read(&data_group(0x04, &payload)).unwrap();
        let GroupData::Statement(sd) = &group.data else {
            panic!("not a statement");
        };
        assert_eq!(sd.tmd, TimeControlMode::RealTime);
        assert_eq!(sd.stm, Some(Timestamp(0x0_01_23_45_670)));
        assert_eq!(sd.stm.and_then(Timestamp::to_millis), Some(5_025_670));
        assert_eq!(sd.data_unit_loop_length, 6);
        assert_eq!(sd.data_units.len(), 1);
    }

    #[test]
    fn test_stm_overlaps_loop_length() {
        // ループ長は8バイトの下位32ビットなので、STMの最後の桁と予約ビットも含まれる
        for header in [hex!("40 0123456780000006"), hex!("80 012345670F000006")] {
            let mut payload = header.to_vec();
            payload.extend_from_slice(&data_unit(0x40, &hex!("AA")));
            assert_matches!(
                read(&data_group(0x04, &payload)),
                Err(Error::Malformed(Malformed::Truncated))
            );
        }
    }

    #[test]
    fn test_size_mismatch() {
        // データグループサイズが実際の中身より1バイト長い
        let mut payload = statement_data(&data_unit(0x20, &hex!("A2")));
        payload.push(0x00);
        assert_matches!(
            read(&data_group(0x04, &payload)),
            Err(Error::Malformed(Malformed::LengthMismatch {
                declared: 11,
                consumed: 10
            }))
        );

        // データユニットがループ長を超える
        let mut payload = statement_data(&data_unit(0x20, &hex!("A2 A4")));
        payload[3] = 5;
        assert_matches!(
            read(&data_group(0x04, &payload)),
            Err(Error::Malformed(Malformed::LengthMismatch {
                declared: 5,
                consumed: 7
            }))
        );

        // データユニットがデータグループからはみ出す
        let mut payload = statement_data(&data_unit(0x20, &hex!("A2 A4")));
        payload[8] = 0x10;
        assert_matches!(
            read(&data_group(0x04, &payload)),
            Err(Error::Malformed(Malformed::Truncated))
        );
    }

    #[test]
    fn test_bad_marker() {
        let mut data = data_group(0x04, &statement_data(&data_unit(0x20, &hex!("A2"))));
        data[1] = 0x00;

        let mut cursor = ByteCursor::new(&*data);
        assert_matches!(
            DataGroup::read(&mut cursor, &mut session()),
            Err(Error::Malformed(Malformed::BadMarker {
                offset: 1,
                expected: 0xFF,
                found: 0x00
            }))
        );
        // データグループサイズは読まれていない
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn test_bad_unit_separator() {
        let mut units = data_unit(0x20, &hex!("A2"));
        units[0] = 0x1E;
        assert_matches!(
            read(&data_group(0x04, &statement_data(&units))),
            Err(Error::Malformed(Malformed::UnitSeparator(0x1E)))
        );
    }

    #[test]
    fn test_missing_crc() {
        let mut data = data_group(0x04, &statement_data(&data_unit(0x20, &hex!("A2"))));
        data.truncate(data.len() - 1);
        let group = read(&data).unwrap();
        assert_eq!(group.crc, None);

        // 中身が欠けているのは終端
        data.truncate(data.len() - 3);
        assert_matches!(read(&data), Err(Error::Exhausted { .. }));
    }

    #[test]
    fn test_statement_body_aborted() {
        // 不明なエスケープシーケンスの後は読まない
        let units = data_unit(0x20, &hex!("A2 1B 40 A4"));
        let group = read(&data_group(0x04, &statement_data(&units))).unwrap();
        let DataUnitBody::StatementBody(sb) = &group.data.data_units()[0].body else {
            panic!("not a statement body");
        };
        assert_eq!(sb.statements.len(), 1);
        assert_matches!(&sb.aborted, Some(Malformed::Escape(_)));

        // 漢字の途中で終わる
        let units = data_unit(0x20, &hex!("A2 3B"));
        let group = read(&data_group(0x04, &statement_data(&units))).unwrap();
        let DataUnitBody::StatementBody(sb) = &group.data.data_units()[0].body else {
            panic!("not a statement body");
        };
        assert_eq!(sb.statements.len(), 1);
        assert_eq!(sb.aborted, Some(Malformed::Truncated));
    }

    #[test]
    fn test_statement_body_skips_unimplemented() {
        // G1にモザイクAを指示してLS1、1文字読み飛ばしてLS0
        let mut session = session();
        let body = StatementBody::read(&hex!("1B 29 32 0E 21 0F A2"), &mut session).unwrap();
        assert_eq!(body.skipped, 1);
        assert_eq!(body.statements.len(), 4);
        assert_eq!(body.aborted, None);
    }

    #[test]
    fn test_statement_body_skips_broken_macro() {
        // マクロ0x21の中身がESCだけで終わっている
        let mut session = session();
        let body = StatementBody::read(&hex!("95 41 21 1B 95 4F A2"), &mut session).unwrap();
        assert_eq!(body.skipped, 1);
        assert_eq!(body.aborted, None);
        assert_eq!(body.statements.len(), 2);
        assert_eq!(body.text(), "あ");
        assert!(!session.decoder().has_pending_macro());
    }

    #[test]
    fn test_text() {
        let mut session = session();
        let body =
            StatementBody::read(&hex!("A2 20 A4 0D 88 0E 41 20 42 1B 29 20 41 21"), &mut session)
                .unwrap();
        assert_eq!(body.text(), "あ\u{3000}い\nA B\u{FFFD}");
    }
}
