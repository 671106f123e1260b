//! 制御符号表と、制御符号に続くパラメータの読み取り。

use std::io::Read;

use arrayvec::ArrayVec;

use super::char::{
    CharSize, Color, Control, Csi, Flashing, FontStyle, GraphicCode, InvocationArea, Ornament,
    Polarity, Time, TimeControlMode, WritingFormat, WritingMode,
};
use super::decode::{Designator, GraphicSet};
use crate::cursor::ByteCursor;
use crate::error::{Malformed, Result};

/// C0およびC1の制御符号。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ControlCode {
    /// 空白。
    Nul = 0x00,
    /// ベル。
    Bel = 0x07,
    /// 動作位置後退。
    Apb = 0x08,
    /// 動作位置前進。
    Apf = 0x09,
    /// 動作行前進。
    Apd = 0x0A,
    /// 動作行後退。
    Apu = 0x0B,
    /// 画面消去。
    Cs = 0x0C,
    /// 動作位置改行。
    Apr = 0x0D,
    /// G1をGLに呼び出す。
    Ls1 = 0x0E,
    /// G0をGLに呼び出す。
    Ls0 = 0x0F,
    /// 指定動作位置前進。
    Papf = 0x16,
    /// 取消。
    Can = 0x18,
    /// シングルシフト2。
    Ss2 = 0x19,
    /// エスケープ。
    Esc = 0x1B,
    /// 動作位置指定。
    Aps = 0x1C,
    /// シングルシフト3。
    Ss3 = 0x1D,
    /// データヘッダ識別符号。
    Rs = 0x1E,
    /// データユニット識別符号。
    Us = 0x1F,
    /// スペース。
    Sp = 0x20,
    /// デリート。
    Del = 0x7F,
    /// 前景色黒。
    Bkf = 0x80,
    /// 前景色赤。
    Rdf = 0x81,
    /// 前景色緑。
    Gff = 0x82,
    /// 前景色黄。
    Ylf = 0x83,
    /// 前景色青。
    Blf = 0x84,
    /// 前景色マゼンタ。
    Mgf = 0x85,
    /// 前景色シアン。
    Cnf = 0x86,
    /// 前景色白。
    Whf = 0x87,
    /// 小型サイズ。
    Ssz = 0x88,
    /// 中型サイズ。
    Msz = 0x89,
    /// 標準サイズ。
    Nsz = 0x8A,
    /// 指定サイズ。
    Szx = 0x8B,
    /// 色指定。
    Col = 0x90,
    /// フラッシング制御。
    Flc = 0x91,
    /// コンシール制御。
    Cdc = 0x92,
    /// パターン極性。
    Pol = 0x93,
    /// 書込みモード変更。
    Wmm = 0x94,
    /// マクロ指定。
    Macro = 0x95,
    /// 囲み制御。
    Hlc = 0x97,
    /// 文字繰り返し。
    Rpc = 0x98,
    /// アンダーライン終了およびモザイク分離終了。
    Spl = 0x99,
    /// アンダーライン開始およびモザイク分離開始。
    Stl = 0x9A,
    /// コントロールシーケンスイントロデューサ。
    Csi = 0x9B,
    /// 時間制御。
    Time = 0x9D,
}

impl ControlCode {
    /// `b`に対応する制御符号を返す。
    ///
    /// 制御符号表にない値の場合は`None`を返す。
    pub fn from_byte(b: u8) -> Option<ControlCode> {
        let code = match b {
            0x00 => ControlCode::Nul,
            0x07 => ControlCode::Bel,
            0x08 => ControlCode::Apb,
            0x09 => ControlCode::Apf,
            0x0A => ControlCode::Apd,
            0x0B => ControlCode::Apu,
            0x0C => ControlCode::Cs,
            0x0D => ControlCode::Apr,
            0x0E => ControlCode::Ls1,
            0x0F => ControlCode::Ls0,
            0x16 => ControlCode::Papf,
            0x18 => ControlCode::Can,
            0x19 => ControlCode::Ss2,
            0x1B => ControlCode::Esc,
            0x1C => ControlCode::Aps,
            0x1D => ControlCode::Ss3,
            0x1E => ControlCode::Rs,
            0x1F => ControlCode::Us,
            0x20 => ControlCode::Sp,
            0x7F => ControlCode::Del,
            0x80 => ControlCode::Bkf,
            0x81 => ControlCode::Rdf,
            0x82 => ControlCode::Gff,
            0x83 => ControlCode::Ylf,
            0x84 => ControlCode::Blf,
            0x85 => ControlCode::Mgf,
            0x86 => ControlCode::Cnf,
            0x87 => ControlCode::Whf,
            0x88 => ControlCode::Ssz,
            0x89 => ControlCode::Msz,
            0x8A => ControlCode::Nsz,
            0x8B => ControlCode::Szx,
            0x90 => ControlCode::Col,
            0x91 => ControlCode::Flc,
            0x92 => ControlCode::Cdc,
            0x93 => ControlCode::Pol,
            0x94 => ControlCode::Wmm,
            0x95 => ControlCode::Macro,
            0x97 => ControlCode::Hlc,
            0x98 => ControlCode::Rpc,
            0x99 => ControlCode::Spl,
            0x9A => ControlCode::Stl,
            0x9B => ControlCode::Csi,
            0x9D => ControlCode::Time,
            _ => return None,
        };
        Some(code)
    }

    /// 制御符号の値を返す。
    #[inline]
    pub fn byte(self) -> u8 {
        self as u8
    }

    /// 制御符号に続くパラメータを`cursor`から読み取り、[`Control`]を生成する。
    ///
    /// パラメータが規定外の場合は[`Control::Unknown`]を返す。
    pub fn read<R: Read>(self, cursor: &mut ByteCursor<R>) -> Result<Control> {
        let control = match self {
            ControlCode::Nul => Control::Null,
            ControlCode::Bel => Control::Bell,
            ControlCode::Apb => Control::ActivePositionBackward,
            ControlCode::Apf => Control::ActivePositionForward,
            ControlCode::Apd => Control::ActivePositionDown,
            ControlCode::Apu => Control::ActivePositionUp,
            ControlCode::Cs => Control::ClearScreen,
            ControlCode::Apr => Control::ActivePositionReturn,
            ControlCode::Ls1 => Control::LockingShift {
                area: InvocationArea::Gl,
                register: Designator::G1,
            },
            ControlCode::Ls0 => Control::LockingShift {
                area: InvocationArea::Gl,
                register: Designator::G0,
            },
            ControlCode::Papf => {
                Control::ParameterizedActivePositionForward(cursor.read_u8()? & 0x3F)
            }
            ControlCode::Can => Control::Cancel,
            ControlCode::Ss2 => Control::SingleShift(Designator::G2),
            ControlCode::Esc => read_esc(cursor)?,
            ControlCode::Aps => {
                let row = cursor.read_u8()? & 0x3F;
                let col = cursor.read_u8()? & 0x3F;
                Control::ActivePositionSet { row, col }
            }
            ControlCode::Ss3 => Control::SingleShift(Designator::G3),
            ControlCode::Rs => Control::RecordSeparator,
            ControlCode::Us => Control::UnitSeparator,
            ControlCode::Sp => Control::Space,
            ControlCode::Del => Control::Delete,

            ControlCode::Bkf
            | ControlCode::Rdf
            | ControlCode::Gff
            | ControlCode::Ylf
            | ControlCode::Blf
            | ControlCode::Mgf
            | ControlCode::Cnf
            | ControlCode::Whf => Control::Color(Color::Foreground(self.byte() & 0x07)),

            ControlCode::Ssz => Control::CharSize(CharSize::Small),
            ControlCode::Msz => Control::CharSize(CharSize::Medium),
            ControlCode::Nsz => Control::CharSize(CharSize::Normal),
            ControlCode::Szx => match cursor.read_u8()? {
                0x60 => Control::CharSize(CharSize::Micro),
                0x41 => Control::CharSize(CharSize::HighW),
                0x44 => Control::CharSize(CharSize::WidthW),
                0x45 => Control::CharSize(CharSize::SizeW),
                0x6B => Control::CharSize(CharSize::Special1),
                0x64 => Control::CharSize(CharSize::Special2),
                p1 => self.unknown(format_args!("p1={:02X}", p1)),
            },

            ControlCode::Col => match cursor.read_u8()? {
                p1 @ 0x40..=0x4F => Control::Color(Color::Foreground(p1 & 0x0F)),
                p1 @ 0x50..=0x5F => Control::Color(Color::Background(p1 & 0x0F)),
                p1 @ 0x60..=0x6F => Control::Color(Color::HalfForeground(p1 & 0x0F)),
                p1 @ 0x70..=0x7F => Control::Color(Color::HalfBackground(p1 & 0x0F)),
                0x20 => Control::Color(Color::Palette(cursor.read_u8()? & 0x0F)),
                p1 => self.unknown(format_args!("p1={:02X}", p1)),
            },
            ControlCode::Flc => match cursor.read_u8()? {
                0x40 => Control::Flashing(Flashing::Normal),
                0x47 => Control::Flashing(Flashing::Inverted),
                0x4F => Control::Flashing(Flashing::Stop),
                p1 => self.unknown(format_args!("p1={:02X}", p1)),
            },
            ControlCode::Cdc => match cursor.read_u8()? {
                0x20 => Control::Conceal {
                    p1: 0x20,
                    p2: Some(cursor.read_u8()?),
                },
                p1 => Control::Conceal { p1, p2: None },
            },
            ControlCode::Pol => match cursor.read_u8()? {
                0x40 => Control::Polarity(Polarity::Normal),
                0x41 => Control::Polarity(Polarity::Inverted1),
                0x42 => Control::Polarity(Polarity::Inverted2),
                p1 => self.unknown(format_args!("p1={:02X}", p1)),
            },
            ControlCode::Wmm => match cursor.read_u8()? {
                0x40 => Control::WritingMode(WritingMode::Both),
                0x44 => Control::WritingMode(WritingMode::Foreground),
                0x45 => Control::WritingMode(WritingMode::Background),
                p1 => self.unknown(format_args!("p1={:02X}", p1)),
            },
            ControlCode::Macro => read_macro(cursor)?,
            ControlCode::Hlc => Control::HighlightBlock(cursor.read_u8()? & 0x0F),
            ControlCode::Rpc => Control::RepeatCharacter(cursor.read_u8()? & 0x3F),
            ControlCode::Spl => Control::StopLining,
            ControlCode::Stl => Control::StartLining,
            ControlCode::Csi => read_csi(cursor)?,
            ControlCode::Time => read_time(cursor)?,
        };
        Ok(control)
    }

    /// パラメータが不明であることを記録して[`Control::Unknown`]を返す。
    fn unknown(self, detail: std::fmt::Arguments) -> Control {
        log::trace!("unknown {:?}: {}", self, detail);
        Control::Unknown(self.byte())
    }
}

/// 先頭の1バイト`b`に続くパラメータを読み取り、制御符号を得る。
///
/// 制御符号表にない値の場合、追加のバイトは読み取らずに[`Control::Unknown`]を返す。
pub fn read_control<R: Read>(b: u8, cursor: &mut ByteCursor<R>) -> Result<Control> {
    match ControlCode::from_byte(b) {
        Some(code) => code.read(cursor),
        None => {
            log::trace!("unknown control code: {:02X}", b);
            Ok(Control::Unknown(b))
        }
    }
}

/// 1バイトGセットの終端符号から符号集合を得る。
fn one_byte_set(f: u8) -> Option<GraphicSet> {
    let set = match f {
        0x4A => GraphicSet::Alnum,
        0x30 => GraphicSet::Hira,
        0x31 => GraphicSet::Kata,
        0x32 => GraphicSet::MosaicA,
        0x33 => GraphicSet::MosaicB,
        0x34 => GraphicSet::MosaicC,
        0x35 => GraphicSet::MosaicD,
        0x36 => GraphicSet::PropAlnum,
        0x37 => GraphicSet::PropHira,
        0x38 => GraphicSet::PropKata,
        0x49 => GraphicSet::JisXKata,
        _ => return None,
    };
    Some(set)
}

/// 2バイトGセットの終端符号から符号集合を得る。
fn two_byte_set(f: u8) -> Option<GraphicSet> {
    let set = match f {
        0x42 => GraphicSet::Kanji,
        0x39 => GraphicSet::JisKanjiPlane1,
        0x3A => GraphicSet::JisKanjiPlane2,
        0x3B => GraphicSet::ExtraSymbols,
        _ => return None,
    };
    Some(set)
}

/// 1バイトDRCSの終端符号から符号集合を得る。
fn one_byte_drcs(f: u8) -> Option<GraphicSet> {
    match f {
        0x41..=0x4F => GraphicSet::drcs(f - 0x40),
        0x70 => Some(GraphicSet::Macro),
        _ => None,
    }
}

/// `0x28..=0x2B`の中間符号から指示先を得る。
fn designator(i: u8) -> Option<Designator> {
    match i {
        0x28 => Some(Designator::G0),
        0x29 => Some(Designator::G1),
        0x2A => Some(Designator::G2),
        0x2B => Some(Designator::G3),
        _ => None,
    }
}

/// ESCに続くバイト列を読み取る。
///
/// 符号の呼び出しと指示以外のものは[`Malformed::Escape`]とする。
fn read_esc<R: Read>(cursor: &mut ByteCursor<R>) -> Result<Control> {
    let mut seq = ArrayVec::<u8, 4>::new();
    macro_rules! next {
        () => {{
            let b = cursor.read_u8()?;
            seq.push(b);
            b
        }};
    }
    fn invoke(area: InvocationArea, register: Designator) -> Option<Control> {
        Some(Control::LockingShift { area, register })
    }
    fn designate(register: Designator, set: Option<GraphicSet>) -> Option<Control> {
        set.map(|set| Control::Designate { register, set })
    }

    let control = match next!() {
        // LS2
        0x6E => invoke(InvocationArea::Gl, Designator::G2),
        // LS3
        0x6F => invoke(InvocationArea::Gl, Designator::G3),
        // LS1R
        0x7E => invoke(InvocationArea::Gr, Designator::G1),
        // LS2R
        0x7D => invoke(InvocationArea::Gr, Designator::G2),
        // LS3R
        0x7C => invoke(InvocationArea::Gr, Designator::G3),

        // 1バイトGセット・1バイトDRCS
        i @ 0x28..=0x2B => {
            let g = designator(i);
            match next!() {
                0x20 => {
                    let f = next!();
                    g.and_then(|g| designate(g, one_byte_drcs(f)))
                }
                f => g.and_then(|g| designate(g, one_byte_set(f))),
            }
        }

        // 2バイトGセット・2バイトDRCS
        0x24 => match next!() {
            i @ 0x28..=0x2B => {
                let g = designator(i);
                match next!() {
                    0x20 => match next!() {
                        0x40 => g.and_then(|g| designate(g, Some(GraphicSet::Drcs0))),
                        _ => None,
                    },
                    f => g.and_then(|g| designate(g, two_byte_set(f))),
                }
            }
            // G0は中間符号を省略できる
            f => designate(Designator::G0, two_byte_set(f)),
        },

        _ => None,
    };

    match control {
        Some(control) => Ok(control),
        None => Err(Malformed::Escape(seq).into()),
    }
}

/// MACROに続くマクロ定義を読み取る。
fn read_macro<R: Read>(cursor: &mut ByteCursor<R>) -> Result<Control> {
    let run = match cursor.read_u8()? {
        0x40 => false,
        0x41 => true,
        p1 => return Ok(ControlCode::Macro.unknown(format_args!("p1={:02X}", p1))),
    };
    let code = match cursor.read_u8()? {
        mc @ 0x21..=0x7E => GraphicCode::new(mc),
        mc => return Err(Malformed::GraphicCode(mc).into()),
    };

    let mut body = Vec::new();
    loop {
        match cursor.read_u8()? {
            0x95 => match cursor.read_u8()? {
                // マクロ終了
                0x4F => break,
                // マクロはネストできない
                0x40 | 0x41 => return Err(Malformed::NestedMacro.into()),
                b => body.extend_from_slice(&[0x95, b]),
            },
            b => body.push(b),
        }
    }

    log::trace!("macro {:?} defined ({} bytes, run={})", code, body.len(), run);
    Ok(Control::MacroDefinition { code, run, body })
}

/// CSIやTIMEのパラメータ列。
enum Parameters {
    /// 終端符号とパラメータ。
    Complete(u8, ArrayVec<u32, 4>),
    /// 不正な値があったため最後まで読み飛ばした。
    Skipped,
}

/// `0x3B`区切りの10進数パラメータと中間符号`0x20`、終端符号を読み取る。
///
/// `no_params`に含まれる値はパラメータなしの終端符号として扱う。
fn read_parameters<R: Read>(
    cursor: &mut ByteCursor<R>,
    what: &str,
    no_params: &[u8],
) -> Result<Parameters> {
    fn skip_to_the_end<R: Read>(cursor: &mut ByteCursor<R>) -> Result<Parameters> {
        // 中間文字まで飛ばす
        while cursor.read_u8()? != 0x20 {}

        // 終端文字
        cursor.read_u8()?;
        Ok(Parameters::Skipped)
    }

    // パラメータは最大4つ
    let mut params = ArrayVec::<u32, 4>::new();
    let mut param = 0u32;
    loop {
        match cursor.read_u8()? {
            p @ 0x30..=0x39 => {
                param = param.saturating_mul(10).saturating_add((p - 0x30) as u32);
            }

            0x3B => {
                if params.try_push(param).is_err() {
                    log::trace!("{}: too many params", what);
                    return skip_to_the_end(cursor);
                }
                param = 0;
            }

            // 中間文字
            0x20 => {
                let f = cursor.read_u8()?;
                if params.try_push(param).is_err() {
                    log::trace!("{}: too many params", what);
                    return Ok(Parameters::Skipped);
                }
                return Ok(Parameters::Complete(f, params));
            }

            f if no_params.contains(&f) => return Ok(Parameters::Complete(f, params)),

            b => {
                log::trace!("{}: unknown byte {:02X}", what, b);
                return skip_to_the_end(cursor);
            }
        }
    }
}

/// 百の位をパレット番号、下2桁を色番号とするパラメータを、
/// パレット番号を上位4ビットとするカラーマップアドレスに変換する。
#[inline]
fn color_map_address(p: u32) -> u8 {
    ((((p / 100) & 0x0F) as u8) << 4) | (((p % 100) & 0x0F) as u8)
}

/// CSIに続く拡張制御符号を読み取る。
fn read_csi<R: Read>(cursor: &mut ByteCursor<R>) -> Result<Control> {
    // PLD/PLU/SCS（パラメータなし）
    let (f, params) = match read_parameters(cursor, "CSI", &[0x5B, 0x5C, 0x6F])? {
        Parameters::Complete(f, params) => (f, params),
        Parameters::Skipped => return Ok(Control::Unknown(ControlCode::Csi.byte())),
    };

    let csi = match (f, params.as_slice()) {
        // SWF
        (0x53, &[p1 @ 0..=12]) => Csi::SetWritingFormat(WritingFormat::Init(p1 as u8)),
        (0x53, &[p1, p2 @ 0..=2, p3]) => Csi::SetWritingFormat(WritingFormat::Details {
            vertical: p1 == 8,
            size: p2 as u8,
            chars: p3,
            lines: None,
        }),
        (0x53, &[p1, p2 @ 0..=2, p3, p4]) => Csi::SetWritingFormat(WritingFormat::Details {
            vertical: p1 == 8,
            size: p2 as u8,
            chars: p3,
            lines: Some(p4),
        }),

        // SDF
        (0x56, &[width, height]) => Csi::SetDisplayFormat { width, height },
        // SDP
        (0x5F, &[x, y]) => Csi::SetDisplayPosition { x, y },
        // SSM
        (0x57, &[width, height]) => Csi::CharacterCompositionDot { width, height },
        // SHS
        (0x58, &[p1]) => Csi::SetHorizontalSpacing(p1),
        // SVS
        (0x59, &[p1]) => Csi::SetVerticalSpacing(p1),
        // ACPS
        (0x61, &[x, y]) => Csi::ActiveCoordinatePositionSet { x, y },
        // RCS
        (0x6E, &[p1 @ 0..=15]) => Csi::RasterColor(p1 as u8),

        // ORN
        (0x63, &[0] | &[0, _]) => Csi::Ornament(Ornament::None),
        (0x63, &[1, p2]) => Csi::Ornament(Ornament::Hemming(color_map_address(p2))),
        (0x63, &[2, p2]) => Csi::Ornament(Ornament::Shade(color_map_address(p2))),
        (0x63, &[3] | &[3, _]) => Csi::Ornament(Ornament::Hollow),

        // MDF
        (0x64, &[0]) => Csi::FontStyle(FontStyle::Standard),
        (0x64, &[1]) => Csi::FontStyle(FontStyle::Bold),
        (0x64, &[2]) => Csi::FontStyle(FontStyle::Slanted),
        (0x64, &[3]) => Csi::FontStyle(FontStyle::BoldSlanted),

        // CFS
        (0x65, &[p1]) => Csi::CharacterFont(p1),
        // PRA
        (0x68, &[p1]) => Csi::BuiltinSound(p1),
        // SCS
        (0x6F, &[]) => Csi::SkipCharacterSet,

        (final_byte, _) => {
            log::trace!("untyped CSI: {:02X}={:?}", final_byte, params);
            Csi::Other { final_byte, params }
        }
    };
    Ok(Control::Csi(csi))
}

/// 時・分・秒・ミリ秒のパラメータをミリ秒に変換する。
#[inline]
fn to_millis(hour: u32, minute: u32, second: u32, millisecond: u32) -> u64 {
    (hour as u64) * (60 * 60 * 1000)
        + (minute as u64) * (60 * 1000)
        + (second as u64) * 1000
        + (millisecond as u64)
}

/// TIMEに続くパラメータを読み取る。
fn read_time<R: Read>(cursor: &mut ByteCursor<R>) -> Result<Control> {
    let time = match cursor.read_u8()? {
        0x20 => Time::Wait(cursor.read_u8()? & 0x3F),
        0x28 => match cursor.read_u8()? {
            p2 @ 0x40..=0x43 => Time::Mode(TimeControlMode::from_bits(p2 - 0x40)),
            p2 => return Ok(ControlCode::Time.unknown(format_args!("p1=28, p2={:02X}", p2))),
        },
        0x29 => {
            let (f, params) = match read_parameters(cursor, "TIME", &[])? {
                Parameters::Complete(f, params) => (f, params),
                Parameters::Skipped => return Ok(Control::Unknown(ControlCode::Time.byte())),
            };
            match (f, params.as_slice()) {
                (0x40, &[h, m, s, ms]) => Time::PresentationStart(to_millis(h, m, s, ms)),
                (0x41, &[h, m, s, ms]) => Time::Offset(to_millis(h, m, s, ms)),
                (0x42, &[h, m, s, ..]) => Time::Performance(to_millis(h, m, s, 0) / 1000),
                (0x43, &[h, m, s, ms]) => Time::DisplayEnd(to_millis(h, m, s, ms)),
                _ => {
                    return Ok(ControlCode::Time.unknown(format_args!(
                        "p1=29, f={:02X}, params={:?}",
                        f, params
                    )))
                }
            }
        }
        p1 => return Ok(ControlCode::Time.unknown(format_args!("p1={:02X}", p1))),
    };
    Ok(Control::Time(time))
}
