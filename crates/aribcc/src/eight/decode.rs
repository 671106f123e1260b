//! 8単位符号のデコード。

use std::io::Read;

use super::char::{
    Character, Control, DrcsRef, GraphicCode, InvocationArea, Statement, StatementKind,
};
use super::{control, table};
use crate::cursor::ByteCursor;
use crate::drcs::{drcs0_code, DrcsCache};
use crate::error::{Error, Malformed, Result};

/// 符号の指示。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Designator {
    /// G0に対する指示。
    G0 = 0,
    /// G1に対する指示。
    G1 = 1,
    /// G2に対する指示。
    G2 = 2,
    /// G3に対する指示。
    G3 = 3,
}

/// 文字符号集合。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GraphicSet {
    /// 漢字、2バイト符号。
    Kanji,
    /// 英数、1バイト符号。
    Alnum,
    /// 平仮名、1バイト符号。
    Hira,
    /// 片仮名、1バイト符号。
    Kata,
    /// モザイクA、1バイト符号。
    MosaicA,
    /// モザイクB、1バイト符号。
    MosaicB,
    /// モザイクC、1バイト符号。
    MosaicC,
    /// モザイクD、1バイト符号。
    MosaicD,
    /// プロポーショナル英数、1バイト符号。
    PropAlnum,
    /// プロポーショナル平仮名、1バイト符号。
    PropHira,
    /// プロポーショナル片仮名、1バイト符号。
    PropKata,
    /// JIS X 0201 片仮名、1バイト符号。
    JisXKata,
    /// JIS互換漢字1面、2バイト符号。
    JisKanjiPlane1,
    /// JIS互換漢字2面、2バイト符号。
    JisKanjiPlane2,
    /// 追加記号、2バイト符号。
    ExtraSymbols,
    /// DRCS-0、2バイト符号。
    Drcs0,
    /// DRCS-1、1バイト符号。
    Drcs1,
    /// DRCS-2、1バイト符号。
    Drcs2,
    /// DRCS-3、1バイト符号。
    Drcs3,
    /// DRCS-4、1バイト符号。
    Drcs4,
    /// DRCS-5、1バイト符号。
    Drcs5,
    /// DRCS-6、1バイト符号。
    Drcs6,
    /// DRCS-7、1バイト符号。
    Drcs7,
    /// DRCS-8、1バイト符号。
    Drcs8,
    /// DRCS-9、1バイト符号。
    Drcs9,
    /// DRCS-10、1バイト符号。
    Drcs10,
    /// DRCS-11、1バイト符号。
    Drcs11,
    /// DRCS-12、1バイト符号。
    Drcs12,
    /// DRCS-13、1バイト符号。
    Drcs13,
    /// DRCS-14、1バイト符号。
    Drcs14,
    /// DRCS-15、1バイト符号。
    Drcs15,
    /// マクロ、1バイト符号。
    Macro,
}

const DRCS_SETS: [GraphicSet; 16] = [
    GraphicSet::Drcs0,
    GraphicSet::Drcs1,
    GraphicSet::Drcs2,
    GraphicSet::Drcs3,
    GraphicSet::Drcs4,
    GraphicSet::Drcs5,
    GraphicSet::Drcs6,
    GraphicSet::Drcs7,
    GraphicSet::Drcs8,
    GraphicSet::Drcs9,
    GraphicSet::Drcs10,
    GraphicSet::Drcs11,
    GraphicSet::Drcs12,
    GraphicSet::Drcs13,
    GraphicSet::Drcs14,
    GraphicSet::Drcs15,
];

impl GraphicSet {
    /// 集合番号`n`のDRCSを返す。
    ///
    /// `n`が`0..=15`の範囲にない場合は`None`を返す。
    #[inline]
    pub fn drcs(n: u8) -> Option<GraphicSet> {
        DRCS_SETS.get(n as usize).copied()
    }

    /// DRCSであればその集合番号を返す。
    #[inline]
    pub fn drcs_set(self) -> Option<u8> {
        DRCS_SETS.iter().position(|&s| s == self).map(|n| n as u8)
    }

    /// 2バイト符号の集合であれば`true`を返す。
    #[inline]
    pub fn is_two_byte(self) -> bool {
        matches!(
            self,
            GraphicSet::Kanji
                | GraphicSet::JisKanjiPlane1
                | GraphicSet::JisKanjiPlane2
                | GraphicSet::ExtraSymbols
                | GraphicSet::Drcs0
        )
    }

    /// 未対応の集合の名前。
    fn unimplemented_name(self) -> Option<&'static str> {
        let name = match self {
            GraphicSet::MosaicA => "MosaicA",
            GraphicSet::MosaicB => "MosaicB",
            GraphicSet::MosaicC => "MosaicC",
            GraphicSet::MosaicD => "MosaicD",
            GraphicSet::PropAlnum => "PropAlnum",
            GraphicSet::PropHira => "PropHira",
            GraphicSet::PropKata => "PropKata",
            GraphicSet::JisKanjiPlane1 => "JisKanjiPlane1",
            GraphicSet::JisKanjiPlane2 => "JisKanjiPlane2",
            GraphicSet::ExtraSymbols => "ExtraSymbols",
            _ => return None,
        };
        Some(name)
    }
}

/// 字幕文ごとに符号の指示と呼び出しを初期化するかどうか。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResetPolicy {
    /// 初期化せず、前の字幕文の状態を引き継ぐ。
    #[default]
    Persist,
    /// 字幕文の先頭で初期状態に戻す。
    PerStatementBody,
}

/// 8単位符号をデコードする際のオプション。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// 初期状態でG0～G3に指示する符号集合。
    pub graphic_sets: [GraphicSet; 4],

    /// 初期状態でGLに呼び出す符号集合。
    pub gl: Designator,

    /// 初期状態でGRに呼び出す符号集合。
    pub gr: Designator,

    /// 字幕文ごとの初期化方針。
    pub reset: ResetPolicy,
}

impl Options {
    /// 字幕の符号列をデコードする際のオプション。
    pub const CAPTION: Options = Options {
        graphic_sets: [
            GraphicSet::Kanji,
            GraphicSet::Alnum,
            GraphicSet::Hira,
            GraphicSet::Macro,
        ],
        gl: Designator::G0,
        gr: Designator::G2,
        reset: ResetPolicy::Persist,
    };

    /// G1を片仮名とする以外は[`Options::CAPTION`]と同じオプション。
    pub const KATAKANA_G1: Options = Options {
        graphic_sets: [
            GraphicSet::Kanji,
            GraphicSet::Kata,
            GraphicSet::Hira,
            GraphicSet::Macro,
        ],
        gl: Designator::G0,
        gr: Designator::G2,
        reset: ResetPolicy::Persist,
    };

    /// ワンセグにおける字幕の符号列をデコードする際のオプション。
    pub const ONESEG_CAPTION: Options = Options {
        graphic_sets: [
            GraphicSet::Kanji,
            GraphicSet::Drcs1,
            GraphicSet::Hira,
            GraphicSet::Macro,
        ],
        gl: Designator::G1,
        gr: Designator::G0,
        reset: ResetPolicy::Persist,
    };

    /// 初期化方針を変更したオプションを返す。
    #[inline]
    pub const fn with_reset(self, reset: ResetPolicy) -> Options {
        Options { reset, ..self }
    }
}

impl Default for Options {
    fn default() -> Self {
        Options::CAPTION
    }
}

/// マクロ符号集合。
// MACRO符号でマクロが設定されるまでは既定のマクロを参照する。
#[derive(Debug, Clone)]
struct Macros {
    macros: Option<Box<[Vec<u8>; 0x7E - 0x21 + 1]>>,
}

impl Macros {
    #[inline]
    pub fn new() -> Macros {
        Macros { macros: None }
    }

    /// `n`で指定された符号に定義されたマクロを取得する。
    #[inline]
    pub fn get(&self, n: GraphicCode) -> &[u8] {
        match self.macros {
            Some(ref macros) => &macros[(n.get() - 0x21) as usize],
            None => table::default_macro(n),
        }
    }

    /// `n`で指定された符号にマクロを定義する。
    pub fn set(&mut self, n: GraphicCode, makro: &[u8]) {
        let macros = match self.macros {
            Some(ref mut macros) => macros,
            None => {
                if makro.is_empty() && table::default_macro(n).is_empty() {
                    // 空の場所に空を突っ込むためにヒープ確保するのは避ける
                    return;
                }

                self.macros.insert(crate::utils::boxed_array(|i| {
                    table::default_macro(GraphicCode::new(0x21 + i as u8)).to_vec()
                }))
            }
        };

        macros[(n.get() - 0x21) as usize] = makro.to_vec();
    }
}

/// 実行待ちのマクロ。
#[derive(Debug, Clone)]
struct PendingMacro {
    bytes: Vec<u8>,
    pos: usize,
}

/// ARIB STD-B24の8単位符号をデコードする。
///
/// 符号の指示と呼び出しの状態を保持し、[`Decoder::decode`]を呼び出すごとに文を1つ返す。
/// 状態は字幕文をまたいで引き継がれる。
#[derive(Debug, Clone)]
pub struct Decoder {
    options: Options,
    graphic_sets: [GraphicSet; 4],
    gl: Designator,
    gr: Designator,
    /// 次の1文字だけGLの代わりに使う符号。
    single_shift: Option<Designator>,

    macros: Macros,
    pending_macro: Option<PendingMacro>,
}

impl Decoder {
    /// `options`の初期状態で`Decoder`を生成する。
    pub fn new(options: Options) -> Decoder {
        Decoder {
            options,
            graphic_sets: options.graphic_sets,
            gl: options.gl,
            gr: options.gr,
            single_shift: None,
            macros: Macros::new(),
            pending_macro: None,
        }
    }

    /// 符号の指示と呼び出しを初期状態に戻す。
    ///
    /// 実行待ちのマクロは破棄されるが、定義されたマクロは保持される。
    pub fn reset(&mut self) {
        self.graphic_sets = self.options.graphic_sets;
        self.gl = self.options.gl;
        self.gr = self.options.gr;
        self.single_shift = None;
        self.pending_macro = None;
    }

    /// `Decoder`のオプションを返す。
    #[inline]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// `g`に指示されている符号集合を返す。
    #[inline]
    pub fn graphic_set(&self, g: Designator) -> GraphicSet {
        self.graphic_sets[g as usize]
    }

    /// GLに呼び出されている符号を返す。
    #[inline]
    pub fn gl(&self) -> Designator {
        self.gl
    }

    /// GRに呼び出されている符号を返す。
    #[inline]
    pub fn gr(&self) -> Designator {
        self.gr
    }

    /// 実行中のマクロがあれば`true`を返す。
    ///
    /// この間の[`Decoder::decode`]は入力を読まずにマクロから文を返す。
    #[inline]
    pub fn has_pending_macro(&self) -> bool {
        self.pending_macro.is_some()
    }

    /// 次の文を1つデコードする。
    ///
    /// DRCSの文字は`cache`から引かれる。
    /// [`Error::Unimplemented`]の場合、その文の分は既に読み取られているため続けてデコードできる。
    /// 実行中のマクロが壊れていた場合はマクロを破棄して[`Error::MacroAborted`]を返し、
    /// 次の呼び出しでは入力の続きからデコードする。
    pub fn decode<R: Read>(
        &mut self,
        cursor: &mut ByteCursor<R>,
        cache: &mut DrcsCache,
    ) -> Result<Statement> {
        let Some(mut pending) = self.pending_macro.take() else {
            return self.decode_step(cursor, cache, false);
        };

        let mut sub = ByteCursor::new(&pending.bytes[pending.pos..]);
        let result = self.decode_step(&mut sub, cache, true);
        pending.pos += sub.position() as usize;

        match result {
            Ok(statement) => {
                if pending.pos < pending.bytes.len() {
                    self.pending_macro = Some(pending);
                }
                Ok(Statement { len: 0, ..statement })
            }
            Err(Error::Unimplemented { what, .. }) => {
                if pending.pos < pending.bytes.len() {
                    self.pending_macro = Some(pending);
                }
                Err(Error::Unimplemented { what, len: 0 })
            }
            Err(e) => match e.within_region() {
                Error::Malformed(m) => {
                    log::debug!("macro dropped: {}", m);
                    Err(Error::MacroAborted(m))
                }
                e => Err(e),
            },
        }
    }

    fn decode_step<R: Read>(
        &mut self,
        cursor: &mut ByteCursor<R>,
        cache: &mut DrcsCache,
        in_macro: bool,
    ) -> Result<Statement> {
        let start = cursor.position();
        let shift = self.single_shift.take();

        let kind = match self.read_statement(cursor, cache, shift) {
            Ok(kind) => kind,
            Err(Error::Unimplemented { what, .. }) => {
                let len = (cursor.position() - start) as usize;
                log::trace!("unimplemented {} ({} bytes)", what, len);
                return Err(Error::Unimplemented { what, len });
            }
            Err(e) => return Err(e),
        };

        if let StatementKind::Control(control) = &kind {
            self.apply(control, in_macro);
        }

        Ok(Statement {
            kind,
            len: (cursor.position() - start) as usize,
        })
    }

    /// 制御符号による状態の変更を適用する。
    fn apply(&mut self, control: &Control, in_macro: bool) {
        match *control {
            Control::LockingShift {
                area: InvocationArea::Gl,
                register,
            } => self.gl = register,
            Control::LockingShift {
                area: InvocationArea::Gr,
                register,
            } => self.gr = register,
            Control::SingleShift(register) => self.single_shift = Some(register),
            Control::Designate { register, set } => self.graphic_sets[register as usize] = set,
            Control::MacroDefinition {
                code,
                run,
                ref body,
            } => {
                self.macros.set(code, body);
                if run && !in_macro {
                    self.queue_macro(code);
                }
            }
            Control::MacroInvoke(code) => {
                // マクロ実行はネストできない
                if !in_macro {
                    self.queue_macro(code);
                }
            }
            _ => {}
        }
    }

    fn queue_macro(&mut self, code: GraphicCode) {
        let bytes = self.macros.get(code);
        if !bytes.is_empty() {
            self.pending_macro = Some(PendingMacro {
                bytes: bytes.to_vec(),
                pos: 0,
            });
        }
    }

    fn read_statement<R: Read>(
        &mut self,
        cursor: &mut ByteCursor<R>,
        cache: &mut DrcsCache,
        shift: Option<Designator>,
    ) -> Result<StatementKind> {
        match cursor.read_u8()? {
            // GL: 0x21..=0x7E
            c1 @ 0x21..=0x7E => {
                let g = shift.unwrap_or(self.gl);
                self.read_graphic(g, GraphicCode::new(c1), cursor, cache)
            }

            // GR: 0xA1..=0xFE
            // シングルシフトはGLにのみ作用する
            c1 @ 0xA1..=0xFE => {
                self.read_graphic(self.gr, GraphicCode::new(c1 & 0x7F), cursor, cache)
            }

            // C0/C1
            b => control::read_control(b, cursor).map(StatementKind::Control),
        }
    }

    /// 符号の指示と図形符号から文字を得る。
    fn read_graphic<R: Read>(
        &mut self,
        g: Designator,
        c1: GraphicCode,
        cursor: &mut ByteCursor<R>,
        cache: &mut DrcsCache,
    ) -> Result<StatementKind> {
        fn read_c2<R: Read>(cursor: &mut ByteCursor<R>) -> Result<GraphicCode> {
            let c2 = cursor.read_u8()?;
            GraphicCode::from_byte(c2).ok_or_else(|| Malformed::GraphicCode(c2).into())
        }

        let set = self.graphic_sets[g as usize];
        let c = match set {
            GraphicSet::Kanji => {
                let c2 = read_c2(cursor)?;
                if table::is_gaiji(c1, c2) {
                    Character::Gaiji(c1, c2)
                } else {
                    Character::Kanji(c1, c2)
                }
            }
            GraphicSet::Alnum => Character::Alnum(c1),
            GraphicSet::Hira => Character::Hira(c1),
            GraphicSet::Kata => Character::Kata(c1),
            GraphicSet::JisXKata => Character::JisXKata(c1),
            GraphicSet::Drcs0 => {
                let c2 = read_c2(cursor)?;
                let code = drcs0_code(c1.get(), c2.get());
                Character::Drcs(DrcsRef::lookup(0, code, cache))
            }
            GraphicSet::Macro => return Ok(StatementKind::Control(Control::MacroInvoke(c1))),
            set => match (set.drcs_set(), set.unimplemented_name()) {
                (Some(n), _) => Character::Drcs(DrcsRef::lookup(n, c1.get() as u16, cache)),
                (None, what) => {
                    if set.is_two_byte() {
                        cursor.read_u8()?;
                    }
                    return Err(Error::Unimplemented {
                        what: what.unwrap_or("GraphicSet"),
                        len: 0,
                    });
                }
            },
        };
        Ok(StatementKind::Char(c))
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder::new(Options::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use hex_literal::hex;

    use crate::drcs::DrcsGlyph;

    fn gc(c: u8) -> GraphicCode {
        GraphicCode::new(c)
    }

    /// `data`を最後までデコードする。
    fn decode_all(decoder: &mut Decoder, data: &[u8]) -> Vec<Result<Statement>> {
        let mut cache = DrcsCache::new();
        let mut cursor = ByteCursor::new(data);
        let mut results = Vec::new();
        while (cursor.position() as usize) < data.len() || decoder.has_pending_macro() {
            results.push(decoder.decode(&mut cursor, &mut cache));
        }
        results
    }

    fn kinds(data: &[u8]) -> Vec<StatementKind> {
        decode_all(&mut Decoder::default(), data)
            .into_iter()
            .map(|r| r.unwrap().kind)
            .collect()
    }

    #[test]
    fn test_graphic_set() {
        assert_eq!(GraphicSet::drcs(0), Some(GraphicSet::Drcs0));
        assert_eq!(GraphicSet::drcs(15), Some(GraphicSet::Drcs15));
        assert_eq!(GraphicSet::drcs(16), None);
        assert_eq!(GraphicSet::Drcs7.drcs_set(), Some(7));
        assert_eq!(GraphicSet::Kanji.drcs_set(), None);
        assert!(GraphicSet::Drcs0.is_two_byte());
        assert!(!GraphicSet::Drcs1.is_two_byte());
    }

    #[test]
    fn test_default_state() {
        let decoder = Decoder::default();
        assert_eq!(decoder.graphic_set(Designator::G0), GraphicSet::Kanji);
        assert_eq!(decoder.graphic_set(Designator::G1), GraphicSet::Alnum);
        assert_eq!(decoder.graphic_set(Designator::G2), GraphicSet::Hira);
        assert_eq!(decoder.graphic_set(Designator::G3), GraphicSet::Macro);
        assert_eq!(decoder.gl(), Designator::G0);
        assert_eq!(decoder.gr(), Designator::G2);

        let decoder = Decoder::new(Options::KATAKANA_G1);
        assert_eq!(decoder.graphic_set(Designator::G1), GraphicSet::Kata);
    }

    #[test]
    fn test_kanji_aps_cs() {
        let data = hex!("3B 7A 1C 45 4A 0C");
        let mut decoder = Decoder::default();
        let statements = decode_all(&mut decoder, &data)
            .into_iter()
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(statements.len(), 3);
        assert_eq!(
            statements[0].kind,
            StatementKind::Char(Character::Kanji(gc(0x3B), gc(0x7A)))
        );
        assert_eq!(statements[0].as_char().unwrap().to_char(), Some('字'));
        assert_eq!(
            statements[1].as_control(),
            Some(&Control::ActivePositionSet { row: 5, col: 10 })
        );
        assert_eq!(statements[2].as_control(), Some(&Control::ClearScreen));
        assert_eq!(
            statements.iter().map(|s| s.len).sum::<usize>(),
            data.len()
        );
    }

    #[test]
    fn test_gr_hiragana() {
        // GR=G2=平仮名
        assert_eq!(
            kinds(&hex!("A2 A4")),
            [
                StatementKind::Char(Character::Hira(gc(0x22))),
                StatementKind::Char(Character::Hira(gc(0x24))),
            ]
        );
    }

    #[test]
    fn test_gaiji() {
        assert_eq!(
            kinds(&hex!("7C 27")),
            [StatementKind::Char(Character::Gaiji(gc(0x7C), gc(0x27)))]
        );
    }

    #[test]
    fn test_single_shift() {
        // SS2で平仮名を1文字、続く1文字はGL=G0の漢字
        let data = hex!("19 22 3B 7A");
        let mut decoder = Decoder::default();
        let r = decode_all(&mut decoder, &data);
        assert_eq!(r.len(), 3);
        assert_eq!(
            r[0].as_ref().unwrap().as_control(),
            Some(&Control::SingleShift(Designator::G2))
        );
        assert_eq!(
            r[1].as_ref().unwrap().kind,
            StatementKind::Char(Character::Hira(gc(0x22)))
        );
        assert_eq!(
            r[2].as_ref().unwrap().kind,
            StatementKind::Char(Character::Kanji(gc(0x3B), gc(0x7A)))
        );
        assert_eq!(decoder.gl(), Designator::G0);

        // SS3はG3を一度だけ使う
        let mut decoder = Decoder::default();
        let data = hex!("1B 2B 31 1D 22 22 22");
        let r = decode_all(&mut decoder, &data);
        assert_eq!(r.len(), 4);
        assert_eq!(
            r[2].as_ref().unwrap().kind,
            StatementKind::Char(Character::Kata(gc(0x22)))
        );
        assert_eq!(
            r[3].as_ref().unwrap().kind,
            StatementKind::Char(Character::Kanji(gc(0x22), gc(0x22)))
        );

        // GRはシングルシフトの影響を受けず、G2の平仮名のまま
        let k = kinds(&hex!("1D A2 3B 7A"));
        assert_eq!(k.len(), 3);
        assert_eq!(k[1], StatementKind::Char(Character::Hira(gc(0x22))));
        // シフトはGRの文字で消費される
        assert_eq!(
            k[2],
            StatementKind::Char(Character::Kanji(gc(0x3B), gc(0x7A)))
        );
    }

    #[test]
    fn test_locking_shift() {
        // LS1でGL=G1=英数、その後ずっと英数
        let data = hex!("0E 41 42 43 0F 3B 7A");
        let k = kinds(&data);
        assert_eq!(
            k[1..4],
            [
                StatementKind::Char(Character::Alnum(gc(0x41))),
                StatementKind::Char(Character::Alnum(gc(0x42))),
                StatementKind::Char(Character::Alnum(gc(0x43))),
            ]
        );
        assert_eq!(
            k[5],
            StatementKind::Char(Character::Kanji(gc(0x3B), gc(0x7A)))
        );

        // LS2でGL=G2、LS3RでGR=G3
        let mut decoder = Decoder::default();
        decode_all(&mut decoder, &hex!("1B 6E 1B 7C"));
        assert_eq!(decoder.gl(), Designator::G2);
        assert_eq!(decoder.gr(), Designator::G3);

        // 状態は呼び出しをまたいで保持される
        let r = decode_all(&mut decoder, &hex!("22"));
        assert_eq!(
            r[0].as_ref().unwrap().kind,
            StatementKind::Char(Character::Hira(gc(0x22)))
        );
    }

    #[test]
    fn test_designation() {
        let mut decoder = Decoder::default();
        decode_all(&mut decoder, &hex!("1B 28 31 1B 2A 4A"));
        assert_eq!(decoder.graphic_set(Designator::G0), GraphicSet::Kata);
        assert_eq!(decoder.graphic_set(Designator::G2), GraphicSet::Alnum);

        let r = decode_all(&mut decoder, &hex!("22 C1"));
        assert_eq!(
            r[0].as_ref().unwrap().kind,
            StatementKind::Char(Character::Kata(gc(0x22)))
        );
        assert_eq!(
            r[1].as_ref().unwrap().kind,
            StatementKind::Char(Character::Alnum(gc(0x41)))
        );

        decoder.reset();
        assert_eq!(decoder.graphic_set(Designator::G0), GraphicSet::Kanji);
        assert_eq!(decoder.graphic_set(Designator::G2), GraphicSet::Hira);
    }

    #[test]
    fn test_drcs() {
        let mut cache = DrcsCache::new();
        let glyph = DrcsGlyph {
            font_id: 0,
            mode: 0,
            depth: 1,
            width: 8,
            height: 1,
            pattern: vec![0xFF],
        };
        cache.put(1, 0x21, glyph.clone());
        cache.put(0, 0x2223, glyph);

        // G1=DRCS-1をGLに、G2=DRCS-0をGRに
        let data = hex!("1B 29 20 41 0E 21 22 1B 24 2A 20 40 A2 A3");
        let mut decoder = Decoder::default();
        let mut cursor = ByteCursor::new(&data[..]);
        let mut chars = Vec::new();
        while (cursor.position() as usize) < data.len() {
            let s = decoder.decode(&mut cursor, &mut cache).unwrap();
            if let StatementKind::Char(Character::Drcs(r)) = s.kind {
                chars.push(r);
            }
        }

        assert_eq!(chars.len(), 3);
        assert_eq!((chars[0].set, chars[0].code), (1, 0x21));
        assert!(chars[0].glyph.is_some());
        assert_eq!((chars[1].set, chars[1].code), (1, 0x22));
        assert!(chars[1].glyph.is_none());
        assert_eq!((chars[2].set, chars[2].code), (0, 0x2223));
        assert!(chars[2].glyph.is_some());
    }

    #[test]
    fn test_unimplemented() {
        // G1にモザイクAを指示してLS1
        let data = hex!("1B 29 32 0E 21 0F 22 7E");
        let mut decoder = Decoder::default();
        let r = decode_all(&mut decoder, &data);
        assert_eq!(r.len(), 5);
        assert_matches!(
            r[2],
            Err(Error::Unimplemented {
                what: "MosaicA",
                len: 1
            })
        );
        assert_matches!(&r[4], Ok(s) if s.len == 2);

        // 2バイトの集合は2バイト目まで読み取る
        let data = hex!("1B 24 3B 21 21 A2");
        let r = decode_all(&mut Decoder::default(), &data);
        assert_eq!(r.len(), 3);
        assert_matches!(
            r[1],
            Err(Error::Unimplemented {
                what: "ExtraSymbols",
                len: 2
            })
        );
        assert_matches!(&r[2], Ok(s) if s.kind == StatementKind::Char(Character::Hira(gc(0x22))));
    }

    #[test]
    fn test_malformed() {
        let mut decoder = Decoder::default();
        let mut cache = DrcsCache::new();

        // 漢字の2バイト目が図形符号ではない
        let mut cursor = ByteCursor::new(&hex!("3B 0D")[..]);
        assert_matches!(
            decoder.decode(&mut cursor, &mut cache),
            Err(Error::Malformed(Malformed::GraphicCode(0x0D)))
        );

        // 2バイト目がない
        let mut cursor = ByteCursor::new(&hex!("3B")[..]);
        assert_matches!(
            decoder.decode(&mut cursor, &mut cache),
            Err(Error::Exhausted { .. })
        );
    }

    #[test]
    fn test_default_macro() {
        // G3=マクロをGRに呼び出してマクロ0x60を実行する
        let data = hex!("1B 7C E0 21");
        let mut decoder = Decoder::default();
        decode_all(&mut decoder, &data[..3]);
        assert!(!decoder.has_pending_macro());
        assert_eq!(decoder.graphic_set(Designator::G0), GraphicSet::Kanji);
        assert_eq!(decoder.graphic_set(Designator::G1), GraphicSet::Alnum);
        assert_eq!(decoder.graphic_set(Designator::G2), GraphicSet::Hira);
        assert_eq!(decoder.graphic_set(Designator::G3), GraphicSet::Macro);
        assert_eq!(decoder.gl(), Designator::G0);
        assert_eq!(decoder.gr(), Designator::G2);

        // マクロ0x6Eで片仮名・平仮名・英数に
        let r = decode_all(&mut decoder, &hex!("1B 7C EE"));
        assert!(r.iter().skip(2).all(|r| r.as_ref().unwrap().len == 0));
        assert_eq!(r[1].as_ref().unwrap().len, 1);
        assert_eq!(decoder.graphic_set(Designator::G0), GraphicSet::Kata);
        assert_eq!(decoder.graphic_set(Designator::G1), GraphicSet::Hira);
        assert_eq!(decoder.graphic_set(Designator::G2), GraphicSet::Alnum);
        assert_eq!(decoder.gr(), Designator::G2);
    }

    #[test]
    fn test_macro_definition() {
        // マクロ0x21に「LS1」「A」を定義して実行し、その後GLで呼び出す
        let data = hex!("95 41 21 0E 41 95 4F 42 0F 1B 2B 20 70 1D 21");
        let mut decoder = Decoder::default();
        let r = decode_all(&mut decoder, &data);
        let k = r
            .iter()
            .map(|r| r.as_ref().unwrap().kind.clone())
            .collect::<Vec<_>>();

        assert_matches!(&k[0], StatementKind::Control(Control::MacroDefinition { run: true, .. }));
        assert_eq!(
            k[2],
            StatementKind::Char(Character::Alnum(gc(0x41)))
        );
        assert_eq!(
            k[3],
            StatementKind::Char(Character::Alnum(gc(0x42)))
        );
        // SS3でマクロを呼び出す
        assert_eq!(
            k[7],
            StatementKind::Control(Control::MacroInvoke(gc(0x21)))
        );
        assert_eq!(
            k[9],
            StatementKind::Char(Character::Alnum(gc(0x41)))
        );
        assert_eq!(k.len(), 10);
        assert_eq!(
            r.iter().map(|r| r.as_ref().unwrap().len).sum::<usize>(),
            data.len()
        );
    }

    #[test]
    fn test_broken_macro() {
        // 壊れたマクロは破棄され、入力の続きはそのままデコードされる
        let data = hex!("95 41 21 1B 95 4F A2");
        let mut decoder = Decoder::default();
        let r = decode_all(&mut decoder, &data);
        assert_eq!(r.len(), 3);
        assert_matches!(
            &r[0],
            Ok(Statement {
                kind: StatementKind::Control(Control::MacroDefinition { run: true, .. }),
                len: 6,
            })
        );
        assert_matches!(&r[1], Err(Error::MacroAborted(Malformed::Truncated)));
        assert_eq!(
            r[2].as_ref().unwrap().kind,
            StatementKind::Char(Character::Hira(gc(0x22)))
        );
        assert!(!decoder.has_pending_macro());
    }

    #[test]
    fn test_no_panic() {
        for b in 0..=0xFF {
            for options in [Options::CAPTION, Options::ONESEG_CAPTION] {
                let data = [b, b, 0x20, 0x20, 0x20, 0x20];
                let mut decoder = Decoder::new(options);
                let mut cache = DrcsCache::new();
                let mut cursor = ByteCursor::new(&data[..]);
                for _ in 0..8 {
                    let _ = decoder.decode(&mut cursor, &mut cache);
                }
            }
        }
    }
}
