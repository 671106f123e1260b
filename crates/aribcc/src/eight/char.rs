//! デコード結果である文と、それを構成する文字・制御符号。

use std::fmt::{self, Write};
use std::sync::Arc;

use arrayvec::ArrayVec;

use super::decode::{Designator, GraphicSet};
use super::table;
use crate::drcs::{DrcsCache, DrcsGlyph};

/// 文字サイズ。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharSize {
    /// 小型。
    Small,
    /// 中型。
    Medium,
    /// 標準。
    #[default]
    Normal,
    /// 超小型。
    Micro,
    /// 縦倍。
    HighW,
    /// 横倍。
    WidthW,
    /// 縦横倍。
    SizeW,
    /// 特殊1。
    Special1,
    /// 特殊2。
    Special2,
}

impl CharSize {
    /// 文字サイズが小さめの場合に`true`を返す。
    #[inline]
    pub fn is_small(self) -> bool {
        matches!(self, CharSize::Small | CharSize::Medium | CharSize::Micro)
    }
}

/// 図形領域の符号で、`0x21..=0x7E`の範囲のみ保持する。
///
/// GR領域の符号は最上位ビットを落としてから保持する。
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GraphicCode(u8);

impl GraphicCode {
    /// `u8`の値から`GraphicCode`を生成する。
    ///
    /// # パニック
    ///
    /// `n`の値が`0x21..=0x7E`の範囲にない場合、このメソッドはパニックする。
    #[inline]
    pub fn new(n: u8) -> GraphicCode {
        assert!((0x21..=0x7E).contains(&n));
        GraphicCode(n)
    }

    /// GLまたはGRの符号から`GraphicCode`を生成する。
    ///
    /// `0x21..=0x7E`と`0xA1..=0xFE`以外の場合は`None`を返す。
    #[inline]
    pub fn from_byte(b: u8) -> Option<GraphicCode> {
        match b {
            0x21..=0x7E | 0xA1..=0xFE => Some(GraphicCode(b & 0x7F)),
            _ => None,
        }
    }

    /// 符号を`0x21..=0x7E`の範囲に制限された`u8`で返す。
    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Debug for GraphicCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("0x")?;
        fmt::UpperHex::fmt(&self.0, f)
    }
}

/// DRCSへの参照。
///
/// デコード時にキャッシュを引いた結果を保持し、
/// 定義が未着または追い出し済みの場合は`glyph`が`None`となる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrcsRef {
    /// DRCSの集合番号で、`0..=15`の範囲である。
    pub set: u8,
    /// 正規化された符号。
    ///
    /// DRCS-0では上位バイトが区、下位バイトが点、それ以外では1バイトの符号となる。
    pub code: u16,
    /// キャッシュから得られたパターン。
    pub glyph: Option<Arc<DrcsGlyph>>,
}

impl DrcsRef {
    /// `cache`から`set`と`code`に対応するパターンを引いて`DrcsRef`を生成する。
    pub fn lookup(set: u8, code: u16, cache: &mut DrcsCache) -> DrcsRef {
        let glyph = cache.get(set, code);
        if glyph.is_none() {
            log::trace!("DRCS-{} {:04X} not in cache", set, code);
        }
        DrcsRef { set, code, glyph }
    }

    /// DRCS-0から順の連番を得る。
    ///
    /// DRCS-0の場合は区点から計算した値が使われ、
    /// DRCS-1以降はその後に続くように値が続く。
    ///
    /// # サンプル
    ///
    /// ```
    /// use aribcc::eight::char::DrcsRef;
    ///
    /// let r = |set, code| DrcsRef { set, code, glyph: None };
    /// assert_eq!(r(0, 0x2121).to_number(), 0);
    /// assert_eq!(r(1, 0x21).to_number(), 8836);
    /// assert_eq!(r(2, 0x21).to_number(), 8930);
    /// assert_eq!(r(3, 0x22).to_number(), 9025);
    /// ```
    pub fn to_number(&self) -> u16 {
        let [c1, c2] = self.code.to_be_bytes();
        if self.set == 0 {
            (c1.saturating_sub(0x21) as u16) * 94 + (c2.saturating_sub(0x21) as u16)
        } else {
            8836 + 94 * (self.set as u16 - 1) + (c2.saturating_sub(0x21) as u16)
        }
    }
}

/// 図形文字。
///
/// 保持するのは符号のみで、`char`への変換は[`Character::to_char`]で行う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Character {
    /// 漢字。
    Kanji(GraphicCode, GraphicCode),
    /// 漢字系集合の90区～94区にある追加記号。
    Gaiji(GraphicCode, GraphicCode),
    /// 英数。
    Alnum(GraphicCode),
    /// 平仮名。
    Hira(GraphicCode),
    /// 片仮名。
    Kata(GraphicCode),
    /// JIS X 0201 片仮名。
    JisXKata(GraphicCode),
    /// DRCS。
    Drcs(DrcsRef),
}

impl Character {
    /// `Character`を`char`に変換する。
    ///
    /// 漢字は復号できなければ[`table::PLACEHOLDER`]となる。
    /// DRCSや未割り当ての文字の場合は`None`を返す。
    pub fn to_char(&self) -> Option<char> {
        match *self {
            Character::Kanji(c1, c2) => Some(table::decode_kanji(c1, c2)),
            Character::Gaiji(c1, c2) => table::decode_gaiji(c1, c2),
            Character::Alnum(c) => Some(table::decode_alnum(c)),
            Character::Hira(c) => table::decode_hira(c),
            Character::Kata(c) => table::decode_kata(c),
            Character::JisXKata(c) => table::decode_jis_x_kata(c),
            Character::Drcs(_) => None,
        }
    }

    /// 2バイト符号の文字であれば`true`を返す。
    #[inline]
    pub fn is_two_byte(&self) -> bool {
        match self {
            Character::Kanji(..) | Character::Gaiji(..) => true,
            Character::Drcs(r) => r.set == 0,
            _ => false,
        }
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_char(self.to_char().unwrap_or(char::REPLACEMENT_CHARACTER))
    }
}

/// 時刻制御モード。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeControlMode {
    /// フリー。
    Free,

    /// リアルタイム。
    RealTime,

    /// オフセットタイム。
    OffsetTime,

    /// 不明。
    Reserved,
}

impl TimeControlMode {
    /// 2ビットの値から`TimeControlMode`を生成する。
    ///
    /// 上位ビットは無視される。
    #[inline]
    pub fn from_bits(bits: u8) -> TimeControlMode {
        match bits & 0b11 {
            0b00 => TimeControlMode::Free,
            0b01 => TimeControlMode::RealTime,
            0b10 => TimeControlMode::OffsetTime,
            _ => TimeControlMode::Reserved,
        }
    }
}

/// 符号の呼び出し先。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvocationArea {
    /// GL。
    Gl,
    /// GR。
    Gr,
}

/// 色指定。
///
/// 内包する値はいずれも`0..=15`の範囲である。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    /// BKF～WHFやCOLによる前景色。
    Foreground(u8),
    /// COLによる背景色。
    Background(u8),
    /// COLによる前中間色。
    HalfForeground(u8),
    /// COLによる背中間色。
    HalfBackground(u8),
    /// COLによるパレット番号。
    Palette(u8),
}

/// FLC、フラッシング制御。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flashing {
    /// 正相フラッシング開始。
    Normal,
    /// 逆相フラッシング開始。
    Inverted,
    /// フラッシング終了。
    Stop,
}

/// POL、パターン極性。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    /// 正常極性。
    Normal,
    /// 反転極性1。
    Inverted1,
    /// 反転極性2。
    Inverted2,
}

/// WMM、書込みモード変更。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WritingMode {
    /// 前景色及び背景色を書き込む。
    Both,
    /// 前景色のみ書き込む。
    Foreground,
    /// 背景色のみ書き込む。
    Background,
}

/// CSIのSWF、書式選択。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WritingFormat {
    /// 初期化。内包する値は書式の種類で`0..=12`の範囲である。
    Init(u8),
    /// 書式設定。
    Details {
        /// 縦書きであれば`true`。
        vertical: bool,
        /// 字数・行数の単位となる文字サイズで`0..=2`の範囲である。
        size: u8,
        /// 一行の文字数。
        chars: u32,
        /// 行数。
        lines: Option<u32>,
    },
}

/// CSIのORN、文字飾り指定。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ornament {
    /// 文字飾りなし。
    None,
    /// 縁取り。内包する値は文字飾り色のカラーマップアドレス。
    Hemming(u8),
    /// 影付き。内包する値は文字飾り色のカラーマップアドレス。
    Shade(u8),
    /// 中抜き。
    Hollow,
}

/// CSIのMDF、字体指定。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontStyle {
    /// 標準。
    Standard,
    /// 太字。
    Bold,
    /// 斜体。
    Slanted,
    /// 太字斜体。
    BoldSlanted,
}

/// CSIで始まる拡張制御符号。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Csi {
    /// SWF、書式選択。
    SetWritingFormat(WritingFormat),
    /// SDF、表示構成ドット指定。
    SetDisplayFormat {
        /// 水平方向のドット数。
        width: u32,
        /// 垂直方向のドット数。
        height: u32,
    },
    /// SDP、表示位置指定。
    SetDisplayPosition {
        /// 水平方向の座標。
        x: u32,
        /// 垂直方向の座標。
        y: u32,
    },
    /// SSM、文字構成ドット指定。
    CharacterCompositionDot {
        /// 横方向のドット数。
        width: u32,
        /// 縦方向のドット数。
        height: u32,
    },
    /// SHS、字間隔指定。
    SetHorizontalSpacing(u32),
    /// SVS、行間隔指定。
    SetVerticalSpacing(u32),
    /// ACPS、動作位置座標指定。
    ActiveCoordinatePositionSet {
        /// 水平方向の座標。
        x: u32,
        /// 垂直方向の座標。
        y: u32,
    },
    /// RCS、ラスタ色制御。内包する値は`0..=15`の範囲である。
    RasterColor(u8),
    /// ORN、文字飾り指定。
    Ornament(Ornament),
    /// MDF、字体指定。
    FontStyle(FontStyle),
    /// CFS、文字フォント設定。
    CharacterFont(u32),
    /// PRA、内蔵音再生。
    BuiltinSound(u32),
    /// SCS、後続符号列読み飛ばし制御。
    SkipCharacterSet,
    /// 型付けしていないCSI。
    Other {
        /// 終端文字。
        final_byte: u8,
        /// パラメータ。
        params: ArrayVec<u32, 4>,
    },
}

/// TIME、時間制御。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Time {
    /// 処理待ち。内包する値は中断する時間（単位は0.1秒）で`0..=63`の範囲である。
    Wait(u8),
    /// 時刻制御モード。
    Mode(TimeControlMode),
    /// 提示開始時刻（単位はミリ秒）。
    PresentationStart(u64),
    /// オフセット時間（単位はミリ秒）。
    Offset(u64),
    /// 演奏時間（単位は秒）。
    Performance(u64),
    /// 表示終了時刻（単位はミリ秒）。
    DisplayEnd(u64),
}

/// 制御符号。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    /// NUL、空白。
    Null,
    /// BEL、ベル。
    Bell,
    /// APB、動作位置後退。
    ActivePositionBackward,
    /// APF、動作位置前進。
    ActivePositionForward,
    /// APD、動作行前進。
    ActivePositionDown,
    /// APU、動作行後退。
    ActivePositionUp,
    /// CS、画面消去。
    ClearScreen,
    /// APR、動作位置改行。
    ActivePositionReturn,
    /// PAPF、指定動作位置前進。内包する値は`0..=63`の範囲である。
    ParameterizedActivePositionForward(u8),
    /// CAN、取消。
    Cancel,
    /// APS、動作位置指定。
    ActivePositionSet {
        /// 行で`0..=63`の範囲である。
        row: u8,
        /// 桁で`0..=63`の範囲である。
        col: u8,
    },
    /// RS、データヘッダ識別符号。
    RecordSeparator,
    /// US、データユニット識別符号。
    UnitSeparator,
    /// SP、スペース。
    Space,
    /// DEL、デリート。
    Delete,

    /// LS0・LS1およびESCによるLS2・LS3・LS1R・LS2R・LS3R、符号の呼び出し。
    LockingShift {
        /// 呼び出し先。
        area: InvocationArea,
        /// 呼び出す符号。
        register: Designator,
    },
    /// SS2・SS3、次の1文字だけGLに呼び出す。
    SingleShift(Designator),
    /// ESCによる符号の指示。
    Designate {
        /// 指示先。
        register: Designator,
        /// 指示する符号集合。
        set: GraphicSet,
    },

    /// 色指定。
    Color(Color),
    /// SSZ・MSZ・NSZ・SZX、文字サイズ。
    CharSize(CharSize),
    /// FLC、フラッシング制御。
    Flashing(Flashing),
    /// CDC、コンシール制御。
    Conceal {
        /// 第1パラメータ。
        p1: u8,
        /// `p1`が`0x20`の場合の第2パラメータ。
        p2: Option<u8>,
    },
    /// POL、パターン極性。
    Polarity(Polarity),
    /// WMM、書込みモード変更。
    WritingMode(WritingMode),
    /// MACRO、マクロ定義。
    MacroDefinition {
        /// 定義するマクロの符号。
        code: GraphicCode,
        /// 定義後に実行する場合は`true`。
        run: bool,
        /// マクロの本体。
        body: Vec<u8>,
    },
    /// マクロ符号集合による、マクロの呼び出し。
    MacroInvoke(GraphicCode),
    /// HLC、囲み制御。内包する値は`0..=15`の範囲である。
    HighlightBlock(u8),
    /// RPC、文字繰り返し。内包する値は`0..=63`の範囲である。
    RepeatCharacter(u8),
    /// SPL、アンダーライン終了およびモザイク分離終了。
    StopLining,
    /// STL、アンダーライン開始およびモザイク分離開始。
    StartLining,
    /// CSI、拡張制御符号。
    Csi(Csi),
    /// TIME、時間制御。
    Time(Time),

    /// 制御符号表にない符号、またはパラメータが不明な制御符号。
    ///
    /// 内包する値は先頭の1バイトである。
    Unknown(u8),
}

/// 文の内容。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// 図形文字。
    Char(Character),
    /// 制御符号。
    Control(Control),
}

/// デコーダが1回の呼び出しで返す単位。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// 内容。
    pub kind: StatementKind,
    /// 入力から消費したバイト数。
    ///
    /// マクロの展開によって生じた文は入力を消費しないため`0`となる。
    pub len: usize,
}

impl Statement {
    /// 図形文字であればそれを返す。
    #[inline]
    pub fn as_char(&self) -> Option<&Character> {
        match &self.kind {
            StatementKind::Char(c) => Some(c),
            StatementKind::Control(_) => None,
        }
    }

    /// 制御符号であればそれを返す。
    #[inline]
    pub fn as_control(&self) -> Option<&Control> {
        match &self.kind {
            StatementKind::Char(_) => None,
            StatementKind::Control(c) => Some(c),
        }
    }
}
