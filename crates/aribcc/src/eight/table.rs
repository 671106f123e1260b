//! 8単位符号の固定の符号集合。

use super::char::GraphicCode;

/// 復号できない漢字の代わりに使う文字。
pub const PLACEHOLDER: char = '\u{25FB}';

/// 漢字系集合の内、外字として扱う区の範囲。
const GAIJI_ROWS: std::ops::RangeInclusive<u8> = 90..=94;

/// 区点が追加記号（外字）の範囲にあれば`true`を返す。
#[inline]
pub fn is_gaiji(c1: GraphicCode, c2: GraphicCode) -> bool {
    let row = c1.get() - 0x20;
    let cell = c2.get() - 0x20;
    GAIJI_ROWS.contains(&row) && (1..=94).contains(&cell)
}

/// 外字を`char`に変換する。
///
/// 未割り当ての位置や範囲外の場合は`None`を返す。
pub fn decode_gaiji(c1: GraphicCode, c2: GraphicCode) -> Option<char> {
    if !is_gaiji(c1, c2) {
        return None;
    }

    let row = (c1.get() - 0x20 - GAIJI_ROWS.start()) as usize;
    let cell = (c2.get() - 0x21) as usize;
    GAIJI[row][cell]
}

/// 漢字をJIS X 0208の区点として`char`に変換する。
///
/// 復号できない場合は[`PLACEHOLDER`]を返す。
pub fn decode_kanji(c1: GraphicCode, c2: GraphicCode) -> char {
    let bytes = [c1.get() | 0x80, c2.get() | 0x80];
    let decoded = encoding_rs::EUC_JP.decode_without_bom_handling_and_without_replacement(&bytes);

    let mut chars = decoded.as_deref().unwrap_or_default().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => PLACEHOLDER,
    }
}

/// 英数を`char`に変換する。
///
/// ASCIIと同じだが`0x5C`は円記号になる。
#[inline]
pub fn decode_alnum(c: GraphicCode) -> char {
    match c.get() {
        0x5C => '\u{00A5}',
        c => c as char,
    }
}

/// 平仮名を`char`に変換する。
#[inline]
pub fn decode_hira(c: GraphicCode) -> Option<char> {
    let c = c.get();
    HIRAGANA[(c & 0x0F) as usize][((c >> 4) & 0x07) as usize]
}

/// 片仮名を`char`に変換する。
#[inline]
pub fn decode_kata(c: GraphicCode) -> Option<char> {
    let c = c.get();
    KATAKANA[(c & 0x0F) as usize][((c >> 4) & 0x07) as usize]
}

/// JIS X 0201の片仮名を半角片仮名の`char`に変換する。
#[inline]
pub fn decode_jis_x_kata(c: GraphicCode) -> Option<char> {
    match c.get() {
        c @ 0x21..=0x5F => char::from_u32(0xFF61 + (c - 0x21) as u32),
        _ => None,
    }
}

/// `0x60..=0x6F`に予め定義されたマクロを返す。
///
/// それ以外の符号には何も定義されていないため空のスライスを返す。
#[inline]
pub fn default_macro(c: GraphicCode) -> &'static [u8] {
    match c.get() {
        c @ 0x60..=0x6F => DEFAULT_MACROS[(c - 0x60) as usize],
        _ => &[],
    }
}

static DEFAULT_MACROS: [&[u8]; 16] = [
    b"\x1B\x24\x42\x1B\x29\x4A\x1B\x2A\x30\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x24\x42\x1B\x29\x31\x1B\x2A\x30\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x24\x42\x1B\x29\x20\x41\x1B\x2A\x30\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x28\x32\x1B\x29\x34\x1B\x2A\x35\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x28\x32\x1B\x29\x33\x1B\x2A\x35\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x28\x32\x1B\x29\x20\x41\x1B\x2A\x35\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x28\x20\x41\x1B\x29\x20\x42\x1B\x2A\x20\x43\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x28\x20\x44\x1B\x29\x20\x45\x1B\x2A\x20\x46\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x28\x20\x47\x1B\x29\x20\x48\x1B\x2A\x20\x49\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x28\x20\x4A\x1B\x29\x20\x4B\x1B\x2A\x20\x4C\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x28\x20\x4D\x1B\x29\x20\x4E\x1B\x2A\x20\x4F\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x24\x42\x1B\x29\x20\x42\x1B\x2A\x30\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x24\x42\x1B\x29\x20\x43\x1B\x2A\x30\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x24\x42\x1B\x29\x20\x44\x1B\x2A\x30\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x28\x31\x1B\x29\x30\x1B\x2A\x4A\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x28\x4A\x1B\x29\x32\x1B\x2A\x20\x41\x1B\x2B\x20\x70\x0F\x1B\x7D",
];

// 下位4ビットと上位3ビットで引く。
static HIRAGANA: [[Option<char>; 8]; 16] = [
    [None, None, None, Some('ぐ'), Some('だ'), Some('ば'), Some('む'), Some('ゐ')],
    [None, None, Some('ぁ'), Some('け'), Some('ち'), Some('ぱ'), Some('め'), Some('ゑ')],
    [None, None, Some('あ'), Some('げ'), Some('ぢ'), Some('ひ'), Some('も'), Some('を')],
    [None, None, Some('ぃ'), Some('こ'), Some('っ'), Some('び'), Some('ゃ'), Some('ん')],
    [None, None, Some('い'), Some('ご'), Some('つ'), Some('ぴ'), Some('や'), None],
    [None, None, Some('ぅ'), Some('さ'), Some('づ'), Some('ふ'), Some('ゅ'), None],
    [None, None, Some('う'), Some('ざ'), Some('て'), Some('ぶ'), Some('ゆ'), None],
    [None, None, Some('ぇ'), Some('し'), Some('で'), Some('ぷ'), Some('ょ'), Some('ゝ')],
    [None, None, Some('え'), Some('じ'), Some('と'), Some('へ'), Some('よ'), Some('ゞ')],
    [None, None, Some('ぉ'), Some('す'), Some('ど'), Some('べ'), Some('ら'), Some('ー')],
    [None, None, Some('お'), Some('ず'), Some('な'), Some('ぺ'), Some('り'), Some('。')],
    [None, None, Some('か'), Some('せ'), Some('に'), Some('ほ'), Some('る'), Some('「')],
    [None, None, Some('が'), Some('ぜ'), Some('ぬ'), Some('ぼ'), Some('れ'), Some('」')],
    [None, None, Some('き'), Some('そ'), Some('ね'), Some('ぽ'), Some('ろ'), Some('、')],
    [None, None, Some('ぎ'), Some('ぞ'), Some('の'), Some('ま'), Some('ゎ'), Some('・')],
    [None, None, Some('く'), Some('た'), Some('は'), Some('み'), Some('わ'), None],
];

static KATAKANA: [[Option<char>; 8]; 16] = [
    [None, None, None, Some('グ'), Some('ダ'), Some('バ'), Some('ム'), Some('ヰ')],
    [None, None, Some('ァ'), Some('ケ'), Some('チ'), Some('パ'), Some('メ'), Some('ヱ')],
    [None, None, Some('ア'), Some('ゲ'), Some('ヂ'), Some('ヒ'), Some('モ'), Some('ヲ')],
    [None, None, Some('ィ'), Some('コ'), Some('ッ'), Some('ビ'), Some('ャ'), Some('ン')],
    [None, None, Some('イ'), Some('ゴ'), Some('ツ'), Some('ピ'), Some('ヤ'), Some('ヴ')],
    [None, None, Some('ゥ'), Some('サ'), Some('ヅ'), Some('フ'), Some('ュ'), Some('ヵ')],
    [None, None, Some('ウ'), Some('ザ'), Some('テ'), Some('ブ'), Some('ユ'), Some('ヶ')],
    [None, None, Some('ェ'), Some('シ'), Some('デ'), Some('プ'), Some('ョ'), Some('ヽ')],
    [None, None, Some('エ'), Some('ジ'), Some('ト'), Some('ヘ'), Some('ヨ'), Some('ヾ')],
    [None, None, Some('ォ'), Some('ス'), Some('ド'), Some('ベ'), Some('ラ'), Some('ー')],
    [None, None, Some('オ'), Some('ズ'), Some('ナ'), Some('ペ'), Some('リ'), Some('。')],
    [None, None, Some('カ'), Some('セ'), Some('ニ'), Some('ホ'), Some('ル'), Some('「')],
    [None, None, Some('ガ'), Some('ゼ'), Some('ヌ'), Some('ボ'), Some('レ'), Some('」')],
    [None, None, Some('キ'), Some('ソ'), Some('ネ'), Some('ポ'), Some('ロ'), Some('、')],
    [None, None, Some('ギ'), Some('ゾ'), Some('ノ'), Some('マ'), Some('ヮ'), Some('・')],
    [None, None, Some('ク'), Some('タ'), Some('ハ'), Some('ミ'), Some('ワ'), None],
];

// 90区から94区までの追加記号。`None`は未割り当て。
static GAIJI: [[Option<char>; 94]; 5] = [
    // 90区
    [
        Some('\u{26CC}'), Some('\u{26CD}'), Some('\u{2757}'), Some('\u{26CF}'), Some('\u{26D0}'), Some('\u{26D1}'),
        None, Some('\u{26D2}'), Some('\u{26D5}'), Some('\u{26D3}'), Some('\u{26D4}'), None,
        None, None, None, Some('\u{1F17F}'), Some('\u{1F18A}'), None,
        None, Some('\u{26D6}'), Some('\u{26D7}'), Some('\u{26D8}'), Some('\u{26D9}'), Some('\u{26DA}'),
        Some('\u{26DB}'), Some('\u{26DC}'), Some('\u{26DD}'), Some('\u{26DE}'), Some('\u{26DF}'), Some('\u{26E0}'),
        Some('\u{26E1}'), Some('\u{2B55}'), Some('\u{3248}'), Some('\u{3249}'), Some('\u{324A}'), Some('\u{324B}'),
        Some('\u{324C}'), Some('\u{324D}'), Some('\u{324E}'), Some('\u{324F}'), None, None,
        None, None, Some('\u{2491}'), Some('\u{2492}'), Some('\u{2493}'), Some('\u{1F14A}'),
        Some('\u{1F14C}'), Some('\u{1F13F}'), Some('\u{1F146}'), Some('\u{1F14B}'), Some('\u{1F210}'), Some('\u{1F211}'),
        Some('\u{1F212}'), Some('\u{1F213}'), Some('\u{1F142}'), Some('\u{1F214}'), Some('\u{1F215}'), Some('\u{1F216}'),
        Some('\u{1F14D}'), Some('\u{1F131}'), Some('\u{1F13D}'), Some('\u{2B1B}'), Some('\u{2B24}'), Some('\u{1F217}'),
        Some('\u{1F218}'), Some('\u{1F219}'), Some('\u{1F21A}'), Some('\u{1F21B}'), Some('\u{26BF}'), Some('\u{1F21C}'),
        Some('\u{1F21D}'), Some('\u{1F21E}'), Some('\u{1F21F}'), Some('\u{1F220}'), Some('\u{1F221}'), Some('\u{1F222}'),
        Some('\u{1F223}'), Some('\u{1F224}'), Some('\u{1F225}'), Some('\u{1F14E}'), Some('\u{3299}'), Some('\u{1F200}'),
        None, None, None, None, None, None,
        None, None, None, None,
    ],
    // 91区
    [
        Some('\u{26E3}'), Some('\u{2B56}'), Some('\u{2B57}'), Some('\u{2B58}'), Some('\u{2B59}'), Some('\u{2613}'),
        Some('\u{328B}'), Some('\u{3012}'), Some('\u{26E8}'), Some('\u{3246}'), Some('\u{3245}'), Some('\u{26E9}'),
        Some('\u{FD6}'), Some('\u{26EA}'), Some('\u{26EB}'), Some('\u{26EC}'), Some('\u{2668}'), Some('\u{26ED}'),
        Some('\u{26EE}'), Some('\u{26EF}'), Some('\u{2693}'), Some('\u{2708}'), Some('\u{26F0}'), Some('\u{26F1}'),
        Some('\u{26F2}'), Some('\u{26F3}'), Some('\u{26F4}'), Some('\u{26F5}'), Some('\u{1F157}'), Some('\u{24B9}'),
        Some('\u{24C8}'), Some('\u{26F6}'), Some('\u{1F15F}'), Some('\u{1F18B}'), Some('\u{1F18D}'), Some('\u{1F18C}'),
        Some('\u{1F179}'), Some('\u{26F7}'), Some('\u{26F8}'), Some('\u{26F9}'), Some('\u{26FA}'), Some('\u{1F17B}'),
        Some('\u{260E}'), Some('\u{26FB}'), Some('\u{26FC}'), Some('\u{26FD}'), Some('\u{26FE}'), Some('\u{1F17C}'),
        Some('\u{26FF}'), None, None, None, None, None,
        None, None, None, None, None, None,
        None, None, None, None, None, None,
        None, None, None, None, None, None,
        None, None, None, None, None, None,
        None, None, None, None, None, None,
        None, None, None, None, None, None,
        None, None, None, None,
    ],
    // 92区
    [
        Some('\u{27A1}'), Some('\u{2B05}'), Some('\u{2B06}'), Some('\u{2B07}'), Some('\u{2B2F}'), Some('\u{2B2E}'),
        Some('\u{5E74}'), Some('\u{6708}'), Some('\u{65E5}'), Some('\u{5186}'), Some('\u{33A1}'), Some('\u{33A5}'),
        Some('\u{339D}'), Some('\u{33A0}'), Some('\u{33A4}'), Some('\u{1F100}'), Some('\u{2488}'), Some('\u{2489}'),
        Some('\u{248A}'), Some('\u{248B}'), Some('\u{248C}'), Some('\u{248D}'), Some('\u{248E}'), Some('\u{248F}'),
        Some('\u{2490}'), Some('\u{6C0F}'), Some('\u{526F}'), Some('\u{5143}'), Some('\u{6545}'), Some('\u{524D}'),
        Some('\u{65B0}'), Some('\u{1F101}'), Some('\u{1F102}'), Some('\u{1F103}'), Some('\u{1F104}'), Some('\u{1F105}'),
        Some('\u{1F106}'), Some('\u{1F107}'), Some('\u{1F108}'), Some('\u{1F109}'), Some('\u{1F10A}'), Some('\u{3233}'),
        Some('\u{3236}'), Some('\u{3232}'), Some('\u{3231}'), Some('\u{3239}'), Some('\u{3244}'), Some('\u{25B6}'),
        Some('\u{25C0}'), Some('\u{3016}'), Some('\u{3017}'), Some('\u{27D0}'), Some('\u{B2}'), Some('\u{B3}'),
        Some('\u{1F12D}'), None, None, None, None, None,
        None, None, None, None, None, None,
        None, None, None, None, None, None,
        None, None, None, None, None, None,
        None, None, None, None, None, None,
        None, Some('\u{1F12C}'), Some('\u{1F12B}'), Some('\u{3247}'), Some('\u{1F190}'), Some('\u{1F226}'),
        Some('\u{213B}'), None, None, None,
    ],
    // 93区
    [
        Some('\u{322A}'), Some('\u{322B}'), Some('\u{322C}'), Some('\u{322D}'), Some('\u{322E}'), Some('\u{322F}'),
        Some('\u{3230}'), Some('\u{3237}'), Some('\u{337E}'), Some('\u{337D}'), Some('\u{337C}'), Some('\u{337B}'),
        Some('\u{2116}'), Some('\u{2121}'), Some('\u{3036}'), Some('\u{26BE}'), Some('\u{1F240}'), Some('\u{1F241}'),
        Some('\u{1F242}'), Some('\u{1F243}'), Some('\u{1F244}'), Some('\u{1F245}'), Some('\u{1F246}'), Some('\u{1F247}'),
        Some('\u{1F248}'), Some('\u{1F12A}'), Some('\u{1F227}'), Some('\u{1F228}'), Some('\u{1F229}'), Some('\u{1F214}'),
        Some('\u{1F22A}'), Some('\u{1F22B}'), Some('\u{1F22C}'), Some('\u{1F22D}'), Some('\u{1F22E}'), Some('\u{1F22F}'),
        Some('\u{1F230}'), Some('\u{1F231}'), Some('\u{2113}'), Some('\u{338F}'), Some('\u{3390}'), Some('\u{33CA}'),
        Some('\u{339E}'), Some('\u{33A2}'), Some('\u{3371}'), None, None, Some('\u{BD}'),
        Some('\u{2189}'), Some('\u{2153}'), Some('\u{2154}'), Some('\u{BC}'), Some('\u{BE}'), Some('\u{2155}'),
        Some('\u{2156}'), Some('\u{2157}'), Some('\u{2158}'), Some('\u{2159}'), Some('\u{215A}'), Some('\u{2150}'),
        Some('\u{215B}'), Some('\u{2151}'), Some('\u{2152}'), Some('\u{2600}'), Some('\u{2601}'), Some('\u{2602}'),
        Some('\u{26C4}'), Some('\u{2616}'), Some('\u{2617}'), Some('\u{26C9}'), Some('\u{26CA}'), Some('\u{2666}'),
        Some('\u{2665}'), Some('\u{2663}'), Some('\u{2660}'), Some('\u{26CB}'), Some('\u{2A00}'), Some('\u{203C}'),
        Some('\u{2048}'), Some('\u{26C5}'), Some('\u{2614}'), Some('\u{26C6}'), Some('\u{2603}'), Some('\u{26C7}'),
        Some('\u{26A1}'), Some('\u{26C8}'), None, Some('\u{269E}'), Some('\u{269F}'), Some('\u{266B}'),
        Some('\u{260E}'), None, None, None,
    ],
    // 94区
    [
        Some('\u{2160}'), Some('\u{2161}'), Some('\u{2162}'), Some('\u{2163}'), Some('\u{2164}'), Some('\u{2165}'),
        Some('\u{2166}'), Some('\u{2167}'), Some('\u{2168}'), Some('\u{2169}'), Some('\u{216A}'), Some('\u{216B}'),
        Some('\u{2470}'), Some('\u{2471}'), Some('\u{2472}'), Some('\u{2473}'), None, None,
        None, None, None, None, None, None,
        None, None, None, None, None, None,
        None, None, Some('\u{1F110}'), Some('\u{1F111}'), Some('\u{1F112}'), Some('\u{1F113}'),
        Some('\u{1F114}'), Some('\u{1F115}'), Some('\u{1F116}'), Some('\u{1F117}'), Some('\u{1F118}'), Some('\u{1F119}'),
        Some('\u{1F11A}'), Some('\u{1F11B}'), Some('\u{1F11C}'), Some('\u{1F11D}'), Some('\u{1F11E}'), Some('\u{1F11F}'),
        Some('\u{1F120}'), Some('\u{1F121}'), Some('\u{1F122}'), Some('\u{1F123}'), Some('\u{1F124}'), Some('\u{1F125}'),
        Some('\u{1F126}'), Some('\u{1F127}'), Some('\u{1F128}'), Some('\u{1F129}'), Some('\u{3255}'), Some('\u{3256}'),
        Some('\u{3257}'), Some('\u{3258}'), Some('\u{3259}'), Some('\u{325A}'), Some('\u{2460}'), Some('\u{2461}'),
        Some('\u{2462}'), Some('\u{2463}'), Some('\u{2464}'), Some('\u{2465}'), Some('\u{2466}'), Some('\u{2467}'),
        Some('\u{2468}'), Some('\u{2469}'), Some('\u{246A}'), Some('\u{246B}'), Some('\u{246C}'), Some('\u{246D}'),
        Some('\u{246E}'), Some('\u{246F}'), Some('\u{2776}'), Some('\u{2777}'), Some('\u{2778}'), Some('\u{2779}'),
        Some('\u{277A}'), Some('\u{277B}'), Some('\u{277C}'), Some('\u{277D}'), Some('\u{277E}'), Some('\u{277F}'),
        Some('\u{24EB}'), Some('\u{24EC}'), Some('\u{325B}'), None,
    ],
];
