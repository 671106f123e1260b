//! DRCS（動的に再定義が可能な外字）の定義とそのキャッシュ。

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::sync::Arc;

use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::cursor::ByteCursor;
use crate::error::Result;

/// DRCSのパターン1つ。
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DrcsGlyph {
    /// フォント識別（4ビット）。
    pub font_id: u8,
    /// 符号化モード（4ビット）。
    pub mode: u8,
    /// 1画素あたりのビット数。
    pub depth: u8,
    /// 横方向の画素数。
    pub width: u8,
    /// 縦方向の画素数。
    pub height: u8,
    /// 左上から行ごとに詰められたパターンデータ。
    pub pattern: Vec<u8>,
}

impl DrcsGlyph {
    /// `cursor`から`DrcsGlyph`を読み取る。
    pub fn read<R: Read>(cursor: &mut ByteCursor<R>) -> Result<DrcsGlyph> {
        let b = cursor.read_u8()?;
        let font_id = (b & 0xF0) >> 4;
        let mode = b & 0x0F;
        let depth = cursor.read_u8()?;
        let width = cursor.read_u8()?;
        let height = cursor.read_u8()?;
        let pattern = cursor.read_bytes(Self::pattern_len(depth, width, height))?;

        Ok(DrcsGlyph {
            font_id,
            mode,
            depth,
            width,
            height,
            pattern,
        })
    }

    /// パターンデータのバイト数を計算する。
    #[inline]
    pub fn pattern_len(depth: u8, width: u8, height: u8) -> usize {
        ((width as usize) * (height as usize) * (depth as usize) + 7) / 8
    }

    /// パターンを1画素1要素に展開する。
    ///
    /// 各要素は`0..2^depth`の範囲で、行優先で並ぶ。
    /// パターンデータが足りない場合は`0`で埋め、余る場合は切り捨てる。
    /// 1画素あたりのビット数が1・2・4以外の場合は`None`を返す。
    pub fn pixels(&self) -> Option<Vec<u8>> {
        let bpp = match self.depth {
            bpp @ (1 | 2 | 4) => bpp as usize,
            _ => return None,
        };
        let mask = (1u8 << bpp) - 1;
        let size = (self.width as usize) * (self.height as usize);

        let pixels = (0..size)
            .map(|i| {
                let bit = i * bpp;
                let Some(&byte) = self.pattern.get(bit / 8) else {
                    return 0;
                };
                let shift = 8 - bpp - bit % 8;
                (byte >> shift) & mask
            })
            .collect();
        Some(pixels)
    }
}

impl fmt::Debug for DrcsGlyph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DrcsGlyph")
            .field("font_id", &self.font_id)
            .field("mode", &self.mode)
            .field("depth", &self.depth)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pattern", &format_args!("[{} bytes]", self.pattern.len()))
            .finish()
    }
}

/// DRCSの符号1つ分の定義。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrcsCharacter {
    /// DRCSの集合番号で、`0..=15`の範囲である。
    pub set: u8,
    /// 正規化された符号。
    pub code: u16,
    /// 符号に対応するパターン。
    pub fonts: SmallVec<[DrcsGlyph; 1]>,
}

impl DrcsCharacter {
    /// `cursor`から`DrcsCharacter`を読み取る。
    ///
    /// 文字符号の上位バイトが`0x41..=0x4F`であればDRCS-1～DRCS-15の1バイト符号、
    /// それ以外はDRCS-0の区点として扱う。
    pub fn read<R: Read>(cursor: &mut ByteCursor<R>) -> Result<DrcsCharacter> {
        let character_code = cursor.read_be_16()?;
        let number_of_font = cursor.read_u8()?;

        let [hi, lo] = character_code.to_be_bytes();
        let (set, code) = match hi {
            0x41..=0x4F => (hi - 0x40, (lo & 0x7F) as u16),
            _ => (0, drcs0_code(hi, lo)),
        };

        let fonts = (0..number_of_font)
            .map(|_| DrcsGlyph::read(cursor))
            .collect::<Result<_>>()?;

        Ok(DrcsCharacter { set, code, fonts })
    }

    /// 各データユニットに含まれるDRCSの定義をすべて読み取る。
    pub fn read_all<R: Read>(cursor: &mut ByteCursor<R>) -> Result<Vec<DrcsCharacter>> {
        let number_of_code = cursor.read_u8()?;
        (0..number_of_code)
            .map(|_| DrcsCharacter::read(cursor))
            .collect()
    }
}

/// DRCS-0の2バイト符号を、区を上位バイト・点を下位バイトとした値に正規化する。
#[inline]
pub fn drcs0_code(c1: u8, c2: u8) -> u16 {
    (((c1 & 0x7F) as u16) << 8) | ((c2 & 0x7F) as u16)
}

/// 最近使われていないものから追い出す、容量付きのDRCSキャッシュ。
///
/// キーは集合番号と正規化された符号の組。
/// 取得も使用とみなして順序を更新する。
#[derive(Debug, Clone)]
pub struct DrcsCache {
    entries: IndexMap<(u8, u16), CacheEntry, FxBuildHasher>,
    // 最後に使われた時点の順で並べたキー
    order: BTreeMap<u64, (u8, u16)>,
    tick: u64,
    capacity: usize,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    glyph: Arc<DrcsGlyph>,
    tick: u64,
}

impl DrcsCache {
    /// 既定の容量。
    pub const DEFAULT_CAPACITY: usize = 4096;

    /// 既定の容量で`DrcsCache`を生成する。
    #[inline]
    pub fn new() -> DrcsCache {
        DrcsCache::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// 容量を指定して`DrcsCache`を生成する。
    ///
    /// `capacity`が`0`の場合は`1`として扱う。
    pub fn with_capacity(capacity: usize) -> DrcsCache {
        DrcsCache {
            entries: IndexMap::default(),
            order: BTreeMap::new(),
            tick: 0,
            capacity: capacity.max(1),
        }
    }

    /// 容量を返す。
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 保持しているパターンの数を返す。
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 何も保持していなければ`true`を返す。
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// パターンを登録する。
    ///
    /// 同じキーがあれば上書きし、容量を超える場合は最も古いものを黙って追い出す。
    pub fn put(&mut self, set: u8, code: u16, glyph: impl Into<Arc<DrcsGlyph>>) {
        let key = (set, code);
        let tick = self.next_tick();
        let entry = CacheEntry {
            glyph: glyph.into(),
            tick,
        };
        if let Some(old) = self.entries.insert(key, entry) {
            self.order.remove(&old.tick);
        }
        self.order.insert(tick, key);

        while self.entries.len() > self.capacity {
            let Some((_, (set, code))) = self.order.pop_first() else {
                break;
            };
            self.entries.swap_remove(&(set, code));
            log::trace!("DRCS-{} {:04X} evicted", set, code);
        }
    }

    /// パターンを取得する。
    pub fn get(&mut self, set: u8, code: u16) -> Option<Arc<DrcsGlyph>> {
        let tick = self.next_tick();
        let entry = self.entries.get_mut(&(set, code))?;
        self.order.remove(&entry.tick);
        self.order.insert(tick, (set, code));
        entry.tick = tick;
        Some(entry.glyph.clone())
    }

    /// 順序を更新せずにパターンがあるか調べる。
    #[inline]
    pub fn contains(&self, set: u8, code: u16) -> bool {
        self.entries.contains_key(&(set, code))
    }

    /// すべてのパターンを破棄する。
    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

impl Default for DrcsCache {
    fn default() -> Self {
        DrcsCache::new()
    }
}
