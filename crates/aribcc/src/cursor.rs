//! 字幕データを順に読み取るためのバイトカーソル。

use std::collections::VecDeque;
use std::io::{self, Read};

use crate::error::{Error, Result};

/// データグループの先頭に置かれる3バイトの固定値。
///
/// 順にスタッフィングバイト、データ識別、プライベートストリーム識別。
pub const DATA_GROUP_MARKER: [u8; 3] = [0x80, 0xFF, 0xF0];

/// 再同期時に一度に読み込むバイト数。
const RESYNC_CHUNK: usize = 4096;

/// 任意の[`Read`]から、宣言された長さだけを正確に読み取るカーソル。
///
/// 読み取った位置を保持し、要求したバイト数に満たない場合は[`Error::Exhausted`]を返す。
#[derive(Debug)]
pub struct ByteCursor<R> {
    reader: R,
    /// 再同期の際に読み込んだが、まだ返していないバイト列。
    lookahead: VecDeque<u8>,
    pos: u64,
}

impl<R: Read> ByteCursor<R> {
    /// `reader`から読み取る`ByteCursor`を生成する。
    #[inline]
    pub fn new(reader: R) -> ByteCursor<R> {
        ByteCursor {
            reader,
            lookahead: VecDeque::new(),
            pos: 0,
        }
    }

    /// これまでに読み取ったバイト数を返す。
    #[inline]
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// 内包するリーダーを返す。
    ///
    /// 再同期で先読みしたバイト列は失われる。
    #[inline]
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// `buf`に読み込めるだけ読み込み、読み込んだバイト数を返す。
    ///
    /// 戻り値が`buf.len()`より小さい場合はストリームの終端に到達している。
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut n = 0;
        while n < buf.len() {
            let Some(b) = self.lookahead.pop_front() else {
                break;
            };
            buf[n] = b;
            n += 1;
        }

        while n < buf.len() {
            match self.reader.read(&mut buf[n..]) {
                Ok(0) => break,
                Ok(read) => n += read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(Error::Io(e)),
            }
        }

        self.pos += n as u64;
        Ok(n)
    }

    /// `buf`を埋めるだけのバイト列を読み取る。
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let available = self.fill(buf)?;
        if available < buf.len() {
            return Err(Error::Exhausted {
                wanted: buf.len(),
                available,
            });
        }
        Ok(())
    }

    #[inline]
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0; N];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// 1バイトを読み取る。
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        let [b] = self.read_array()?;
        Ok(b)
    }

    /// ビッグエンディアンで16ビット符号無し整数を読み取る。
    #[inline]
    pub fn read_be_16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    /// ビッグエンディアンで24ビット符号無し整数を読み取る。
    #[inline]
    pub fn read_be_24(&mut self) -> Result<u32> {
        let [b1, b2, b3] = self.read_array()?;
        Ok(u32::from_be_bytes([0, b1, b2, b3]))
    }

    /// ビッグエンディアンで32ビット符号無し整数を読み取る。
    #[inline]
    pub fn read_be_32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    /// ビッグエンディアンで64ビット符号無し整数を読み取る。
    #[inline]
    pub fn read_be_64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    /// `len`バイトをそのまま読み取る。
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// 2バイトのCRCを読み取る。
    ///
    /// ストリーム末尾のデータグループではCRCが欠けていることがあるため、
    /// 2バイトに満たない場合は警告を出力して`None`を返す。
    pub fn read_optional_crc(&mut self) -> Result<Option<u16>> {
        let mut buf = [0; 2];
        let available = self.fill(&mut buf)?;
        if available < buf.len() {
            log::warn!(
                "CRC missing at the end of stream ({} of 2 bytes)",
                available
            );
            return Ok(None);
        }
        Ok(Some(u16::from_be_bytes(buf)))
    }

    /// 次の[`DATA_GROUP_MARKER`]まで読み飛ばし、読み飛ばしたバイト数を返す。
    ///
    /// 見つかったマーカーはまだ読み取られていない状態で残るため、
    /// 続けてデータグループを読み取ることができる。
    /// マーカーが見つからないまま終端に到達した場合は[`Error::Exhausted`]を返す。
    pub fn resync(&mut self) -> Result<u64> {
        let finder = memchr::memmem::Finder::new(&DATA_GROUP_MARKER);
        let mut window = Vec::with_capacity(RESYNC_CHUNK + DATA_GROUP_MARKER.len());
        let mut skipped = 0;

        loop {
            let filled = window.len();
            window.resize(filled + RESYNC_CHUNK, 0);
            let n = self.fill(&mut window[filled..])?;
            window.truncate(filled + n);

            if let Some(i) = finder.find(&window) {
                // マーカー以降は読んでいないことにする
                let rest = window.split_off(i);
                self.pos -= rest.len() as u64;
                for &b in rest.iter().rev() {
                    self.lookahead.push_front(b);
                }

                skipped += i as u64;
                log::debug!("resynchronized after {} bytes", skipped);
                return Ok(skipped);
            }

            if n == 0 {
                return Err(Error::Exhausted {
                    wanted: DATA_GROUP_MARKER.len(),
                    available: window.len(),
                });
            }

            // マーカーが境界をまたぐ場合に備えて末尾を残す
            let keep = window.len().min(DATA_GROUP_MARKER.len() - 1);
            let drop = window.len() - keep;
            window.drain(..drop);
            skipped += drop as u64;
        }
    }
}
