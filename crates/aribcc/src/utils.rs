/// 要素数`N`のヒープに確保される配列を、`f`を呼び出した戻り値で生成する。
pub fn boxed_array<T, const N: usize, F>(f: F) -> Box<[T; N]>
where
    F: FnMut(usize) -> T,
{
    let slice = (0..N).map(f).collect::<Vec<T>>().into_boxed_slice();

    // Safety: 要素数の分かっている`Box<[T]>`から`Box<[T; N]>`への変換でしかない
    unsafe { Box::from_raw(Box::into_raw(slice) as *mut [T; N]) }
}

/// 4ビットずつ詰められたBCDの各桁を10進数として解釈する。
///
/// 9を超える桁がある場合は`None`を返す。
pub fn bcd_to_u64(bcd: u64, digits: u32) -> Option<u64> {
    (0..digits).rev().try_fold(0u64, |acc, i| {
        let digit = (bcd >> (i * 4)) & 0x0F;
        (digit <= 9).then(|| acc * 10 + digit)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boxed_array() {
        assert_eq!(
            boxed_array::<Option<[u8; 64]>, 8192, _>(|_| None),
            (0..8192)
                .map(|_| None)
                .collect::<Vec<Option<[u8; 64]>>>()
                .try_into()
                .unwrap(),
        );
        assert_eq!(*boxed_array::<usize, 4, _>(|i| i * 2), [0, 2, 4, 6]);
    }

    #[test]
    fn test_bcd_to_u64() {
        assert_eq!(bcd_to_u64(0x1234, 4), Some(1234));
        assert_eq!(bcd_to_u64(0x0000_0059, 2), Some(59));
        assert_eq!(bcd_to_u64(0x12_34_56_789, 9), Some(123456789));
        assert_eq!(bcd_to_u64(0x1A, 2), None);
        assert_eq!(bcd_to_u64(0xFF12, 2), Some(12));
    }
}
