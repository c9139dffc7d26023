//! パイプ上のバイト列 ⇔ `f32` 列
//!
//! 推論プロセスと同じマシン上で動く前提なのでネイティブエンディアン。

use byteorder::{ByteOrder, NativeEndian};
use rgo_core::FLOAT_SIZE;

/// `f32` 列をパイプに流すバイト列にする
pub fn encode_f32s(values: &[f32]) -> Vec<u8> {
    let mut out = vec![0u8; values.len() * FLOAT_SIZE];
    NativeEndian::write_f32_into(values, &mut out);
    out
}

/// バイト列を `f32` 列に戻す。末尾の端数バイトは捨てる。
pub fn decode_f32s(bytes: &[u8]) -> Vec<f32> {
    let n = bytes.len() / FLOAT_SIZE;
    let mut out = vec![0.0f32; n];
    NativeEndian::read_f32_into(&bytes[..n * FLOAT_SIZE], &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_uses_native_layout() {
        let bytes = encode_f32s(&[0.5, -2.0]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..4], &0.5f32.to_ne_bytes());
        assert_eq!(&bytes[4..], &(-2.0f32).to_ne_bytes());
    }

    #[test]
    fn decode_drops_partial_tail() {
        let mut bytes = encode_f32s(&[1.25, 3.0]);
        bytes.extend_from_slice(&[0xAA, 0xBB]);
        assert_eq!(decode_f32s(&bytes), vec![1.25, 3.0]);
        assert!(decode_f32s(&[1, 2, 3]).is_empty());
    }
}
