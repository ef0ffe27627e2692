//! 帧编码 / 解码
//!
//! 帧布局固定为 `tag + body + checksum`，由消息体类型决定总长度。
//! 编码时总是重新计算校验和；解码时只报告校验和是否有效，从不修正。

use crate::ids::Tag;
use crate::messages::WireBody;
use crate::ProtocolError;
use bytes::{BufMut, Bytes, BytesMut};

/// 加法校验和：所有字节之和 mod 256
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, byte| acc.wrapping_add(*byte))
}

/// 给定消息体长度时的完整帧长度
pub const fn frame_len(body_len: usize) -> usize {
    Tag::LEN + body_len + 1
}

/// 编码一帧
///
/// 写入标签、消息体（多字节字段为大端），最后追加校验和。
pub fn encode<B: WireBody>(tag: Tag, body: &B) -> Bytes {
    let mut buf = BytesMut::with_capacity(frame_len(B::LEN));
    buf.put_slice(tag.as_bytes());
    body.encode_into(&mut buf);
    debug_assert_eq!(buf.len(), Tag::LEN + B::LEN);
    let sum = checksum(&buf);
    buf.put_u8(sum);
    buf.freeze()
}

/// 解码结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded<B> {
    pub tag: Tag,
    pub body: B,
    pub checksum_valid: bool,
}

/// 按消息体类型解码一帧（`encode` 的逐字节逆操作）
///
/// 长度不符时返回 `InvalidLength`；校验和错误不会返回错误，
/// 而是通过 `checksum_valid` 报告。
pub fn decode<B: WireBody>(bytes: &[u8]) -> Result<Decoded<B>, ProtocolError> {
    let raw = RawFrame::parse(bytes, B::LEN)?;
    let checksum_valid = raw.checksum_valid();
    let body = B::decode(&raw.body)?;
    Ok(Decoded {
        tag: raw.tag,
        body,
        checksum_valid,
    })
}

/// 未解释消息体的原始帧
///
/// 接收路径先读取标签，再根据标签决定消息体长度，所以这里只做切分。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub tag: Tag,
    pub body: Bytes,
    pub checksum: u8,
}

impl RawFrame {
    /// 将恰好 `frame_len(body_len)` 字节切分为标签、消息体和校验和
    pub fn parse(bytes: &[u8], body_len: usize) -> Result<Self, ProtocolError> {
        let expected = frame_len(body_len);
        if bytes.len() != expected {
            return Err(ProtocolError::InvalidLength {
                expected,
                actual: bytes.len(),
            });
        }
        let tag = Tag::from_slice(bytes)?;
        Ok(Self {
            tag,
            body: Bytes::copy_from_slice(&bytes[Tag::LEN..expected - 1]),
            checksum: bytes[expected - 1],
        })
    }

    /// 按接收顺序重新计算的校验和
    pub fn computed_checksum(&self) -> u8 {
        checksum(self.tag.as_bytes()).wrapping_add(checksum(&self.body))
    }

    pub fn checksum_valid(&self) -> bool {
        self.computed_checksum() == self.checksum
    }

    /// 校验和无效时返回 `ChecksumMismatch`
    pub fn verify(self) -> Result<Self, ProtocolError> {
        let expected = self.computed_checksum();
        if expected != self.checksum {
            return Err(ProtocolError::ChecksumMismatch {
                tag: self.tag,
                expected,
                actual: self.checksum,
            });
        }
        Ok(self)
    }

    /// 重新拼出线路字节（用于日志）
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(frame_len(self.body.len()));
        buf.put_slice(self.tag.as_bytes());
        buf.put_slice(&self.body);
        buf.put_u8(self.checksum);
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Opcode;
    use crate::constants::{NUM_CHANNELS, NUM_SAMPLES};
    use crate::messages::{
        ChannelIntensity, Empty, Flag, IntensityTable, Period, SampleTable, ThermistorValues,
    };
    use proptest::prelude::*;
    use std::fmt::Debug;

    fn assert_roundtrip<B>(opcode: Opcode, body: B) -> Result<(), TestCaseError>
    where
        B: WireBody + PartialEq + Debug,
    {
        let tag = Tag::from(opcode);
        let bytes = encode(tag, &body);
        prop_assert_eq!(bytes.len(), frame_len(B::LEN));
        let decoded = decode::<B>(&bytes).unwrap();
        prop_assert_eq!(decoded, Decoded { tag, body, checksum_valid: true });
        Ok(())
    }

    fn arb_sample_table() -> impl Strategy<Value = SampleTable> {
        (
            prop::collection::vec(0.0f64..=1.0, NUM_CHANNELS),
            1usize..=NUM_SAMPLES,
        )
            .prop_map(|(levels, samples_used)| {
                let mut intensities = IntensityTable::default();
                for (index, level) in levels.into_iter().enumerate() {
                    intensities.set(index + 1, level);
                }
                SampleTable::from_intensities(&intensities, samples_used)
            })
    }

    #[test]
    fn test_checksum_wraps() {
        assert_eq!(checksum(&[]), 0);
        assert_eq!(checksum(&[0xFF, 0x02]), 0x01);
        assert_eq!(checksum(&[0x05, 0x05, 0x06, 0x00, 0x10]), 0x20);
    }

    #[test]
    fn test_encode_set_period_layout() {
        let bytes = encode(Tag::from(Opcode::SetPeriod), &Period { ticks: 0x1234 });
        // 05 05 06 | 12 34 | sum
        let sum = 0x05u8 + 0x05 + 0x06 + 0x12 + 0x34;
        assert_eq!(&bytes[..], &[0x05, 0x05, 0x06, 0x12, 0x34, sum]);
    }

    #[test]
    fn test_encode_empty_body() {
        let bytes = encode(Tag::from(Opcode::ThermistorValues), &Empty);
        assert_eq!(&bytes[..], &[0x05, 0x05, 0x80, 0x8A]);
    }

    #[test]
    fn test_decode_reports_bad_checksum() {
        let mut bytes = encode(Tag::from(Opcode::SetPeriod), &Period { ticks: 7 }).to_vec();
        *bytes.last_mut().unwrap() ^= 0xFF;
        let decoded = decode::<Period>(&bytes).unwrap();
        assert!(!decoded.checksum_valid);
        assert_eq!(decoded.body.ticks, 7);
    }

    #[test]
    fn test_decode_wrong_length() {
        let err = decode::<ThermistorValues>(&[0x05, 0x05, 0x80, 0x8A]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::InvalidLength {
                expected: 12,
                actual: 4
            }
        );
    }

    #[test]
    fn test_raw_frame_verify() {
        let bytes = encode(
            Tag::from(Opcode::SetIntensity),
            &ChannelIntensity {
                channel: 3,
                intensity: 0xABCD,
            },
        );
        let raw = RawFrame::parse(&bytes, ChannelIntensity::LEN).unwrap();
        assert_eq!(raw.to_bytes(), bytes);
        assert!(raw.clone().verify().is_ok());

        let corrupted = RawFrame {
            checksum: raw.checksum.wrapping_add(1),
            ..raw
        };
        assert!(matches!(
            corrupted.verify(),
            Err(ProtocolError::ChecksumMismatch { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_thermistor_roundtrip(a: u16, b: u16, c: u16, d: u16) {
            assert_roundtrip(Opcode::ThermistorValues, ThermistorValues { raw: [a, b, c, d] })?;
        }

        #[test]
        fn prop_period_roundtrip(ticks: u16) {
            assert_roundtrip(Opcode::SetPeriod, Period { ticks })?;
        }

        #[test]
        fn prop_flag_roundtrip(value: bool) {
            assert_roundtrip(Opcode::FilePlayback, Flag(value))?;
        }

        #[test]
        fn prop_channel_intensity_roundtrip(channel: u8, intensity: u16) {
            assert_roundtrip(Opcode::SetIntensity, ChannelIntensity { channel, intensity })?;
        }

        #[test]
        fn prop_single_byte_flip_breaks_checksum(
            channel: u8,
            intensity: u16,
            index in 0usize..7,
            flip in 1u8..=255,
        ) {
            let body = ChannelIntensity { channel, intensity };
            let mut bytes = encode(Tag::from(Opcode::SetIntensity), &body).to_vec();
            bytes[index] ^= flip;
            let raw = RawFrame::parse(&bytes, ChannelIntensity::LEN).unwrap();
            prop_assert!(!raw.checksum_valid());
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_sample_table_roundtrip(table in arb_sample_table()) {
            assert_roundtrip(Opcode::LoadFile, table)?;
        }

        #[test]
        fn prop_sample_table_byte_flip_breaks_checksum(
            table in arb_sample_table(),
            index in 0usize..frame_len(SampleTable::LEN),
            flip in 1u8..=255,
        ) {
            let mut bytes = encode(Tag::from(Opcode::LoadFile), &table).to_vec();
            bytes[index] ^= flip;
            let raw = RawFrame::parse(&bytes, SampleTable::LEN).unwrap();
            prop_assert!(!raw.checksum_valid());
        }
    }
}
