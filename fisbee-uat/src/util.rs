use bytes::Buf;

use crate::frame::DecodeError;

/// Fallible fixed-size reads on a [`Buf`].
///
/// Frames handed to us are frequently truncated or corrupted, so every read
/// inside a frame body goes through these instead of the panicking
/// [`Buf`] getters.
pub trait BufReadBytesExt {
    fn try_get_bytes<const N: usize>(&mut self) -> Result<[u8; N], DecodeError>;
}

impl<B: Buf> BufReadBytesExt for B {
    fn try_get_bytes<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut data: [u8; N] = [0; N];
        self.try_copy_to_slice(&mut data[..])?;
        Ok(data)
    }
}

/// Splits `count` bytes off the front of `buffer`.
pub fn take_slice<'a>(buffer: &mut &'a [u8], count: usize) -> Result<&'a [u8], DecodeError> {
    let (head, tail) = buffer
        .split_at_checked(count)
        .ok_or(DecodeError::Truncated {
            expected_length: count,
            buffer_length: buffer.len(),
        })?;
    *buffer = tail;
    Ok(head)
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::{
        frame::DecodeError,
        util::{
            BufReadBytesExt,
            take_slice,
        },
    };

    /// Packs fields of arbitrary width, most significant bit first.
    #[derive(Debug, Default)]
    pub struct BitWriter {
        bytes: Vec<u8>,
        num_bits: usize,
    }

    impl BitWriter {
        pub fn bits(mut self, value: u32, width: usize) -> Self {
            for i in (0..width).rev() {
                if self.num_bits % 8 == 0 {
                    self.bytes.push(0);
                }
                if (value >> i) & 1 != 0 {
                    let last = self.bytes.len() - 1;
                    self.bytes[last] |= 0x80 >> (self.num_bits % 8);
                }
                self.num_bits += 1;
            }
            self
        }

        pub fn bytes(mut self, bytes: &[u8]) -> Self {
            for byte in bytes {
                self = self.bits((*byte).into(), 8);
            }
            self
        }

        pub fn finish(self) -> Vec<u8> {
            self.bytes
        }
    }

    #[test]
    fn it_packs_bits() {
        let bytes = BitWriter::default()
            .bits(0b101, 3)
            .bits(0b11111, 5)
            .bits(0b1, 1)
            .finish();
        assert_eq!(bytes, vec![0b10111111, 0b10000000]);
    }

    #[test]
    fn it_reads_bytes_without_panicking() {
        let mut buffer = &[1u8, 2, 3][..];
        assert_eq!(buffer.try_get_bytes::<2>().unwrap(), [1, 2]);
        assert!(matches!(
            buffer.try_get_bytes::<2>(),
            Err(DecodeError::Truncated {
                expected_length: 2,
                buffer_length: 1
            })
        ));
    }

    #[test]
    fn it_takes_slices() {
        let mut buffer = &[1u8, 2, 3, 4][..];
        assert_eq!(take_slice(&mut buffer, 3).unwrap(), &[1, 2, 3]);
        assert_eq!(buffer, &[4]);
        assert!(take_slice(&mut buffer, 2).is_err());
        assert_eq!(buffer, &[4]);
        assert_eq!(take_slice(&mut buffer, 1).unwrap(), &[4]);
        assert!(buffer.is_empty());
    }
}
