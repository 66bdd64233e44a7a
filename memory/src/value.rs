use nalgebra::{
    Quaternion,
    Vector2,
    Vector3,
    Vector4,
};

use crate::{
    MemoryError,
    MemoryResult,
    RemoteAddress,
};

/// A plain value with a fixed little endian layout within the target process.
pub trait MemoryValue: Sized {
    const SIZE: usize;

    /// Decode the value from exactly `Self::SIZE` bytes.
    fn from_bytes(bytes: &[u8]) -> Self;

    fn decode(bytes: &[u8]) -> MemoryResult<Self> {
        if bytes.len() != Self::SIZE {
            return Err(MemoryError::SizeMismatch {
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }

        Ok(Self::from_bytes(bytes))
    }
}

macro_rules! impl_primitive {
    ($($ty:ty),*) => {
        $(
            impl MemoryValue for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn from_bytes(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_primitive!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl MemoryValue for bool {
    const SIZE: usize = 1;

    fn from_bytes(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

impl MemoryValue for RemoteAddress {
    const SIZE: usize = 8;

    fn from_bytes(bytes: &[u8]) -> Self {
        RemoteAddress(u64::from_bytes(bytes))
    }
}

impl<T: MemoryValue, const N: usize> MemoryValue for [T; N] {
    const SIZE: usize = T::SIZE * N;

    fn from_bytes(bytes: &[u8]) -> Self {
        std::array::from_fn(|index| {
            T::from_bytes(&bytes[index * T::SIZE..(index + 1) * T::SIZE])
        })
    }
}

impl MemoryValue for Vector2<f32> {
    const SIZE: usize = 0x08;

    fn from_bytes(bytes: &[u8]) -> Self {
        Vector2::from(<[f32; 2]>::from_bytes(bytes))
    }
}

impl MemoryValue for Vector3<f32> {
    const SIZE: usize = 0x0C;

    fn from_bytes(bytes: &[u8]) -> Self {
        Vector3::from(<[f32; 3]>::from_bytes(bytes))
    }
}

impl MemoryValue for Vector4<f32> {
    const SIZE: usize = 0x10;

    fn from_bytes(bytes: &[u8]) -> Self {
        Vector4::from(<[f32; 4]>::from_bytes(bytes))
    }
}

/// Quaternions are stored as (x, y, z, w).
impl MemoryValue for Quaternion<f32> {
    const SIZE: usize = 0x10;

    fn from_bytes(bytes: &[u8]) -> Self {
        let [x, y, z, w] = <[f32; 4]>::from_bytes(bytes);
        Quaternion::new(w, x, y, z)
    }
}

/// Decode a tightly packed array of values.
pub fn decode_array<T: MemoryValue>(bytes: &[u8]) -> MemoryResult<Vec<T>> {
    if T::SIZE == 0 || bytes.len() % T::SIZE != 0 {
        return Err(MemoryError::SizeMismatch {
            expected: T::SIZE,
            actual: bytes.len(),
        });
    }

    Ok(bytes.chunks_exact(T::SIZE).map(T::from_bytes).collect())
}

#[cfg(test)]
mod test {
    use nalgebra::Quaternion;

    use super::{
        decode_array,
        MemoryValue,
    };
    use crate::{
        MemoryError,
        RemoteAddress,
    };

    #[test]
    fn decode_little_endian() {
        assert_eq!(u32::decode(&[0x78, 0x56, 0x34, 0x12]), Ok(0x12345678));
        assert_eq!(
            RemoteAddress::decode(&0x1122_3344_5566_7788u64.to_le_bytes()),
            Ok(RemoteAddress(0x1122_3344_5566_7788))
        );
        assert_eq!(
            u32::decode(&[0x00, 0x01]),
            Err(MemoryError::SizeMismatch {
                expected: 4,
                actual: 2
            })
        );
    }

    #[test]
    fn decode_quaternion_order() {
        let mut bytes = Vec::new();
        for value in [1.0f32, 2.0, 3.0, 4.0] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }

        let value = Quaternion::<f32>::decode(&bytes).unwrap();
        assert_eq!(value.w, 4.0);
        assert_eq!(value.i, 1.0);
        assert_eq!(value.k, 3.0);
    }

    #[test]
    fn decode_packed_array() {
        let bytes = [1u8, 0, 2, 0, 3, 0];
        assert_eq!(decode_array::<u16>(&bytes).unwrap(), vec![1, 2, 3]);
        assert!(decode_array::<u32>(&bytes).is_err());
    }
}
