use crate::{
    decode_array,
    MemoryError,
    MemoryResult,
    MemoryValue,
    RemoteAddress,
};

/// A single read within a scatter round trip.
pub struct ScatterRequest {
    pub address: RemoteAddress,
    pub buffer: Vec<u8>,
    pub status: MemoryResult<()>,
}

impl ScatterRequest {
    pub fn new(address: RemoteAddress, length: usize) -> Self {
        Self {
            address,
            buffer: vec![0u8; length],
            /* a request which has not been served is unreadable */
            status: Err(MemoryError::InvalidAddress { address, length }),
        }
    }
}

/// Read access to the memory of the target process.
///
/// Implementations own the transport towards the target process and
/// the timeout of every request. A read never blocks indefinitely.
pub trait MemoryAccess: Send + Sync {
    /// Read `buffer.len()` bytes starting at `address`.
    fn read_slice(&self, address: RemoteAddress, buffer: &mut [u8]) -> MemoryResult<()>;

    /// Serve all requests within one round trip.
    /// Every request carries its own status. An error return indicates
    /// that the round trip itself failed and no request has been served.
    fn read_scatter(&self, requests: &mut [ScatterRequest]) -> MemoryResult<()> {
        for request in requests.iter_mut() {
            request.status = self.read_slice(request.address, &mut request.buffer);
        }

        Ok(())
    }

    /// Base address of a module loaded into the target process.
    fn module_base(&self, name: &str) -> MemoryResult<RemoteAddress>;

    /// Total amount of round trips issued towards the target process.
    fn total_read_calls(&self) -> usize;
}

pub trait MemoryAccessExt: MemoryAccess {
    fn read_bytes(&self, address: RemoteAddress, length: usize) -> MemoryResult<Vec<u8>> {
        let mut buffer = vec![0u8; length];
        self.read_slice(address, &mut buffer)?;
        Ok(buffer)
    }

    fn read<T: MemoryValue>(&self, address: RemoteAddress) -> MemoryResult<T> {
        let buffer = self.read_bytes(address, T::SIZE)?;
        T::decode(&buffer)
    }

    fn read_vec<T: MemoryValue>(&self, address: RemoteAddress, count: usize) -> MemoryResult<Vec<T>> {
        let buffer = self.read_bytes(address, T::SIZE * count)?;
        decode_array(&buffer)
    }

    /// Read a pointer. A null pointer is reported as an error.
    fn read_pointer(&self, address: RemoteAddress) -> MemoryResult<RemoteAddress> {
        let value = self.read::<RemoteAddress>(address)?;
        if value.is_null() {
            return Err(MemoryError::NullPointer { address });
        }

        Ok(value)
    }

    /// Read `length` UTF-16 code units.
    fn read_utf16(&self, address: RemoteAddress, length: usize) -> MemoryResult<String> {
        let units = self.read_vec::<u16>(address, length)?;
        Ok(String::from_utf16_lossy(&units))
    }
}

impl<M: MemoryAccess + ?Sized> MemoryAccessExt for M {}
