use raid_memory::{
    MemoryAccess,
    MemoryAccessExt,
    MemoryValue,
    RemoteAddress,
};
use raid_offsets::{
    Field,
    FieldShape,
    OffsetTable,
};

use crate::{
    ResolveError,
    ResolveResult,
};

const CLASS_NAME_CHUNK: usize = 0x10;

/// Direct (non batched) access to the managed objects of the target process.
///
/// Only used while constructing entities and during structural re-validation.
/// Every hot path goes through a `ScatterBatch` instead.
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    pub memory: &'a dyn MemoryAccess,
    pub table: &'a OffsetTable,
}

impl<'a> ResolveContext<'a> {
    pub fn new(memory: &'a dyn MemoryAccess, table: &'a OffsetTable) -> Self {
        Self { memory, table }
    }

    /// Resolve the address of `field` relative to `base`.
    pub fn walk(&self, field: Field, base: RemoteAddress) -> ResolveResult<RemoteAddress> {
        let chain = self
            .table
            .chain(field)
            .map_err(|_| ResolveError::MissingOffset(field))?;

        chain
            .walk(self.memory, base)
            .map_err(|source| ResolveError::BrokenChain { field, source })
    }

    /// Resolve the address of the pointer a pointer field follows last.
    pub fn walk_pointer_slot(
        &self,
        field: Field,
        base: RemoteAddress,
    ) -> ResolveResult<RemoteAddress> {
        let chain = self
            .table
            .chain(field)
            .map_err(|_| ResolveError::MissingOffset(field))?
            .pointer_slot()
            .ok_or(ResolveError::MissingOffset(field))?;

        chain
            .walk(self.memory, base)
            .map_err(|source| ResolveError::BrokenChain { field, source })
    }

    pub fn read_value<T: MemoryValue>(&self, field: Field, base: RemoteAddress) -> ResolveResult<T> {
        debug_assert_eq!(field.shape(), FieldShape::Value);

        let address = self.walk(field, base)?;
        self.memory
            .read::<T>(address)
            .map_err(ResolveError::unreadable(field.field_name()))
    }

    /// Read a managed UTF-16 string object.
    pub fn read_string(&self, string: RemoteAddress) -> ResolveResult<String> {
        let length = self.read_value::<i32>(Field::StringLength, string)?;
        let limit = self.table.limits().max_string_chars;
        if length < 0 || length as usize > limit {
            return Err(ResolveError::implausible(
                "string length",
                format!("{} at {} (limit {})", length, string, limit),
            ));
        }

        if length == 0 {
            return Ok(String::new());
        }

        let chars = self.walk(Field::StringChars, string)?;
        self.memory
            .read_utf16(chars, length as usize)
            .map_err(ResolveError::unreadable("string characters"))
    }

    /// Follow `field` to a string object and read it.
    pub fn read_string_field(&self, field: Field, base: RemoteAddress) -> ResolveResult<String> {
        let string = self.walk(field, base)?;
        self.read_string(string)
    }

    /// Read the class name of a managed object.
    pub fn read_class_name(&self, object: RemoteAddress) -> ResolveResult<String> {
        let name = self.walk(Field::ObjectClassName, object)?;
        let limit = self.table.limits().max_string_chars;

        let mut buffer = Vec::with_capacity(CLASS_NAME_CHUNK);
        while buffer.len() < limit {
            let address = name.offset(buffer.len() as u64);
            let chunk = match self.memory.read_bytes(address, CLASS_NAME_CHUNK) {
                Ok(chunk) => chunk,
                Err(_) => self.read_class_name_tail(address)?,
            };

            if let Some(end) = chunk.iter().position(|value| *value == 0) {
                buffer.extend_from_slice(&chunk[..end]);
                return String::from_utf8(buffer)
                    .map_err(|_| ResolveError::implausible("class name", "not valid utf-8"));
            }

            buffer.extend_from_slice(&chunk);
        }

        Err(ResolveError::implausible(
            "class name",
            format!("longer than {} bytes", limit),
        ))
    }

    /// Read the remainder of a name ending close to unreadable memory byte by byte.
    fn read_class_name_tail(&self, address: RemoteAddress) -> ResolveResult<Vec<u8>> {
        let mut chunk = Vec::with_capacity(CLASS_NAME_CHUNK);
        for index in 0..CLASS_NAME_CHUNK {
            let value = self
                .memory
                .read::<u8>(address.offset(index as u64))
                .map_err(ResolveError::unreadable("class name"))?;

            chunk.push(value);
            if value == 0 {
                break;
            }
        }

        Ok(chunk)
    }

    /// Read the element pointers of a managed array object.
    pub fn read_array(
        &self,
        array: RemoteAddress,
        limit: usize,
    ) -> ResolveResult<Vec<RemoteAddress>> {
        let count = self.read_value::<i32>(Field::ArrayCount, array)?;
        self.read_elements(array, count, limit)
    }

    /// Read the element pointers of a managed list object.
    pub fn read_list(&self, list: RemoteAddress, limit: usize) -> ResolveResult<Vec<RemoteAddress>> {
        let count = self.read_value::<i32>(Field::ListCount, list)?;
        if count == 0 {
            return Ok(Vec::new());
        }

        let items = self.walk(Field::ListItems, list)?;
        self.read_elements(items, count, limit)
    }

    fn read_elements(
        &self,
        array: RemoteAddress,
        count: i32,
        limit: usize,
    ) -> ResolveResult<Vec<RemoteAddress>> {
        if count < 0 || count as usize > limit {
            return Err(ResolveError::implausible(
                "element count",
                format!("{} at {} (limit {})", count, array, limit),
            ));
        }

        if count == 0 {
            return Ok(Vec::new());
        }

        let first = self.walk(Field::ArrayFirstElement, array)?;
        self.memory
            .read_vec::<RemoteAddress>(first, count as usize)
            .map_err(ResolveError::unreadable("array elements"))
    }
}
