use std::{
    collections::BTreeMap,
    fs::File,
    io::{
        BufReader,
        Read,
    },
    path::Path,
    sync::{
        atomic::{
            AtomicBool,
            AtomicUsize,
            Ordering,
        },
        Mutex,
        PoisonError,
        RwLock,
    },
};

use anyhow::Context;
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    MemoryAccess,
    MemoryError,
    MemoryResult,
    RemoteAddress,
    ScatterRequest,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRegion {
    pub address: u64,
    pub bytes: Vec<u8>,
}

/// Serialized form of a memory image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryImageFile {
    #[serde(default)]
    pub modules: BTreeMap<String, u64>,

    #[serde(default)]
    pub regions: Vec<ImageRegion>,
}

/// A sparse, in process copy of the target process memory.
///
/// Used to replay captured memory and as programmable memory within tests.
/// Reads can be forced to fail for specific addresses or for whole round trips.
#[derive(Default)]
pub struct MemoryImage {
    regions: RwLock<BTreeMap<u64, Vec<u8>>>,
    modules: RwLock<BTreeMap<String, RemoteAddress>>,

    failing: RwLock<Vec<RemoteAddress>>,
    fail_round_trips: AtomicBool,

    read_log: Mutex<Vec<RemoteAddress>>,
    read_calls: AtomicUsize,
}

impl MemoryImage {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn from_file(file: MemoryImageFile) -> Self {
        let image = Self::new();
        for (name, base) in file.modules {
            image.register_module(&name, RemoteAddress(base));
        }

        for region in file.regions {
            image.write_bytes(RemoteAddress(region.address), &region.bytes);
        }

        image
    }

    pub fn from_reader(reader: impl Read) -> anyhow::Result<Self> {
        let file: MemoryImageFile =
            serde_json::from_reader(reader).context("parse memory image")?;
        Ok(Self::from_file(file))
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("open memory image {}", path.display()))?;
        let image = Self::from_reader(BufReader::new(file))?;

        log::debug!(
            "Loaded memory image {} ({} regions)",
            path.display(),
            image.region_count()
        );
        Ok(image)
    }

    pub fn region_count(&self) -> usize {
        self.regions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn register_module(&self, name: &str, base: RemoteAddress) {
        self.modules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), base);
    }

    /// Write bytes into the image.
    /// Writes within an existing region patch that region, all other writes create a new region.
    pub fn write_bytes(&self, address: RemoteAddress, bytes: &[u8]) {
        let mut regions = self.regions.write().unwrap_or_else(PoisonError::into_inner);
        if let Some((start, region)) = regions.range_mut(..=address.0).next_back() {
            let offset = (address.0 - *start) as usize;
            if offset + bytes.len() <= region.len() {
                region[offset..offset + bytes.len()].copy_from_slice(bytes);
                return;
            }
        }

        regions.insert(address.0, bytes.to_vec());
    }

    pub fn write_u32(&self, address: RemoteAddress, value: u32) {
        self.write_bytes(address, &value.to_le_bytes());
    }

    pub fn write_i32(&self, address: RemoteAddress, value: i32) {
        self.write_bytes(address, &value.to_le_bytes());
    }

    pub fn write_u64(&self, address: RemoteAddress, value: u64) {
        self.write_bytes(address, &value.to_le_bytes());
    }

    pub fn write_pointer(&self, address: RemoteAddress, target: RemoteAddress) {
        self.write_u64(address, target.0);
    }

    pub fn write_f32_slice(&self, address: RemoteAddress, values: &[f32]) {
        let bytes = values
            .iter()
            .flat_map(|value| value.to_le_bytes())
            .collect::<Vec<_>>();
        self.write_bytes(address, &bytes);
    }

    pub fn write_i32_slice(&self, address: RemoteAddress, values: &[i32]) {
        let bytes = values
            .iter()
            .flat_map(|value| value.to_le_bytes())
            .collect::<Vec<_>>();
        self.write_bytes(address, &bytes);
    }

    pub fn write_utf16(&self, address: RemoteAddress, value: &str) {
        let bytes = value
            .encode_utf16()
            .flat_map(|unit| unit.to_le_bytes())
            .collect::<Vec<_>>();
        self.write_bytes(address, &bytes);
    }

    /// Every read touching this address will fail.
    pub fn fail_address(&self, address: RemoteAddress) {
        self.failing
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(address);
    }

    pub fn restore_address(&self, address: RemoteAddress) {
        self.failing
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|failing| *failing != address);
    }

    /// Let every scatter round trip fail as a whole.
    pub fn set_fail_round_trips(&self, fail: bool) {
        self.fail_round_trips.store(fail, Ordering::Relaxed);
    }

    /// Start addresses of all reads served so far.
    pub fn read_log(&self) -> Vec<RemoteAddress> {
        self.read_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_read_log(&self) {
        self.read_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn copy_into(&self, address: RemoteAddress, buffer: &mut [u8]) -> MemoryResult<()> {
        self.read_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(address);

        let length = buffer.len();
        let read_end = address.0.saturating_add(length.max(1) as u64);
        let failing = self.failing.read().unwrap_or_else(PoisonError::into_inner);
        if failing
            .iter()
            .any(|failing| failing.0 >= address.0 && failing.0 < read_end)
        {
            return Err(MemoryError::InvalidAddress { address, length });
        }

        let regions = self.regions.read().unwrap_or_else(PoisonError::into_inner);
        let (start, region) = regions
            .range(..=address.0)
            .next_back()
            .ok_or(MemoryError::InvalidAddress { address, length })?;

        let offset = (address.0 - *start) as usize;
        if offset >= region.len() {
            return Err(MemoryError::InvalidAddress { address, length });
        }

        let available = region.len() - offset;
        if available < length {
            return Err(MemoryError::PartialRead {
                address,
                copied: available,
                requested: length,
            });
        }

        buffer.copy_from_slice(&region[offset..offset + length]);
        Ok(())
    }
}

impl MemoryAccess for MemoryImage {
    fn read_slice(&self, address: RemoteAddress, buffer: &mut [u8]) -> MemoryResult<()> {
        self.read_calls.fetch_add(1, Ordering::Relaxed);
        self.copy_into(address, buffer)
    }

    fn read_scatter(&self, requests: &mut [ScatterRequest]) -> MemoryResult<()> {
        self.read_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_round_trips.load(Ordering::Relaxed) {
            return Err(MemoryError::ProcessUnavailable);
        }

        for request in requests.iter_mut() {
            request.status = self.copy_into(request.address, &mut request.buffer);
        }

        Ok(())
    }

    fn module_base(&self, name: &str) -> MemoryResult<RemoteAddress> {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
            .ok_or_else(|| MemoryError::UnknownModule(name.to_string()))
    }

    fn total_read_calls(&self) -> usize {
        self.read_calls.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod test {
    use super::MemoryImage;
    use crate::{
        MemoryAccess,
        MemoryAccessExt,
        MemoryError,
        RemoteAddress,
    };

    #[test]
    fn patch_and_read() {
        let memory = MemoryImage::new();
        memory.write_bytes(RemoteAddress(0x1000), &[0u8; 0x20]);
        memory.write_u64(RemoteAddress(0x1008), 0xDEAD_BEEF);

        assert_eq!(memory.region_count(), 1);
        assert_eq!(memory.read::<u64>(RemoteAddress(0x1008)), Ok(0xDEAD_BEEF));
        assert_eq!(memory.read::<u64>(RemoteAddress(0x1000)), Ok(0));
    }

    #[test]
    fn reads_outside_regions_fail() {
        let memory = MemoryImage::new();
        memory.write_u32(RemoteAddress(0x1000), 1);

        assert!(matches!(
            memory.read::<u32>(RemoteAddress(0x0FFF)),
            Err(MemoryError::InvalidAddress { .. })
        ));
        assert!(matches!(
            memory.read::<u64>(RemoteAddress(0x1000)),
            Err(MemoryError::PartialRead {
                copied: 4,
                requested: 8,
                ..
            })
        ));
    }

    #[test]
    fn null_pointer_is_an_error() {
        let memory = MemoryImage::new();
        memory.write_u64(RemoteAddress(0x1000), 0);

        assert_eq!(
            memory.read_pointer(RemoteAddress(0x1000)),
            Err(MemoryError::NullPointer {
                address: RemoteAddress(0x1000)
            })
        );
    }

    #[test]
    fn load_image_file() {
        let json = r#"{
            "modules": { "GameAssembly.dll": 4096 },
            "regions": [ { "address": 8192, "bytes": [1, 0, 0, 0] } ]
        }"#;

        let memory = MemoryImage::from_reader(json.as_bytes()).unwrap();
        assert_eq!(
            memory.module_base("GameAssembly.dll"),
            Ok(RemoteAddress(0x1000))
        );
        assert_eq!(memory.read::<u32>(RemoteAddress(0x2000)), Ok(1));
        assert!(memory.module_base("UnityPlayer.dll").is_err());
    }

    #[test]
    fn restore_failing_address() {
        let memory = MemoryImage::new();
        memory.write_u32(RemoteAddress(0x1000), 7);
        memory.fail_address(RemoteAddress(0x1002));
        assert!(memory.read::<u32>(RemoteAddress(0x1000)).is_err());

        memory.restore_address(RemoteAddress(0x1002));
        assert_eq!(memory.read::<u32>(RemoteAddress(0x1000)), Ok(7));
    }
}
