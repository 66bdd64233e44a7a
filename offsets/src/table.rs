use std::{
    collections::BTreeMap,
    fs::File,
    io::{
        BufReader,
        Read,
    },
    path::Path,
};

use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    Field,
    FieldShape,
    OffsetChain,
    OffsetError,
    OffsetResult,
};

/// Class names identifying the player structures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTags {
    pub local: String,
    pub observed: String,
}

fn default_usize<const V: usize>() -> usize {
    V
}

/// Upper bounds for values read from the target process.
/// Anything above is considered implausible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLimits {
    #[serde(default = "default_usize::<256>")]
    pub max_players: usize,

    #[serde(default = "default_usize::<128>")]
    pub max_bones: usize,

    #[serde(default = "default_usize::<16384>")]
    pub max_vertices: usize,

    #[serde(default = "default_usize::<128>")]
    pub max_string_chars: usize,

    #[serde(default = "default_usize::<32>")]
    pub max_slots: usize,

    #[serde(default = "default_usize::<1024>")]
    pub max_wishlist: usize,
}

impl Default for TableLimits {
    fn default() -> Self {
        Self {
            max_players: 256,
            max_bones: 128,
            max_vertices: 16384,
            max_string_chars: 128,
            max_slots: 32,
            max_wishlist: 1024,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OffsetTableFile {
    game_version: String,
    module: String,
    type_tags: TypeTags,

    #[serde(default)]
    limits: TableLimits,

    /// Index of each named bone within the bone transform list
    #[serde(default)]
    bones: BTreeMap<String, usize>,

    structures: BTreeMap<String, BTreeMap<String, OffsetChain>>,
}

/// Offsets for one specific build of the target process.
#[derive(Debug, Clone)]
pub struct OffsetTable {
    game_version: String,
    module: String,
    type_tags: TypeTags,
    limits: TableLimits,
    bones: BTreeMap<String, usize>,

    chains: BTreeMap<Field, OffsetChain>,
}

impl OffsetTable {
    pub fn load_from(path: &Path) -> OffsetResult<Self> {
        let file = File::open(path)?;
        let table = Self::from_reader(BufReader::new(file))?;
        log::debug!(
            "Loaded offsets for game version {} from {}",
            table.game_version,
            path.display()
        );
        Ok(table)
    }

    pub fn from_reader(reader: impl Read) -> OffsetResult<Self> {
        let file: OffsetTableFile = serde_json::from_reader(reader)?;
        Self::from_file(file)
    }

    pub fn from_json(value: &str) -> OffsetResult<Self> {
        let file: OffsetTableFile = serde_json::from_str(value)?;
        Self::from_file(file)
    }

    fn from_file(mut file: OffsetTableFile) -> OffsetResult<Self> {
        let mut chains = BTreeMap::new();
        for field in Field::all() {
            let chain = file
                .structures
                .get_mut(field.structure_name())
                .and_then(|structure| structure.remove(field.field_name()));

            let chain = match chain {
                Some(chain) => chain,
                None if field.is_required() => {
                    return Err(OffsetError::MissingField {
                        structure: field.structure_name(),
                        field: field.field_name(),
                    })
                }
                None => continue,
            };

            let shape_valid = match field.shape() {
                FieldShape::Pointer => chain.ends_with_deref(),
                FieldShape::Value => !chain.ends_with_deref(),
            };
            if !shape_valid {
                return Err(OffsetError::InvalidShape {
                    structure: field.structure_name(),
                    field: field.field_name(),
                    expected: match field.shape() {
                        FieldShape::Pointer => "end with a dereference",
                        FieldShape::Value => "not end with a dereference",
                    },
                });
            }

            chains.insert(field, chain);
        }

        for (structure, fields) in file.structures.iter() {
            for name in fields.keys() {
                log::debug!("Ignoring unknown offset {}.{}", structure, name);
            }
        }

        Ok(Self {
            game_version: file.game_version,
            module: file.module,
            type_tags: file.type_tags,
            limits: file.limits,
            bones: file.bones,
            chains,
        })
    }

    pub fn game_version(&self) -> &str {
        &self.game_version
    }

    /// Module the game world locator is relative to
    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn type_tags(&self) -> &TypeTags {
        &self.type_tags
    }

    pub fn limits(&self) -> &TableLimits {
        &self.limits
    }

    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bones.get(name).copied()
    }

    pub fn chain(&self, field: Field) -> OffsetResult<&OffsetChain> {
        self.chains
            .get(&field)
            .ok_or(OffsetError::MissingField {
                structure: field.structure_name(),
                field: field.field_name(),
            })
    }

    pub fn has_field(&self, field: Field) -> bool {
        self.chains.contains_key(&field)
    }
}
