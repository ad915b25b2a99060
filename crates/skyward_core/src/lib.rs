pub mod checksum;
pub mod clock;
pub mod container;
pub mod document;
pub mod error;
pub mod field;
pub mod items;
pub mod keys;
pub mod layout;
mod persist;
pub mod reader;
pub mod region;

pub use container::FileFormat;
pub use document::{
    DocumentEvent, DocumentState, ItemState, OpenReport, SaveDocument, SlotDefaults, SlotSnapshot,
};
pub use error::{ContainerFault, CoreError, CoreErrorCode};
pub use field::{Encoding, FieldDescriptor, FieldType, FieldValue, Vec3};
pub use items::{ItemCategory, ItemEntry, QuantityBounds};
pub use keys::{KeyMaterial, KeyStore, KeyStoreConfig};
pub use layout::GameSlot;
pub use region::Region;

/// Session settings handed to the editor front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    /// Region used for newly created files.
    pub default_region: Region,
    pub keys: KeyStoreConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_region: Region::NtscU,
            keys: KeyStoreConfig::default(),
        }
    }
}

impl EditorConfig {
    pub fn key_store(&self) -> KeyStore {
        KeyStore::new(self.keys.clone())
    }

    /// A fresh document in the configured default region.
    pub fn new_document(&self, keys: Option<KeyMaterial>) -> SaveDocument {
        SaveDocument::create(self.default_region, keys)
    }
}
