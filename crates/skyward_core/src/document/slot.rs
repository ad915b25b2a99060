use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::layout::GameSlot;
use crate::reader::BigEndianWriter;

use super::SaveDocument;

const NEW_GAME: u8 = 1;
const QUARTERS_PER_HEART: u16 = 4;

/// Values the new-game dialog can pre-fill. Unset fields stay at the reset
/// pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDefaults {
    pub player_name: Option<String>,
    pub rupees: Option<u16>,
    /// In quarter hearts.
    pub current_hp: Option<u16>,
    pub heart_containers: Option<u8>,
}

impl SaveDocument {
    /// Reset `slot` and apply `defaults`. Other slots are untouched; the
    /// checksum is left for the caller to update.
    pub fn create_slot(&mut self, slot: GameSlot, defaults: &SlotDefaults) {
        self.reset_slot_bytes(slot);
        let fields = self.fields();
        if let Some(name) = &defaults.player_name {
            self.set_field(slot, &fields.player_name, name);
        }
        if let Some(rupees) = defaults.rupees {
            self.set_field(slot, &fields.rupees, &rupees);
        }
        if let Some(hearts) = defaults.heart_containers {
            self.set_field(slot, &fields.total_hp, &(u16::from(hearts) * QUARTERS_PER_HEART));
        }
        if let Some(hp) = defaults.current_hp {
            self.set_field(slot, &fields.current_hp, &hp);
        }
        self.mark_modified();
    }

    pub fn delete_slot(&mut self, slot: GameSlot) {
        self.reset_slot_bytes(slot);
        self.mark_modified();
    }

    pub fn is_new(&self, slot: GameSlot) -> bool {
        self.get_field::<u8>(slot, &self.fields().new_game) != 0
    }

    pub fn set_new(&mut self, slot: GameSlot, new: bool) {
        let value = if new { NEW_GAME } else { 0 };
        self.set_field(slot, &self.fields().new_game, &value);
    }

    /// Copy of one slot's bytes, as written by the quest export.
    pub fn export_slot(&self, slot: GameSlot) -> Vec<u8> {
        let range = self.region().layout().slot_range(slot);
        self.raw_buffer()[range.as_range()].to_vec()
    }

    /// Overwrite `slot` with a previously exported slot of the same region.
    /// The checksum is left for the caller to update.
    pub fn import_slot(&mut self, slot: GameSlot, bytes: &[u8]) -> Result<(), CoreError> {
        let region = self.region();
        let range = region.layout().slot_range(slot);
        if bytes.len() != range.len() {
            return Err(CoreError::format(format!(
                "{region} slots are {:#x} bytes, got {:#x}",
                range.len(),
                bytes.len()
            )));
        }
        self.loaded_mut().buffer[range.as_range()].copy_from_slice(bytes);
        self.mark_modified();
        Ok(())
    }

    pub(super) fn reset_slot_bytes(&mut self, slot: GameSlot) {
        let layout = self.region().layout();
        let range = layout.slot_range(slot);
        let sentinel = layout.fields.new_game;
        let mut writer = BigEndianWriter::new(&mut self.loaded_mut().buffer[range.as_range()]);
        writer.fill(0, range.len(), 0);
        writer.write_u8(sentinel.offset, NEW_GAME);
    }
}
