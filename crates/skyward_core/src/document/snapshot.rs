use chrono::NaiveDateTime;
use serde::Serialize;

use crate::clock::{self, PlayTime};
use crate::field::Vec3;
use crate::items::{self, ItemCategory};
use crate::layout::GameSlot;

use super::SaveDocument;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemState {
    pub key: &'static str,
    pub name: &'static str,
    pub category: ItemCategory,
    pub owned: Option<bool>,
    pub quantity: Option<u16>,
    pub max: Option<u16>,
}

/// Read-only view of one slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotSnapshot {
    pub slot: GameSlot,
    pub is_new: bool,
    pub player_name: String,
    pub play_time: PlayTime,
    pub save_time: Option<NaiveDateTime>,
    pub rupees: u16,
    pub total_hp: u16,
    pub unk_hp: u16,
    pub current_hp: u16,
    pub hero_mode: bool,
    pub intro_viewed: bool,
    pub night: bool,
    pub player_position: Vec3,
    pub player_rotation: Vec3,
    pub camera_position: Vec3,
    pub camera_rotation: Vec3,
    pub room_id: u8,
    pub current_map: String,
    pub current_area: String,
    pub current_room: String,
    pub items: Vec<ItemState>,
}

impl SaveDocument {
    pub fn snapshot(&self, slot: GameSlot) -> SlotSnapshot {
        let f = self.fields();
        let layout = self.region().layout();
        let items = items::catalog()
            .iter()
            .map(|item| ItemState {
                key: item.key,
                name: item.name,
                category: item.category,
                owned: item
                    .flag
                    .map(|flag| self.get_field(slot, &layout.adjust(flag))),
                quantity: item.quantity.map(|spec| self.read_quantity(slot, &spec)),
                max: item.quantity.map(|spec| spec.max),
            })
            .collect();

        SlotSnapshot {
            slot,
            is_new: self.is_new(slot),
            player_name: self.get_field(slot, &f.player_name),
            play_time: PlayTime::from_ticks(self.get_field(slot, &f.play_time)),
            save_time: clock::save_time_from_ticks(self.get_field(slot, &f.save_time)),
            rupees: self.get_field(slot, &f.rupees),
            total_hp: self.get_field(slot, &f.total_hp),
            unk_hp: self.get_field(slot, &f.unk_hp),
            current_hp: self.get_field(slot, &f.current_hp),
            hero_mode: self.get_field(slot, &f.hero_mode),
            intro_viewed: self.get_field(slot, &f.intro_viewed),
            night: self.get_field(slot, &f.night),
            player_position: self.get_field(slot, &f.player_position),
            player_rotation: self.get_field(slot, &f.player_rotation),
            camera_position: self.get_field(slot, &f.camera_position),
            camera_rotation: self.get_field(slot, &f.camera_rotation),
            room_id: self.get_field(slot, &f.room_id),
            current_map: self.get_field(slot, &f.current_map),
            current_area: self.get_field(slot, &f.current_area),
            current_room: self.get_field(slot, &f.current_room),
            items,
        }
    }
}
