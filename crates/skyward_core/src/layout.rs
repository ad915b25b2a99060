use std::fmt;

use serde::{Deserialize, Serialize};

use crate::field::{Encoding, FieldDescriptor};

pub const HEADER_LEN: usize = 0x20;
pub const SLOT_COUNT: usize = 3;
pub const CHECKSUM_WIDTH: usize = 4;

/// Slot-relative offset where the HP/location block begins. PAL saves insert
/// extra bytes before it, so everything from here on moves with the region.
pub const TAIL_START: usize = 0x5300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        (self.start..self.end).contains(&offset)
    }

    pub fn contains_range(&self, other: ByteRange) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    pub fn as_range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// One of the three adventures stored side by side in a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GameSlot {
    Game1,
    Game2,
    Game3,
}

impl GameSlot {
    pub const ALL: [GameSlot; SLOT_COUNT] = [Self::Game1, Self::Game2, Self::Game3];

    pub const fn index(self) -> usize {
        match self {
            Self::Game1 => 0,
            Self::Game2 => 1,
            Self::Game3 => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// 1-based number as shown to players.
    pub fn number(self) -> usize {
        self.index() + 1
    }
}

impl fmt::Display for GameSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Game {}", self.number())
    }
}

/// Per-slot field descriptors for one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotFields {
    pub play_time: FieldDescriptor,
    pub save_time: FieldDescriptor,
    pub player_position: FieldDescriptor,
    pub player_rotation: FieldDescriptor,
    pub camera_position: FieldDescriptor,
    pub camera_rotation: FieldDescriptor,
    pub player_name: FieldDescriptor,
    pub hero_mode: FieldDescriptor,
    pub intro_viewed: FieldDescriptor,
    pub rupees: FieldDescriptor,
    pub total_hp: FieldDescriptor,
    pub unk_hp: FieldDescriptor,
    pub current_hp: FieldDescriptor,
    pub room_id: FieldDescriptor,
    pub current_map: FieldDescriptor,
    pub current_area: FieldDescriptor,
    pub current_room: FieldDescriptor,
    pub new_game: FieldDescriptor,
    pub night: FieldDescriptor,
}

impl SlotFields {
    pub const fn all(&self) -> [FieldDescriptor; 19] {
        [
            self.play_time,
            self.save_time,
            self.player_position,
            self.player_rotation,
            self.camera_position,
            self.camera_rotation,
            self.player_name,
            self.hero_mode,
            self.intro_viewed,
            self.rupees,
            self.total_hp,
            self.unk_hp,
            self.current_hp,
            self.room_id,
            self.current_map,
            self.current_area,
            self.current_room,
            self.new_game,
            self.night,
        ]
    }

    pub fn by_name(&self, name: &str) -> Option<FieldDescriptor> {
        self.all().into_iter().find(|field| field.name == name)
    }

    const fn with_tail_shift(self, delta: usize) -> Self {
        Self {
            total_hp: self.total_hp.shifted(delta),
            unk_hp: self.unk_hp.shifted(delta),
            current_hp: self.current_hp.shifted(delta),
            room_id: self.room_id.shifted(delta),
            current_map: self.current_map.shifted(delta),
            current_area: self.current_area.shifted(delta),
            current_room: self.current_room.shifted(delta),
            new_game: self.new_game.shifted(delta),
            night: self.night.shifted(delta),
            ..self
        }
    }
}

#[rustfmt::skip]
const RETAIL_FIELDS: SlotFields = SlotFields {
    play_time:       FieldDescriptor::new("play_time",       0x0000, Encoding::U64),
    save_time:       FieldDescriptor::new("save_time",       0x0008, Encoding::U64),
    player_position: FieldDescriptor::new("player_position", 0x0010, Encoding::Vec3),
    player_rotation: FieldDescriptor::new("player_rotation", 0x001C, Encoding::Vec3),
    camera_position: FieldDescriptor::new("camera_position", 0x0028, Encoding::Vec3),
    camera_rotation: FieldDescriptor::new("camera_rotation", 0x0034, Encoding::Vec3),
    player_name:     FieldDescriptor::new("player_name",     0x08D4, Encoding::Utf16(8)),
    hero_mode:       FieldDescriptor::bit("hero_mode",       0x08FE, 0x08),
    intro_viewed:    FieldDescriptor::bit("intro_viewed",    0x0941, 0x01),
    rupees:          FieldDescriptor::new("rupees",          0x0A5E, Encoding::U16),
    total_hp:        FieldDescriptor::new("total_hp",        0x5302, Encoding::U16),
    unk_hp:          FieldDescriptor::new("unk_hp",          0x5304, Encoding::U16),
    current_hp:      FieldDescriptor::new("current_hp",      0x5306, Encoding::U16),
    room_id:         FieldDescriptor::new("room_id",         0x5309, Encoding::U8),
    current_map:     FieldDescriptor::new("current_map",     0x531C, Encoding::Ascii(32)),
    current_area:    FieldDescriptor::new("current_area",    0x533C, Encoding::Ascii(32)),
    current_room:    FieldDescriptor::new("current_room",    0x535C, Encoding::Ascii(32)),
    new_game:        FieldDescriptor::new("new_game",        0x53AD, Encoding::U8),
    night:           FieldDescriptor::bit("night",           0x53B3, 0x01),
};

const PAL_TAIL_SHIFT: usize = 0x10;
const PAL_FIELDS: SlotFields = RETAIL_FIELDS.with_tail_shift(PAL_TAIL_SHIFT);

/// Everything that differs between regional saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionLayout {
    pub signature: [u8; 4],
    pub file_len: usize,
    pub slot_stride: usize,
    /// Bytes inserted before [`TAIL_START`] relative to retail NTSC saves.
    pub tail_shift: usize,
    pub fields: SlotFields,
}

pub(crate) const NTSC_U_LAYOUT: RegionLayout = RegionLayout {
    signature: *b"SOUE",
    file_len: 0xFBE0,
    slot_stride: 0x53C0,
    tail_shift: 0,
    fields: RETAIL_FIELDS,
};

pub(crate) const NTSC_J_LAYOUT: RegionLayout = RegionLayout {
    signature: *b"SOUJ",
    ..NTSC_U_LAYOUT
};

pub(crate) const PAL_LAYOUT: RegionLayout = RegionLayout {
    signature: *b"SOUP",
    file_len: 0xFBD0,
    slot_stride: 0x53D0,
    tail_shift: PAL_TAIL_SHIFT,
    fields: PAL_FIELDS,
};

impl RegionLayout {
    pub const fn slot_range(&self, slot: GameSlot) -> ByteRange {
        let start = HEADER_LEN + slot.index() * self.slot_stride;
        ByteRange {
            start,
            end: start + self.slot_stride,
        }
    }

    pub const fn slots_end(&self) -> usize {
        HEADER_LEN + SLOT_COUNT * self.slot_stride
    }

    pub const fn checksum_offset(&self) -> usize {
        self.slots_end()
    }

    /// Bytes fed into the checksum: everything before the checksum field.
    pub const fn checksum_range(&self) -> ByteRange {
        ByteRange {
            start: 0,
            end: self.checksum_offset(),
        }
    }

    pub const fn checksum_field(&self) -> ByteRange {
        let start = self.checksum_offset();
        ByteRange {
            start,
            end: start + CHECKSUM_WIDTH,
        }
    }

    pub const fn padding(&self) -> ByteRange {
        ByteRange {
            start: self.checksum_field().end,
            end: self.file_len,
        }
    }

    /// Move a slot-relative offset recorded against retail NTSC saves into
    /// this region's slot.
    pub const fn adjust(&self, field: FieldDescriptor) -> FieldDescriptor {
        if field.offset >= TAIL_START {
            field.shifted(self.tail_shift)
        } else {
            field
        }
    }

    /// Checksum and padding fit inside the file and every field fits inside
    /// a slot. Evaluated at compile time for the built-in layouts.
    pub const fn is_consistent(&self) -> bool {
        if self.checksum_offset() + CHECKSUM_WIDTH > self.file_len {
            return false;
        }
        let fields = self.fields.all();
        let mut i = 0;
        while i < fields.len() {
            let field = fields[i];
            if field.offset + field.width() > self.slot_stride {
                return false;
            }
            i += 1;
        }
        true
    }
}

const _: () = assert!(NTSC_U_LAYOUT.is_consistent());
const _: () = assert!(NTSC_J_LAYOUT.is_consistent());
const _: () = assert!(PAL_LAYOUT.is_consistent());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_reject_fields_past_the_stride() {
        assert!(PAL_LAYOUT.is_consistent());
        let cramped = RegionLayout {
            slot_stride: 0x53B0,
            ..NTSC_U_LAYOUT
        };
        assert!(!cramped.is_consistent());
        let short = RegionLayout {
            file_len: NTSC_U_LAYOUT.checksum_offset() + 2,
            ..NTSC_U_LAYOUT
        };
        assert!(!short.is_consistent());
    }

    #[test]
    fn pal_shifts_only_tail_fields() {
        assert_eq!(PAL_FIELDS.rupees, RETAIL_FIELDS.rupees);
        assert_eq!(
            PAL_FIELDS.current_hp.offset,
            RETAIL_FIELDS.current_hp.offset + PAL_TAIL_SHIFT
        );
    }

    #[test]
    fn checksum_sits_after_last_slot() {
        assert_eq!(NTSC_U_LAYOUT.checksum_offset(), 0xFB60);
        assert_eq!(PAL_LAYOUT.checksum_offset(), 0xFB90);
        assert!(!NTSC_U_LAYOUT.checksum_range().contains(0xFB60));
    }

    #[test]
    fn slot_numbers_are_one_based() {
        assert_eq!(GameSlot::from_index(2), Some(GameSlot::Game3));
        assert_eq!(GameSlot::from_index(3), None);
        assert_eq!(GameSlot::Game1.to_string(), "Game 1");
    }

    #[test]
    fn fields_are_found_by_name() {
        assert_eq!(PAL_FIELDS.by_name("current_hp"), Some(PAL_FIELDS.current_hp));
        assert_eq!(RETAIL_FIELDS.by_name("bogus"), None);
    }
}
