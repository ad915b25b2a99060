//! Equipment and inventory catalog.
//!
//! Ownership of each item is a single bit; consumables additionally carry a
//! count with a canonical maximum. Counts above the maximum are legal in
//! hand-crafted saves, so writes report them instead of clamping.

use serde::Serialize;

use crate::field::{Encoding, FieldDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ItemCategory {
    Sword,
    Equipment,
    Wallet,
    Ammo,
    Bug,
    Material,
    Collectible,
}

/// Slot-relative location of an item count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantitySpec {
    pub field: FieldDescriptor,
    pub max: u16,
}

impl QuantitySpec {
    /// Largest value the field can physically hold.
    pub fn storable_max(&self) -> u16 {
        match self.field.encoding {
            Encoding::U8 => u8::MAX as u16,
            _ => u16::MAX,
        }
    }

    pub fn bounds(&self, value: u16) -> QuantityBounds {
        if value <= self.max {
            QuantityBounds::InRange
        } else {
            QuantityBounds::OutOfRange { max: self.max }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QuantityBounds {
    InRange,
    OutOfRange { max: u16 },
}

impl QuantityBounds {
    pub fn is_in_range(&self) -> bool {
        matches!(self, Self::InRange)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemEntry {
    pub key: &'static str,
    pub name: &'static str,
    pub category: ItemCategory,
    pub flag: Option<FieldDescriptor>,
    pub quantity: Option<QuantitySpec>,
}

const fn owned(
    key: &'static str,
    name: &'static str,
    category: ItemCategory,
    offset: usize,
    mask: u8,
) -> ItemEntry {
    ItemEntry {
        key,
        name,
        category,
        flag: Some(FieldDescriptor::bit(key, offset, mask)),
        quantity: None,
    }
}

const fn counted(
    key: &'static str,
    name: &'static str,
    category: ItemCategory,
    flag: Option<(usize, u8)>,
    count_offset: usize,
    max: u16,
) -> ItemEntry {
    ItemEntry {
        key,
        name,
        category,
        flag: match flag {
            Some((offset, mask)) => Some(FieldDescriptor::bit(key, offset, mask)),
            None => None,
        },
        quantity: Some(QuantitySpec {
            field: FieldDescriptor::new(key, count_offset, Encoding::U8),
            max,
        }),
    }
}

use ItemCategory::{Ammo, Bug, Collectible, Equipment, Material, Sword, Wallet};

#[rustfmt::skip]
const CATALOG: &[ItemEntry] = &[
    // Swords
    owned("practice_sword",      "Practice Sword",        Sword,     0x09F2, 0x01),
    owned("goddess_sword",       "Goddess Sword",         Sword,     0x09F2, 0x02),
    owned("goddess_longsword",   "Goddess Longsword",     Sword,     0x09F2, 0x04),
    owned("goddess_white_sword", "Goddess White Sword",   Sword,     0x09F2, 0x08),
    owned("master_sword",        "Master Sword",          Sword,     0x09F2, 0x10),
    owned("true_master_sword",   "True Master Sword",     Sword,     0x09F2, 0x20),

    // Equipment
    owned("slingshot",           "Slingshot",             Equipment, 0x09E6, 0x01),
    owned("scattershot",         "Scattershot",           Equipment, 0x09E6, 0x02),
    owned("bug_net",             "Bug Net",               Equipment, 0x09E6, 0x04),
    owned("big_bug_net",         "Big Bug Net",           Equipment, 0x09E6, 0x08),
    owned("beetle",              "Beetle",                Equipment, 0x09E7, 0x01),
    owned("hook_beetle",         "Hook Beetle",           Equipment, 0x09E7, 0x02),
    owned("quick_beetle",        "Quick Beetle",          Equipment, 0x09E7, 0x04),
    owned("tough_beetle",        "Tough Beetle",          Equipment, 0x09E7, 0x08),
    owned("bomb_bag",            "Bomb Bag",              Equipment, 0x09E8, 0x01),
    owned("gust_bellows",        "Gust Bellows",          Equipment, 0x09E8, 0x02),
    owned("whip",                "Whip",                  Equipment, 0x09E8, 0x04),
    owned("clawshots",           "Clawshots",             Equipment, 0x09E8, 0x08),
    owned("bow",                 "Bow",                   Equipment, 0x09E9, 0x01),
    owned("iron_bow",            "Iron Bow",              Equipment, 0x09E9, 0x02),
    owned("sacred_bow",          "Sacred Bow",            Equipment, 0x09E9, 0x04),
    owned("digging_mitts",       "Digging Mitts",         Equipment, 0x09EA, 0x01),
    owned("mogma_mitts",         "Mogma Mitts",           Equipment, 0x09EA, 0x02),
    owned("sailcloth",           "Sailcloth",             Equipment, 0x09EA, 0x04),
    owned("goddess_harp",        "Goddess's Harp",        Equipment, 0x09EA, 0x08),
    owned("water_dragon_scale",  "Water Dragon's Scale",  Equipment, 0x09EB, 0x01),
    owned("fireshield_earrings", "Fireshield Earrings",   Equipment, 0x09EB, 0x02),

    // Wallets
    owned("medium_wallet",       "Medium Wallet",         Wallet,    0x09EC, 0x01),
    owned("big_wallet",          "Big Wallet",            Wallet,    0x09EC, 0x02),
    owned("giant_wallet",        "Giant Wallet",          Wallet,    0x09EC, 0x04),
    owned("tycoon_wallet",       "Tycoon Wallet",         Wallet,    0x09EC, 0x08),

    // Ammo
    counted("arrows",            "Arrows",                Ammo,      None,               0x0A60, 20),
    counted("bombs",             "Bombs",                 Ammo,      None,               0x0A61, 10),
    counted("deku_seeds",        "Deku Seeds",            Ammo,      None,               0x0A62, 20),

    // Bugs
    counted("hornet",               "Hornet",               Bug,       Some((0x09F4, 0x01)), 0x0A63, 99),
    counted("blessed_butterfly",    "Blessed Butterfly",    Bug,       Some((0x09F4, 0x02)), 0x0A64, 99),
    counted("volcanic_ladybug",     "Volcanic Ladybug",     Bug,       Some((0x09F4, 0x04)), 0x0A65, 99),
    counted("gerudo_dragonfly",     "Gerudo Dragonfly",     Bug,       Some((0x09F4, 0x08)), 0x0A66, 99),
    counted("starry_firefly",       "Starry Firefly",       Bug,       Some((0x09F4, 0x10)), 0x0A67, 99),
    counted("woodland_rhino_beetle", "Woodland Rhino Beetle", Bug,     Some((0x09F4, 0x20)), 0x0A68, 99),
    counted("sand_cicada",          "Sand Cicada",          Bug,       Some((0x09F4, 0x40)), 0x0A69, 99),
    counted("sky_stag_beetle",      "Sky Stag Beetle",      Bug,       Some((0x09F4, 0x80)), 0x0A6A, 99),
    counted("faron_grasshopper",    "Faron Grasshopper",    Bug,       Some((0x09F5, 0x01)), 0x0A6B, 99),
    counted("skyloft_mantis",       "Skyloft Mantis",       Bug,       Some((0x09F5, 0x02)), 0x0A6C, 99),
    counted("lanayru_ant",          "Lanayru Ant",          Bug,       Some((0x09F5, 0x04)), 0x0A6D, 99),
    counted("eldin_roller",         "Eldin Roller",         Bug,       Some((0x09F5, 0x08)), 0x0A6E, 99),

    // Materials
    counted("hornet_larvae",     "Hornet Larvae",         Material,  Some((0x09F6, 0x01)), 0x0A6F, 99),
    counted("bird_feather",      "Bird Feather",          Material,  Some((0x09F6, 0x02)), 0x0A70, 99),
    counted("tumbleweed",        "Tumbleweed",            Material,  Some((0x09F6, 0x04)), 0x0A71, 99),
    counted("lizard_tail",       "Lizard Tail",           Material,  Some((0x09F6, 0x08)), 0x0A72, 99),
    counted("eldin_ore",         "Eldin Ore",             Material,  Some((0x09F6, 0x10)), 0x0A73, 99),
    counted("ancient_flower",    "Ancient Flower",        Material,  Some((0x09F6, 0x20)), 0x0A74, 99),
    counted("amber_relic",       "Amber Relic",           Material,  Some((0x09F6, 0x40)), 0x0A75, 99),
    counted("dusk_relic",        "Dusk Relic",            Material,  Some((0x09F6, 0x80)), 0x0A76, 99),
    counted("jelly_blob",        "Jelly Blob",            Material,  Some((0x09F7, 0x01)), 0x0A77, 99),
    counted("monster_claw",      "Monster Claw",          Material,  Some((0x09F7, 0x02)), 0x0A78, 99),
    counted("monster_horn",      "Monster Horn",          Material,  Some((0x09F7, 0x04)), 0x0A79, 99),
    counted("ornamental_skull",  "Ornamental Skull",      Material,  Some((0x09F7, 0x08)), 0x0A7A, 99),
    counted("evil_crystal",      "Evil Crystal",          Material,  Some((0x09F7, 0x10)), 0x0A7B, 99),
    counted("blue_bird_feather", "Blue Bird Feather",     Material,  Some((0x09F7, 0x20)), 0x0A7C, 99),
    counted("golden_skull",      "Golden Skull",          Material,  Some((0x09F7, 0x40)), 0x0A7D, 99),
    counted("goddess_plume",     "Goddess Plume",         Material,  Some((0x09F7, 0x80)), 0x0A7E, 99),

    // Collectibles
    ItemEntry {
        key: "gratitude_crystals",
        name: "Gratitude Crystals",
        category: Collectible,
        flag: None,
        quantity: Some(QuantitySpec {
            field: FieldDescriptor::new("gratitude_crystals", 0x0A80, Encoding::U16),
            max: 80,
        }),
    },
];

pub fn catalog() -> &'static [ItemEntry] {
    CATALOG
}

/// Look an item up by its key (`"master_sword"`) or display name, ignoring
/// case.
pub fn find(name: &str) -> Option<&'static ItemEntry> {
    CATALOG
        .iter()
        .find(|item| item.key.eq_ignore_ascii_case(name) || item.name.eq_ignore_ascii_case(name))
}
