#![allow(dead_code)]

use skyward_core::{GameSlot, KeyMaterial, Region, SaveDocument, SlotDefaults, checksum};

pub fn keys() -> KeyMaterial {
    let mut bytes = [0u8; 48];
    for (i, b) in bytes.iter_mut().enumerate() {
        *b = (i as u8).wrapping_mul(29).wrapping_add(7);
    }
    KeyMaterial::from_bytes(&bytes).expect("fixture keys")
}

/// A played-looking save: every slot populated, checksum valid.
pub fn sample_save(region: Region) -> Vec<u8> {
    let mut doc = SaveDocument::create(region, None);
    for slot in GameSlot::ALL {
        doc.create_slot(
            slot,
            &SlotDefaults {
                player_name: Some(format!("Link{}", slot.number())),
                rupees: Some(100 * slot.number() as u16),
                current_hp: Some(24),
                heart_containers: Some(6),
            },
        );
        doc.set_new(slot, false);
    }
    doc.update_checksum();
    let bytes = doc.raw_buffer().to_vec();
    assert!(checksum::verify(&bytes, region));
    bytes
}

/// Differing byte offsets between two equal-length buffers.
pub fn diff_offsets(a: &[u8], b: &[u8]) -> Vec<usize> {
    assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .enumerate()
        .filter_map(|(i, (x, y))| (x != y).then_some(i))
        .collect()
}
