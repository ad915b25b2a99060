use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::layout::{NTSC_J_LAYOUT, NTSC_U_LAYOUT, PAL_LAYOUT, RegionLayout};

static NTSC_U: RegionLayout = NTSC_U_LAYOUT;
static NTSC_J: RegionLayout = NTSC_J_LAYOUT;
static PAL: RegionLayout = PAL_LAYOUT;

/// Retail release a save was written by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    NtscU,
    NtscJ,
    Pal,
}

impl Region {
    pub const ALL: [Region; 3] = [Self::NtscU, Self::NtscJ, Self::Pal];

    pub fn layout(self) -> &'static RegionLayout {
        match self {
            Self::NtscU => &NTSC_U,
            Self::NtscJ => &NTSC_J,
            Self::Pal => &PAL,
        }
    }

    pub fn signature(self) -> [u8; 4] {
        self.layout().signature
    }

    pub fn buffer_len(self) -> usize {
        self.layout().file_len
    }

    pub fn from_signature(signature: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|region| region.signature() == signature)
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::NtscU => "NTSC-U",
            Self::NtscJ => "NTSC-J",
            Self::Pal => "PAL",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ntsc-u" | "ntscu" | "us" | "usa" | "soue" => Ok(Self::NtscU),
            "ntsc-j" | "ntscj" | "jp" | "japan" | "souj" => Ok(Self::NtscJ),
            "pal" | "eu" | "europe" | "soup" => Ok(Self::Pal),
            other => Err(format!(
                "unknown region {other:?}, expected ntsc-u, ntsc-j or pal"
            )),
        }
    }
}

/// Decide which region a plain save buffer belongs to.
///
/// The game ID at offset 0 selects a candidate; the buffer length must then
/// match that region exactly. There is no best guess: anything else is
/// `None`.
pub fn classify(bytes: &[u8]) -> Option<Region> {
    let signature = bytes.get(..4)?;
    let Some(region) = Region::from_signature(signature) else {
        debug!("unrecognised save signature {signature:02x?}");
        return None;
    };
    if bytes.len() != region.buffer_len() {
        debug!(
            "{region} signature with wrong length {:#x}, expected {:#x}",
            bytes.len(),
            region.buffer_len()
        );
        return None;
    }
    Some(region)
}

/// [`classify`] applied to a file on disk. Unreadable files are `None`.
pub fn classify_file(path: impl AsRef<Path>) -> Option<Region> {
    let path = path.as_ref();
    match fs::read(path) {
        Ok(bytes) => classify(&bytes),
        Err(e) => {
            debug!("cannot classify {}: {e}", path.display());
            None
        }
    }
}
