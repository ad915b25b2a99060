use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::result::Result as StdResult;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::persist::write_atomic;

pub const KEY_LEN: usize = 16;
pub const KEY_FILE_LEN: usize = KEY_LEN * 3;
pub const DEFAULT_KEY_FILE: &str = "keys.bin";
pub const KEY_CACHE_ENV: &str = "SKYWARD_SE_KEY_CACHE";

#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    pub sd_key: [u8; KEY_LEN],
    pub sd_iv: [u8; KEY_LEN],
    pub digest_salt: [u8; KEY_LEN],
}

impl KeyMaterial {
    /// Parse the raw `keys.bin` layout. Wrong length or an all-zero key is
    /// rejected.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != KEY_FILE_LEN {
            return None;
        }
        let mut material = Self {
            sd_key: [0; KEY_LEN],
            sd_iv: [0; KEY_LEN],
            digest_salt: [0; KEY_LEN],
        };
        material.sd_key.copy_from_slice(&bytes[..KEY_LEN]);
        material.sd_iv.copy_from_slice(&bytes[KEY_LEN..KEY_LEN * 2]);
        material.digest_salt.copy_from_slice(&bytes[KEY_LEN * 2..]);
        material.is_well_formed().then_some(material)
    }

    pub fn to_bytes(&self) -> [u8; KEY_FILE_LEN] {
        let mut out = [0u8; KEY_FILE_LEN];
        out[..KEY_LEN].copy_from_slice(&self.sd_key);
        out[KEY_LEN..KEY_LEN * 2].copy_from_slice(&self.sd_iv);
        out[KEY_LEN * 2..].copy_from_slice(&self.digest_salt);
        out
    }

    fn is_well_formed(&self) -> bool {
        [&self.sd_key, &self.sd_iv, &self.digest_salt]
            .iter()
            .all(|key| key.iter().any(|&b| b != 0))
    }
}

// Never print key bytes.
impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("sd_key", &"<redacted>")
            .field("sd_iv", &"<redacted>")
            .field("digest_salt", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct KeyCache {
    sd_key: String,
    sd_iv: String,
    digest_salt: String,
}

impl KeyCache {
    fn from_material(material: &KeyMaterial) -> Self {
        Self {
            sd_key: encode_hex(&material.sd_key),
            sd_iv: encode_hex(&material.sd_iv),
            digest_salt: encode_hex(&material.digest_salt),
        }
    }

    fn into_material(self) -> Option<KeyMaterial> {
        let material = KeyMaterial {
            sd_key: decode_hex_16(&self.sd_key).ok()?,
            sd_iv: decode_hex_16(&self.sd_iv).ok()?,
            digest_salt: decode_hex_16(&self.digest_salt).ok()?,
        };
        material.is_well_formed().then_some(material)
    }
}

/// Where key material is looked for and persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStoreConfig {
    pub cache_path: Option<PathBuf>,
    pub key_file: PathBuf,
}

impl Default for KeyStoreConfig {
    fn default() -> Self {
        Self {
            cache_path: env::var_os(KEY_CACHE_ENV).map(PathBuf::from),
            key_file: PathBuf::from(DEFAULT_KEY_FILE),
        }
    }
}

/// Session-scoped holder of [`KeyMaterial`]. Keys come from the JSON cache
/// first, then the 48-byte key file; a malformed source is skipped.
#[derive(Debug, Clone, Default)]
pub struct KeyStore {
    config: KeyStoreConfig,
    material: Option<KeyMaterial>,
}

impl KeyStore {
    pub fn new(config: KeyStoreConfig) -> Self {
        Self {
            config,
            material: None,
        }
    }

    pub fn config(&self) -> &KeyStoreConfig {
        &self.config
    }

    /// Try the cache, then the key file. Returns the loaded keys, or `None`
    /// when neither source yields valid material.
    pub fn load(&mut self) -> Option<&KeyMaterial> {
        self.material = self.load_cache().or_else(|| self.load_key_file());
        if self.material.is_none() {
            info!("no console keys available; container saves are disabled");
        }
        self.material.as_ref()
    }

    fn load_cache(&self) -> Option<KeyMaterial> {
        let path = self.config.cache_path.as_ref()?;
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                debug!("key cache {} unavailable: {e}", path.display());
                return None;
            }
        };
        let parsed = serde_json::from_str::<KeyCache>(&text)
            .ok()
            .and_then(KeyCache::into_material);
        match parsed {
            Some(material) => {
                info!("loaded console keys from cache {}", path.display());
                Some(material)
            }
            None => {
                warn!("ignoring malformed key cache {}", path.display());
                None
            }
        }
    }

    fn load_key_file(&self) -> Option<KeyMaterial> {
        let path = &self.config.key_file;
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("key file {} unavailable: {e}", path.display());
                return None;
            }
        };
        match KeyMaterial::from_bytes(&bytes) {
            Some(material) => {
                info!("loaded console keys from {}", path.display());
                Some(material)
            }
            None => {
                warn!(
                    "ignoring key file {}: expected {KEY_FILE_LEN} bytes of non-zero keys, got {}",
                    path.display(),
                    bytes.len()
                );
                None
            }
        }
    }

    /// Persist the held keys to the cache. Returns `false` when there is
    /// nothing to write or no cache path is configured.
    pub fn save(&self) -> Result<bool, CoreError> {
        let (Some(material), Some(path)) = (&self.material, &self.config.cache_path) else {
            return Ok(false);
        };
        let json = serde_json::to_string_pretty(&KeyCache::from_material(material))
            .map_err(|e| CoreError::format(format!("failed to encode key cache: {e}")))?;
        write_atomic(path, json.as_bytes())
            .map_err(|e| CoreError::file(&e, format_args!("writing {}", path.display())))?;
        info!("saved console keys to {}", path.display());
        Ok(true)
    }

    pub fn set_material(&mut self, material: KeyMaterial) {
        self.material = Some(material);
    }

    pub fn is_available(&self) -> bool {
        self.material.is_some()
    }

    pub fn material(&self) -> Option<&KeyMaterial> {
        self.material.as_ref()
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn decode_hex_16(s: &str) -> StdResult<[u8; KEY_LEN], ()> {
    let s = s.trim();
    if s.len() != KEY_LEN * 2 {
        return Err(());
    }
    let mut out = [0u8; KEY_LEN];
    for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
        let hi = hex_nibble(chunk[0])?;
        let lo = hex_nibble(chunk[1])?;
        out[i] = (hi << 4) | lo;
    }
    Ok(out)
}

fn hex_nibble(b: u8) -> StdResult<u8, ()> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        _ => Err(()),
    }
}
