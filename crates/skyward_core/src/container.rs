//! Encrypted on-disk container used by the console's data management.
//!
//! ```text
//! 0x00  4   magic  "Bk\0\x01"
//! 0x04  4   container version
//! 0x08  4   game ID of the wrapped save
//! 0x0C  4   payload length
//! 0x10  16  CBC initialization vector
//! 0x20  32  SHA-256(digest_salt || header[0x00..0x20] || plaintext)
//! 0x40  ..  AES-128-CBC ciphertext of the plain save
//! ```
//!
//! The digest is independent of the save's own CRC: a container can be
//! intact while the save inside it carries a stale checksum, and both layers
//! are checked separately.

use std::path::Path;

use aes::Aes128;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use log::debug;
use sha2::{Digest, Sha256};

use crate::error::ContainerFault;
use crate::keys::KeyMaterial;
use crate::reader::{BigEndianReader, BigEndianWriter};
use crate::region::{self, Region};

pub const MAGIC: [u8; 4] = *b"Bk\0\x01";
pub const VERSION: u32 = 1;
pub const HEADER_LEN: usize = 0x40;
const DIGESTED_HEADER_LEN: usize = 0x20;
const IV_OFFSET: usize = 0x10;
const DIGEST_OFFSET: usize = 0x20;
const BLOCK_LEN: usize = 16;

/// Which on-disk representation a file uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Plain,
    Container,
}

impl FileFormat {
    /// Format implied by a destination path: `.bin` is a container, anything
    /// else is a plain save.
    pub fn for_path(path: &Path) -> Self {
        let is_bin = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("bin"));
        if is_bin { Self::Container } else { Self::Plain }
    }

    /// Format of loaded bytes, judged by the leading signature first and the
    /// path second.
    pub fn detect(path: Option<&Path>, bytes: &[u8]) -> Self {
        if is_container(bytes) {
            Self::Container
        } else if region::classify(bytes).is_some() {
            Self::Plain
        } else {
            path.map_or(Self::Plain, Self::for_path)
        }
    }
}

pub fn is_container(bytes: &[u8]) -> bool {
    bytes.starts_with(&MAGIC)
}

/// Decrypt a container into a plain save buffer.
///
/// No partially decoded buffer is ever returned: every check happens before
/// the plaintext leaves this function.
pub fn decode(raw: &[u8], keys: Option<&KeyMaterial>) -> Result<Vec<u8>, ContainerFault> {
    let keys = keys.ok_or(ContainerFault::MissingKey)?;

    if raw.len() < HEADER_LEN || !is_container(raw) {
        return Err(ContainerFault::BadHeader);
    }
    let header = BigEndianReader::new(&raw[..HEADER_LEN]);
    let version = header.read_u32(0x04);
    if version != VERSION {
        debug!("unsupported container version {version}");
        return Err(ContainerFault::BadHeader);
    }
    let payload_len = header.read_u32(0x0C) as usize;
    let payload = &raw[HEADER_LEN..];
    if payload.len() != payload_len || payload_len % BLOCK_LEN != 0 {
        debug!(
            "container payload length {:#x} does not match header {:#x}",
            payload.len(),
            payload_len
        );
        return Err(ContainerFault::BadHeader);
    }

    let mut iv = [0u8; BLOCK_LEN];
    iv.copy_from_slice(header.read_bytes(IV_OFFSET, BLOCK_LEN));
    let mut plain = payload.to_vec();
    cbc_decrypt(&mut plain, &keys.sd_key, &iv);

    let expected = header.read_bytes(DIGEST_OFFSET, 32);
    if digest(keys, &raw[..DIGESTED_HEADER_LEN], &plain).as_slice() != expected {
        return Err(ContainerFault::BadDigest);
    }

    let Some(region) = region::classify(&plain) else {
        return Err(ContainerFault::UnknownRegion);
    };
    if header.read_bytes(0x08, 4) != region.signature() {
        debug!("container game ID disagrees with wrapped {region} save");
        return Err(ContainerFault::BadHeader);
    }

    Ok(plain)
}

/// Encrypt a plain save buffer into a container.
pub fn encode(
    buffer: &[u8],
    region: Region,
    keys: Option<&KeyMaterial>,
) -> Result<Vec<u8>, ContainerFault> {
    let keys = keys.ok_or(ContainerFault::MissingKey)?;
    assert_eq!(
        buffer.len(),
        region.buffer_len(),
        "encoding a {region} container from a buffer of the wrong length"
    );

    let mut out = vec![0u8; HEADER_LEN + buffer.len()];
    {
        let mut header = BigEndianWriter::new(&mut out[..HEADER_LEN]);
        header.write_bytes(0x00, &MAGIC);
        header.write_u32(0x04, VERSION);
        header.write_bytes(0x08, &region.signature());
        header.write_u32(0x0C, buffer.len() as u32);
        header.write_bytes(IV_OFFSET, &keys.sd_iv);
    }
    let sum = digest(keys, &out[..DIGESTED_HEADER_LEN], buffer);
    out[DIGEST_OFFSET..HEADER_LEN].copy_from_slice(&sum);

    let payload = &mut out[HEADER_LEN..];
    payload.copy_from_slice(buffer);
    cbc_encrypt(payload, &keys.sd_key, &keys.sd_iv);

    Ok(out)
}

/// Re-wrap bytes into `target` format. Plain input is passed through
/// unchanged when the target is plain, and likewise for containers.
pub fn convert(
    bytes: &[u8],
    target: FileFormat,
    keys: Option<&KeyMaterial>,
) -> Result<Vec<u8>, ContainerFault> {
    match (is_container(bytes), target) {
        (true, FileFormat::Container) | (false, FileFormat::Plain) => Ok(bytes.to_vec()),
        (true, FileFormat::Plain) => decode(bytes, keys),
        (false, FileFormat::Container) => {
            let region = region::classify(bytes).ok_or(ContainerFault::UnknownRegion)?;
            encode(bytes, region, keys)
        }
    }
}

fn digest(keys: &KeyMaterial, header: &[u8], plain: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(keys.digest_salt);
    hasher.update(header);
    hasher.update(plain);
    hasher.finalize().into()
}

fn cbc_encrypt(data: &mut [u8], key: &[u8; 16], iv: &[u8; 16]) {
    let cipher = Aes128::new(GenericArray::from_slice(key));
    let mut prev = *iv;
    for chunk in data.chunks_exact_mut(BLOCK_LEN) {
        for (b, p) in chunk.iter_mut().zip(prev.iter()) {
            *b ^= p;
        }
        cipher.encrypt_block(GenericArray::from_mut_slice(chunk));
        prev.copy_from_slice(chunk);
    }
}

fn cbc_decrypt(data: &mut [u8], key: &[u8; 16], iv: &[u8; 16]) {
    let cipher = Aes128::new(GenericArray::from_slice(key));
    let mut prev = *iv;
    for chunk in data.chunks_exact_mut(BLOCK_LEN) {
        let mut saved = [0u8; BLOCK_LEN];
        saved.copy_from_slice(chunk);
        cipher.decrypt_block(GenericArray::from_mut_slice(chunk));
        for (b, p) in chunk.iter_mut().zip(prev.iter()) {
            *b ^= p;
        }
        prev = saved;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KEY_FILE_LEN;

    fn keys() -> KeyMaterial {
        let mut bytes = [0u8; KEY_FILE_LEN];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(37).wrapping_add(11);
        }
        KeyMaterial::from_bytes(&bytes).expect("test keys")
    }

    fn plain(region: Region) -> Vec<u8> {
        let mut bytes = vec![0u8; region.buffer_len()];
        bytes[..4].copy_from_slice(&region.signature());
        for (i, b) in bytes.iter_mut().enumerate().skip(4) {
            *b = (i % 251) as u8;
        }
        bytes
    }

    #[test]
    fn aes128_cbc_matches_nist_vector() {
        // NIST SP 800-38A F.2.1, first block.
        let key = [
            0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6, 0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf,
            0x4f, 0x3c,
        ];
        let iv: [u8; 16] = core::array::from_fn(|i| i as u8);
        let mut block = [
            0x6b, 0xc1, 0xbe, 0xe2, 0x2e, 0x40, 0x9f, 0x96, 0xe9, 0x3d, 0x7e, 0x11, 0x73, 0x93,
            0x17, 0x2a,
        ];
        cbc_encrypt(&mut block, &key, &iv);
        assert_eq!(
            block,
            [
                0x76, 0x49, 0xab, 0xac, 0x81, 0x19, 0xb2, 0x46, 0xce, 0xe9, 0x8e, 0x9b, 0x12, 0xe9,
                0x19, 0x7d
            ]
        );
        cbc_decrypt(&mut block, &key, &iv);
        assert_eq!(block[0], 0x6b);
    }

    #[test]
    fn encode_decode_each_region() {
        let keys = keys();
        for region in Region::ALL {
            let bytes = plain(region);
            let wrapped = encode(&bytes, region, Some(&keys)).expect("encode");
            assert!(is_container(&wrapped));
            assert_ne!(&wrapped[HEADER_LEN..HEADER_LEN + 64], &bytes[..64]);
            assert_eq!(decode(&wrapped, Some(&keys)), Ok(bytes));
        }
    }

    #[test]
    fn missing_key_is_reported_first() {
        let wrapped = encode(&plain(Region::NtscU), Region::NtscU, Some(&keys())).expect("encode");
        assert_eq!(decode(&wrapped, None), Err(ContainerFault::MissingKey));
        assert_eq!(
            encode(&plain(Region::NtscU), Region::NtscU, None),
            Err(ContainerFault::MissingKey)
        );
    }

    #[test]
    fn tampered_ciphertext_fails_digest() {
        let mut wrapped =
            encode(&plain(Region::Pal), Region::Pal, Some(&keys())).expect("encode");
        let last = wrapped.len() - 1;
        wrapped[last] ^= 0x01;
        assert_eq!(decode(&wrapped, Some(&keys())), Err(ContainerFault::BadDigest));
    }

    #[test]
    fn wrong_key_fails_digest() {
        let wrapped = encode(&plain(Region::NtscJ), Region::NtscJ, Some(&keys())).expect("encode");
        let mut other = keys().to_bytes();
        other[0] ^= 0x80;
        let other = KeyMaterial::from_bytes(&other).expect("other keys");
        assert_eq!(decode(&wrapped, Some(&other)), Err(ContainerFault::BadDigest));
    }

    #[test]
    fn bad_magic_and_truncation_are_header_faults() {
        let mut wrapped =
            encode(&plain(Region::NtscU), Region::NtscU, Some(&keys())).expect("encode");
        let keys = keys();
        let truncated = &wrapped[..wrapped.len() - 16];
        assert_eq!(decode(truncated, Some(&keys)), Err(ContainerFault::BadHeader));
        wrapped[0] = b'X';
        assert_eq!(decode(&wrapped, Some(&keys)), Err(ContainerFault::BadHeader));
        assert_eq!(decode(b"Bk", Some(&keys)), Err(ContainerFault::BadHeader));
    }

    /// Container built field by field, with a valid digest over whatever
    /// header and payload it is given.
    fn hand_wrap(keys: &KeyMaterial, game_id: &[u8; 4], bytes: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; HEADER_LEN + bytes.len()];
        {
            let mut header = BigEndianWriter::new(&mut out[..HEADER_LEN]);
            header.write_bytes(0, &MAGIC);
            header.write_u32(4, VERSION);
            header.write_bytes(8, game_id);
            header.write_u32(0x0C, bytes.len() as u32);
            header.write_bytes(IV_OFFSET, &keys.sd_iv);
        }
        let sum = digest(keys, &out[..DIGESTED_HEADER_LEN], bytes);
        out[DIGEST_OFFSET..HEADER_LEN].copy_from_slice(&sum);
        out[HEADER_LEN..].copy_from_slice(bytes);
        cbc_encrypt(&mut out[HEADER_LEN..], &keys.sd_key, &keys.sd_iv);
        out
    }

    #[test]
    fn payload_of_unknown_size_is_rejected() {
        let keys = keys();
        let mut bytes = plain(Region::NtscU);
        bytes.truncate(0x1000);
        let out = hand_wrap(&keys, b"SOUE", &bytes);
        assert_eq!(decode(&out, Some(&keys)), Err(ContainerFault::UnknownRegion));
    }

    #[test]
    fn unsupported_version_is_a_header_fault() {
        let keys = keys();
        let mut wrapped = encode(&plain(Region::NtscU), Region::NtscU, Some(&keys)).expect("encode");
        wrapped[4..8].copy_from_slice(&2u32.to_be_bytes());
        assert_eq!(decode(&wrapped, Some(&keys)), Err(ContainerFault::BadHeader));
    }

    #[test]
    fn game_id_must_match_wrapped_save() {
        let keys = keys();
        let out = hand_wrap(&keys, b"SOUJ", &plain(Region::NtscU));
        assert_eq!(decode(&out, Some(&keys)), Err(ContainerFault::BadHeader));
        let out = hand_wrap(&keys, b"SOUE", &plain(Region::NtscU));
        assert_eq!(decode(&out, Some(&keys)), Ok(plain(Region::NtscU)));
    }

    #[test]
    fn format_follows_extension_and_signature() {
        assert_eq!(
            FileFormat::for_path(Path::new("data.BIN")),
            FileFormat::Container
        );
        assert_eq!(
            FileFormat::for_path(Path::new("wiiking2.sav")),
            FileFormat::Plain
        );
        let wrapped = encode(&plain(Region::NtscU), Region::NtscU, Some(&keys())).expect("encode");
        assert_eq!(
            FileFormat::detect(Some(Path::new("x.sav")), &wrapped),
            FileFormat::Container
        );
        assert_eq!(
            FileFormat::detect(Some(Path::new("x.bin")), &plain(Region::Pal)),
            FileFormat::Plain
        );
    }

    #[test]
    fn convert_is_identity_for_matching_format() {
        let bytes = plain(Region::NtscU);
        assert_eq!(convert(&bytes, FileFormat::Plain, None), Ok(bytes.clone()));
        let wrapped = convert(&bytes, FileFormat::Container, Some(&keys())).expect("wrap");
        assert_eq!(convert(&wrapped, FileFormat::Plain, Some(&keys())), Ok(bytes));
    }
}
