//! Base58check address encoding.
//!
//! Legacy addresses are `version (1) || hash160 (20) || checksum (4)`,
//! base58-encoded, where the checksum is the first four bytes of
//! `SHA256(SHA256(version || hash160))`.

use sha2::{Digest, Sha256};

use crate::error::IndexError;

/// Decoded payload length: version byte, 20-byte hash, 4-byte checksum.
pub const ADDRESS_PAYLOAD_LEN: usize = 25;

const CHECKSUM_LEN: usize = 4;

/// A validated legacy address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedAddress {
    pub version: u8,
    pub hash160: [u8; 20],
}

fn checksum(body: &[u8]) -> [u8; CHECKSUM_LEN] {
    let first = Sha256::digest(body);
    let second = Sha256::digest(first);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&second[..CHECKSUM_LEN]);
    out
}

/// Decodes and checks `address`. Fails on bad characters, a wrong length,
/// or a checksum mismatch.
pub fn decode(address: &str) -> Result<DecodedAddress, IndexError> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| IndexError::InvalidAddress(format!("{}: {}", address, e)))?;

    if bytes.len() != ADDRESS_PAYLOAD_LEN {
        return Err(IndexError::InvalidAddress(format!(
            "{}: expected {} bytes, got {}",
            address,
            ADDRESS_PAYLOAD_LEN,
            bytes.len()
        )));
    }

    let (body, check) = bytes.split_at(ADDRESS_PAYLOAD_LEN - CHECKSUM_LEN);
    if checksum(body) != check {
        return Err(IndexError::InvalidAddress(format!(
            "{}: checksum mismatch",
            address
        )));
    }

    let mut hash160 = [0u8; 20];
    hash160.copy_from_slice(&body[1..]);
    Ok(DecodedAddress {
        version: body[0],
        hash160,
    })
}

/// Encodes a version byte and hash160 as a base58check address.
pub fn encode(version: u8, hash160: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(ADDRESS_PAYLOAD_LEN);
    payload.push(version);
    payload.extend_from_slice(hash160);
    let check = checksum(&payload);
    payload.extend_from_slice(&check);
    bs58::encode(payload).into_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

    #[test]
    fn genesis_coinbase_address_is_valid() {
        let decoded = decode(GENESIS).unwrap();
        assert_eq!(decoded.version, 0);
        assert_eq!(
            hex::encode(decoded.hash160),
            "62e907b15cbf27d5425399ebf6f0fb50ebb88f18"
        );
    }

    #[test]
    fn encode_inverts_decode() {
        let decoded = decode(GENESIS).unwrap();
        assert_eq!(encode(decoded.version, &decoded.hash160), GENESIS);
    }

    #[test]
    fn altered_character_fails_checksum() {
        let tampered = GENESIS.replace("DivfNa", "DivfNb");
        assert!(matches!(
            decode(&tampered),
            Err(IndexError::InvalidAddress(msg)) if msg.contains("checksum")
        ));
    }

    #[test]
    fn non_base58_characters_are_rejected() {
        // '0', 'O', 'I' and 'l' are not in the alphabet.
        assert!(decode("10OIl").is_err());
        assert!(decode("").is_err());
    }

    #[test]
    fn wrong_length_is_rejected() {
        let short = bs58::encode([0u8; 10]).into_string();
        assert!(decode(&short).is_err());
    }

    #[test]
    fn version_byte_is_preserved() {
        let addr = encode(5, &[7u8; 20]);
        assert!(addr.starts_with('3'));
        assert_eq!(decode(&addr).unwrap().version, 5);
    }
}
