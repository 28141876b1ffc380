use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Number of bytes in a participant address.
pub const ADDRESS_BYTES: usize = 20;

/// Material used to derive a [`ParticipantId`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentityMaterial {
    /// A raw 32-byte secret, e.g. a wallet seed.
    Seed([u8; 32]),
    /// A human-readable account name such as `alice`.
    Name(String),
}

/// Account address of a ballot participant.
///
/// Addresses are 20 bytes and render as `0x`-prefixed lowercase hex. An
/// address is either parsed from that form or derived deterministically from
/// [`IdentityMaterial`] with BLAKE3, so the same material always maps to the
/// same participant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId([u8; ADDRESS_BYTES]);

impl ParticipantId {
    /// Derive an address from identity material.
    pub fn derive(material: &IdentityMaterial) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"ballot-participant-v1:");
        match material {
            IdentityMaterial::Seed(seed) => {
                hasher.update(b"seed:");
                hasher.update(seed);
            }
            IdentityMaterial::Name(name) => {
                hasher.update(b"name:");
                hasher.update(name.as_bytes());
            }
        }
        let digest = hasher.finalize();
        let mut address = [0u8; ADDRESS_BYTES];
        address.copy_from_slice(&digest.as_bytes()[..ADDRESS_BYTES]);
        Self(address)
    }

    /// Shorthand for deriving from [`IdentityMaterial::Name`].
    pub fn named(name: &str) -> Self {
        Self::derive(&IdentityMaterial::Name(name.to_string()))
    }

    /// Create a random address for tests and demos.
    pub fn ephemeral() -> Self {
        let mut seed = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut seed);
        Self::derive(&IdentityMaterial::Seed(seed))
    }

    /// Create from raw address bytes.
    pub fn from_raw(bytes: [u8; ADDRESS_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }

    /// Full `0x`-prefixed hex form.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Abbreviated form (`0x` plus the first 8 hex characters).
    pub fn short_id(&self) -> String {
        format!("0x{}", hex::encode(&self.0[..4]))
    }

    /// Parse the hex form, with or without the `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != ADDRESS_BYTES {
            return Err(TypeError::InvalidLength {
                expected: ADDRESS_BYTES,
                actual: bytes.len(),
            });
        }
        let mut address = [0u8; ADDRESS_BYTES];
        address.copy_from_slice(&bytes);
        Ok(Self(address))
    }

    /// Resolve user input into an address.
    ///
    /// Input starting with `0x` must be a well-formed address. Anything else
    /// is treated as an account name and derived.
    pub fn resolve(input: &str) -> Result<Self, TypeError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(TypeError::EmptyIdentity);
        }
        if input.starts_with("0x") {
            Self::from_hex(input)
        } else {
            Ok(Self::named(input))
        }
    }
}

impl FromStr for ParticipantId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s)
    }
}

impl fmt::Debug for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParticipantId({})", self.short_id())
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// Serialized as the hex string so addresses can key JSON maps.
impl Serialize for ParticipantId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ParticipantId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_hex(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        let material = IdentityMaterial::Seed([42u8; 32]);
        assert_eq!(
            ParticipantId::derive(&material),
            ParticipantId::derive(&material)
        );
    }

    #[test]
    fn seed_and_name_material_are_separated() {
        let seed = ParticipantId::derive(&IdentityMaterial::Seed([b'a'; 32]));
        let name = ParticipantId::derive(&IdentityMaterial::Name("a".repeat(32)));
        assert_ne!(seed, name);
    }

    #[test]
    fn ephemeral_ids_are_unique() {
        assert_ne!(ParticipantId::ephemeral(), ParticipantId::ephemeral());
    }

    #[test]
    fn hex_form_has_prefix_and_length() {
        let id = ParticipantId::named("alice");
        let hex = id.to_hex();
        assert!(hex.starts_with("0x"));
        assert_eq!(hex.len(), 2 + ADDRESS_BYTES * 2);
        assert_eq!(ParticipantId::from_hex(&hex).unwrap(), id);
        assert_eq!(ParticipantId::from_hex(&hex[2..]).unwrap(), id);
    }

    #[test]
    fn resolve_accepts_names_and_addresses() {
        let alice = ParticipantId::named("alice");
        assert_eq!(ParticipantId::resolve("alice").unwrap(), alice);
        assert_eq!(ParticipantId::resolve(" alice ").unwrap(), alice);
        assert_eq!(ParticipantId::resolve(&alice.to_hex()).unwrap(), alice);
    }

    #[test]
    fn resolve_rejects_malformed_addresses() {
        assert_eq!(
            ParticipantId::resolve("0xabcd"),
            Err(TypeError::InvalidLength {
                expected: ADDRESS_BYTES,
                actual: 2
            })
        );
        assert!(matches!(
            ParticipantId::resolve("0xzz"),
            Err(TypeError::InvalidHex(_))
        ));
        assert_eq!(ParticipantId::resolve("   "), Err(TypeError::EmptyIdentity));
    }

    #[test]
    fn serializes_as_hex_string() {
        let id = ParticipantId::from_raw([0xab; ADDRESS_BYTES]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "ab".repeat(ADDRESS_BYTES)));
        let parsed: ParticipantId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn usable_as_json_map_key() {
        let mut map = std::collections::HashMap::new();
        map.insert(ParticipantId::named("bob"), 3u64);
        let json = serde_json::to_string(&map).unwrap();
        let parsed: std::collections::HashMap<ParticipantId, u64> =
            serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, map);
    }
}
