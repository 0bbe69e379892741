//! Code signing information
//!
//! Handles:
//! - Translating a raw signing descriptor into a fixed-shape [`SigningInfo`]
//! - Explicit "unknown" values for every attribute that cannot be determined
//! - Named code signing flag bits for callers that interpret `csFlags`
//! - Reading descriptors for on-disk binaries through `codesign`

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize, Serializer};

use crate::constants::*;
use crate::models::Pid;

pub mod codesign;

/// Code signing flag bits as reported by the kernel (`cs_blobs.h`).
/// Passed through unmodified in `csFlags`.
pub const CS_VALID: u32 = 0x0000_0001;
pub const CS_ADHOC: u32 = 0x0000_0002;
pub const CS_GET_TASK_ALLOW: u32 = 0x0000_0004;
pub const CS_INSTALLER: u32 = 0x0000_0008;
pub const CS_HARD: u32 = 0x0000_0100;
pub const CS_KILL: u32 = 0x0000_0200;
pub const CS_RESTRICT: u32 = 0x0000_0800;
pub const CS_ENFORCEMENT: u32 = 0x0000_1000;
pub const CS_REQUIRE_LV: u32 = 0x0000_2000;
pub const CS_RUNTIME: u32 = 0x0001_0000;
pub const CS_DEV_CODE: u32 = 0x0004_0000;
pub const CS_PLATFORM_BINARY: u32 = 0x0400_0000;
pub const CS_SIGNED: u32 = 0x2000_0000;

/// Signing data as supplied by the signing collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSigningDescriptor {
    /// Code directory hash; empty when not available
    #[serde(default, with = "hex::serde")]
    pub cd_hash: Vec<u8>,
    #[serde(default)]
    pub cs_flags: Option<u32>,
    #[serde(default)]
    pub signing_id: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub is_platform_binary: Option<bool>,
}

/// A signing attribute that is either known or explicitly unknown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningField<T> {
    Known(T),
    Unknown,
}

impl<T> Default for SigningField<T> {
    fn default() -> Self {
        SigningField::Unknown
    }
}

impl<T> SigningField<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            SigningField::Known(value) => Some(value),
            SigningField::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, SigningField::Unknown)
    }
}

impl<T> From<Option<T>> for SigningField<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(SigningField::Unknown, SigningField::Known)
    }
}

impl<T: Serialize> Serialize for SigningField<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SigningField::Known(value) => value.serialize(serializer),
            SigningField::Unknown => serializer.serialize_str(UNKNOWN_VALUE),
        }
    }
}

/// Code signing information for one process
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningInfo {
    /// Lowercase hex code directory hash
    pub cd_hash: SigningField<String>,
    pub cs_flags: SigningField<u32>,
    pub signature_identifier: SigningField<String>,
    pub team_identifier: SigningField<String>,
    pub is_platform_binary: SigningField<bool>,
}

impl SigningInfo {
    /// Signing info with every attribute unknown
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Whether a flag bit is set, if the flags are known
    pub fn has_flag(&self, flag: u32) -> Option<bool> {
        self.cs_flags.known().map(|flags| flags & flag == flag)
    }

    /// Key/value view using the signing attribute names. Always holds all
    /// five keys.
    pub fn to_map(&self) -> BTreeMap<&'static str, serde_json::Value> {
        fn value<T: Serialize>(field: &SigningField<T>) -> serde_json::Value {
            serde_json::to_value(field)
                .unwrap_or_else(|_| serde_json::Value::String(UNKNOWN_VALUE.to_string()))
        }

        BTreeMap::from([
            (KEY_SIGNATURE_CDHASH, value(&self.cd_hash)),
            (KEY_SIGNATURE_FLAGS, value(&self.cs_flags)),
            (KEY_SIGNATURE_IDENTIFIER, value(&self.signature_identifier)),
            (KEY_SIGNATURE_TEAM_IDENTIFIER, value(&self.team_identifier)),
            (KEY_SIGNATURE_PLATFORM_BINARY, value(&self.is_platform_binary)),
        ])
    }
}

/// Translate a raw signing descriptor for `pid` into [`SigningInfo`].
///
/// Never fails: a missing descriptor, an empty or all-zero hash, and
/// empty identifier strings all become `Unknown`. When the platform
/// binary bit is not supplied directly it is read from the flags.
pub fn extract_signing_info(pid: Pid, descriptor: Option<&RawSigningDescriptor>) -> SigningInfo {
    let Some(descriptor) = descriptor else {
        debug!("No signing descriptor for pid {}", pid);
        return SigningInfo::unknown();
    };

    let cd_hash = if descriptor.cd_hash.is_empty() || descriptor.cd_hash.iter().all(|b| *b == 0) {
        SigningField::Unknown
    } else {
        SigningField::Known(hex::encode(&descriptor.cd_hash))
    };

    let non_empty = |value: &Option<String>| -> SigningField<String> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .into()
    };

    let is_platform_binary = descriptor
        .is_platform_binary
        .or_else(|| descriptor.cs_flags.map(|flags| flags & CS_PLATFORM_BINARY != 0))
        .into();

    SigningInfo {
        cd_hash,
        cs_flags: descriptor.cs_flags.into(),
        signature_identifier: non_empty(&descriptor.signing_id),
        team_identifier: non_empty(&descriptor.team_id),
        is_platform_binary,
    }
}
