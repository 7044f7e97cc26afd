// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Contains the `StatusCode` type, the severity bits and the subset of named codes that the
//! monitored item services produce or consume.

use std::{error::Error, fmt, fmt::Formatter};

use bitflags::bitflags;
use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};

bitflags! {
    /// A 32-bit OPC UA status code. The top 16 bits hold the severity and code, the lower
    /// 16 bits hold info bits. Named codes are associated constants declared below.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct StatusCode: u32 {
        const IS_ERROR = 0x8000_0000;
        const IS_UNCERTAIN = 0x4000_0000;
        const STATUS_MASK = 0xFFFF_0000;
        const BIT_MASK = 0x0000_FFFF;
    }
}

macro_rules! status_codes {
    ( $( $name:ident = $value:literal ),* $(,)? ) => {
        #[allow(non_upper_case_globals)]
        impl StatusCode {
            $( pub const $name: StatusCode = StatusCode::from_bits_retain($value); )*

            /// Returns the symbolic name of the status, ignoring info bits.
            pub fn name(&self) -> &'static str {
                match self.status().bits() {
                    $( $value => stringify!($name), )*
                    _ => "Unrecognized",
                }
            }
        }
    };
}

status_codes! {
    Good = 0x0000_0000,
    Uncertain = 0x4000_0000,
    UncertainLastUsableValue = 0x4090_0000,
    UncertainInitialValue = 0x4092_0000,
    Bad = 0x8000_0000,
    BadUnexpectedError = 0x8001_0000,
    BadInternalError = 0x8002_0000,
    BadOutOfMemory = 0x8003_0000,
    BadCommunicationError = 0x8005_0000,
    BadTimeout = 0x800A_0000,
    BadServiceUnsupported = 0x800B_0000,
    BadServerNotConnected = 0x800D_0000,
    BadNothingToDo = 0x800F_0000,
    BadTooManyOperations = 0x8010_0000,
    BadUserAccessDenied = 0x801F_0000,
    BadSessionIdInvalid = 0x8025_0000,
    BadSessionClosed = 0x8026_0000,
    BadSubscriptionIdInvalid = 0x8028_0000,
    BadRequestCancelledByClient = 0x802C_0000,
    BadNodeIdInvalid = 0x8033_0000,
    BadNodeIdUnknown = 0x8034_0000,
    BadAttributeIdInvalid = 0x8035_0000,
    BadIndexRangeInvalid = 0x8036_0000,
    BadNotSupported = 0x803D_0000,
    BadMonitoringModeInvalid = 0x8041_0000,
    BadMonitoredItemIdInvalid = 0x8042_0000,
    BadMonitoredItemFilterInvalid = 0x8043_0000,
    BadMonitoredItemFilterUnsupported = 0x8044_0000,
    BadFilterNotAllowed = 0x8045_0000,
    BadTypeMismatch = 0x8074_0000,
    BadMethodInvalid = 0x8075_0000,
    BadArgumentsMissing = 0x8076_0000,
    BadSecureChannelClosed = 0x8086_0000,
    BadNotConnected = 0x808A_0000,
    BadInvalidArgument = 0x80AB_0000,
    BadConnectionClosed = 0x80AE_0000,
    BadOperationAbandoned = 0x80B3_0000,
}

impl StatusCode {
    /// Returns the bit flags of the status code, i.e. it masks out the actual status code value
    pub fn bitflags(&self) -> StatusCode {
        *self & StatusCode::BIT_MASK
    }

    /// Returns the status only, i.e. it masks out any bit flags that come with the status code
    pub fn status(&self) -> StatusCode {
        *self & StatusCode::STATUS_MASK
    }

    /// Tests if the status code is bad
    pub fn is_bad(&self) -> bool {
        self.contains(StatusCode::IS_ERROR)
    }

    /// Tests if the status code is uncertain
    pub fn is_uncertain(&self) -> bool {
        self.contains(StatusCode::IS_UNCERTAIN)
    }

    /// Tests if the status code is good (i.e. not bad or uncertain)
    pub fn is_good(&self) -> bool {
        !self.is_bad() && !self.is_uncertain()
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        StatusCode::Good
    }
}

// The bitflags! macro would print the flag names, which is meaningless for status codes
// because they are a combination of bits and unique values.
impl fmt::Debug for StatusCode {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} (0x{:08X})", self.name(), self.bits())
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        // Displays the StatusCode as it's name, or its name+bitflags
        let bits = self.bitflags();
        if bits.is_empty() {
            write!(f, "{}", self.name())
        } else {
            write!(f, "{}+{:04X}", self.name(), bits.bits())
        }
    }
}

impl Error for StatusCode {}

// Serialize / Deserialize are manually implemented because bitflags! doesn't do it.

impl Serialize for StatusCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(self.bits())
    }
}

struct StatusCodeVisitor;

impl<'de> Visitor<'de> for StatusCodeVisitor {
    type Value = u32;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("an unsigned 32-bit integer")
    }

    fn visit_u32<E>(self, value: u32) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(value)
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        u32::try_from(value).map_err(|_| E::custom("status code out of range"))
    }
}

impl<'de> Deserialize<'de> for StatusCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, <D as Deserializer<'de>>::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(StatusCode::from_bits_retain(
            deserializer.deserialize_u32(StatusCodeVisitor)?,
        ))
    }
}

#[test]
fn status_code() {
    assert!(StatusCode::Good.is_good());
    assert!(!StatusCode::Good.is_bad());
    assert!(!StatusCode::Good.is_uncertain());

    assert!(StatusCode::UncertainLastUsableValue.is_uncertain());
    assert!(!StatusCode::UncertainLastUsableValue.is_bad());
    assert!(!StatusCode::UncertainLastUsableValue.is_good());

    assert!(StatusCode::BadMonitoredItemIdInvalid.is_bad());
    assert!(!StatusCode::BadMonitoredItemIdInvalid.is_uncertain());
    assert!(!StatusCode::BadMonitoredItemIdInvalid.is_good());
}

#[test]
fn status_code_name() {
    assert_eq!(StatusCode::BadNothingToDo.name(), "BadNothingToDo");
    assert_eq!(format!("{}", StatusCode::BadNotConnected), "BadNotConnected");
    // Info bits do not change the name
    let with_bits = StatusCode::from_bits_retain(StatusCode::BadTimeout.bits() | 0x0400);
    assert_eq!(with_bits.status(), StatusCode::BadTimeout);
    assert_eq!(format!("{}", with_bits), "BadTimeout+0400");
    assert_eq!(StatusCode::from_bits_retain(0x80FF_0000).name(), "Unrecognized");
}
