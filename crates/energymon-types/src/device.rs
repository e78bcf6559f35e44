//! Switch identity types: datapath ids, device ids, port numbers.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// OpenFlow datapath identifier of a switch connection.
///
/// The datapath id is negotiated during the control-channel handshake and
/// is stable for a given switch instance.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Dpid(u64);

impl Dpid {
    /// Creates a datapath id from its raw 64-bit value.
    pub const fn new(raw: u64) -> Self {
        Dpid(raw)
    }

    /// Returns the raw 64-bit value.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns the controller-level device id for this datapath.
    pub fn device_id(&self) -> DeviceId {
        DeviceId::from_dpid(*self)
    }
}

impl fmt::Display for Dpid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Controller-level device identifier.
///
/// Rendered as `of:<16 hex digits>`, derived from the switch [`Dpid`].
/// Identity only; carries no behavior.
///
/// # Examples
///
/// ```
/// use energymon_types::{DeviceId, Dpid};
///
/// let id = DeviceId::from_dpid(Dpid::new(0x1));
/// assert_eq!(id.to_string(), "of:0000000000000001");
/// assert_eq!("of:0000000000000001".parse::<DeviceId>().unwrap(), id);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(u64);

impl DeviceId {
    /// URI scheme prefix for OpenFlow-backed devices.
    pub const SCHEME: &'static str = "of";

    /// Creates a device id from a datapath id.
    pub const fn from_dpid(dpid: Dpid) -> Self {
        DeviceId(dpid.0)
    }

    /// Returns the underlying datapath id.
    pub const fn dpid(&self) -> Dpid {
        Dpid(self.0)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:016x}", Self::SCHEME, self.0)
    }
}

impl FromStr for DeviceId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .strip_prefix("of:")
            .and_then(|hex| u64::from_str_radix(hex, 16).ok())
            .ok_or_else(|| ParseError::InvalidDeviceId(s.to_string()))?;
        Ok(DeviceId(raw))
    }
}

impl TryFrom<String> for DeviceId {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> String {
        id.to_string()
    }
}

/// Switch port number.
///
/// Valid port numbers lie below [`PortNumber::ANY`]; `ANY` is the request
/// wildcard and is never used as a stored key.
///
/// # Examples
///
/// ```
/// use energymon_types::PortNumber;
///
/// let port = PortNumber::new(3).unwrap();
/// assert_eq!(port.as_u32(), 3);
/// assert!(PortNumber::new(PortNumber::ANY.as_u32()).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub struct PortNumber(u32);

impl PortNumber {
    /// Request wildcard addressing all ports of a device.
    pub const ANY: PortNumber = PortNumber(0xffff_ffff);

    /// Creates a new port number.
    ///
    /// # Errors
    ///
    /// Returns an error for the reserved `ANY` wildcard value.
    pub const fn new(n: u32) -> Result<Self, ParseError> {
        if n < Self::ANY.0 {
            Ok(PortNumber(n))
        } else {
            Err(ParseError::InvalidPortNumber(n))
        }
    }

    /// Creates a port number from a signed wire value.
    ///
    /// Negative values come from malformed hardware replies and yield
    /// `None`, as does the `ANY` wildcard.
    pub fn from_signed(n: i32) -> Option<Self> {
        if n < 0 {
            return None;
        }
        Self::new(n as u32).ok()
    }

    /// Returns the port number as a u32.
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Returns true if this is the `ANY` request wildcard.
    pub const fn is_wildcard(&self) -> bool {
        self.0 == Self::ANY.0
    }
}

impl fmt::Display for PortNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_wildcard() {
            write!(f, "ANY")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl TryFrom<u32> for PortNumber {
    type Error = ParseError;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        PortNumber::new(n)
    }
}

impl From<PortNumber> for u32 {
    fn from(port: PortNumber) -> u32 {
        port.0
    }
}
