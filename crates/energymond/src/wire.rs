//! Experimenter stats message codec.
//!
//! The energy telemetry extension rides on experimenter (vendor) stats
//! messages of the switch control protocol. Framing and session handling
//! belong to the transport; this module encodes request payloads and
//! decodes reply payloads.
//!
//! Layout, big-endian:
//!
//! ```text
//! u8  message type     0x12 stats request / 0x13 stats reply
//! u32 xid              request correlation id
//! u16 stats type       0xffff = experimenter
//! u16 flags            bit 0 = REPLY_MORE (more fragments follow)
//! u32 experimenter id  0xf82a
//! u32 subtype          0 = global energy, 1 = port energy
//! ..  body
//! ```
//!
//! Bodies: the global reply carries two IEEE-754 doubles as raw 64-bit
//! values; the port reply carries a run of 20-byte entries
//! `{port_no: i32, current_consumption: u64, power_drawn: u64}`.

use byteorder::{BigEndian, ReadBytesExt};
use energymon_types::{EnergyReading, PortNumber};
use std::io::Cursor;
use thiserror::Error;

/// Experimenter id of the energy telemetry extension.
pub const ENERGY_EXPERIMENTER: u32 = 0xf82a;

/// Stats type value marking an experimenter stats message.
pub const STATS_TYPE_EXPERIMENTER: u16 = 0xffff;

/// Flag bit: more reply fragments follow.
pub const FLAG_REPLY_MORE: u16 = 0x0001;

const MSG_STATS_REQUEST: u8 = 0x12;
const MSG_STATS_REPLY: u8 = 0x13;

const SUBTYPE_GLOBAL_ENERGY: u32 = 0;
const SUBTYPE_PORT_ENERGY: u32 = 1;

const HEADER_LEN: usize = 17;
const GLOBAL_BODY_LEN: usize = 16;
const PORT_ENTRY_LEN: usize = 20;

/// Errors from decoding a message that claims to be ours.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// The message ended before its declared structure was complete.
    #[error("truncated message: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// The port reply body is not a whole number of entries.
    #[error("port reply body of {0} bytes is not a whole number of entries")]
    RaggedEntries(usize),
}

/// An outbound telemetry request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsRequest {
    /// Request for the device-global energy reading.
    GlobalEnergy { xid: u32 },
    /// Request for per-port energy readings; `port` is normally the `ANY`
    /// wildcard.
    PortEnergy { xid: u32, port: PortNumber },
}

impl StatsRequest {
    /// Returns the correlation id.
    pub fn xid(&self) -> u32 {
        match self {
            StatsRequest::GlobalEnergy { xid } => *xid,
            StatsRequest::PortEnergy { xid, .. } => *xid,
        }
    }

    /// Encodes the request for the wire.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            StatsRequest::GlobalEnergy { xid } => {
                encode_header(MSG_STATS_REQUEST, *xid, 0, SUBTYPE_GLOBAL_ENERGY)
            }
            StatsRequest::PortEnergy { xid, port } => {
                let mut buf = encode_header(MSG_STATS_REQUEST, *xid, 0, SUBTYPE_PORT_ENERGY);
                buf.extend_from_slice(&port.as_u32().to_be_bytes());
                buf
            }
        }
    }
}

/// One entry of a port energy reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortEnergyEntry {
    /// Port number as reported by the switch; negative values are
    /// malformed.
    pub port_no: i32,
    /// Current consumption, raw IEEE-754 bits.
    pub current_consumption: u64,
    /// Power drawn, raw IEEE-754 bits.
    pub power_drawn: u64,
}

impl PortEnergyEntry {
    /// Returns the validated port number, `None` for malformed entries.
    pub fn port(&self) -> Option<PortNumber> {
        PortNumber::from_signed(self.port_no)
    }

    /// Reinterprets the raw bit fields as an energy reading.
    pub fn reading(&self) -> EnergyReading {
        EnergyReading::new(
            f64::from_bits(self.current_consumption),
            f64::from_bits(self.power_drawn),
        )
    }
}

/// A decoded telemetry reply.
#[derive(Debug, Clone, PartialEq)]
pub enum StatsReply {
    /// Device-global energy reading.
    GlobalEnergy {
        xid: u32,
        current_consumption: f64,
        power_drawn: f64,
    },
    /// One fragment of a per-port reply. `more` mirrors the REPLY_MORE
    /// flag; the batch completes on the fragment where it is absent.
    PortEnergy {
        xid: u32,
        more: bool,
        entries: Vec<PortEnergyEntry>,
    },
}

/// Decodes a received message.
///
/// Returns `Ok(None)` for any message that is not an energy telemetry
/// reply (wrong type, wrong experimenter, unknown subtype); such traffic
/// is simply not ours. Returns an error only for messages that claim to
/// be ours but are structurally malformed.
pub fn decode_reply(bytes: &[u8]) -> Result<Option<StatsReply>, WireError> {
    if bytes.len() < HEADER_LEN {
        return Ok(None);
    }

    let truncated = |expected: usize| WireError::Truncated {
        expected,
        actual: bytes.len(),
    };

    let mut cursor = Cursor::new(bytes);
    let msg_type = cursor.read_u8().map_err(|_| truncated(HEADER_LEN))?;
    let xid = cursor
        .read_u32::<BigEndian>()
        .map_err(|_| truncated(HEADER_LEN))?;
    let stats_type = cursor
        .read_u16::<BigEndian>()
        .map_err(|_| truncated(HEADER_LEN))?;
    let flags = cursor
        .read_u16::<BigEndian>()
        .map_err(|_| truncated(HEADER_LEN))?;
    let experimenter = cursor
        .read_u32::<BigEndian>()
        .map_err(|_| truncated(HEADER_LEN))?;
    let subtype = cursor
        .read_u32::<BigEndian>()
        .map_err(|_| truncated(HEADER_LEN))?;

    if msg_type != MSG_STATS_REPLY
        || stats_type != STATS_TYPE_EXPERIMENTER
        || experimenter != ENERGY_EXPERIMENTER
    {
        return Ok(None);
    }

    let body = &bytes[HEADER_LEN..];
    match subtype {
        SUBTYPE_GLOBAL_ENERGY => {
            if body.len() < GLOBAL_BODY_LEN {
                return Err(truncated(HEADER_LEN + GLOBAL_BODY_LEN));
            }
            let mut cursor = Cursor::new(body);
            let current_consumption = f64::from_bits(
                cursor
                    .read_u64::<BigEndian>()
                    .map_err(|_| truncated(HEADER_LEN + GLOBAL_BODY_LEN))?,
            );
            let power_drawn = f64::from_bits(
                cursor
                    .read_u64::<BigEndian>()
                    .map_err(|_| truncated(HEADER_LEN + GLOBAL_BODY_LEN))?,
            );
            Ok(Some(StatsReply::GlobalEnergy {
                xid,
                current_consumption,
                power_drawn,
            }))
        }
        SUBTYPE_PORT_ENERGY => {
            if body.len() % PORT_ENTRY_LEN != 0 {
                return Err(WireError::RaggedEntries(body.len()));
            }
            let mut cursor = Cursor::new(body);
            let count = body.len() / PORT_ENTRY_LEN;
            let mut entries = Vec::with_capacity(count);
            for i in 0..count {
                let end = HEADER_LEN + (i + 1) * PORT_ENTRY_LEN;
                entries.push(PortEnergyEntry {
                    port_no: cursor.read_i32::<BigEndian>().map_err(|_| truncated(end))?,
                    current_consumption: cursor
                        .read_u64::<BigEndian>()
                        .map_err(|_| truncated(end))?,
                    power_drawn: cursor
                        .read_u64::<BigEndian>()
                        .map_err(|_| truncated(end))?,
                });
            }
            Ok(Some(StatsReply::PortEnergy {
                xid,
                more: flags & FLAG_REPLY_MORE != 0,
                entries,
            }))
        }
        _ => Ok(None),
    }
}

/// Encodes a global energy reply (the switch side of the exchange).
pub fn encode_global_reply(xid: u32, current_consumption: f64, power_drawn: f64) -> Vec<u8> {
    let mut buf = encode_header(MSG_STATS_REPLY, xid, 0, SUBTYPE_GLOBAL_ENERGY);
    buf.extend_from_slice(&current_consumption.to_bits().to_be_bytes());
    buf.extend_from_slice(&power_drawn.to_bits().to_be_bytes());
    buf
}

/// Encodes one port energy reply fragment (the switch side of the
/// exchange).
pub fn encode_port_reply(xid: u32, more: bool, entries: &[PortEnergyEntry]) -> Vec<u8> {
    let flags = if more { FLAG_REPLY_MORE } else { 0 };
    let mut buf = encode_header(MSG_STATS_REPLY, xid, flags, SUBTYPE_PORT_ENERGY);
    for entry in entries {
        buf.extend_from_slice(&entry.port_no.to_be_bytes());
        buf.extend_from_slice(&entry.current_consumption.to_be_bytes());
        buf.extend_from_slice(&entry.power_drawn.to_be_bytes());
    }
    buf
}

fn encode_header(msg_type: u8, xid: u32, flags: u16, subtype: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + PORT_ENTRY_LEN);
    buf.push(msg_type);
    buf.extend_from_slice(&xid.to_be_bytes());
    buf.extend_from_slice(&STATS_TYPE_EXPERIMENTER.to_be_bytes());
    buf.extend_from_slice(&flags.to_be_bytes());
    buf.extend_from_slice(&ENERGY_EXPERIMENTER.to_be_bytes());
    buf.extend_from_slice(&subtype.to_be_bytes());
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_global_reply_roundtrip() {
        let bytes = encode_global_reply(7, 10.5, -2.25);
        let reply = decode_reply(&bytes).unwrap().unwrap();
        assert_eq!(
            reply,
            StatsReply::GlobalEnergy {
                xid: 7,
                current_consumption: 10.5,
                power_drawn: -2.25,
            }
        );
    }

    #[test]
    fn test_port_reply_roundtrip_with_more_flag() {
        let entries = vec![
            PortEnergyEntry {
                port_no: 1,
                current_consumption: 3.0f64.to_bits(),
                power_drawn: 1.0f64.to_bits(),
            },
            PortEnergyEntry {
                port_no: 2,
                current_consumption: 4.0f64.to_bits(),
                power_drawn: 2.0f64.to_bits(),
            },
        ];
        let bytes = encode_port_reply(9, true, &entries);
        let reply = decode_reply(&bytes).unwrap().unwrap();
        assert_eq!(
            reply,
            StatsReply::PortEnergy {
                xid: 9,
                more: true,
                entries,
            }
        );
    }

    #[test]
    fn test_empty_port_fragment_decodes() {
        let bytes = encode_port_reply(3, false, &[]);
        match decode_reply(&bytes).unwrap().unwrap() {
            StatsReply::PortEnergy { more, entries, .. } => {
                assert!(!more);
                assert!(entries.is_empty());
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn test_request_encoding_carries_xid_and_port() {
        let request = StatsRequest::PortEnergy {
            xid: 42,
            port: PortNumber::ANY,
        };
        let bytes = request.encode();
        assert_eq!(bytes[0], MSG_STATS_REQUEST);
        assert_eq!(u32::from_be_bytes(bytes[1..5].try_into().unwrap()), 42);
        assert_eq!(
            u32::from_be_bytes(bytes[HEADER_LEN..].try_into().unwrap()),
            PortNumber::ANY.as_u32()
        );
    }

    #[test]
    fn test_foreign_traffic_is_ignored() {
        // Too short to be a stats message at all.
        assert_eq!(decode_reply(&[0x13, 0, 0]).unwrap(), None);

        // Wrong experimenter id.
        let mut bytes = encode_global_reply(1, 0.0, 0.0);
        bytes[9..13].copy_from_slice(&0xdead_beefu32.to_be_bytes());
        assert_eq!(decode_reply(&bytes).unwrap(), None);

        // A request is not a reply.
        let request = StatsRequest::GlobalEnergy { xid: 1 }.encode();
        assert_eq!(decode_reply(&request).unwrap(), None);

        // Unknown subtype.
        let mut bytes = encode_global_reply(1, 0.0, 0.0);
        bytes[13..17].copy_from_slice(&99u32.to_be_bytes());
        assert_eq!(decode_reply(&bytes).unwrap(), None);
    }

    #[test]
    fn test_truncated_global_reply_is_an_error() {
        let mut bytes = encode_global_reply(1, 1.0, 2.0);
        bytes.truncate(HEADER_LEN + 8);
        assert_eq!(
            decode_reply(&bytes).unwrap_err(),
            WireError::Truncated {
                expected: HEADER_LEN + GLOBAL_BODY_LEN,
                actual: HEADER_LEN + 8,
            }
        );
    }

    #[test]
    fn test_ragged_port_reply_is_an_error() {
        let entry = PortEnergyEntry {
            port_no: 1,
            current_consumption: 0,
            power_drawn: 0,
        };
        let mut bytes = encode_port_reply(1, false, &[entry]);
        bytes.pop();
        assert_eq!(
            decode_reply(&bytes).unwrap_err(),
            WireError::RaggedEntries(PORT_ENTRY_LEN - 1)
        );
    }

    #[test]
    fn test_entry_validation_and_reinterpretation() {
        let good = PortEnergyEntry {
            port_no: 5,
            current_consumption: 1.5f64.to_bits(),
            power_drawn: 0.5f64.to_bits(),
        };
        assert_eq!(good.port(), Some(PortNumber::new(5).unwrap()));
        assert_eq!(good.reading(), EnergyReading::new(1.5, 0.5));

        let bad = PortEnergyEntry {
            port_no: -4,
            ..good
        };
        assert_eq!(bad.port(), None);
    }
}
