//! The 27-byte wire packet: 1-byte flags, a big-endian `u16` sequence, and three
//! big-endian `f64` timestamps. Stateless and pure — no I/O, no clock access.

use crate::error::DecodeError;
use byteorder::{BigEndian, ByteOrder};

pub const PACKET_SIZE: usize = 27;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketFlags {
    Request = 0x01,
    Reply = 0x02,
}

impl TryFrom<u8> for PacketFlags {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(PacketFlags::Request),
            0x02 => Ok(PacketFlags::Reply),
            other => Err(DecodeError::InvalidFlags(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Packet {
    pub flags: PacketFlags,
    pub sequence: u16,
    pub t1: f64,
    pub t2: f64,
    pub t3: f64,
}

pub fn encode(flags: PacketFlags, sequence: u16, t1: f64, t2: f64, t3: f64) -> [u8; PACKET_SIZE] {
    let mut buf = [0u8; PACKET_SIZE];
    buf[0] = flags as u8;
    BigEndian::write_u16(&mut buf[1..3], sequence);
    BigEndian::write_f64(&mut buf[3..11], t1);
    BigEndian::write_f64(&mut buf[11..19], t2);
    BigEndian::write_f64(&mut buf[19..27], t3);
    buf
}

pub fn decode(buf: &[u8]) -> Result<Packet, DecodeError> {
    if buf.len() != PACKET_SIZE {
        return Err(DecodeError::InvalidLength(buf.len()));
    }
    let flags = PacketFlags::try_from(buf[0])?;
    let sequence = BigEndian::read_u16(&buf[1..3]);
    let t1 = BigEndian::read_f64(&buf[3..11]);
    let t2 = BigEndian::read_f64(&buf[11..19]);
    let t3 = BigEndian::read_f64(&buf[19..27]);
    Ok(Packet { flags, sequence, t1, t2, t3 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_request() {
        let buf = encode(PacketFlags::Request, 42, 1.5, 0.0, 0.0);
        assert_eq!(buf.len(), PACKET_SIZE);
        let packet = decode(&buf).unwrap();
        assert_eq!(packet.flags, PacketFlags::Request);
        assert_eq!(packet.sequence, 42);
        assert_eq!(packet.t1, 1.5);
    }

    #[test]
    fn round_trip_reply_preserves_all_three_timestamps() {
        let buf = encode(PacketFlags::Reply, 65535, 100.123456, 100.2, 100.3);
        let packet = decode(&buf).unwrap();
        assert_eq!(packet.flags, PacketFlags::Reply);
        assert_eq!(packet.sequence, 65535);
        assert_eq!(packet.t1, 100.123456);
        assert_eq!(packet.t2, 100.2);
        assert_eq!(packet.t3, 100.3);
    }

    #[test]
    fn rejects_short_buffer() {
        let buf = [0u8; 10];
        assert_eq!(decode(&buf), Err(DecodeError::InvalidLength(10)));
    }

    #[test]
    fn rejects_long_buffer() {
        let buf = [0u8; 28];
        assert_eq!(decode(&buf), Err(DecodeError::InvalidLength(28)));
    }

    #[test]
    fn rejects_unknown_flags() {
        let mut buf = encode(PacketFlags::Request, 1, 0.0, 0.0, 0.0);
        buf[0] = 0x09;
        assert_eq!(decode(&buf), Err(DecodeError::InvalidFlags(0x09)));
    }

    #[test]
    fn sequence_wraps_at_u16_boundary() {
        let buf = encode(PacketFlags::Request, 65535u16.wrapping_add(1), 0.0, 0.0, 0.0);
        let packet = decode(&buf).unwrap();
        assert_eq!(packet.sequence, 0);
    }
}
