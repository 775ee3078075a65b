//! Drives one request/reply exchange with the master and derives a [`Sample`]
//! from the resulting four timestamps.

use crate::codec::{self, PacketFlags};
use crate::error::ExchangeError;
use crate::sample::Sample;
use crate::traits::{ClockSource, Exchanger};
use std::net::UdpSocket;
use std::time::{Duration, Instant};

pub struct Requester<C: ClockSource> {
    socket: UdpSocket,
    clock: C,
    timeout: Duration,
}

impl<C: ClockSource> Requester<C> {
    pub fn connect(master_addr: &str, clock: C, timeout: Duration) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(master_addr)?;
        Ok(Requester { socket, clock, timeout })
    }
}

impl<C: ClockSource> Exchanger for Requester<C> {
    fn exchange(&mut self, sequence: u16) -> Result<Sample, ExchangeError> {
        let t1 = self.clock.now();
        let request = codec::encode(PacketFlags::Request, sequence, t1, 0.0, 0.0);
        self.socket.send(&request)?;

        let deadline = Instant::now() + self.timeout;
        let mut saw_mismatched_reply = false;
        let mut buf = [0u8; 128];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            self.socket.set_read_timeout(Some(remaining))?;

            let size = match self.socket.recv(&mut buf) {
                Ok(n) => n,
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break
                }
                Err(e) => return Err(e.into()),
            };

            let packet = match codec::decode(&buf[..size]) {
                Ok(p) => p,
                Err(_) => continue,
            };
            if packet.flags != PacketFlags::Reply {
                continue;
            }
            if packet.sequence != sequence {
                saw_mismatched_reply = true;
                continue;
            }

            let t4 = self.clock.now();
            return Ok(Sample::new(packet.t1, packet.t2, packet.t3, t4));
        }

        if saw_mismatched_reply {
            Err(ExchangeError::Mismatch)
        } else {
            Err(ExchangeError::Timeout)
        }
    }
}
