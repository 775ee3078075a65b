//! Single-threaded UDP responder: stamps T2 on receipt, T3 immediately before
//! replying, and echoes T1 back untouched.

use crate::codec::{self, PacketFlags};
use crate::master::time_source::MasterTimeSource;
use log::{debug, warn};
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const RECV_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct MasterResponder {
    socket: UdpSocket,
    time_source: Arc<MasterTimeSource>,
}

impl MasterResponder {
    pub fn bind(addr: &str, time_source: Arc<MasterTimeSource>) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(RECV_POLL_INTERVAL))?;
        Ok(MasterResponder { socket, time_source })
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.socket.local_addr()
    }

    /// Blocking receive loop. `stop` is polled once per receive-loop iteration,
    /// bounded by the socket's read timeout.
    pub fn run(&self, stop: Arc<AtomicBool>) {
        let mut buf = [0u8; 128];
        while !stop.load(Ordering::SeqCst) {
            let (size, src) = match self.socket.recv_from(&mut buf) {
                Ok(v) => v,
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    continue
                }
                Err(e) => {
                    warn!("responder recv error: {}", e);
                    continue;
                }
            };
            // T2: stamped the instant the datagram is observed.
            let t2 = self.time_source.now();

            let packet = match codec::decode(&buf[..size]) {
                Ok(p) => p,
                Err(e) => {
                    debug!("dropping malformed packet from {}: {}", src, e);
                    continue;
                }
            };

            if packet.flags != PacketFlags::Request {
                debug!("dropping non-request packet from {}", src);
                continue;
            }

            // T3: stamped immediately before the reply is sent.
            let t3 = self.time_source.now();
            let reply = codec::encode(PacketFlags::Reply, packet.sequence, packet.t1, t2, t3);
            if let Err(e) = self.socket.send_to(&reply, src) {
                warn!("responder send error to {}: {}", src, e);
            }
        }
    }
}
