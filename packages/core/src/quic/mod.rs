//! QUIC transport: packet parsing, header protection, packet-number
//! spaces, CRYPTO/stream reassembly, the handshake state machine, loss
//! recovery, and per-connection state.

pub mod cid;
pub mod connection;
pub mod crypto_stream;
pub mod frame;
pub mod handshake;
pub mod header_protection;
pub mod packet;
pub mod recovery;
pub mod space;
pub mod stream;

pub use cid::ConnectionId;
pub use connection::Connection;
pub use frame::Frame;
pub use handshake::{HandshakeDriver, HandshakeEvent, HandshakeState};
pub use packet::{
    build_long_header, build_short_header, decode_packet_number, encode_packet_number, parse_long_header, parse_short_header, LongHeader, LongPacketType, ShortHeader,
};
pub use space::{PacketNumberSpace, PacketNumberSpaces, SpaceId};
