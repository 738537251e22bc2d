//! UDP/QUIC event loop for HTTP/3: demultiplexes datagrams by
//! connection ID, drives the TLS 1.3 handshake through
//! [`blitz_core::tls::RustlsEngine`], and once 1-RTT keys are up feeds
//! STREAM frame payloads to [`blitz_core::orchestrator::handle_http3_request_stream`].
//!
//! One UDP socket serves every connection; per-connection state lives in
//! an in-memory map keyed by connection ID, looked up and driven from a
//! single task. This keeps packet-number-space bookkeeping and handshake
//! ordering simple at the cost of not spreading connections across
//! threads — acceptable for the reference event loop this binary is.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use blitz_core::error::QuicError;
use blitz_core::orchestrator::handle_http3_request_stream;
use blitz_core::quic::frame::{encode_crypto, encode_stream, parse_frame};
use blitz_core::quic::header_protection::HeaderProtectionKey;
use blitz_core::quic::{
    build_long_header, build_short_header, decode_packet_number, encode_packet_number, parse_long_header, parse_short_header, Connection, ConnectionId, Frame as QuicFrame, HandshakeEvent,
    LongPacketType, SpaceId,
};
use blitz_core::tls::engine::{KeyChange, Keys, PacketCrypto, TlsEngine};
use blitz_core::tls::{server_initial_keys, RustlsEngine};
use blitz_core::time::Clock;
use rustls::ServerConfig;

use crate::state::GatewayState;

const MAX_DATAGRAM: usize = 65535;
const SAMPLE_LEN: usize = 16;
const PN_RESERVED_LEN: usize = 4;
const AEAD_TAG_LEN: usize = 16;
/// Fixed length of server-chosen connection IDs would be used here, but
/// this event loop instead reuses the client's offered DCID verbatim as
/// its own local CID (see `handle_long_header_datagram`), so short-header
/// packets carry whatever length that DCID happened to be. Since clients
/// in practice choose 8-byte DCIDs, this is used only as a sanity bound.
const MAX_LOCAL_CID_LEN: usize = 20;

struct ConnEntry {
    conn: Connection,
    engine: RustlsEngine,
    peer_addr: SocketAddr,
    initial_keys: Keys,
    handshake_keys: Option<Keys>,
    one_rtt_keys: Option<Keys>,
    tx_space: SpaceId,
    request_buf: Vec<u8>,
}

/// Serves HTTP/3 over QUIC on `listen` until the process stops.
pub async fn serve(listen: &str, tls_config: Arc<ServerConfig>, state: Arc<GatewayState>) -> std::io::Result<()> {
    let socket = Arc::new(UdpSocket::bind(listen).await?);
    info!(addr = listen, "QUIC/UDP listener bound");

    let mut connections: HashMap<Vec<u8>, ConnEntry> = HashMap::new();
    let mut buf = vec![0u8; MAX_DATAGRAM];

    loop {
        let (len, peer_addr) = match socket.recv_from(&mut buf).await {
            Ok(v) => v,
            Err(err) => {
                warn!(error = %err, "UDP recv failed");
                continue;
            }
        };
        let datagram = &mut buf[..len];
        if datagram.is_empty() {
            continue;
        }

        if datagram[0] & 0x80 != 0 {
            if let Err(err) = handle_long_header_datagram(datagram, peer_addr, &mut connections, &tls_config, &socket).await {
                debug!(peer = %peer_addr, error = %err, "dropped long-header packet");
            }
        } else if let Err(err) = handle_short_header_datagram(datagram, peer_addr, &mut connections, &state, &socket).await {
            debug!(peer = %peer_addr, error = %err, "dropped short-header packet");
        }
    }
}

async fn handle_long_header_datagram(
    datagram: &mut [u8],
    peer_addr: SocketAddr,
    connections: &mut HashMap<Vec<u8>, ConnEntry>,
    tls_config: &Arc<ServerConfig>,
    socket: &UdpSocket,
) -> Result<(), QuicError> {
    let (packet_type, dcid, scid, header_len, length) = {
        let parsed = parse_long_header(datagram)?;
        (parsed.packet_type, parsed.dcid.as_bytes().to_vec(), parsed.scid.as_bytes().to_vec(), parsed.header_len, parsed.length as usize)
    };

    match packet_type {
        LongPacketType::Initial => {
            let key = dcid.clone();
            if !connections.contains_key(&key) {
                // The server keeps the client's offered DCID as its own
                // local CID rather than minting a fresh one; CIDs are
                // opaque per RFC 9000, so this is legal and saves a
                // second original-DCID-to-assigned-SCID routing table.
                let local_cid = ConnectionId::from_slice(&dcid)?;
                let peer_cid = ConnectionId::from_slice(&scid)?;
                let secrets = blitz_core::tls::derive_initial_secrets(&dcid).map_err(|_| QuicError::DecryptFailure)?;
                let initial_keys = server_initial_keys(&secrets).map_err(|_| QuicError::DecryptFailure)?;
                let engine = RustlsEngine::new_server(Arc::clone(tls_config), Vec::new()).map_err(|_| QuicError::DecryptFailure)?;
                connections.insert(
                    key.clone(),
                    ConnEntry {
                        conn: Connection::new(local_cid, peer_cid),
                        engine,
                        peer_addr,
                        initial_keys,
                        handshake_keys: None,
                        one_rtt_keys: None,
                        tx_space: SpaceId::Initial,
                        request_buf: Vec::new(),
                    },
                );
            }

            let entry = connections.get_mut(&key).expect("just inserted or already present");
            let payload = {
                let hp = &entry.initial_keys.remote.header_protection;
                let packet_crypto = &*entry.initial_keys.remote.packet;
                unprotect_and_open(datagram, header_len, length, hp, packet_crypto, &mut entry.conn, SpaceId::Initial, true)?
            };
            process_crypto_frames(payload, SpaceId::Initial, entry)?;
            drive_handshake(entry, socket).await;
        }
        LongPacketType::Handshake => {
            let Some(entry) = connections.get_mut(&dcid) else {
                return Err(QuicError::ProtocolViolation("Handshake packet for unknown connection"));
            };
            if entry.handshake_keys.is_none() {
                return Err(QuicError::KeysNotReady);
            }
            let payload = {
                let handshake_keys = entry.handshake_keys.as_ref().expect("checked above");
                let hp = &handshake_keys.remote.header_protection;
                let packet_crypto = &*handshake_keys.remote.packet;
                unprotect_and_open(datagram, header_len, length, hp, packet_crypto, &mut entry.conn, SpaceId::Handshake, true)?
            };
            process_crypto_frames(payload, SpaceId::Handshake, entry)?;
            drive_handshake(entry, socket).await;
        }
        LongPacketType::ZeroRtt | LongPacketType::Retry => {
            debug!("0-RTT and Retry packets are not supported, dropping");
        }
    }
    Ok(())
}

/// Removes header protection in place and opens the AEAD payload,
/// returning the plaintext frame bytes.
#[allow(clippy::too_many_arguments)]
fn unprotect_and_open<'a>(
    datagram: &'a mut [u8],
    header_len: usize,
    declared_length: usize,
    hp: &HeaderProtectionKey,
    packet_crypto: &dyn PacketCrypto,
    conn: &mut Connection,
    space: SpaceId,
    long_header: bool,
) -> Result<&'a mut [u8], QuicError> {
    let packet_end = header_len + declared_length;
    if datagram.len() < packet_end || declared_length < PN_RESERVED_LEN + SAMPLE_LEN {
        return Err(QuicError::PacketTooShort);
    }

    // Over-read a full 4-byte packet-number field and sample the 16 bytes
    // right after it, regardless of the packet's true (shorter) pn
    // length, per RFC 9001 §5.4.2.
    let (head, tail) = datagram.split_at_mut(header_len);
    let (pn_bytes, after_pn) = tail.split_at_mut(PN_RESERVED_LEN);
    let sample = &after_pn[..SAMPLE_LEN];
    let pn_len = hp.remove(&mut head[0], pn_bytes, sample, long_header)?;

    let mut truncated = 0u64;
    for &b in &pn_bytes[..pn_len] {
        truncated = (truncated << 8) | u64::from(b);
    }
    let largest_rx = conn.spaces_mut().get_mut(space).largest_rx();
    let packet_number = decode_packet_number(truncated, pn_len, largest_rx);
    conn.accept_packet_number(space, packet_number)?;

    let header_end = header_len + pn_len;
    let (header_slice, rest) = datagram.split_at_mut(header_end);
    let payload_and_tag = &mut rest[..packet_end - header_end];
    packet_crypto.open_in_place(packet_number, header_slice, payload_and_tag).map_err(|_| QuicError::DecryptFailure)
}

fn process_crypto_frames(payload: &[u8], space: SpaceId, entry: &mut ConnEntry) -> Result<(), QuicError> {
    let mut offset = 0;
    while offset < payload.len() {
        let (frame, used) = parse_frame(&payload[offset..])?;
        offset += used;
        if let QuicFrame::Crypto { offset: crypto_offset, data } = frame {
            let ready = match space {
                SpaceId::Initial => entry.conn.receive_initial_crypto(crypto_offset, data)?,
                SpaceId::Handshake => entry.conn.receive_handshake_crypto(crypto_offset, data),
                SpaceId::OneRtt => Vec::new(),
            };
            if !ready.is_empty() {
                entry.engine.read_handshake(space, &ready).map_err(|_| QuicError::DecryptFailure)?;
            }
        }
    }
    Ok(())
}

/// Drains handshake bytes the engine wants to send, applies the resulting
/// key changes, and writes the response packet(s) to the wire.
async fn drive_handshake(entry: &mut ConnEntry, socket: &UdpSocket) {
    loop {
        let mut out = Vec::new();
        let key_change = match entry.engine.write_handshake(entry.tx_space, &mut out) {
            Ok(change) => change,
            Err(err) => {
                warn!(peer = %entry.peer_addr, error = %err, "TLS handshake write failed");
                return;
            }
        };

        if !out.is_empty() {
            let space = entry.tx_space;
            let offset = entry.conn.spaces_mut().get_mut(space).crypto_tx_offset;
            let mut frame_bytes = Vec::new();
            if encode_crypto(offset, &out, &mut frame_bytes).is_ok() {
                entry.conn.spaces_mut().get_mut(space).crypto_tx_offset += out.len() as u64;
                send_long_packet(entry, space, &frame_bytes, socket).await;
            }
            if space == SpaceId::Initial {
                let _ = entry.conn.apply_handshake_event(HandshakeEvent::ServerHelloSent);
            }
        }

        match key_change {
            Some(KeyChange::Handshake { keys }) => {
                entry.handshake_keys = Some(keys);
                let _ = entry.conn.apply_handshake_event(HandshakeEvent::HandshakeKeysDerived);
                entry.tx_space = SpaceId::Handshake;
            }
            Some(KeyChange::OneRtt { keys }) => {
                entry.one_rtt_keys = Some(keys);
                // rustls::quic can derive 1-RTT keys for a server before
                // it has separately signalled "peer Finished verified";
                // the driver's state machine wants both events in order,
                // so both are applied together at this single point.
                let _ = entry.conn.apply_handshake_event(HandshakeEvent::PeerFinishedVerified);
                let _ = entry.conn.apply_handshake_event(HandshakeEvent::OneRttKeysDerived);
                entry.tx_space = SpaceId::OneRtt;
                break;
            }
            None => break,
        }
    }
}

async fn send_long_packet(entry: &mut ConnEntry, space: SpaceId, crypto_frame: &[u8], socket: &UdpSocket) {
    let packet_type = match space {
        SpaceId::Initial => LongPacketType::Initial,
        SpaceId::Handshake => LongPacketType::Handshake,
        SpaceId::OneRtt => return,
    };

    let mut payload = crypto_frame.to_vec();
    let pn = entry.conn.on_packet_sent(space, payload.len() as u64, Instant::now());
    let dcid = entry.conn.peer_cid.as_bytes().to_vec();
    let scid = entry.conn.local_cid.as_bytes().to_vec();
    let mut packet = build_long_header(packet_type, 1, &dcid, &scid, &[], PN_RESERVED_LEN, payload.len() + AEAD_TAG_LEN);
    let header_len = packet.len() - PN_RESERVED_LEN;
    let pn_bytes = encode_packet_number(pn, PN_RESERVED_LEN);
    packet[header_len..].copy_from_slice(&pn_bytes);

    let keys = match space {
        SpaceId::Initial => &entry.initial_keys,
        SpaceId::Handshake => entry.handshake_keys.as_ref().expect("handshake keys present once tx_space advances"),
        SpaceId::OneRtt => return,
    };
    if keys.local.packet.seal_in_place(pn, &packet, &mut payload).is_err() {
        warn!(peer = %entry.peer_addr, "failed to seal outgoing handshake packet");
        return;
    }
    packet.extend_from_slice(&payload);

    let sample_start = header_len + PN_RESERVED_LEN;
    if packet.len() < sample_start + SAMPLE_LEN {
        return;
    }
    let sample: [u8; SAMPLE_LEN] = packet[sample_start..sample_start + SAMPLE_LEN].try_into().expect("length checked above");
    let (head, tail) = packet.split_at_mut(header_len);
    if keys.local.header_protection.apply(&mut head[0], &mut tail[..PN_RESERVED_LEN], PN_RESERVED_LEN, &sample, true).is_err() {
        return;
    }

    let _ = socket.send_to(&packet, entry.peer_addr).await;
}

async fn handle_short_header_datagram(
    datagram: &mut [u8],
    peer_addr: SocketAddr,
    connections: &mut HashMap<Vec<u8>, ConnEntry>,
    state: &Arc<GatewayState>,
    socket: &UdpSocket,
) -> Result<(), QuicError> {
    // Short headers don't self-describe their DCID length, and this event
    // loop reuses the client's Initial DCID verbatim as the local CID
    // (see `handle_long_header_datagram`), which may be any length up to
    // 20 bytes; try each length until one matches a tracked connection.
    let max_len = MAX_LOCAL_CID_LEN.min(datagram.len().saturating_sub(1));
    let mut matched = None;
    for cid_len in 0..=max_len {
        if let Ok(header) = parse_short_header(datagram, cid_len) {
            let dcid = header.dcid.as_bytes().to_vec();
            if connections.contains_key(&dcid) {
                matched = Some((dcid, header.header_len, datagram.len() - header.header_len));
                break;
            }
        }
    }
    let (dcid, header_len, declared_length) = matched.ok_or(QuicError::ProtocolViolation("1-RTT packet for unknown connection"))?;

    let entry = connections.get_mut(&dcid).expect("just matched above");
    if entry.one_rtt_keys.is_none() {
        return Err(QuicError::KeysNotReady);
    }

    let payload = {
        let one_rtt_keys = entry.one_rtt_keys.as_ref().expect("checked above");
        let hp = &one_rtt_keys.remote.header_protection;
        let packet_crypto = &*one_rtt_keys.remote.packet;
        unprotect_and_open(datagram, header_len, declared_length, hp, packet_crypto, &mut entry.conn, SpaceId::OneRtt, false)?
    };

    let mut offset = 0;
    while offset < payload.len() {
        let (frame, used) = parse_frame(&payload[offset..])?;
        offset += used;
        if let QuicFrame::Stream { stream_id: _, offset: stream_offset, fin, data } = frame {
            entry.request_buf.extend_from_slice(data);
            let _ = stream_offset; // single request stream per connection in this event loop
            if fin {
                let chain = state.chain();
                let dispatcher = state.dispatcher.as_ref();
                match handle_http3_request_stream(&entry.request_buf, peer_addr.ip(), &chain, &state.clock as &dyn Clock, dispatcher).await {
                    Ok(Some(response_bytes)) => send_one_rtt_response(entry, &response_bytes, socket).await,
                    Ok(None) => {}
                    Err(err) => warn!(peer = %peer_addr, error = %err, "HTTP/3 request handling failed"),
                }
                entry.request_buf.clear();
            }
        }
    }
    Ok(())
}

async fn send_one_rtt_response(entry: &mut ConnEntry, h3_bytes: &[u8], socket: &UdpSocket) {
    let mut payload = Vec::new();
    if encode_stream(0, 0, h3_bytes, true, &mut payload).is_err() {
        return;
    }
    let pn = entry.conn.on_packet_sent(SpaceId::OneRtt, payload.len() as u64, Instant::now());

    let Some(keys) = entry.one_rtt_keys.as_ref() else { return };
    let dcid = entry.conn.peer_cid.as_bytes().to_vec();
    let mut packet = build_short_header(&dcid, PN_RESERVED_LEN);
    let header_len = packet.len() - PN_RESERVED_LEN;
    let pn_bytes = encode_packet_number(pn, PN_RESERVED_LEN);
    packet[header_len..].copy_from_slice(&pn_bytes);

    if keys.local.packet.seal_in_place(pn, &packet, &mut payload).is_err() {
        return;
    }
    packet.extend_from_slice(&payload);

    let sample_start = header_len + PN_RESERVED_LEN;
    if packet.len() < sample_start + SAMPLE_LEN {
        return;
    }
    let sample: [u8; SAMPLE_LEN] = packet[sample_start..sample_start + SAMPLE_LEN].try_into().expect("length checked above");
    let (head, tail) = packet.split_at_mut(header_len);
    if keys.local.header_protection.apply(&mut head[0], &mut tail[..PN_RESERVED_LEN], PN_RESERVED_LEN, &sample, false).is_err() {
        return;
    }

    let _ = socket.send_to(&packet, entry.peer_addr).await;
}
