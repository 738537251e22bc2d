//! HTTP/3 request/response framing over one bidirectional stream:
//! HEADERS frame → QPACK decode → optional DATA frames →
//! middleware chain → QPACK-encode the response headers → HEADERS+DATA
//! frames back. Operates on already-reassembled stream bytes; demuxing
//! those bytes out of QUIC packets is `quic::Connection`'s job one layer
//! down.

use std::net::IpAddr;

use crate::error::GatewayError;
use crate::h3::{encode_frame, parse_frame, Frame};
use crate::qpack::{decode_header_block, encode_header_block, HeaderField};
use crate::time::Clock;

use super::backend_dispatch::BackendDispatcher;
use super::middleware::{MiddlewareChain, RequestContext};

/// Parses every complete frame out of a request stream's buffered bytes,
/// runs the middleware chain once the HEADERS frame is found, and
/// returns the encoded HEADERS+DATA frames to write back. Returns
/// `Ok(None)` if the stream doesn't yet contain a complete HEADERS frame.
/// `dispatcher` is `Some` only in load-balancer mode.
pub async fn handle_request_stream(buf: &[u8], peer_ip: IpAddr, chain: &MiddlewareChain<'_>, clock: &dyn Clock, dispatcher: Option<&BackendDispatcher>) -> Result<Option<Vec<u8>>, GatewayError> {
    let mut offset = 0;
    let mut method = String::from("GET");
    let mut path = String::from("/");
    let mut auth_header: Option<String> = None;
    let mut body = Vec::new();
    let mut saw_headers = false;

    while offset < buf.len() {
        let Some((frame, used)) = parse_frame(&buf[offset..])? else {
            break; // incomplete frame at the tail, wait for more bytes
        };
        offset += used;
        match frame {
            Frame::Headers(block) => {
                let fields = decode_header_block(&block)?;
                for HeaderField { name, value } in fields {
                    match name.as_str() {
                        ":method" => method = value,
                        ":path" => path = value,
                        "authorization" => auth_header = Some(value),
                        _ => {}
                    }
                }
                saw_headers = true;
            }
            Frame::Data(chunk) => body.extend_from_slice(&chunk),
            Frame::Settings(_) | Frame::GoAway(_) | Frame::Unknown { .. } => {}
        }
    }

    if !saw_headers {
        return Ok(None);
    }

    let ctx = RequestContext { peer_ip, method: &method, path: &path, auth_header: auth_header.as_deref(), now_unix: clock.unix_now() };
    let response = match dispatcher {
        Some(dispatcher) => chain.handle_with_backend(&ctx, clock.monotonic_now(), dispatcher, &body).await,
        None => chain.handle(&ctx, clock.monotonic_now()),
    };

    let status_str = response.status.to_string();
    let header_fields = vec![HeaderField::new(":status", status_str)];
    let header_block = encode_header_block(&header_fields)?;

    let mut out = encode_frame(&Frame::Headers(header_block.into()));
    if !response.body.is_empty() {
        out.extend_from_slice(&encode_frame(&Frame::Data(response.body.into())));
    }
    Ok(Some(out))
}
