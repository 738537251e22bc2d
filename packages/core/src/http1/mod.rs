//! Zero-allocation HTTP/1.x request parsing and response formatting.

mod parser;
mod request;
mod response;

pub use parser::parse_request;
pub use request::{Header, Method, Request, Version, MAX_HEADERS, MAX_HEADER_NAME_LEN, MAX_HEADER_VALUE_LEN, MAX_PATH_LEN, MAX_REQUEST_SIZE};
pub use response::format_response;
