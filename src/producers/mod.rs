//! Built-in push query producers.
//!
//! - [`HttpProducer`]: runs queries against a live server
//! - [`VecProducer`]: replays recorded responses

/// HTTP push query producer.
pub mod http_producer;
/// Newline framing of chunked responses.
pub mod record_decoder;
/// In-memory replay producer.
pub mod vec_producer;

pub use http_producer::{HttpConfig, HttpProducer};
pub use record_decoder::RecordDecoder;
pub use vec_producer::VecProducer;
