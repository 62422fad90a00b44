//! # HTTP Push Query Producer
//!
//! Runs a push query against a ksqlDB server's `/query` endpoint and streams
//! the chunked response back as records.
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use streamweave_ksql::producers::{HttpConfig, HttpProducer};
//! use streamweave_ksql::query::{QueryWindow, build};
//! use streamweave_ksql::Producer;
//!
//! # async fn example() {
//! let mut producer = HttpProducer::new(HttpConfig::new("http://localhost:8088"));
//! let query = build("PAGEVIEWS", &QueryWindow::new().with_limit(5));
//! let mut records = producer.produce(&query);
//! while let Some(record) = records.next().await {
//!   println!("{:?}", record);
//! }
//! # }
//! ```
//!
//! The connection is opened on first poll and lives inside the stream, so
//! dropping the stream closes it on every exit path.

use crate::error::{KsqlError, TransportError};
use crate::output::{Output, RawRecord, RecordStream};
use crate::producers::record_decoder::RecordDecoder;
use crate::query::PushQuery;
use crate::{Producer, ProducerConfig};
use async_stream::stream;
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE, HeaderName, HeaderValue};
use http::{Method, Request, Uri};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, error, info};

/// Media type of push-query requests and responses.
pub const KSQL_MEDIA_TYPE: &str = "application/vnd.ksql.v1+json";

/// Endpoint path used when none is configured.
pub const DEFAULT_QUERY_PATH: &str = "/query";

/// Connection settings for [`HttpProducer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
  /// Server base URL, e.g. `http://localhost:8088`.
  pub url: String,
  /// Endpoint path appended to `url`.
  pub path: String,
  /// Extra request headers.
  pub headers: Vec<(String, String)>,
}

impl HttpConfig {
  /// Creates a config for the server at `url`.
  pub fn new(url: impl Into<String>) -> Self {
    Self {
      url: url.into(),
      path: DEFAULT_QUERY_PATH.to_string(),
      headers: Vec::new(),
    }
  }

  /// Overrides the endpoint path.
  #[must_use]
  pub fn with_path(mut self, path: impl Into<String>) -> Self {
    self.path = path.into();
    self
  }

  /// Adds a request header.
  #[must_use]
  pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.push((name.into(), value.into()));
    self
  }

  /// The full endpoint URI.
  pub fn endpoint(&self) -> Result<Uri, TransportError> {
    let url = format!("{}{}", self.url.trim_end_matches('/'), self.path);
    url
      .parse()
      .map_err(|source| TransportError::InvalidUrl { url, source })
  }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
  ksql: &'a str,
  streams_properties: &'a BTreeMap<String, String>,
}

/// A producer that runs push queries over HTTP.
#[derive(Debug, Clone)]
pub struct HttpProducer {
  /// Connection settings.
  pub http_config: HttpConfig,
  /// Configuration for the producer.
  pub config: ProducerConfig,
  client: Client<HttpConnector, Full<Bytes>>,
}

impl HttpProducer {
  /// Creates a producer for the server described by `http_config`.
  pub fn new(http_config: HttpConfig) -> Self {
    Self {
      http_config,
      config: ProducerConfig::default(),
      client: Client::builder(TokioExecutor::new()).build_http(),
    }
  }

  /// Sets the name for this producer.
  #[must_use]
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.config.name = Some(name.into());
    self
  }

  /// Sets the initial capacity of the record decoder's buffer.
  ///
  /// This does not change how much is read per call or how records are
  /// framed. See [`ProducerConfig::chunk_size`].
  #[must_use]
  pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
    self.config = self.config.with_chunk_size(chunk_size);
    self
  }

  fn request(&self, query: &PushQuery) -> Result<Request<Full<Bytes>>, TransportError> {
    let body = serde_json::to_vec(&QueryRequest {
      ksql: query.text(),
      streams_properties: query.properties(),
    })?;

    let mut builder = Request::builder()
      .method(Method::POST)
      .uri(self.http_config.endpoint()?)
      .header(CONTENT_TYPE, format!("{KSQL_MEDIA_TYPE}; charset=utf-8"))
      .header(ACCEPT, KSQL_MEDIA_TYPE);
    for (name, value) in &self.http_config.headers {
      builder = builder.header(
        HeaderName::try_from(name.as_str()).map_err(http::Error::from)?,
        HeaderValue::try_from(value.as_str()).map_err(http::Error::from)?,
      );
    }
    Ok(builder.body(Full::new(Bytes::from(body)))?)
  }
}

impl Output for HttpProducer {
  type Output = RawRecord;
  type OutputStream = RecordStream;
}

impl Producer for HttpProducer {
  fn produce(&mut self, query: &PushQuery) -> Self::OutputStream {
    let component = self.component_info().name;
    let client = self.client.clone();
    let chunk_size = self.config.chunk_size;
    let request = self.request(query);

    Box::pin(stream! {
      let request = match request {
        Ok(request) => request,
        Err(e) => {
          error!(component = %component, error = %e, "failed to build push query request");
          yield Err(KsqlError::from(e));
          return;
        }
      };
      let uri = request.uri().clone();

      let response = match client.request(request).await {
        Ok(response) => response,
        Err(e) => {
          error!(component = %component, uri = %uri, error = %e, "push query connection failed");
          yield Err(KsqlError::Transport(TransportError::from(e)));
          return;
        }
      };

      let status = response.status();
      if !status.is_success() {
        let body = match response.into_body().collect().await {
          Ok(collected) => String::from_utf8_lossy(&collected.to_bytes()).into_owned(),
          Err(_) => String::new(),
        };
        error!(component = %component, status = %status, "push query rejected");
        yield Err(KsqlError::Transport(TransportError::Status { status, body }));
        return;
      }

      info!(component = %component, uri = %uri, "push query connected");
      let _release = scopeguard::guard(uri, |uri| {
        debug!(uri = %uri, "push query connection released");
      });

      let mut body = response.into_body();
      let mut decoder = RecordDecoder::with_capacity(chunk_size);
      while let Some(frame) = body.frame().await {
        let frame = match frame {
          Ok(frame) => frame,
          Err(e) => {
            error!(component = %component, error = %e, "push query response failed");
            yield Err(KsqlError::Transport(TransportError::from(e)));
            return;
          }
        };
        let Ok(data) = frame.into_data() else {
          continue;
        };
        for record in decoder.push(&data) {
          yield record;
        }
      }

      if let Some(record) = decoder.finish() {
        yield record;
      }
      debug!(component = %component, "push query response closed");
    })
  }

  fn set_config_impl(&mut self, config: ProducerConfig) {
    self.config = config;
  }

  fn get_config_impl(&self) -> &ProducerConfig {
    &self.config
  }

  fn get_config_mut_impl(&mut self) -> &mut ProducerConfig {
    &mut self.config
  }
}
