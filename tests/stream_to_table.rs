use std::net::SocketAddr;
use std::time::Duration;
use streamweave_ksql::producers::HttpConfig;
use streamweave_ksql::{
  ErrorStrategy, KsqlClient, KsqlError, QueryWindow, StopReason, TransportError,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const CHUNKED_OK: &str = "HTTP/1.1 200 OK\r\n\
  content-type: application/vnd.ksql.v1+json\r\n\
  transfer-encoding: chunked\r\n\r\n";

const HEADER: &str =
  "[{\"header\":{\"queryId\":\"transient_PAGEVIEWS_1\",\"schema\":\"`ROWTIME` BIGINT, `USERID` STRING\"}},\n";

// Reads one request: headers, then `content-length` bytes of body.
async fn read_request(socket: &mut TcpStream) -> String {
  let mut data = Vec::new();
  let mut buf = [0u8; 1024];
  loop {
    let n = socket.read(&mut buf).await.unwrap();
    assert!(n > 0, "client closed before sending a request");
    data.extend_from_slice(&buf[..n]);

    let text = String::from_utf8_lossy(&data).into_owned();
    if let Some(end) = text.find("\r\n\r\n") {
      let length = text[..end]
        .lines()
        .find_map(|line| {
          let (name, value) = line.split_once(':')?;
          name
            .eq_ignore_ascii_case("content-length")
            .then(|| value.trim().parse::<usize>().unwrap())
        })
        .unwrap_or(0);
      if data.len() >= end + 4 + length {
        return text;
      }
    }
  }
}

/// Serves one push query. Writes `chunks` as a chunked body, then either
/// closes the response or holds it open until the client disconnects.
async fn serve<C>(chunks: Vec<C>, hold_open: bool) -> (SocketAddr, JoinHandle<String>)
where
  C: AsRef<[u8]> + Send + 'static,
{
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();

  let handle = tokio::spawn(async move {
    let (mut socket, _) = listener.accept().await.unwrap();
    let request = read_request(&mut socket).await;

    socket.write_all(CHUNKED_OK.as_bytes()).await.unwrap();
    for chunk in chunks {
      let chunk = chunk.as_ref();
      let mut framed = format!("{:x}\r\n", chunk.len()).into_bytes();
      framed.extend_from_slice(chunk);
      framed.extend_from_slice(b"\r\n");
      socket.write_all(&framed).await.unwrap();
      socket.flush().await.unwrap();
    }

    if hold_open {
      let mut buf = [0u8; 64];
      while let Ok(n) = socket.read(&mut buf).await {
        if n == 0 {
          break;
        }
      }
    } else {
      socket.write_all(b"0\r\n\r\n").await.unwrap();
    }
    request
  });

  (addr, handle)
}

fn client(addr: SocketAddr) -> KsqlClient {
  KsqlClient::with_http_config(HttpConfig::new(format!("http://{addr}")))
}

#[tokio::test]
async fn test_stream_to_table_over_http() {
  let (addr, server) = serve(
    vec![
      HEADER,
      "{\"row\":{\"columns\":[1591000000000,\"User_1\"]}},\n{\"row\":{\"col",
      "umns\":[1591000001000,\"User_2\"]}},\n",
      "\n",
      "{\"finalMessage\":\"Limit Reached\"}]\n",
    ],
    false,
  )
  .await;

  let mut client = client(addr);
  let window = QueryWindow::new()
    .with_start("2020-06-01 00:00:00")
    .with_limit(5);
  let table = client
    .stream_to_table("PAGEVIEWS", &window, &CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(table.num_rows(), 2);
  assert_eq!(table.column_names(), vec!["ROWTIME", "USERID"]);
  let times = table.timestamps("ROWTIME").unwrap();
  assert_eq!(times[0].unwrap().to_string(), "2020-06-01 08:26:40");
  assert_eq!(times[1].unwrap().to_string(), "2020-06-01 08:26:41");

  let request = server.await.unwrap();
  assert!(request.starts_with("POST /query HTTP/1.1"));
  assert!(
    request
      .to_ascii_lowercase()
      .contains("accept: application/vnd.ksql.v1+json")
  );
  assert!(request.contains("\"streamsProperties\":{\"auto.offset.reset\":\"earliest\"}"));
  assert!(request.contains("EMIT CHANGES\\nLIMIT 5;"));
}

#[tokio::test]
async fn test_idle_timeout_releases_connection() {
  let (addr, server) = serve(
    vec![HEADER, "{\"row\":{\"columns\":[1591000000000,\"User_1\"]}},\n"],
    true,
  )
  .await;

  let mut client = client(addr);
  let window = QueryWindow::new().with_idle_timeout(Duration::from_millis(200));
  let (result, stop) = client
    .stream_rows("PAGEVIEWS", &window, &CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(stop, StopReason::IdleTimeout);
  assert_eq!(result.len(), 1);

  drop(client);
  tokio::time::timeout(Duration::from_secs(5), server)
    .await
    .expect("connection should be closed after the idle timeout")
    .unwrap();
}

#[tokio::test]
async fn test_cancellation_keeps_partial_rows() {
  let (addr, server) = serve(
    vec![
      HEADER,
      "{\"row\":{\"columns\":[1591000000000,\"User_1\"]}},\n",
      "{\"row\":{\"columns\":[1591000001000,\"User_2\"]}},\n",
    ],
    true,
  )
  .await;

  let cancel = CancellationToken::new();
  let trigger = cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(300)).await;
    trigger.cancel();
  });

  let mut client = client(addr);
  let table = client
    .stream_to_table("PAGEVIEWS", &QueryWindow::new(), &cancel)
    .await
    .unwrap();
  assert_eq!(table.num_rows(), 2);

  drop(client);
  tokio::time::timeout(Duration::from_secs(5), server)
    .await
    .expect("connection should be closed after cancellation")
    .unwrap();
}

#[tokio::test]
async fn test_rejected_query_is_transport_error() {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    let (mut socket, _) = listener.accept().await.unwrap();
    read_request(&mut socket).await;
    let body = "{\"@type\":\"statement_error\",\"message\":\"PAGEVIEWS does not exist.\"}";
    let response = format!(
      "HTTP/1.1 400 Bad Request\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{}",
      body.len(),
      body
    );
    socket.write_all(response.as_bytes()).await.unwrap();
  });

  let err = client(addr)
    .stream_to_table("PAGEVIEWS", &QueryWindow::new(), &CancellationToken::new())
    .await
    .unwrap_err();

  match err {
    KsqlError::Transport(TransportError::Status { status, body }) => {
      assert_eq!(status.as_u16(), 400);
      assert!(body.contains("does not exist"));
    }
    other => panic!("Expected status error, got {other:?}"),
  }
}

#[tokio::test]
async fn test_invalid_utf8_record_is_skipped() {
  let mut bad = b"{\"row\":{\"columns\":[1591000001000,\"".to_vec();
  bad.extend_from_slice(&[0xff, 0xfe]);
  bad.extend_from_slice(b"\"]}},\n");
  let chunks = vec![
    HEADER.as_bytes().to_vec(),
    b"{\"row\":{\"columns\":[1591000000000,\"User_1\"]}},\n".to_vec(),
    bad,
    b"{\"row\":{\"columns\":[1591000002000,\"User_3\"]}}]\n".to_vec(),
  ];

  let (addr, server) = serve(chunks.clone(), false).await;
  let err = client(addr)
    .stream_to_table("PAGEVIEWS", &QueryWindow::new(), &CancellationToken::new())
    .await
    .unwrap_err();
  assert!(matches!(err, KsqlError::MalformedMessage { .. }));
  // The client may hang up before the rest of the body is written.
  drop(server);

  let (addr, server) = serve(chunks, false).await;
  let table = client(addr)
    .with_error_strategy(ErrorStrategy::Skip)
    .stream_to_table("PAGEVIEWS", &QueryWindow::new(), &CancellationToken::new())
    .await
    .unwrap();
  assert_eq!(table.num_rows(), 2);
  server.await.unwrap();
}
