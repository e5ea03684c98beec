use std::io::{BufReader, Read, Write};
use std::net::TcpListener;
#[cfg(unix)]
use std::os::unix::net::UnixListener;
use std::sync::mpsc;
use std::thread;

use bytes::Bytes;
use http::{Method, Request, StatusCode, Version};
use indoc::indoc;
use micro_scgi::client::{ScgiClient, Transport};
use micro_scgi::codec::read_netstring;
use micro_scgi::protocol::{ReasonPhrase, ScgiTarget};

/// What the mock server saw: the header block as ordered pairs, then the body.
#[derive(Debug)]
struct Captured {
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Captured {
    fn get(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }
}

fn split_header_block(block: &[u8]) -> Vec<(String, String)> {
    let block = block.strip_suffix(b"\0").expect("header block must end with NUL");
    let tokens: Vec<String> = block.split(|b| *b == 0).map(|t| String::from_utf8(t.to_vec()).unwrap()).collect();
    assert_eq!(tokens.len() % 2, 0, "odd number of tokens: {tokens:?}");
    tokens.chunks(2).map(|pair| (pair[0].clone(), pair[1].clone())).collect()
}

fn serve_one<S: Read + Write>(stream: S, response: &'static [u8]) -> Captured {
    let mut reader = BufReader::new(stream);
    let block = read_netstring(&mut reader).unwrap();
    let headers = split_header_block(&block);
    let content_length: usize = headers[0].1.parse().unwrap();

    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).unwrap();

    let mut stream = reader.into_inner();
    stream.write_all(response).unwrap();
    Captured { headers, body }
}

/// Starts a TCP server answering `count` requests with `response`.
fn tcp_server(count: usize, response: &'static [u8]) -> (String, mpsc::Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for stream in listener.incoming().take(count) {
            let captured = serve_one(stream.unwrap(), response);
            tx.send(captured).unwrap();
        }
    });

    (format!("scgi://{addr}"), rx)
}

fn read_body<R: Read>(mut body: R) -> String {
    let mut out = String::new();
    body.read_to_string(&mut out).unwrap();
    out
}

#[test]
fn get_over_tcp() {
    let (target, rx) = tcp_server(1, b"Status: 200 OK\r\nX: y\r\n\r\nbody");

    let request = Request::get("/")
        .header("REMOTE_ADDR", "127.0.0.1")
        .extension(ScgiTarget::new(target))
        .body(())
        .unwrap();

    let response = ScgiClient::new().execute(request).unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.version(), Version::HTTP_11);
    assert_eq!(response.extensions().get::<ReasonPhrase>().unwrap().as_str(), Some("OK"));
    assert_eq!(response.headers()["x"], "y");
    assert_eq!(read_body(response.into_body()), "body");

    let captured = rx.recv().unwrap();
    let expected = [
        ("CONTENT_LENGTH", "0"),
        ("SCGI", "1"),
        ("REQUEST_METHOD", "GET"),
        ("SERVER_PROTOCOL", "HTTP/1.1"),
        ("REMOTE_ADDR", "127.0.0.1"),
    ];
    let headers: Vec<(&str, &str)> = captured.headers.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    assert_eq!(headers, expected);
    assert!(captured.body.is_empty());
}

#[test]
fn status_without_reason_phrase() {
    let (target, _rx) = tcp_server(1, b"Status: 200\r\nX: y\r\n\r\nbody");

    let request = Request::get("/").extension(ScgiTarget::new(target)).body(()).unwrap();
    let response = ScgiClient::new().execute(request).unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.extensions().get::<ReasonPhrase>().is_none());
    assert_eq!(response.headers()["x"], "y");
    assert_eq!(read_body(response.into_body()), "body");
}

#[test]
fn redirect_with_bare_line_feeds() {
    let (target, _rx) = tcp_server(1, b"Status: 302\nLocation: /x\n\n");

    let request = Request::get("/old").extension(ScgiTarget::new(target)).body(()).unwrap();
    let response = ScgiClient::new().execute(request).unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()["location"], "/x");
    assert_eq!(read_body(response.into_body()), "");
}

#[test]
fn post_sends_body_after_block() {
    let (target, rx) = tcp_server(
        1,
        indoc! {b"
            Status: 201 Created\r
            Content-Type: text/plain\r
            Content-Length: 7\r
            \r
            created"},
    );

    let request = Request::post("/form")
        .header("content-type", "application/x-www-form-urlencoded")
        .header("QUERY_STRING", "debug=1")
        .extension(ScgiTarget::new(target))
        .body("name=value")
        .unwrap();

    let response = ScgiClient::new().execute(request).unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert_eq!(read_body(response.into_body()), "created");

    let captured = rx.recv().unwrap();
    assert_eq!(captured.get("CONTENT_LENGTH"), Some("10"));
    assert_eq!(captured.get("REQUEST_METHOD"), Some("POST"));
    assert_eq!(captured.get("CONTENT-TYPE"), Some("application/x-www-form-urlencoded"));
    assert_eq!(captured.get("QUERY_STRING"), Some("debug=1"));
    assert_eq!(captured.body, b"name=value");
}

#[test]
fn multi_valued_headers_are_joined() {
    let (target, rx) = tcp_server(1, b"Status: 204 No Content\r\n\r\n");

    let request = Request::get("/")
        .header("x-tag", "a")
        .header("x-tag", "b")
        .extension(ScgiTarget::new(target))
        .body(Bytes::new())
        .unwrap();

    let response = ScgiClient::new().execute(request).unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(read_body(response.into_body()), "");

    let captured = rx.recv().unwrap();
    assert_eq!(captured.get("X-TAG"), Some("a,b"));
}

#[test]
fn http_10_request() {
    let (target, rx) = tcp_server(1, b"Status: 404 Not Found\r\n\r\nmissing");

    let request =
        Request::get("/nope").version(Version::HTTP_10).extension(ScgiTarget::new(target)).body(()).unwrap();

    let response = ScgiClient::new().execute(request).unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.version(), Version::HTTP_10);
    assert_eq!(read_body(response.into_body()), "missing");

    assert_eq!(rx.recv().unwrap().get("SERVER_PROTOCOL"), Some("HTTP/1.0"));
}

#[test]
fn head_response_has_no_body() {
    let (target, _rx) = tcp_server(1, b"Status: 200 OK\r\nContent-Length: 42\r\n\r\n");

    let request = Request::builder()
        .method(Method::HEAD)
        .uri("/")
        .extension(ScgiTarget::new(target))
        .body(())
        .unwrap();

    let response = ScgiClient::new().execute(request).unwrap();
    assert_eq!(response.headers()["content-length"], "42");
    assert_eq!(read_body(response.into_body()), "");
}

#[test]
fn missing_status_is_format_error() {
    let (target, _rx) = tcp_server(1, b"Content-Type: text/plain\r\n\r\nbody");

    let request = Request::get("/").extension(ScgiTarget::new(target)).body(()).unwrap();
    let error = ScgiClient::new().execute(request).unwrap_err();
    assert!(error.is_format(), "{error}");
}

#[test]
fn malformed_headers_are_protocol_error() {
    let (target, _rx) = tcp_server(1, b"Status: 200 OK\r\nnot a header\r\n\r\n");

    let request = Request::get("/").extension(ScgiTarget::new(target)).body(()).unwrap();
    let error = ScgiClient::new().execute(request).unwrap_err();
    assert!(error.is_protocol(), "{error}");
}

#[test]
fn server_closing_early_is_io_error() {
    let (target, _rx) = tcp_server(1, b"");

    let request = Request::get("/").extension(ScgiTarget::new(target)).body(()).unwrap();
    let error = ScgiClient::new().execute(request).unwrap_err();
    assert!(error.is_io(), "{error}");
}

#[test]
fn connect_refused() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let request = Request::get("/").extension(ScgiTarget::new(format!("scgi://{addr}"))).body(()).unwrap();
    let error = ScgiClient::new().execute(request).unwrap_err();
    assert!(error.is_connect(), "{error}");
}

#[test]
fn invalid_targets_fail_before_dialing() {
    for target in ["scgi://h:9000/x.sock", "scgi://", "not a url", "scgi://h:99999"] {
        let request = Request::get("/").extension(ScgiTarget::new(target)).body(()).unwrap();
        let error = ScgiClient::new().execute(request).unwrap_err();
        assert!(error.is_validation(), "{target}: {error}");
    }
}

#[test]
fn concurrent_exchanges_share_one_client() {
    const COUNT: usize = 8;
    let (target, rx) = tcp_server(COUNT, b"Status: 200 OK\r\n\r\npong");
    let client = ScgiClient::new();

    thread::scope(|scope| {
        for i in 0..COUNT {
            let target = target.clone();
            let client = &client;
            scope.spawn(move || {
                let request = Request::get(format!("/{i}"))
                    .header("REQUEST_URI", format!("/{i}"))
                    .extension(ScgiTarget::new(target))
                    .body(())
                    .unwrap();
                let response = client.execute(request).unwrap();
                assert_eq!(read_body(response.into_body()), "pong");
            });
        }
    });

    let mut uris: Vec<String> = rx.iter().take(COUNT).map(|c| c.get("REQUEST_URI").unwrap().to_string()).collect();
    uris.sort();
    let mut expected: Vec<String> = (0..COUNT).map(|i| format!("/{i}")).collect();
    expected.sort();
    assert_eq!(uris, expected);
}

#[cfg(unix)]
#[test]
fn get_over_unix_socket() {
    let path = std::env::temp_dir().join(format!("micro-scgi-{}.sock", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path).unwrap();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        serve_one(stream, b"Status: 200 OK\r\nContent-Length: 4\r\n\r\nunix")
    });

    let target = format!("scgi:///{}", path.display());
    let request = Request::put("/upload")
        .extension(ScgiTarget::new(target))
        .body(vec![1u8, 2, 3])
        .unwrap();

    let response = ScgiClient::new().execute(request).unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_body(response.into_body()), "unix");

    let captured = server.join().unwrap();
    assert_eq!(captured.get("CONTENT_LENGTH"), Some("3"));
    assert_eq!(captured.get("REQUEST_METHOD"), Some("PUT"));
    assert_eq!(captured.body, [1, 2, 3]);

    let _ = std::fs::remove_file(&path);
}

#[cfg(unix)]
#[test]
fn escaped_unix_socket_path() {
    let dir = std::env::temp_dir().join(format!("micro scgi {}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("app.sock");
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path).unwrap();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        serve_one(stream, b"Status: 200 OK\r\n\r\nescaped")
    });

    let target = format!("scgi:///{}", path.display().to_string().replace(' ', "%20"));
    let request = Request::get("/").extension(ScgiTarget::new(target)).body(()).unwrap();

    let response = ScgiClient::new().execute(request).unwrap();
    assert_eq!(read_body(response.into_body()), "escaped");
    assert_eq!(server.join().unwrap().get("REQUEST_METHOD"), Some("GET"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn caller_imposed_read_timeout() {
    use micro_scgi::connection::ScgiConnection;
    use micro_scgi::protocol::resolve;
    use std::time::Duration;

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (done_tx, done_rx) = mpsc::channel::<()>();
    let server = thread::spawn(move || {
        // keep the connection open without answering
        let (_stream, _) = listener.accept().unwrap();
        let _ = done_rx.recv();
    });

    let target = resolve(&format!("scgi://{addr}")).unwrap();
    let mut connection = ScgiConnection::connect(&target).unwrap();
    connection.get_mut().set_read_timeout(Some(Duration::from_millis(100))).unwrap();
    connection.get_ref().set_write_timeout(Some(Duration::from_secs(5))).unwrap();

    let parts = Request::get("/").body(()).unwrap().into_parts().0;
    connection.send(&parts, b"").unwrap();
    let error = connection.read_response(Version::HTTP_11, &Method::GET).unwrap_err();
    assert!(error.is_io(), "{error}");

    done_tx.send(()).unwrap();
    server.join().unwrap();
}
