use std::io::{self, Read, Write};

use http::Request;
use micro_scgi::client::{ScgiClient, Transport};
use micro_scgi::protocol::ScgiTarget;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

// cargo run --example scgi_get -- scgi://127.0.0.1:4000 /hello
// cargo run --example scgi_get -- scgi:////run/app.sock /
fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut args = std::env::args().skip(1);
    let target = args.next().unwrap_or_else(|| "scgi://127.0.0.1:4000".to_string());
    let uri = args.next().unwrap_or_else(|| "/".to_string());

    let (path, query) = uri.split_once('?').unwrap_or((&uri, ""));
    let request = Request::get(uri.as_str())
        .header("REQUEST_URI", uri.as_str())
        .header("PATH_INFO", path)
        .header("QUERY_STRING", query)
        .header("REMOTE_ADDR", "127.0.0.1")
        .extension(ScgiTarget::new(target))
        .body(())
        .expect("request must be valid");

    let mut response = match ScgiClient::new().execute(request) {
        Ok(response) => response,
        Err(e) => {
            error!(cause = %e, "scgi request failed");
            return;
        }
    };

    info!(status = %response.status(), "received response");
    for (name, value) in response.headers() {
        println!("{name}: {}", String::from_utf8_lossy(value.as_bytes()));
    }
    println!();

    let mut body = Vec::new();
    if let Err(e) = response.body_mut().read_to_end(&mut body) {
        error!(cause = %e, "failed to read response body");
        return;
    }
    if let Err(e) = io::stdout().write_all(&body) {
        error!(cause = %e, "failed to write response body");
    }
}
