//! Readiness probing
//!
//! Before any load starts, the target must answer one request inside a
//! bounded window. Any HTTP status counts as ready; the probe only proves the
//! listener is up and speaking HTTP, not that the endpoint is healthy. A
//! target that never answers aborts the scenario as unavailable, so no
//! misleading partial metrics are emitted.

use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::framer;

const PROBE_CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const PROBE_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Block until the target answers one request, or the window closes
pub fn wait_ready(host: &str, port: u16, path: &str, window: Duration) -> Result<()> {
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|e| Error::config(format!("cannot resolve {host}:{port}: {e}")))?
        .next()
        .ok_or_else(|| Error::config(format!("{host}:{port} resolved to no address")))?;

    let request = format!("GET {path} HTTP/1.1\r\nHost: {host}:{port}\r\nConnection: close\r\n\r\n");

    let deadline = Instant::now() + window;
    let mut last_error = String::from("no probe attempted");
    loop {
        match probe_once(&addr, request.as_bytes()) {
            Ok(status) => {
                tracing::debug!(%addr, status, "target answered readiness probe");
                return Ok(());
            }
            Err(e) => last_error = e,
        }
        if Instant::now() >= deadline {
            return Err(Error::target_unavailable(format!(
                "{host}:{port} did not answer within {window:?}: {last_error}"
            )));
        }
        thread::sleep(PROBE_RETRY_DELAY);
    }
}

fn probe_once(addr: &std::net::SocketAddr, request: &[u8]) -> std::result::Result<u16, String> {
    let mut stream =
        TcpStream::connect_timeout(addr, PROBE_CONNECT_TIMEOUT).map_err(|e| e.to_string())?;
    stream
        .set_read_timeout(Some(PROBE_CONNECT_TIMEOUT))
        .map_err(|e| e.to_string())?;
    stream
        .set_write_timeout(Some(PROBE_CONNECT_TIMEOUT))
        .map_err(|e| e.to_string())?;
    stream.write_all(request).map_err(|e| e.to_string())?;
    let response = framer::read_response(&mut stream).map_err(|e| e.to_string())?;
    Ok(response.status)
}
