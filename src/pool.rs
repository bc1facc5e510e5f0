//! Per-worker connection pooling over a pluggable transport
//!
//! Each worker owns a private, bounded pool of persistent connections. Pools
//! are never shared across workers, so the request loop touches no locks. A
//! connection that fails is discarded, never repaired; the worker opens a
//! fresh one on a later attempt.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};

/// A duplex byte stream to the target, exclusively owned by one worker
pub trait Conn: Read + Write + Send {}

impl<T: Read + Write + Send> Conn for T {}

/// Opens new connections to the target
///
/// This is the seam the engine's tests use to inject deterministic fake
/// connections; production runs use [`TcpConnector`].
pub trait Connector: Send + Sync {
    /// Open a fresh connection, bounded by the connect timeout
    fn connect(&self) -> io::Result<Box<dyn Conn>>;
}

/// TCP transport with per-operation timeouts and Nagle disabled
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: SocketAddr,
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl TcpConnector {
    /// Resolve `host:port` and build a connector
    pub fn new(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        io_timeout: Duration,
    ) -> Result<Self> {
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| Error::config(format!("cannot resolve {host}:{port}: {e}")))?
            .next()
            .ok_or_else(|| Error::config(format!("{host}:{port} resolved to no address")))?;
        Ok(Self {
            addr,
            connect_timeout,
            io_timeout,
        })
    }

    /// Target socket address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Connector for TcpConnector {
    fn connect(&self) -> io::Result<Box<dyn Conn>> {
        let stream = TcpStream::connect_timeout(&self.addr, self.connect_timeout)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(self.io_timeout))?;
        stream.set_write_timeout(Some(self.io_timeout))?;
        Ok(Box::new(stream))
    }
}

/// Bounded per-worker pool with round-robin reuse
///
/// Populated lazily: `take` opens a connection only when the pool is empty,
/// and `put` returns a healthy one to the back of the rotation. Dropping a
/// connection instead of `put`-ting it back is how a worker discards it.
pub struct ConnectionPool {
    connector: Arc<dyn Connector>,
    conns: VecDeque<Box<dyn Conn>>,
    capacity: usize,
}

impl ConnectionPool {
    /// Create an empty pool bounded at `capacity` connections
    pub fn new(connector: Arc<dyn Connector>, capacity: usize) -> Self {
        Self {
            connector,
            conns: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Borrow the least recently used connection, opening one if none are pooled
    pub fn take(&mut self) -> io::Result<Box<dyn Conn>> {
        match self.conns.pop_front() {
            Some(conn) => Ok(conn),
            None => self.connector.connect(),
        }
    }

    /// Return a healthy connection to the rotation
    ///
    /// Silently closed if the pool is already at capacity.
    pub fn put(&mut self, conn: Box<dyn Conn>) {
        if self.conns.len() < self.capacity {
            self.conns.push_back(conn);
        }
    }

    /// Number of idle pooled connections
    pub fn idle(&self) -> usize {
        self.conns.len()
    }

    /// Pool capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("idle", &self.conns.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullConn;

    impl Read for NullConn {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    impl Write for NullConn {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct CountingConnector {
        opened: AtomicUsize,
    }

    impl Connector for CountingConnector {
        fn connect(&self) -> io::Result<Box<dyn Conn>> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(NullConn))
        }
    }

    #[test]
    fn test_pool_opens_lazily_and_reuses() {
        let connector = Arc::new(CountingConnector {
            opened: AtomicUsize::new(0),
        });
        let mut pool = ConnectionPool::new(connector.clone(), 4);

        let conn = pool.take().unwrap();
        assert_eq!(connector.opened.load(Ordering::SeqCst), 1);

        pool.put(conn);
        assert_eq!(pool.idle(), 1);

        let _conn = pool.take().unwrap();
        // Reused, not reopened.
        assert_eq!(connector.opened.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pool_discard_forces_reconnect() {
        let connector = Arc::new(CountingConnector {
            opened: AtomicUsize::new(0),
        });
        let mut pool = ConnectionPool::new(connector.clone(), 4);

        let conn = pool.take().unwrap();
        drop(conn); // discard instead of put
        assert_eq!(pool.idle(), 0);

        let _replacement = pool.take().unwrap();
        assert_eq!(connector.opened.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_pool_respects_capacity() {
        let connector = Arc::new(CountingConnector {
            opened: AtomicUsize::new(0),
        });
        let mut pool = ConnectionPool::new(connector.clone(), 2);

        let a = pool.take().unwrap();
        let b = pool.take().unwrap();
        let c = pool.take().unwrap();
        pool.put(a);
        pool.put(b);
        pool.put(c); // over capacity, dropped

        assert_eq!(pool.idle(), 2);
    }
}
