//! Worker loop tests against deterministic fake connections

use super::Worker;
use crate::catalog::{Expect, PayloadSpec, RequestCatalog, ScenarioSpec};
use crate::pool::{Conn, Connector};
use crate::stats::WorkerStats;

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const OK_RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok";

/// State shared by every fake connection of one connector
struct FakeShared {
    response: Vec<u8>,
    latency: Option<Duration>,
    /// Global count of requests served, across all connections
    served: AtomicUsize,
    /// Serve index (0-based) that fails with an I/O error; fires once
    fail_on_serve: Option<usize>,
    fail_fired: AtomicBool,
    /// Set once a connection is used again after it errored
    reused_after_error: AtomicBool,
    /// Stop flag shared with the workers, raised after `stop_after` serves
    stop: Arc<AtomicBool>,
    stop_after: usize,
    opened: AtomicUsize,
}

struct FakeConnector {
    shared: Arc<FakeShared>,
}

impl FakeConnector {
    fn new(stop: Arc<AtomicBool>, stop_after: usize) -> Self {
        Self {
            shared: Arc::new(FakeShared {
                response: OK_RESPONSE.to_vec(),
                latency: None,
                served: AtomicUsize::new(0),
                fail_on_serve: None,
                fail_fired: AtomicBool::new(false),
                reused_after_error: AtomicBool::new(false),
                stop,
                stop_after,
                opened: AtomicUsize::new(0),
            }),
        }
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        Arc::get_mut(&mut self.shared).unwrap().latency = Some(latency);
        self
    }

    fn with_response(mut self, response: &[u8]) -> Self {
        Arc::get_mut(&mut self.shared).unwrap().response = response.to_vec();
        self
    }

    fn with_fail_on_serve(mut self, serve: usize) -> Self {
        Arc::get_mut(&mut self.shared).unwrap().fail_on_serve = Some(serve);
        self
    }

    fn served(&self) -> usize {
        self.shared.served.load(Ordering::SeqCst)
    }

    fn opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }
}

impl Connector for FakeConnector {
    fn connect(&self) -> io::Result<Box<dyn Conn>> {
        self.shared.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeConn {
            shared: Arc::clone(&self.shared),
            pending: Vec::new(),
            errored: false,
        }))
    }
}

/// One fake connection: each request write is answered by the canned response
struct FakeConn {
    shared: Arc<FakeShared>,
    pending: Vec<u8>,
    errored: bool,
}

impl FakeConn {
    fn check_reuse(&self) {
        if self.errored {
            self.shared.reused_after_error.store(true, Ordering::SeqCst);
        }
    }
}

impl Write for FakeConn {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check_reuse();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for FakeConn {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.check_reuse();
        if self.pending.is_empty() {
            // A drained buffer means the previous response was fully framed;
            // this read begins serving the next request.
            let serve = self.shared.served.fetch_add(1, Ordering::SeqCst);
            if serve + 1 >= self.shared.stop_after {
                self.shared.stop.store(true, Ordering::Release);
            }
            if self.shared.fail_on_serve == Some(serve)
                && !self.shared.fail_fired.swap(true, Ordering::SeqCst)
            {
                self.errored = true;
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "injected"));
            }
            if let Some(latency) = self.shared.latency {
                thread::sleep(latency);
            }
            self.pending = self.shared.response.clone();
        }
        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

fn single_variant_catalog() -> Arc<RequestCatalog> {
    let spec = ScenarioSpec::new("test", "127.0.0.1", 8080)
        .with_variant(PayloadSpec::new("only", "{}"));
    Arc::new(RequestCatalog::build(&spec).unwrap())
}

#[test]
fn test_worker_attempts_match_served_requests() {
    let stop = Arc::new(AtomicBool::new(false));
    let connector = Arc::new(FakeConnector::new(Arc::clone(&stop), 50));

    let worker = Worker::new(
        0,
        single_variant_catalog(),
        connector.clone(),
        4,
        stop,
        true,
    );
    let stats = worker.run();

    assert_eq!(stats.total_attempts() as usize, connector.served());
    assert_eq!(stats.total_errors(), 0);
    assert_eq!(stats.per_variant()[0].statuses.get(&200).copied(), Some(50));
    assert_eq!(stats.per_variant()[0].latencies_ms.len(), 50);
}

#[test]
fn test_no_record_lost_across_workers() {
    let stop = Arc::new(AtomicBool::new(false));
    let connector = Arc::new(FakeConnector::new(Arc::clone(&stop), 200));
    let catalog = single_variant_catalog();

    let handles: Vec<_> = (0..4)
        .map(|id| {
            let worker = Worker::new(
                id,
                Arc::clone(&catalog),
                connector.clone(),
                4,
                Arc::clone(&stop),
                true,
            );
            thread::spawn(move || worker.run())
        })
        .collect();

    let per_worker: Vec<WorkerStats> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let mut merged = WorkerStats::new(catalog.len());
    for stats in &per_worker {
        merged.merge(stats);
    }

    // Exact conservation: every served request is counted exactly once.
    let sum: u64 = per_worker.iter().map(|s| s.total_attempts()).sum();
    assert_eq!(merged.total_attempts(), sum);
    assert_eq!(merged.total_attempts() as usize, connector.served());
    assert_eq!(merged.total_errors(), 0);
    assert_eq!(
        merged.per_variant()[0].latencies_ms.len() as u64,
        merged.total_attempts()
    );
}

#[test]
fn test_io_error_discards_connection_and_counts_once() {
    let stop = Arc::new(AtomicBool::new(false));
    let connector = Arc::new(
        // Third request (serve index 2) errors.
        FakeConnector::new(Arc::clone(&stop), 6).with_fail_on_serve(2),
    );

    let worker = Worker::new(
        0,
        single_variant_catalog(),
        connector.clone(),
        4,
        stop,
        true,
    );
    let stats = worker.run();

    assert_eq!(stats.total_attempts(), 6);
    assert_eq!(stats.total_errors(), 1);
    assert_eq!(stats.per_variant()[0].latencies_ms.len(), 5);

    // The failed connection was replaced, and never touched again.
    assert_eq!(connector.opened(), 2);
    assert!(!connector.shared.reused_after_error.load(Ordering::SeqCst));
}

#[test]
fn test_warmup_keeps_counters_but_drops_latencies() {
    let stop = Arc::new(AtomicBool::new(false));
    let connector = Arc::new(FakeConnector::new(Arc::clone(&stop), 20));

    let worker = Worker::new(
        0,
        single_variant_catalog(),
        connector,
        4,
        stop,
        false, // warm-up pass
    );
    let stats = worker.run();

    assert_eq!(stats.total_attempts(), 20);
    assert!(stats.per_variant()[0].latencies_ms.is_empty());
}

#[test]
fn test_rejected_status_counts_as_error() {
    let stop = Arc::new(AtomicBool::new(false));
    let connector = Arc::new(
        FakeConnector::new(Arc::clone(&stop), 10)
            .with_response(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\n\r\n"),
    );

    let spec = ScenarioSpec::new("test", "127.0.0.1", 8080)
        .with_variant(PayloadSpec::new("strict", "{}").with_expect(Expect::Status(200)));
    let catalog = Arc::new(RequestCatalog::build(&spec).unwrap());

    let worker = Worker::new(0, catalog, connector, 4, stop, true);
    let stats = worker.run();

    let v = &stats.per_variant()[0];
    assert_eq!(v.attempts, 10);
    assert_eq!(v.errors, 10);
    assert_eq!(v.statuses.get(&500).copied(), Some(10));
    assert!(v.latencies_ms.is_empty());
}

#[test]
fn test_simulated_latency_is_measured() {
    let stop = Arc::new(AtomicBool::new(false));
    let connector = Arc::new(
        FakeConnector::new(Arc::clone(&stop), 20).with_latency(Duration::from_millis(1)),
    );

    let worker = Worker::new(
        0,
        single_variant_catalog(),
        connector,
        4,
        stop,
        true,
    );
    let stats = worker.run();

    let latencies = &stats.per_variant()[0].latencies_ms;
    assert_eq!(latencies.len(), 20);
    assert!(latencies.iter().all(|&ms| ms >= 1.0), "latency below the simulated 1 ms");
}
