//! Integration tests for connection instance numbering and lazy initialisation.
//!
//! These tests verify that every sink of one connection shares its prefix,
//! that distinct connections never share an instance number regardless of
//! attachment order or concurrency, and that concurrent first use attaches
//! at most one default console sink.

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

use conn::{ConnectionRegistry, SinkOptions, TracedConnection};
use proptest::prelude::*;
use test_support::MemoryConnection;

fn traced(registry: &Arc<ConnectionRegistry>) -> TracedConnection<MemoryConnection> {
    TracedConnection::with_registry(MemoryConnection::new(), Arc::clone(registry))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// N sinks on one connection share a prefix; M connections get M distinct numbers.
    #[test]
    fn prefixes_are_shared_per_connection_and_unique_across(
        sinks_per_connection in proptest::collection::vec(1usize..5, 1..12),
        reversed in any::<bool>(),
    ) {
        let registry = Arc::new(ConnectionRegistry::new());
        let connections: Vec<_> = sinks_per_connection.iter().map(|_| traced(&registry)).collect();

        let mut order: Vec<usize> = (0..connections.len()).collect();
        if reversed {
            order.reverse();
        }

        let mut prefixes = HashSet::new();
        for index in order {
            let conn = &connections[index];
            let handles: Vec<_> = (0..sinks_per_connection[index])
                .map(|_| conn.attach_writer(Vec::new(), SinkOptions::file()))
                .collect();
            let prefix = handles[0].prefix();
            prop_assert!(
                handles.iter().all(|handle| handle.prefix() == prefix),
                "prefix differs from {}",
                prefix
            );
            prop_assert!(prefixes.insert(prefix.clone()), "duplicate prefix {}", prefix);
        }

        prop_assert_eq!(prefixes.len(), connections.len());
        prop_assert_eq!(registry.issued(), connections.len() as u64);
    }
}

/// Verifies concurrent attachment across connections never reuses a number.
#[test]
fn concurrent_attachment_yields_unique_instances() {
    const THREADS: usize = 16;
    let registry = Arc::new(ConnectionRegistry::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let conn = traced(&registry);
                barrier.wait();
                conn.attach_writer(Vec::new(), SinkOptions::file()).prefix()
            })
        })
        .collect();

    let prefixes: HashSet<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(prefixes.len(), THREADS);
    for n in 1..=THREADS {
        assert!(prefixes.contains(&format!("CONN[{n}]")));
    }
}

/// Verifies concurrent first use of one connection attaches one console sink.
#[test]
fn concurrent_first_use_attaches_single_default_sink() {
    const THREADS: usize = 8;
    let registry = Arc::new(ConnectionRegistry::new());
    let conn = Arc::new(traced(&registry));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let conn = Arc::clone(&conn);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                conn.local_addr().unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(conn.is_initialized());
    assert_eq!(conn.sinks().len(), 1);
    assert_eq!(registry.issued(), 1);
}

/// Verifies sinks attached after initialisation are traced alongside the default.
#[test]
fn sinks_attached_after_first_use_join_the_fan_out() {
    let registry = Arc::new(ConnectionRegistry::new());
    let conn = traced(&registry);
    conn.initialize();

    let late = conn.attach_writer(Vec::new(), SinkOptions::file());
    conn.write(b"late").unwrap();

    assert_eq!(conn.sinks().len(), 2);
    assert_eq!(late.sent_dumps(), 1);
    assert_eq!(late.prefix(), conn.sinks()[0].prefix());
}
