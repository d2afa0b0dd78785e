use super::*;
use crate::test_support::record;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Instant,
};

#[test]
fn submit_blocks_until_the_batcher_receives() {
    let (tx, rx) = record_channel();
    let delivered = Arc::new(AtomicBool::new(false));

    let producer = {
        let delivered = Arc::clone(&delivered);
        thread::spawn(move || {
            tx.submit(record(1)).expect("submit");
            delivered.store(true, Ordering::SeqCst);
        })
    };

    thread::sleep(Duration::from_millis(100));
    assert!(
        !delivered.load(Ordering::SeqCst),
        "hand-off completed without a receiver"
    );

    match rx.receive(Duration::from_secs(5)) {
        Received::Record(r) => assert_eq!(r.format, "r1"),
        other => panic!("expected a record, got {other:?}"),
    }

    producer.join().unwrap();
    assert!(delivered.load(Ordering::SeqCst));
}

#[test]
fn receive_times_out_without_busy_waiting() {
    let (_tx, rx) = record_channel();

    let start = Instant::now();
    assert!(matches!(
        rx.receive(Duration::from_millis(80)),
        Received::Timeout
    ));
    assert!(start.elapsed() >= Duration::from_millis(80));
}

#[test]
fn terminate_arrives_as_sentinel() {
    let (tx, rx) = record_channel();
    let handle = thread::spawn(move || tx.terminate());

    assert!(matches!(
        rx.receive(Duration::from_secs(5)),
        Received::Sentinel
    ));
    assert!(handle.join().unwrap().is_ok());
}

#[test]
fn dropping_receiver_cancels_blocked_producer() {
    let (tx, rx) = record_channel();

    let producer = thread::spawn(move || tx.submit(record(7)));

    thread::sleep(Duration::from_millis(50));
    drop(rx);

    assert_eq!(producer.join().unwrap(), Err(Cancelled));
}

#[test]
fn dropping_all_senders_disconnects() {
    let (tx, rx) = record_channel();
    let second = tx.clone();
    drop(tx);
    drop(second);

    assert!(matches!(
        rx.receive(Duration::from_secs(1)),
        Received::Disconnected
    ));
}
