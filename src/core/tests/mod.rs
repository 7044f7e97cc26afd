use crate::core::handle::AtomicHandle;

#[test]
fn atomic_handle_increment() {
    // Expect sequential handles
    let h = AtomicHandle::new(0);
    assert_eq!(h.next(), 0);
    assert_eq!(h.next(), 1);
    assert_eq!(h.next(), 2);
    let h = AtomicHandle::new(100);
    assert_eq!(h.next(), 100);
    assert_eq!(h.next(), 101);
}

#[test]
fn atomic_handle_wrap() {
    // Simulate wrapping around
    let h = AtomicHandle::new(u32::MAX - 2);
    assert_eq!(h.next(), u32::MAX - 2);
    assert_eq!(h.next(), u32::MAX - 1);
    assert_eq!(h.next(), u32::MAX);
    assert_eq!(h.next(), u32::MAX - 2);
}

#[test]
fn atomic_handle_raise() {
    let h = AtomicHandle::new(1);
    assert_eq!(h.next(), 1);
    // Adopted handle moves the sequence past it
    h.raise_to(50);
    assert_eq!(h.peek(), 51);
    assert_eq!(h.next(), 51);
    // Never lowers it
    h.raise_to(10);
    assert_eq!(h.next(), 52);
    // Below first is ignored
    let h = AtomicHandle::new(100);
    h.raise_to(5);
    assert_eq!(h.next(), 100);
}

#[test]
fn atomic_handle_threads() {
    use std::{collections::HashSet, sync::Arc, thread};

    let h = Arc::new(AtomicHandle::new(1));
    let threads = (0..4)
        .map(|_| {
            let h = h.clone();
            thread::spawn(move || (0..250).map(|_| h.next()).collect::<Vec<_>>())
        })
        .collect::<Vec<_>>();
    let mut all = HashSet::new();
    for t in threads {
        for v in t.join().unwrap() {
            assert!(all.insert(v), "handle {} issued twice", v);
        }
    }
    assert_eq!(all.len(), 1000);
}
