use {
    crate::{
        error::AcquireError,
        multi::MultiLock,
        warded::Warded,
        warden::{Policy, Warden},
    },
    std::{
        sync::Barrier,
        thread,
        time::{Duration, Instant},
    },
};

fn wait_until(mut cond: impl FnMut() -> bool) {
    let start = Instant::now();
    while !cond() {
        assert!(start.elapsed() < Duration::from_secs(10), "timed out");
        thread::yield_now();
    }
}

#[test]
fn claim_registers_with_the_warden() {
    let multi = MultiLock::new();
    let warden = Warden::new(Policy::ReadWrite);
    let claim = multi.claim(&warden).unwrap();
    assert_eq!(warden.writing_count(), 1);
    assert!(multi.raw().rw().inner.lock().writer);
    drop(claim);
    assert_eq!(warden.writing_count(), 0);
    assert_eq!(multi.raw().rw().inner.lock().writer, false);
}

#[test]
fn claim_is_exclusive() {
    let multi = MultiLock::new();
    let warden = Warden::new(Policy::ReadWrite);
    let claim = multi.claim(&warden).unwrap();
    // A second claim by the same warden is refused outright: the multi-lock
    // is in use and the warden already counts a write.
    assert_eq!(multi.claim(&warden).unwrap_err(), AcquireError::Refused);
    thread::scope(|s| {
        s.spawn(|| {
            let other = Warden::new(Policy::ReadWrite);
            assert_eq!(multi.try_claim(&other).unwrap_err(), AcquireError::WouldBlock);
        });
    });
    drop(claim);
    let reclaim = multi.try_claim(&warden).unwrap();
    drop(reclaim);
}

#[test]
fn claim_takes_idle_containers() {
    let multi = MultiLock::new();
    let x = Warded::new(1);
    let y = Warded::new(2);
    let warden = x.new_warden();
    let claim = multi.claim(&warden).unwrap();
    let a = x.write_multi(&multi, &warden).unwrap();
    let b = y.read_multi(&multi, &warden).unwrap();
    assert_eq!(warden.writing_count(), 2);
    assert_eq!(warden.reading_count(), 1);
    // The claim can go early, the container locks stay.
    drop(claim);
    assert_eq!(*a + *b, 3);
    drop(a);
    drop(b);
    assert_eq!(warden.writing_count(), 0);
    assert_eq!(warden.reading_count(), 0);
}

#[test]
fn multi_accessors_block_while_claimed() {
    let multi = MultiLock::new();
    let x = Warded::new(0);
    let y = Warded::new(0);
    let barrier = Barrier::new(2);
    thread::scope(|s| {
        let warden = x.new_warden();
        let claim = multi.claim(&warden).unwrap();
        let helper = s.spawn(|| {
            let other = Warded::new(0);
            let warden = other.new_warden();
            // Any multi-routed acquisition is walled off, even one for a
            // container the claiming thread never touches.
            assert_eq!(
                other.try_read_multi(&multi, &warden).unwrap_err(),
                AcquireError::WouldBlock,
            );
            barrier.wait();
            // Blocks inside the multi-lock until the claim is dropped.
            let guard = x.read_multi(&multi, &warden).unwrap();
            assert_eq!(*guard, 1);
        });
        barrier.wait();
        let mut a = x.write_multi(&multi, &warden).unwrap();
        let mut b = y.write_multi(&multi, &warden).unwrap();
        wait_until(|| multi.raw().rw().inner.lock().readers_waiting > 0);
        *a = 1;
        *b = 1;
        drop(claim);
        drop(a);
        drop(b);
        helper.join().unwrap();
    });
    assert_eq!(*x.read().unwrap(), 1);
    assert_eq!(*y.read().unwrap(), 1);
}

#[test]
fn writes_are_visible_after_the_claim() {
    let multi = MultiLock::new();
    let x = Warded::new(0);
    let y = Warded::new(0);
    let barrier = Barrier::new(2);
    thread::scope(|s| {
        let reader = s.spawn(|| {
            let warden = x.new_warden();
            barrier.wait();
            // Both reads block until the writer drops the corresponding
            // guard and then observe the written values.
            assert_eq!(*x.read_multi(&multi, &warden).unwrap(), 1);
            assert_eq!(*y.read_multi(&multi, &warden).unwrap(), 2);
        });
        let warden = x.new_warden();
        let claim = multi.claim(&warden).unwrap();
        let mut a = x.write_multi(&multi, &warden).unwrap();
        let mut b = y.write_multi(&multi, &warden).unwrap();
        drop(claim);
        *a = 1;
        *b = 2;
        barrier.wait();
        drop(a);
        drop(b);
        reader.join().unwrap();
    });
}

#[test]
fn plain_accessors_ignore_the_multi_lock() {
    let multi = MultiLock::new();
    let x = Warded::new(5);
    let warden = x.new_warden();
    let claim = multi.claim(&warden).unwrap();
    thread::scope(|s| {
        s.spawn(|| {
            // Accessors that don't route through the multi-lock are not
            // affected by the claim.
            assert_eq!(*x.read().unwrap(), 5);
        });
    });
    drop(claim);
}

#[test]
fn default_and_debug() {
    let multi = MultiLock::default();
    assert_eq!(format!("{multi:?}"), "MultiLock { .. }");
    let warden = Warden::new(Policy::ReadWrite);
    let claim = multi.claim(&warden).unwrap();
    assert_eq!(format!("{claim:?}"), "MultiGuard { .. }");
}
