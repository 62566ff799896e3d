//! Integration tests for core-async on native platforms.

use core_async::{runtime, sync, task, time};
use std::sync::Arc;

#[tokio::test]
async fn test_task_spawn() {
    let handle = task::spawn(async { 42 });
    assert_eq!(handle.await.unwrap(), 42);
}

#[tokio::test(start_paused = true)]
async fn test_sleep_advances_paused_clock() {
    let start = time::Instant::now();
    time::sleep(time::Duration::from_millis(200)).await;
    assert!(start.elapsed() >= time::Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_success() {
    let result = time::timeout(time::Duration::from_millis(100), async {
        time::sleep(time::Duration::from_millis(10)).await;
        42
    })
    .await;
    assert_eq!(result.unwrap(), 42);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_failure() {
    let result = time::timeout(time::Duration::from_millis(10), async {
        time::sleep(time::Duration::from_millis(100)).await;
        42
    })
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_mutex() {
    let mutex = Arc::new(sync::Mutex::new(0));
    let mutex_clone = mutex.clone();

    task::spawn(async move {
        *mutex_clone.lock().await += 1;
    })
    .await
    .unwrap();

    assert_eq!(*mutex.lock().await, 1);
}

#[tokio::test]
async fn test_oneshot() {
    let (tx, rx) = sync::oneshot::channel();
    task::spawn(async move {
        let _ = tx.send("done");
    });
    assert_eq!(rx.await.unwrap(), "done");
}

#[tokio::test]
async fn test_broadcast_fan_out() {
    let (tx, mut rx1) = sync::broadcast::channel(4);
    let mut rx2 = tx.subscribe();
    tx.send(1u8).unwrap();
    assert_eq!(rx1.recv().await.unwrap(), 1);
    assert_eq!(rx2.recv().await.unwrap(), 1);
}

#[test]
fn test_block_on() {
    let value = runtime::block_on(async { 5 }).unwrap();
    assert_eq!(value, 5);
}

#[test]
fn test_now_millis_is_after_epoch() {
    assert!(time::now_millis() > 0);
}
