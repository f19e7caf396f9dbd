//! Task bridge behaviour across devices and through capabilities.

use std::sync::Arc;
use std::time::Duration;

use ember_core::{DeviceId, Value};
use ember_events::channel;
use ember_runtime::{
    ApiAdapter, COMPLETION_EVENT, RuntimeError, Task, TaskError, TaskOutcome, TaskResult,
};
use ember_test::{CallLog, MockCapability, test_device_access, test_task_bridge, test_task_bridge_with};

fn constant(values: Vec<Value>) -> Arc<dyn Task> {
    Arc::new(move || -> TaskResult { Ok(values.clone()) })
}

#[tokio::test(start_paused = true)]
async fn test_ids_increase_across_devices() {
    let bridge = test_task_bridge();
    let (queue_a, _stream_a) = channel(DeviceId::new(1), 16);
    let (queue_b, _stream_b) = channel(DeviceId::new(2), 16);

    let mut ids = Vec::new();
    for queue in [&queue_a, &queue_b, &queue_a, &queue_b, &queue_a] {
        ids.push(bridge.issue_task(queue, constant(vec![]), 10).unwrap());
    }

    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(bridge.pending_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_completion_goes_to_issuing_device() {
    let bridge = test_task_bridge();
    let (queue_a, mut stream_a) = channel(DeviceId::new(1), 16);
    let (_queue_b, mut stream_b) = channel(DeviceId::new(2), 16);

    let id = bridge
        .issue_task(&queue_a, constant(vec![Value::from("x")]), 0)
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;

    let event = stream_a.try_pull().unwrap();
    assert_eq!(event.name(), COMPLETION_EVENT);
    assert_eq!(
        event.args(),
        &[
            Value::Integer(i64::try_from(id.get()).unwrap()),
            Value::Boolean(true),
            Value::from("x"),
        ]
    );
    assert!(stream_b.try_pull().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_failure_event_shape() {
    let bridge = test_task_bridge();
    let (queue, mut stream) = channel(DeviceId::new(1), 16);

    let with_message: Arc<dyn Task> = Arc::new(|| -> TaskResult { Err(TaskError::new("no disk")) });
    let without: Arc<dyn Task> = Arc::new(|| -> TaskResult { Err(TaskError::silent()) });
    bridge.issue_task(&queue, with_message, 0).unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;
    bridge.issue_task(&queue, without, 0).unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;

    let first = stream.try_pull().unwrap();
    assert_eq!(&first.args()[1..], &[Value::Boolean(false), Value::from("no disk")]);
    let second = stream.try_pull().unwrap();
    assert_eq!(&second.args()[1..], &[Value::Boolean(false)]);
}

/// Scenario: A and B are both outstanding on one device. B finishes first;
/// its completion is pulled while waiting for A and is dropped, not
/// requeued. The script never observes B's result.
#[tokio::test(start_paused = true)]
async fn test_unrelated_completion_is_dropped_while_awaiting() {
    let bridge = test_task_bridge();
    let (queue, mut stream) = channel(DeviceId::new(1), 16);

    let a = bridge
        .issue_task(&queue, constant(vec![Value::from("a")]), 1)
        .unwrap();
    let b = bridge
        .issue_task(&queue, constant(vec![Value::from("b")]), 0)
        .unwrap();
    assert!(a < b);

    let outcome = bridge.await_completion(&mut stream, a).await.unwrap();
    assert_eq!(outcome, TaskOutcome::Completed(vec![Value::from("a")]));
    assert!(stream.try_pull().is_none());
    assert_eq!(bridge.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unrelated_events_are_discarded_by_filter() {
    let bridge = test_task_bridge();
    let (queue, mut stream) = channel(DeviceId::new(1), 16);
    queue.queue_event("key", vec![Value::from(28)]);
    queue.queue_event("timer", vec![Value::from(1)]);

    bridge.sleep(&queue, &mut stream, 1).await.unwrap();
    assert!(stream.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_waits_on_separate_devices() {
    let bridge = test_task_bridge();
    let mut waiters = Vec::new();
    for device in 1..=4u32 {
        let bridge = bridge.clone();
        waiters.push(tokio::spawn(async move {
            let (queue, mut stream) = channel(DeviceId::new(device), 16);
            bridge
                .execute_task(
                    &queue,
                    &mut stream,
                    constant(vec![Value::from(device)]),
                    5_u32.saturating_sub(device),
                )
                .await
        }));
    }

    let results = futures::future::join_all(waiters).await;
    for (device, result) in (1..=4u32).zip(results) {
        assert_eq!(result.unwrap().unwrap(), vec![Value::from(device)]);
    }
    assert_eq!(bridge.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_capacity_is_process_wide() {
    let bridge = test_task_bridge_with(2);
    let (queue_a, _a) = channel(DeviceId::new(1), 16);
    let (queue_b, mut stream_b) = channel(DeviceId::new(2), 16);

    bridge.issue_task(&queue_a, constant(vec![]), 100).unwrap();
    bridge.issue_task(&queue_a, constant(vec![]), 100).unwrap();

    let err = bridge
        .execute_task(&queue_b, &mut stream_b, constant(vec![]), 0)
        .await
        .unwrap_err();
    assert_eq!(err, RuntimeError::CapacityExceeded { limit: 2 });
    assert!(err.is_script_visible());
}

#[tokio::test(start_paused = true)]
async fn test_capability_sleeps_through_bridge() {
    let bridge = test_task_bridge();
    let (access, mut stream) = test_device_access(3, &bridge);
    let log = CallLog::new();
    let adapter = ApiAdapter::new(
        vec!["os".into()],
        Arc::new(MockCapability::for_device(Arc::new(access), log)),
    );

    let start = tokio::time::Instant::now();
    let out = adapter
        .call_method(&mut stream, 1, vec![Value::from(2)])
        .await
        .unwrap();
    assert!(out.is_empty());
    assert!(start.elapsed() >= Duration::from_millis(100));
    assert_eq!(bridge.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_capability_sleep_interrupted() {
    let bridge = test_task_bridge();
    let (access, mut stream) = test_device_access(4, &bridge);
    let interrupt = stream.interrupt_token();
    let adapter = ApiAdapter::new(
        vec!["os".into()],
        Arc::new(MockCapability::for_device(Arc::new(access), CallLog::new())),
    );

    let waiter = tokio::spawn(async move {
        adapter
            .call_method(&mut stream, 1, vec![Value::from(1000)])
            .await
    });
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(bridge.pending_count(), 1);
    interrupt.cancel();

    let err = waiter.await.unwrap().unwrap_err();
    assert_eq!(err, RuntimeError::Interrupted);
    assert!(!err.is_script_visible());
    assert_eq!(bridge.pending_count(), 0);
}
