//! 并发测试
//!
//! 宿主线程与后台轮询线程同时访问设备时，线路上的交换不能交错。

mod common;

use blinky_driver::{LedDriverBuilder, PlaybackState, TemperatureCalculation, ThreadScheduler};
use blinky_protocol::Opcode;
use common::helpers::wait_for_condition;
use common::mock_device::MockLedBox;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_concurrent_operations_do_not_interleave() {
    let device = MockLedBox::new();
    device.with(|d| d.thermistors = [5, 6, 7, 8]);
    let (transport, handle) = device.connect();

    let driver = Arc::new(
        LedDriverBuilder::new()
            .transport(transport)
            .scheduler(Arc::new(ThreadScheduler::new()))
            .poll_interval(Duration::from_millis(1))
            .temperature(TemperatureCalculation::Raw)
            .build()
            .unwrap(),
    );

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let driver = driver.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    let channel = worker * 16 + (i % 16) + 1;
                    driver
                        .write_intensity(&[channel], (i as f64) / 25.0)
                        .expect("write_intensity");
                    driver.read_temperatures().expect("read_temperatures");
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert!(wait_for_condition(
        || device.count(Opcode::IsFilePlaying) + device.count(Opcode::ThermistorValues) > 100,
        Duration::from_secs(2),
    ));

    device.with(|d| {
        assert_eq!(d.bad_requests, 0);
        assert_eq!(d.intensity_writes.len(), 100);
    });
    assert_eq!(handle.purge_count(), 0);
    assert_eq!(driver.last_temperatures().unwrap().raw.raw, [5, 6, 7, 8]);
}

#[test]
fn test_background_poller_detects_end() {
    let device = MockLedBox::new();
    let (transport, handle) = device.connect();

    let driver = LedDriverBuilder::new()
        .transport(transport)
        .scheduler(Arc::new(ThreadScheduler::new()))
        .poll_interval(Duration::from_millis(2))
        .build()
        .unwrap();

    driver.run(10_000).unwrap();
    assert_eq!(driver.state(), PlaybackState::Playing);

    device.finish_playback();
    assert!(wait_for_condition(
        || driver.state() == PlaybackState::Idle,
        Duration::from_secs(2),
    ));

    drop(driver);
    assert!(handle.is_closed());

    // 关闭后轮询线程不再发送任何请求
    let writes = handle.write_count();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(handle.write_count(), writes);
}
