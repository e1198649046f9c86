//! # Admission control and cancellation
//!
//! Demonstrates:
//! - A concurrency cap of 2 with FIFO queueing of further starts
//! - Promotion of queued tasks as running tasks finish
//! - Cancellation (explicit and by timeout)
//! - Consuming the raw event stream with `events()`
//! - Cleanup of finished tasks

use std::time::Duration;

use taskmonitor::{Admission, EventKind, MonitorConfig, StepSpec, TaskMonitor, TaskOptions};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = MonitorConfig {
        max_concurrent: 2,
        ..MonitorConfig::default()
    };
    let monitor = TaskMonitor::new(cfg);

    let mut rx = monitor.events();
    let printer = tokio::spawn(async move {
        while let Ok(ev) = rx.recv().await {
            match ev.kind {
                EventKind::Queued => {
                    println!("{:>4} {:<10} {} (position {:?})", ev.seq, ev.kind, ev.task_id, ev.queue_position)
                }
                EventKind::Cancelled => {
                    println!("{:>4} {:<10} {} ({:?})", ev.seq, ev.kind, ev.task_id, ev.error)
                }
                EventKind::Removed if &*ev.task_id == "job-4" => break,
                _ => println!("{:>4} {:<10} {}", ev.seq, ev.kind, ev.task_id),
            }
        }
    });

    for i in 0..5 {
        let id = format!("job-{i}");
        let opts = if i == 3 {
            TaskOptions::new().with_timeout(Duration::from_millis(50))
        } else {
            TaskOptions::new()
        };
        monitor.create_task(id.as_str(), "job", "", vec![StepSpec::new("work", "Work")], opts)?;
        match monitor.start_task(&id)? {
            Admission::Started => println!("{id} started"),
            Admission::Queued { position } => println!("{id} queued at {position}"),
        }
    }
    println!("queue: {:?}", monitor.queued());

    monitor.cancel_task("job-2", Some("no longer needed"))?;
    monitor.complete_step("job-0", 0, None)?;
    // job-3 is promoted and times out.
    tokio::time::sleep(Duration::from_millis(100)).await;
    monitor.complete_task("job-1", None)?;
    monitor.complete_task("job-4", None)?;

    println!("{}", monitor.stats());
    println!("removed {} finished tasks", monitor.cleanup(Duration::ZERO));

    printer.await?;
    Ok(())
}
