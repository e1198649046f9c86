//! # Multi-step pipeline with progress reporting
//!
//! Demonstrates:
//! - Steps reported `Running`, then progress, then `Completed`
//! - Task progress and ETA derived from step progress
//! - Built-in `LogWriter` subscriber (run with `RUST_LOG=debug`)
//! - A step failure failing the whole task
//!
//! ```text
//! cargo run --example pipeline --features logging
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use taskmonitor::{
    EventKind, Filter, LogLevel, LogWriter, MonitorConfig, StepReport, StepSpec, Subscribe,
    TaskMonitor, TaskOptions, TaskStatus,
};

/// Simulates one unit of work per step, reporting progress in quarters.
async fn run_step(
    monitor: &TaskMonitor,
    id: &str,
    index: usize,
) -> Result<(), taskmonitor::MonitorError> {
    monitor.report_step_progress(id, index, StepReport::new(0).with_status(TaskStatus::Running))?;
    for pct in [25, 50, 75] {
        tokio::time::sleep(Duration::from_millis(80)).await;
        let task = monitor.report_step_progress(id, index, StepReport::new(pct))?;
        let eta = task.eta(SystemTime::now()).unwrap_or_default();
        println!("{id}: step {index} at {pct}%, task at {}%, eta {eta:?}", task.progress);
    }
    monitor.complete_step(id, index, Some(serde_json::json!({ "rows": 1000 * (index + 1) })))?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let monitor = TaskMonitor::builder(MonitorConfig::default())
        .with_subscribers(subs)
        .build();

    monitor.subscribe_fn(Filter::kind(EventKind::Failed), "alert", |ev| {
        println!("ALERT: {} failed: {:?}", ev.task_id, ev.error);
    });

    let steps = vec![
        StepSpec::new("extract", "Extract"),
        StepSpec::new("transform", "Transform"),
        StepSpec::new("load", "Load"),
    ];
    let opts = TaskOptions::new()
        .with_timeout(Duration::from_secs(10))
        .with_metadata("source", "warehouse")
        .on_complete(|task| println!("etl done in {:?}", task.execution_time()));

    monitor.create_task("etl", "Nightly ETL", "copy warehouse tables", steps.clone(), opts)?;
    monitor.start_task("etl")?;
    for index in 0..3 {
        run_step(&monitor, "etl", index).await?;
    }

    monitor.create_task("backfill", "Backfill", "", steps, TaskOptions::new())?;
    monitor.start_task("backfill")?;
    run_step(&monitor, "backfill", 0).await?;
    monitor.log("backfill", LogLevel::Warn, "source table locked")?;
    monitor.fail_step("backfill", 1, "lock wait timeout")?;

    // Let subscribers drain.
    tokio::time::sleep(Duration::from_millis(100)).await;
    println!("{}", monitor.stats());
    monitor.shutdown();
    Ok(())
}
