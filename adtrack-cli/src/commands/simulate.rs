//! Simulate command - play a scenario against a live tracker.
//!
//! The tracker runs on a multi-threaded tokio runtime while a dedicated
//! thread plays the host UI thread: every scan and every scripted tree
//! mutation runs there, in dispatch order.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use tokio::time::Instant;

use adtrack::ui::{AnalyticsSink, QueueDispatcher, RecordingSink};

use crate::config::{load_tracker_config, TimingOverrides};
use crate::error::CliError;
use crate::scenario::{Scenario, Simulation};

/// Arguments for the simulate command.
pub struct SimulateArgs {
    pub scenario: PathBuf,
    pub config: Option<PathBuf>,
    pub timing: TimingOverrides,
    /// Only print the summary, not each key as it is sent.
    pub quiet: bool,
}

/// Prints each key with its offset from the start of the run.
pub struct ConsoleSink {
    start: Instant,
    recorded: RecordingSink,
    echo: bool,
}

impl ConsoleSink {
    pub fn new(echo: bool) -> Self {
        Self {
            start: Instant::now(),
            recorded: RecordingSink::new(),
            echo,
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.recorded.events()
    }
}

impl AnalyticsSink for ConsoleSink {
    fn send(&self, event_key: &str) {
        if self.echo {
            println!(
                "[{:>6}ms] {}",
                self.start.elapsed().as_millis(),
                event_key
            );
        }
        self.recorded.send(event_key);
    }
}

/// Run the simulate command.
pub fn run(args: SimulateArgs) -> Result<(), CliError> {
    let config = load_tracker_config(args.config.as_deref(), args.timing)?;
    let scenario = Scenario::load(&args.scenario)?;
    let simulation = Simulation::new(scenario)?;

    println!("Scenario: {}", args.scenario.display());
    println!(
        "  Probe interval:     {}ms",
        config.probe_interval.as_millis()
    );
    println!(
        "  Min signal spacing: {}ms",
        config.min_signal_spacing.as_millis()
    );
    println!(
        "  Duration:           {}ms",
        simulation.scenario().duration().as_millis()
    );
    println!();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("adtrack-worker")
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    let (dispatcher, queue) = QueueDispatcher::new();
    let ui_thread = thread::Builder::new()
        .name("adtrack-ui".to_string())
        .spawn(move || queue.run_blocking())
        .map_err(|e| CliError::Runtime(format!("failed to start UI thread: {}", e)))?;

    let sink = Arc::new(ConsoleSink::new(!args.quiet));
    let result = runtime.block_on(simulation.run(config, sink.clone(), Arc::new(dispatcher)));

    // Session tasks hold the dispatcher until the runtime drops them
    drop(runtime);
    drop(simulation);
    if ui_thread.join().is_err() {
        tracing::error!("UI thread panicked");
    }

    let report = result?;
    let events = sink.events();

    println!();
    println!("Summary:");
    println!("  Sessions registered: {}", report.sessions);
    println!("  Sessions at end:     {}", report.active_at_end);
    println!("  Script steps:        {}", report.steps);
    println!("  Keys sent:           {}", events.len());
    println!("  Keys in dedup store: {}", report.stored_keys);
    Ok(())
}
