//! Async loop that drives a [`SettleEngine`].
//!
//! The loop multiplexes three inputs on a background task:
//!
//! ```text
//!   SignalTx ──► signals ──┐
//!                          ├──► SettleEngine ──► settle events ──► session
//!   probe interval ────────┘
//!   CancellationToken ───────► exit
//! ```
//!
//! Signals are polled before probe ticks so a motion that races a tick
//! always postpones the idle rather than being missed.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::engine::{SettleEngine, SettleEvent};
use super::source::ScrollSignal;

/// Spawn the settle loop for one session.
///
/// The loop exits when `cancel` fires or when nobody listens to `events`
/// any more. The first probe fires one interval after spawning.
pub(crate) fn spawn_settle_loop(
    runtime: &Handle,
    engine: SettleEngine,
    probe_interval: Duration,
    signals: mpsc::UnboundedReceiver<ScrollSignal>,
    events: mpsc::UnboundedSender<SettleEvent>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    runtime.spawn(run_settle_loop(
        engine,
        probe_interval,
        signals,
        events,
        cancel,
    ))
}

async fn run_settle_loop(
    mut engine: SettleEngine,
    probe_interval: Duration,
    mut signals: mpsc::UnboundedReceiver<ScrollSignal>,
    events: mpsc::UnboundedSender<SettleEvent>,
    cancel: CancellationToken,
) {
    let mut probe = time::interval_at(time::Instant::now() + probe_interval, probe_interval);
    probe.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut signals_open = true;

    loop {
        let settled = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::trace!("Settle loop cancelled");
                break;
            }

            signal = signals.recv(), if signals_open => match signal {
                Some(signal) => engine.on_signal(&signal).into_iter().collect(),
                None => {
                    // Probes keep running; a silent source can still settle
                    signals_open = false;
                    Vec::new()
                }
            },

            tick = probe.tick() => engine.on_probe(tick.into_std()),
        };

        for event in settled {
            tracing::trace!(trigger = ?event.trigger, "Settled");
            if events.send(event).is_err() {
                tracing::trace!("Settle receiver gone, stopping loop");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settle::engine::{Combine, SettleTrigger, SourceSpec};
    use crate::settle::source::{SignalTx, SourceId};

    const PROBE: Duration = Duration::from_millis(300);
    const SPACING: Duration = Duration::from_millis(100);

    struct Harness {
        signals: SignalTx,
        events: mpsc::UnboundedReceiver<SettleEvent>,
        cancel: CancellationToken,
        handle: JoinHandle<()>,
    }

    fn start(specs: &[SourceSpec], combine: Combine) -> Harness {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let engine = SettleEngine::new(specs, combine, SPACING);
        let handle = spawn_settle_loop(
            &Handle::current(),
            engine,
            PROBE,
            signal_rx,
            event_tx,
            cancel.clone(),
        );
        Harness {
            signals: SignalTx::new(specs[0].id, signal_tx),
            events: event_rx,
            cancel,
            handle,
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SettleEvent>) -> Vec<SettleEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_source_settles_once() {
        let mut harness = start(&[SourceSpec::probed(SourceId(0))], Combine::Each);

        time::sleep(PROBE + Duration::from_millis(10)).await;
        let events = drain(&mut harness.events);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].trigger, SettleTrigger::Source(SourceId(0)));

        // Many more probe intervals, still the same quiet period
        time::sleep(PROBE * 10).await;
        assert!(drain(&mut harness.events).is_empty());

        harness.cancel.cancel();
        harness.handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_scrolling_source_settles_after_quiet_window() {
        let mut harness = start(&[SourceSpec::probed(SourceId(0))], Combine::Each);

        // Keep scrolling through several probe intervals
        for _ in 0..12 {
            harness.signals.motion();
            time::sleep(Duration::from_millis(50)).await;
        }
        assert!(drain(&mut harness.events).is_empty());

        time::sleep(PROBE * 2 + Duration::from_millis(10)).await;
        assert_eq!(drain(&mut harness.events).len(), 1);

        harness.cancel.cancel();
        harness.handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_first_probe_emits_nothing() {
        let mut harness = start(&[SourceSpec::probed(SourceId(0))], Combine::Each);

        harness.cancel.cancel();
        harness.handle.await.unwrap();

        time::sleep(PROBE * 3).await;
        assert!(drain(&mut harness.events).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_signal_channel_keeps_probing() {
        let Harness {
            signals,
            mut events,
            cancel,
            handle,
        } = start(&[SourceSpec::probed(SourceId(0))], Combine::Each);
        drop(signals);

        time::sleep(PROBE + Duration::from_millis(10)).await;
        assert_eq!(drain(&mut events).len(), 1);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_stops_when_events_dropped() {
        let Harness {
            signals,
            events,
            cancel: _cancel,
            handle,
        } = start(&[SourceSpec::probed(SourceId(0))], Combine::Each);
        drop(events);

        time::sleep(PROBE + Duration::from_millis(10)).await;
        handle.await.unwrap();
        assert!(signals.is_closed());
    }
}
