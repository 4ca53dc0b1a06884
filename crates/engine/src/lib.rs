// In crates/engine/src/lib.rs

pub mod error;
pub mod lifecycle;

use crate::lifecycle::{ActiveSignal, LifecycleManager, ScoredCandidate};
use analytics::OutcomeRecorder;
use anyhow::Result;
use app_config::Settings;
use chrono::Utc;
use core_types::{Bar, CandidatePattern, Outcome, Pair, Signal, SystemStatus};
use events::{Commentator, EngineEvent, EventSender, SignalClosed, SignalPublished};
use market_data::{BarStore, MarketFeed};
use patterns::PatternDetector;
use publisher::{ResumeState, StatePublisher};
use scoring::{FeatureExtractor, Scorer, grade_for_probability};
use tokio::time::MissedTickBehavior;

pub use error::Error;

/// What a completed tick tells the scheduler loop.
enum TickFlow {
    Continue,
    FeedExhausted,
}

/// The orchestrator for the whole signal pipeline.
///
/// One tick runs the full chain to completion - bar intake, in-flight signal
/// monitoring, detection, scoring, publication, state mirroring - before the
/// next tick may start. Ticks never interleave, which is what lets the bar
/// store, the active signal and the snapshot live here without locks:
/// everything outside this struct sees value copies only.
pub struct Engine {
    settings: Settings,
    store: BarStore,
    feed: Box<dyn MarketFeed + Send>,
    detector: PatternDetector,
    extractor: FeatureExtractor,
    scorer: Box<dyn Scorer>,
    lifecycle: LifecycleManager,
    recorder: OutcomeRecorder,
    publisher: StatePublisher,
    events_tx: EventSender,
    commentator: Option<Box<dyn Commentator>>,
}

impl Engine {
    pub fn new(
        settings: Settings,
        status: SystemStatus,
        feed: Box<dyn MarketFeed + Send>,
        scorer: Box<dyn Scorer>,
        commentator: Option<Box<dyn Commentator>>,
        events_tx: EventSender,
    ) -> Result<Self> {
        let publisher = StatePublisher::new(
            &settings.publisher.output_dir,
            settings.publisher.write_attempts,
        )?;

        let mut engine = Self {
            store: BarStore::new(settings.bar_store.retention_bars),
            feed,
            detector: PatternDetector::new(settings.detector.clone()),
            extractor: FeatureExtractor::new(settings.scorer.clone()),
            scorer,
            lifecycle: LifecycleManager::new(
                settings.lifecycle.clone(),
                Pair(settings.engine.pair.clone()),
                settings.engine.bar_interval_secs as i64 * 1000,
            ),
            recorder: OutcomeRecorder::new(status),
            publisher,
            events_tx,
            commentator,
            settings,
        };
        engine.resume(status)?;
        Ok(engine)
    }

    /// Picks up where a previous run left off: counters and, if one was in
    /// flight, the pending signal - which the staleness guard will void if
    /// the downtime exceeded its allowance.
    fn resume(&mut self, status: SystemStatus) -> Result<()> {
        let Some(state) = self.publisher.load_resume_state()? else {
            return Ok(());
        };

        tracing::info!(
            next_signal_id = state.next_signal_id,
            total_trades = state.snapshot.total_trades,
            pending = state.active_signal.is_some(),
            "Resuming from persisted state."
        );

        let active = match (state.active_signal, state.entry_open_time) {
            (Some(signal), Some(entry_open_time)) => Some(ActiveSignal {
                signal,
                entry_open_time,
            }),
            _ => None,
        };

        let mut snapshot = state.snapshot;
        snapshot.status = status;
        snapshot.active_signals = active.is_some() as u32;

        self.lifecycle.restore(active, state.next_signal_id);
        self.recorder = OutcomeRecorder::from_snapshot(snapshot);
        Ok(())
    }

    /// The main scheduler loop: one tick per bar interval, missed ticks
    /// skipped rather than replayed, shutdown on ctrl-c. A skipped tick is
    /// only logged - the next one resumes from current market state.
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!(
            pair = %self.settings.engine.pair,
            interval_secs = self.settings.engine.bar_interval_secs,
            feed = self.feed.name(),
            scorer = self.scorer.name(),
            "Starting signal engine."
        );

        // Establish the external read contract from the first moment: all
        // three documents exist even before anything has happened, with
        // explicit empty markers standing in for missing signal/result.
        let now = Utc::now();
        let active = self.lifecycle.active().map(|a| a.signal.clone());
        if let Err(e) = self.publisher.publish_signal(active.as_ref(), now) {
            tracing::warn!(error = %e, "Failed to publish initial signal document.");
        }
        let latest = self.recorder.latest_outcome();
        if let Err(e) = self.publisher.publish_result(latest.as_ref(), now) {
            tracing::warn!(error = %e, "Failed to publish initial result document.");
        }
        self.mirror_state();

        let period = std::time::Duration::from_secs(self.settings.engine.bar_interval_secs);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_tick: Option<std::time::Instant> = None;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    // A missed tick is logged and forgotten: processing
                    // resumes from current market state, never by replaying
                    // the bars the stall skipped.
                    if let Some(prev) = last_tick {
                        if prev.elapsed() > period + period / 2 {
                            tracing::warn!(elapsed = ?prev.elapsed(), "Scheduler missed at least one tick.");
                        }
                    }
                    last_tick = Some(std::time::Instant::now());

                    match self.process_tick().await {
                        Ok(TickFlow::Continue) => {}
                        Ok(TickFlow::FeedExhausted) => {
                            tracing::info!("Feed exhausted. Stopping engine.");
                            break;
                        }
                        // Only invariant violations escape process_tick;
                        // everything environmental degrades to a skipped tick.
                        Err(e) => {
                            tracing::error!(error = %e, "Fatal engine error. Halting.");
                            return Err(e);
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown requested. No further ticks will be issued.");
                    break;
                }
            }
        }

        self.mirror_state();
        Ok(())
    }

    /// Runs the full pipeline once. Collaborator failures (feed, scorer,
    /// state writes) are caught here and degrade to "skip this tick" - they
    /// never corrupt the in-flight signal.
    async fn process_tick(&mut self) -> Result<TickFlow> {
        let now = Utc::now();

        // --- 1. Bar intake ---
        match self.feed.next_bar() {
            Ok(Some(bar)) => {
                if let Err(e) = self.store.append(bar) {
                    tracing::warn!(error = %e, "Rejected bar; skipping detection this tick.");
                }
            }
            Ok(None) => return Ok(TickFlow::FeedExhausted),
            Err(e) => {
                tracing::warn!(error = %e, "Feed failed; skipping tick.");
            }
        }

        // --- 2. Monitor the in-flight signal ---
        let closed = self
            .lifecycle
            .evaluate_expiry(&self.store, now)
            .or_else(|| self.lifecycle.check_staleness(now));
        if let Some(outcome) = closed {
            self.finalize(outcome).await;
        }

        // --- 3. Hunt for a new candidate while idle ---
        if self.lifecycle.is_idle() && !self.store.is_empty() {
            let window_len = self.settings.detector.trailing_window.min(self.store.len());
            let window = self.store.window(window_len)?;

            let candidates = self.detector.detect(&window);
            if !candidates.is_empty() {
                let scored = self.score(candidates, &window);
                let entry_bar = window.last().cloned();
                if let (false, Some(entry_bar)) = (scored.is_empty(), entry_bar) {
                    // An InvariantViolation here is fatal by design.
                    if let Some(signal) = self.lifecycle.publish(scored, &entry_bar, now)? {
                        self.announce(signal);
                    }
                }
            }
        }

        // --- 4. Mirror engine state for the outside world ---
        self.mirror_state();

        Ok(TickFlow::Continue)
    }

    /// Scores every candidate of the tick. A `ScorerUnavailable` answer
    /// discards the whole batch: no candidate qualifies this tick.
    fn score(&self, candidates: Vec<CandidatePattern>, window: &[Bar]) -> Vec<ScoredCandidate> {
        let mut scored = Vec::with_capacity(candidates.len());
        for pattern in candidates {
            let features = self.extractor.extract(&pattern, window);
            match self.scorer.score(&features) {
                Ok(probability) => scored.push(ScoredCandidate {
                    grade: grade_for_probability(probability),
                    probability,
                    pattern,
                }),
                Err(e) => {
                    tracing::warn!(error = %e, "Scoring failed; no candidate qualifies this tick.");
                    return Vec::new();
                }
            }
        }
        scored
    }

    /// Publication side effects: stats, state files, notification event.
    fn announce(&mut self, signal: Signal) {
        self.recorder.on_signal_published(&signal);

        let now = Utc::now();
        if let Err(e) = self.publisher.publish_signal(Some(&signal), now) {
            tracing::warn!(error = %e, "Failed to publish signal document.");
            self.recorder.set_degraded(true);
        }

        let _ = self.events_tx.send(EngineEvent::SignalPublished(SignalPublished {
            at: now,
            signal,
        }));
    }

    /// Terminal-transition side effects: stats, state files, trade log,
    /// notification event, optional commentary. Nothing here can fail the
    /// tick; persistence faults surface as the degraded flag instead.
    async fn finalize(&mut self, outcome: Outcome) {
        self.recorder.record(&outcome);

        let now = Utc::now();
        let mut faulted = false;
        if let Err(e) = self.publisher.publish_result(Some(&outcome), now) {
            tracing::warn!(error = %e, "Failed to publish result document.");
            faulted = true;
        }
        if let Err(e) = self.publisher.append_trade_log(&outcome) {
            tracing::warn!(error = %e, "Failed to append trade log.");
            faulted = true;
        }
        if faulted {
            self.recorder.set_degraded(true);
        }

        let _ = self.events_tx.send(EngineEvent::SignalClosed(SignalClosed {
            at: now,
            outcome: outcome.clone(),
            snapshot: self.recorder.snapshot(),
        }));

        if let Some(commentator) = &self.commentator {
            match commentator.narrate(&outcome).await {
                Ok(commentary) => {
                    tracing::info!(backend = commentator.name(), %commentary, "Commentary generated.");
                }
                Err(e) => {
                    // The commentary boundary must never affect engine state.
                    tracing::warn!(backend = commentator.name(), error = %e, "Commentary failed.");
                }
            }
        }
    }

    /// Mirrors the snapshot and resume state to disk. A persistence fault
    /// after bounded retries flips the degraded flag; a later clean pass
    /// clears it.
    fn mirror_state(&mut self) {
        let now = Utc::now();
        let resume = ResumeState {
            active_signal: self.lifecycle.active().map(|a| a.signal.clone()),
            entry_open_time: self.lifecycle.active().map(|a| a.entry_open_time),
            snapshot: self.recorder.snapshot(),
            next_signal_id: self.lifecycle.next_signal_id(),
        };

        let status = self.publisher.publish_status(&self.recorder.snapshot(), now);
        let state = self.publisher.save_resume_state(&resume);
        match (status, state) {
            (Ok(()), Ok(())) => self.recorder.set_degraded(false),
            (status, state) => {
                for e in [status.err(), state.err()].into_iter().flatten() {
                    tracing::warn!(error = %e, "State mirroring failed.");
                }
                self.recorder.set_degraded(true);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::lifecycle::{LifecycleManager, ScoredCandidate};
    use analytics::OutcomeRecorder;
    use app_config::types::LifecycleSettings;
    use chrono::DateTime;
    use core_types::{
        Bar, CandidatePattern, Direction, Pair, PatternKind, SystemStatus, TradeResult,
    };
    use market_data::BarStore;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    const INTERVAL_MS: i64 = 60_000;

    /// Tiny deterministic generator so the simulation is reproducible.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            self.0 >> 33
        }
    }

    #[test]
    fn randomized_ticks_never_break_the_invariants() {
        let mut rng = Lcg(0xA5EED);
        let mut manager = LifecycleManager::new(
            LifecycleSettings {
                min_confidence: 5,
                base_expiry_bars: 2,
                max_expiry_bars: 3,
                staleness_grace_bars: 2,
            },
            Pair("EURUSD".to_string()),
            INTERVAL_MS,
        );
        let mut recorder = OutcomeRecorder::new(SystemStatus::Live);
        let mut store = BarStore::new(50);

        let mut published = 0u32;
        let mut outcomes = 0u32;
        let mut voids = 0u32;
        // The id of the one signal allowed to be in flight, if any.
        let mut open: Option<u64> = None;
        let mut price = dec!(1.0750);

        for tick in 0..500i64 {
            // Occasional data gaps force the void path at expiry.
            if rng.next() % 7 == 0 {
                continue;
            }

            let open_time = tick * INTERVAL_MS;
            let now = DateTime::from_timestamp_millis(open_time).unwrap();
            let step = Decimal::from(rng.next() as i64 % 21 - 10) / dec!(100000);
            price += step;
            store
                .append(Bar {
                    open_time,
                    open: price,
                    high: price + dec!(0.0003),
                    low: price - dec!(0.0003),
                    close: price,
                    volume: dec!(100),
                })
                .unwrap();

            let closed = manager
                .evaluate_expiry(&store, now)
                .or_else(|| manager.check_staleness(now));
            if let Some(outcome) = closed {
                // Exactly one outcome, and it belongs to the open signal.
                assert_eq!(open.take(), Some(outcome.signal_id));
                recorder.record(&outcome);
                outcomes += 1;
                if outcome.result == TradeResult::Void {
                    voids += 1;
                }
            }

            if manager.is_idle() && rng.next() % 3 == 0 {
                let grade = (rng.next() % 10 + 1) as u8;
                let candidate = ScoredCandidate {
                    pattern: CandidatePattern {
                        kind: PatternKind::OrderBlock,
                        span: (0, 4),
                        bias: if rng.next() % 2 == 0 {
                            Direction::Buy
                        } else {
                            Direction::Sell
                        },
                        strength: 1.0,
                    },
                    probability: grade as f64 / 10.0,
                    grade,
                };
                if let Some(signal) = manager
                    .publish(vec![candidate], store.latest().unwrap(), now)
                    .unwrap()
                {
                    // Publishing is only ever possible from an empty slot.
                    assert!(open.replace(signal.id).is_none());
                    published += 1;
                }
            }

            let snap = recorder.snapshot();
            assert_eq!(snap.total_trades, snap.total_wins + snap.total_losses);
        }

        // Every published signal reached exactly one outcome (or is the one
        // still in flight), and voids stayed out of the trade count.
        let in_flight = if manager.is_idle() { 0 } else { 1 };
        assert_eq!(outcomes + in_flight, published);
        assert!(published > 10, "Simulation never exercised publishing.");
        assert!(voids > 0, "Simulation never exercised the void path.");
        let snap = recorder.snapshot();
        assert_eq!(snap.total_trades + voids, outcomes);
    }
}
