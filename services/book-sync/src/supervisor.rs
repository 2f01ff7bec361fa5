//! Resync supervisor: owns the engine lifecycle for one instrument
//!
//! A single writer task runs sync cycles. Each cycle gets a fresh epoch, a
//! fresh [`ReconciliationEngine`], a fresh stream connection and one
//! snapshot fetch. The fetch runs on its own task and reports back tagged
//! with the epoch that requested it; results for any other epoch are
//! discarded as superseded.
//!
//! Cycle exits:
//! - desync (gap, buffer overflow) → next cycle immediately
//! - snapshot or transport failure → `Error`, wait out the backoff, retry
//! - reset / instrument switch → empty view, cleared tape, next cycle
//! - shutdown, or every handle dropped → `Disconnected`, task ends
//!
//! Which of the first two applies is decided by
//! [`SyncError::needs_backoff`] and [`SyncError::is_user_visible`]. Once
//! `Error` is shown it stays until a snapshot applies; the retry cycle does
//! not flip it back to `Connecting`.
//!
//! Readers never touch the engine. The writer samples it on a fixed
//! interval and publishes immutable [`BookView`]s over a `watch` channel,
//! only from a synced engine, and only when the checksum, the baseline
//! sequence or the engine epoch changed. During a resync the last good view
//! stays published.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};
use types::ids::{Epoch, InstrumentId};
use types::trade::TradeEvent;

use crate::backoff::Backoff;
use crate::config::SyncConfig;
use crate::engine::{DeltaOutcome, ReconciliationEngine};
use crate::error::SyncError;
use crate::events::{Snapshot, StreamMessage};
use crate::metrics::{MetricsSnapshot, SyncMetrics};
use crate::source::{MessageStream, SnapshotSource, StreamConnector};
use crate::status::ConnectionStatus;
use crate::trades::TradeTape;
use crate::view::BookView;

/// Instructions from a [`BookHandle`] to the writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Drop the book and trades, then resync the same instrument.
    Reset,
    /// Drop the book and trades, then sync a different instrument.
    SwitchInstrument(InstrumentId),
    Shutdown,
}

type SnapshotResult = (Epoch, Result<Snapshot, SyncError>);

/// How a sync cycle ended.
#[derive(Debug)]
enum CycleExit {
    /// The engine is unusable; start another cycle.
    Resync(SyncError),
    /// Reset or instrument switch processed.
    Restart,
    Shutdown,
}

/// Cheap, cloneable read/command access to a running supervisor.
#[derive(Debug, Clone)]
pub struct BookHandle {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<BookView>,
    status: watch::Receiver<ConnectionStatus>,
    trades: watch::Receiver<TradeTape>,
    metrics: Arc<SyncMetrics>,
}

impl BookHandle {
    /// Latest published view, limited to `max_depth` levels per side.
    ///
    /// Views are published at [`SyncConfig::publish_depth`], so a larger
    /// `max_depth` still returns at most that many levels. Never blocks and
    /// never observes a half-applied delta.
    pub fn current_view(&self, max_depth: usize) -> BookView {
        self.view.borrow().truncated(max_depth)
    }

    /// Recent trades, most recent first.
    pub fn recent_trades(&self) -> Vec<TradeEvent> {
        self.trades.borrow().recent()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Instrument of the latest published view.
    pub fn instrument(&self) -> InstrumentId {
        self.view.borrow().instrument.clone()
    }

    /// Receiver notified on every published view.
    pub fn subscribe_view(&self) -> watch::Receiver<BookView> {
        self.view.clone()
    }

    /// Receiver notified on every status change.
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Discard the current book and trades and resync from scratch.
    pub async fn reset(&self) -> Result<(), SyncError> {
        self.send(Command::Reset).await
    }

    /// Abandon the current instrument and sync `instrument` instead.
    pub async fn switch_instrument(&self, instrument: InstrumentId) -> Result<(), SyncError> {
        self.send(Command::SwitchInstrument(instrument)).await
    }

    /// Stop the supervisor; the status ends as `Disconnected`.
    pub async fn shutdown(&self) -> Result<(), SyncError> {
        self.send(Command::Shutdown).await
    }

    async fn send(&self, command: Command) -> Result<(), SyncError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SyncError::Stopped)
    }
}

/// Writer task state. Constructed and driven by [`spawn`].
pub struct ResyncSupervisor {
    config: SyncConfig,
    instrument: InstrumentId,
    source: Arc<dyn SnapshotSource>,
    connector: Arc<dyn StreamConnector>,
    epoch: Epoch,
    backoff: Backoff,
    metrics: Arc<SyncMetrics>,
    commands: mpsc::Receiver<Command>,
    snapshot_tx: mpsc::UnboundedSender<SnapshotResult>,
    snapshot_rx: mpsc::UnboundedReceiver<SnapshotResult>,
    view_tx: watch::Sender<BookView>,
    status_tx: watch::Sender<ConnectionStatus>,
    trades_tx: watch::Sender<TradeTape>,
}

/// Start a supervisor for `instrument` on the current tokio runtime.
pub fn spawn(
    config: SyncConfig,
    instrument: InstrumentId,
    source: Arc<dyn SnapshotSource>,
    connector: Arc<dyn StreamConnector>,
) -> (BookHandle, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::channel(config.command_buffer.max(1));
    let (snapshot_tx, snapshot_rx) = mpsc::unbounded_channel();
    let (view_tx, view_rx) = watch::channel(BookView::empty(instrument.clone(), Epoch::ZERO));
    let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);
    let (trades_tx, trades_rx) = watch::channel(TradeTape::new(config.trade_capacity));
    let metrics = Arc::new(SyncMetrics::new());

    let handle = BookHandle {
        commands: command_tx,
        view: view_rx,
        status: status_rx,
        trades: trades_rx,
        metrics: Arc::clone(&metrics),
    };

    let supervisor = ResyncSupervisor {
        backoff: Backoff::new(&config.backoff),
        config,
        instrument,
        source,
        connector,
        epoch: Epoch::ZERO,
        metrics,
        commands: command_rx,
        snapshot_tx,
        snapshot_rx,
        view_tx,
        status_tx,
        trades_tx,
    };

    let task = tokio::spawn(supervisor.run());
    (handle, task)
}

impl ResyncSupervisor {
    async fn run(mut self) {
        info!(instrument = %self.instrument, "Resync supervisor started");

        loop {
            match self.run_cycle().await {
                CycleExit::Shutdown => break,
                CycleExit::Restart => continue,
                CycleExit::Resync(cause) => {
                    self.metrics.record_resync();
                    if cause.is_user_visible() {
                        self.set_status(ConnectionStatus::Error);
                    }
                    if !cause.needs_backoff() {
                        warn!(
                            instrument = %self.instrument,
                            epoch = %self.epoch,
                            cause = %cause,
                            "Resyncing after desync"
                        );
                        continue;
                    }
                    let delay = self.backoff.next_delay();
                    warn!(
                        instrument = %self.instrument,
                        epoch = %self.epoch,
                        cause = %cause,
                        delay_ms = delay.as_millis() as u64,
                        attempt = self.backoff.attempts(),
                        "Sync cycle failed, backing off"
                    );
                    if let Some(CycleExit::Shutdown) = self.wait_backoff(delay).await {
                        break;
                    }
                }
            }
        }

        self.set_status(ConnectionStatus::Disconnected);
        info!(instrument = %self.instrument, "Resync supervisor stopped");
    }

    /// One engine lifetime: connect, fetch, reconcile, until something ends it.
    async fn run_cycle(&mut self) -> CycleExit {
        self.epoch = self.epoch.next();
        let epoch = self.epoch;
        let instrument = self.instrument.clone();
        let mut engine = ReconciliationEngine::new(
            instrument.clone(),
            epoch,
            self.config.pending_capacity,
        );

        if *self.status_tx.borrow() != ConnectionStatus::Error {
            self.set_status(ConnectionStatus::Connecting);
        }
        info!(%instrument, %epoch, "Starting sync cycle");

        // Connect before fetching so no delta between snapshot and stream
        // start is lost; early deltas wait in the engine's buffer.
        let connector = Arc::clone(&self.connector);
        let connected = tokio::select! {
            connected = connector.connect(&instrument) => connected,
            command = self.commands.recv() => return self.apply_command(command),
        };
        let stream = match connected {
            Ok(stream) => stream,
            Err(e) => {
                self.metrics.record_transport_failure();
                return CycleExit::Resync(e);
            }
        };
        let fetch = self.request_snapshot(epoch);
        let exit = self.drive(&mut engine, stream).await;

        // A late result from an upstream failure is left to the epoch guard.
        if matches!(exit, CycleExit::Restart | CycleExit::Shutdown) {
            fetch.abort();
        }
        exit
    }

    /// Route snapshot results, stream items and sampler ticks into the engine.
    async fn drive(
        &mut self,
        engine: &mut ReconciliationEngine,
        mut stream: MessageStream,
    ) -> CycleExit {
        let epoch = engine.epoch();
        let instrument = engine.instrument().clone();

        let mut ticker = interval(self.config.view_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = self.commands.recv() => return self.apply_command(command),

                Some((tag, result)) = self.snapshot_rx.recv() => {
                    if tag != epoch {
                        self.discard_superseded(tag);
                        continue;
                    }
                    let snapshot = match result {
                        Ok(snapshot) => snapshot,
                        Err(e) => {
                            self.metrics.record_snapshot_failure();
                            return CycleExit::Resync(e);
                        }
                    };
                    match engine.apply_snapshot(snapshot) {
                        Ok(summary) => {
                            self.metrics.record_snapshot_applied();
                            for _ in 0..summary.applied {
                                self.metrics.record_applied();
                            }
                            for _ in 0..summary.stale {
                                self.metrics.record_stale();
                            }
                            self.backoff.reset();
                            self.set_status(ConnectionStatus::Connected);
                            self.publish_view(engine);
                        }
                        Err(e) => return self.desynced(e),
                    }
                }

                item = stream.next() => {
                    let Some(item) = item else {
                        self.metrics.record_transport_failure();
                        return CycleExit::Resync(SyncError::Transport("stream ended".to_string()));
                    };
                    match item {
                        Ok(StreamMessage::Delta(delta)) => match engine.on_delta(delta) {
                            Ok(DeltaOutcome::Applied) => self.metrics.record_applied(),
                            Ok(DeltaOutcome::Stale) => self.metrics.record_stale(),
                            Ok(DeltaOutcome::Buffered) => self.metrics.record_buffered(),
                            Ok(DeltaOutcome::Ignored) => {}
                            Err(e) => return self.desynced(e),
                        },
                        Ok(StreamMessage::Trade(trade)) => {
                            self.metrics.record_trade();
                            self.trades_tx.send_modify(|tape| tape.record(trade));
                        }
                        Err(SyncError::Decode(reason)) => {
                            self.metrics.record_malformed();
                            warn!(%instrument, %epoch, %reason, "Skipping malformed frame");
                        }
                        Err(e) => {
                            self.metrics.record_transport_failure();
                            return CycleExit::Resync(e);
                        }
                    }
                }

                _ = ticker.tick() => self.publish_view(engine),
            }
        }
    }

    /// Fetch the snapshot on its own task so the stream keeps draining.
    fn request_snapshot(&self, epoch: Epoch) -> JoinHandle<()> {
        let source = Arc::clone(&self.source);
        let results = self.snapshot_tx.clone();
        let instrument = self.instrument.clone();

        tokio::spawn(async move {
            let result = source.fetch_snapshot(&instrument).await;
            if results.send((epoch, result)).is_err() {
                debug!(%instrument, %epoch, "Supervisor gone before snapshot arrived");
            }
        })
    }

    fn desynced(&self, cause: SyncError) -> CycleExit {
        if matches!(cause, SyncError::SequenceGap { .. }) {
            self.metrics.record_gap();
        }
        CycleExit::Resync(cause)
    }

    fn discard_superseded(&self, received: Epoch) {
        self.metrics.record_superseded();
        let err = SyncError::Superseded {
            received,
            active: self.epoch,
        };
        debug!(instrument = %self.instrument, error = %err, "Discarding superseded result");
    }

    /// Sleep out a backoff delay while still honouring commands.
    async fn wait_backoff(&mut self, delay: Duration) -> Option<CycleExit> {
        tokio::select! {
            _ = sleep(delay) => None,
            command = self.commands.recv() => Some(self.apply_command(command)),
        }
    }

    fn apply_command(&mut self, command: Option<Command>) -> CycleExit {
        match command {
            None | Some(Command::Shutdown) => {
                info!(instrument = %self.instrument, "Shutdown requested");
                CycleExit::Shutdown
            }
            Some(Command::Reset) => {
                info!(instrument = %self.instrument, "Reset requested");
                self.clear_book();
                CycleExit::Restart
            }
            Some(Command::SwitchInstrument(instrument)) => {
                info!(from = %self.instrument, to = %instrument, "Switching instrument");
                self.instrument = instrument;
                self.clear_book();
                CycleExit::Restart
            }
        }
    }

    /// Empty view and trade tape for the (possibly new) instrument.
    fn clear_book(&mut self) {
        self.backoff.reset();
        self.trades_tx.send_modify(TradeTape::clear);
        self.view_tx
            .send_replace(BookView::empty(self.instrument.clone(), self.epoch));
        self.metrics.record_view_published();
    }

    /// Publish a sampled view if the engine is synced and the book, its
    /// baseline or the epoch changed.
    ///
    /// An empty delta moves the baseline without touching any level, so the
    /// checksum alone would leave readers on a stale `baseline_sequence`.
    fn publish_view(&self, engine: &ReconciliationEngine) {
        if !engine.is_synced() {
            return;
        }
        let view = engine.current_view(self.config.publish_depth);
        let published = self.view_tx.send_if_modified(|current| {
            if current.checksum == view.checksum
                && current.baseline_sequence == view.baseline_sequence
                && current.epoch == view.epoch
                && current.instrument == view.instrument
            {
                return false;
            }
            *current = view;
            true
        });
        if published {
            self.metrics.record_view_published();
        }
    }

    fn set_status(&self, status: ConnectionStatus) {
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            debug!(instrument = %self.instrument, from = %current, to = %status, "Status change");
            *current = status;
            true
        });
    }
}
