//! Fluent builder for constructing a [`TripFlowEngine`].

use tf_core::FlowConfig;
use tf_spatial::{DijkstraRouter, NetworkGraph, Router};

use crate::{
    CancelToken, Checkpoint, FlowResult, SegmentAccumulator, StationIndex, TripFlowEngine,
    TripStatusTable,
};

/// Fluent builder for [`TripFlowEngine<R>`].
///
/// # Required inputs
///
/// - [`FlowConfig`]: batch size, concurrency, `max_trips`, …
/// - [`NetworkGraph`]: from [`tf_spatial::NetworkGraphBuilder`]
/// - [`StationIndex`]
/// - `R: Router`: the routing algorithm (e.g. [`DijkstraRouter`])
///
/// # Optional inputs
///
/// | Method               | Default                              |
/// |----------------------|--------------------------------------|
/// | `.resume(cp)`        | Empty counts, every trip pending     |
/// | `.cancel_token(t)`   | A fresh token                        |
///
/// # Example
///
/// ```rust,ignore
/// let mut engine = TripFlowEngineBuilder::dijkstra(config, network, stations)
///     .resume(checkpoint)
///     .build()?;
/// let report = engine.run(&trips, &mut NoopObserver)?;
/// ```
pub struct TripFlowEngineBuilder<R: Router> {
    config:     FlowConfig,
    network:    NetworkGraph,
    stations:   StationIndex,
    router:     R,
    checkpoint: Option<Checkpoint>,
    cancel:     Option<CancelToken>,
}

impl<R: Router> TripFlowEngineBuilder<R> {
    pub fn new(config: FlowConfig, network: NetworkGraph, stations: StationIndex, router: R) -> Self {
        Self { config, network, stations, router, checkpoint: None, cancel: None }
    }

    /// Start from the state saved by an earlier run.  Trips recorded as
    /// terminal are skipped and their counts are kept.
    pub fn resume(mut self, checkpoint: Checkpoint) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    /// Share a cancellation flag created elsewhere (e.g. a signal handler).
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Validate the configuration, restore any checkpoint, and return a
    /// ready-to-run engine.
    ///
    /// # Errors
    ///
    /// - [`FlowError::Core`][crate::FlowError::Core] for an invalid config.
    /// - [`FlowError::UnknownSegment`][crate::FlowError::UnknownSegment] if
    ///   the checkpoint was taken on a different network.
    pub fn build(self) -> FlowResult<TripFlowEngine<R>> {
        self.config.validate()?;

        let (accumulator, status) = match self.checkpoint {
            Some(cp) => {
                let acc = SegmentAccumulator::restore(
                    &self.network,
                    &cp.counts,
                    cp.succeeded_trips().cloned(),
                )?;
                let resumed = cp.status_counts();
                log::info!(
                    "resuming: {} trips resolved earlier, {} segments with counts",
                    resumed.terminal(),
                    cp.counts.len(),
                );
                (acc, TripStatusTable::from_entries(cp.statuses))
            }
            None => (SegmentAccumulator::new(&self.network), TripStatusTable::new()),
        };

        Ok(TripFlowEngine {
            config:   self.config,
            network:  self.network,
            stations: self.stations,
            router:   self.router,
            accumulator,
            status,
            cancel:   self.cancel.unwrap_or_default(),
        })
    }
}

impl TripFlowEngineBuilder<DijkstraRouter> {
    /// A builder using [`DijkstraRouter`] with the config's search deadline.
    pub fn dijkstra(config: FlowConfig, network: NetworkGraph, stations: StationIndex) -> Self {
        let router = DijkstraRouter::with_deadline(config.search_deadline());
        Self::new(config, network, stations, router)
    }
}
