//! Stage wiring: metadata enrichment -> cycle grouping -> minimum aggregation.
//!
//! The pipeline is single-owner. [`Pipeline::spawn`] moves it into one tokio
//! task so batches from any number of producers are applied one at a time.

use crate::aggregator::MinAggregator;
use crate::core::{Config, CycleStatsError, Metric, Result};
use crate::metadata::MetadataEnricher;
use crate::processor::{CycleProcessor, CycleStats};
use chrono::Utc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Tick used when neither the min aggregator nor group expiry needs one
const IDLE_TICK: Duration = Duration::from_secs(1);

/// Capacity of the input and output queues of a spawned pipeline
const QUEUE_DEPTH: usize = 1024;

/// All processing stages in delivery order
pub struct Pipeline {
    enricher: Option<MetadataEnricher>,
    cycles: CycleProcessor,
    min: Option<MinAggregator>,
    last_push: Instant,
}

impl Pipeline {
    /// Build every enabled stage from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let enricher = if config.metadata.enabled {
            Some(
                MetadataEnricher::from_config(&config.metadata)?
                    .with_control_measurement(config.grouping.control_measurement.clone()),
            )
        } else {
            None
        };

        let cycles = CycleProcessor::new(&config.grouping)?;
        let min = config.min.enabled.then(|| MinAggregator::new(&config.min));

        Ok(Self::new(enricher, cycles, min))
    }

    /// Assemble a pipeline from already built stages
    pub fn new(
        enricher: Option<MetadataEnricher>,
        cycles: CycleProcessor,
        min: Option<MinAggregator>,
    ) -> Self {
        Self {
            enricher,
            cycles,
            min,
            last_push: Instant::now(),
        }
    }

    /// Run one batch through every stage and return the completed cycle reports
    pub async fn process(&mut self, batch: Vec<Metric>) -> Vec<Metric> {
        let batch = match self.enricher.as_mut() {
            Some(enricher) => enricher.apply(batch).await,
            None => batch,
        };

        let aggregates = self.cycles.apply(batch);
        self.observe(&aggregates);
        aggregates
    }

    /// Periodic housekeeping: expire stale groups and push minimums when due
    pub fn tick(&mut self, now: Instant) -> Vec<Metric> {
        let mut out = self.cycles.expire(now);
        self.observe(&out);

        if let Some(min) = self.min.as_mut() {
            if now.saturating_duration_since(self.last_push) >= min.period() {
                out.extend(min.push(Utc::now()));
                min.reset();
                self.last_push = now;
            }
        }

        out
    }

    /// Emit whatever the min aggregator holds, regardless of its period
    pub fn drain(&mut self) -> Vec<Metric> {
        match self.min.as_mut() {
            Some(min) => {
                let out = min.push(Utc::now());
                min.reset();
                out
            },
            None => Vec::new(),
        }
    }

    fn observe(&mut self, aggregates: &[Metric]) {
        if let Some(min) = self.min.as_mut() {
            for metric in aggregates {
                min.add(metric);
            }
        }
    }

    /// Counters of the grouping stage
    pub fn cycle_stats(&self) -> CycleStats {
        self.cycles.stats()
    }

    fn tick_interval(&self) -> Duration {
        self.min.as_ref().map_or(IDLE_TICK, |m| m.period().min(IDLE_TICK))
    }

    /// Move the pipeline into its own task.
    ///
    /// Dropping every [`PipelineHandle`] sender ends the task after a final
    /// drain of the min aggregator.
    pub fn spawn(mut self) -> PipelineHandle {
        let (input_tx, mut input_rx) = mpsc::channel::<Vec<Metric>>(QUEUE_DEPTH);
        let (output_tx, output_rx) = mpsc::channel::<Vec<Metric>>(QUEUE_DEPTH);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.tick_interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                let out = tokio::select! {
                    batch = input_rx.recv() => match batch {
                        Some(batch) => self.process(batch).await,
                        None => break,
                    },
                    _ = interval.tick() => self.tick(Instant::now()),
                };

                if !out.is_empty() && output_tx.send(out).await.is_err() {
                    tracing::warn!("Pipeline output closed, stopping");
                    return Err(CycleStatsError::ChannelSend);
                }
            }

            let remaining = self.drain();
            if !remaining.is_empty() && output_tx.send(remaining).await.is_err() {
                return Err(CycleStatsError::ChannelSend);
            }

            tracing::info!("Pipeline stopped: {:?}", self.cycle_stats());
            Ok(())
        });

        PipelineHandle {
            input: input_tx,
            output: output_rx,
            task,
        }
    }
}

/// Queues and task of a spawned pipeline
pub struct PipelineHandle {
    /// Batches to process
    pub input: mpsc::Sender<Vec<Metric>>,
    /// Completed cycle reports and minimum summaries
    pub output: mpsc::Receiver<Vec<Metric>>,
    /// The owning task
    pub task: JoinHandle<Result<()>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ConfigBuilder;
    use chrono::TimeZone;

    fn grinder(secs: i64, field: &str, value: f64) -> Metric {
        Metric::new("grinder", Utc.timestamp_opt(secs, 0).unwrap()).with_field(field, value)
    }

    fn report(secs: i64, speed: f64) -> Vec<Metric> {
        vec![
            grinder(secs, "motor_current", 1.5),
            grinder(secs, "speed", speed),
            grinder(secs, "runtime", 30.0),
            grinder(secs, "jammed", 0.0),
        ]
    }

    #[tokio::test]
    async fn test_process_feeds_min_aggregator() {
        let config = ConfigBuilder::new().build().unwrap();
        let mut pipeline = Pipeline::from_config(&config).unwrap();

        assert_eq!(pipeline.process(report(10, 900.0)).await.len(), 1);
        assert_eq!(pipeline.process(report(11, 850.0)).await.len(), 1);

        let mins = pipeline.drain();
        assert_eq!(mins.len(), 1);
        assert_eq!(mins[0].get_field("speed_min").and_then(|v| v.as_f64()), Some(850.0));
        assert!(pipeline.drain().is_empty());
    }

    #[tokio::test]
    async fn test_tick_respects_period() {
        let config = ConfigBuilder::new().min_period(Duration::from_secs(30)).build().unwrap();
        let mut pipeline = Pipeline::from_config(&config).unwrap();
        pipeline.process(report(10, 900.0)).await;

        let start = Instant::now();
        assert!(pipeline.tick(start).is_empty());
        assert_eq!(pipeline.tick(start + Duration::from_secs(31)).len(), 1);
        assert!(pipeline.tick(start + Duration::from_secs(32)).is_empty());
    }

    #[tokio::test]
    async fn test_spawned_pipeline_round_trip() {
        let config = ConfigBuilder::new().min_enabled(false).build().unwrap();
        let mut handle = Pipeline::from_config(&config).unwrap().spawn();

        handle.input.send(report(10, 900.0)).await.unwrap();
        let out = handle.output.recv().await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].fields().len(), 4);

        drop(handle.input);
        assert!(handle.task.await.unwrap().is_ok());
    }
}
