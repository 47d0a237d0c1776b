//! Hydration entry point.

use crate::assembler::GraphAssembler;
use crate::config::HydrationConfig;
use crate::decoder::RowDecoder;
use crate::result::ResultContainer;
use crate::shape::{BoundShape, ResultShape};
use crate::source::RowSource;
use rowgraph_core::{ChangeRegister, EntityFactory, MetadataRegistry, Result};
use std::time::{Duration, Instant};

/// Counters for one hydration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HydrationStats {
    /// Rows pulled from the source
    pub rows: usize,
    /// Distinct entities placed in the graph
    pub entities: usize,
    /// Collections created and finalized
    pub collections: usize,
    /// Wall-clock time of the run
    pub elapsed: Duration,
}

/// Output of a completed run.
#[derive(Debug, Clone)]
pub struct Hydration {
    pub result: ResultContainer,
    pub stats: HydrationStats,
}

/// Turns rows into an object graph.
///
/// Each call to [`hydrate_all`](Self::hydrate_all) runs with a fresh context;
/// the hydrator itself holds only the registry and configuration and can be
/// reused across queries.
#[derive(Debug, Clone)]
pub struct ObjectHydrator<'r> {
    registry: &'r MetadataRegistry,
    config: HydrationConfig,
}

impl<'r> ObjectHydrator<'r> {
    pub fn new(registry: &'r MetadataRegistry) -> Self {
        Self {
            registry,
            config: HydrationConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: HydrationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &HydrationConfig {
        &self.config
    }

    /// Bind `shape` and hydrate every row `source` produces.
    ///
    /// Mapping problems are reported before the first row is pulled. A source
    /// failure aborts the run and is returned unchanged.
    #[tracing::instrument(level = "debug", skip_all, fields(aliases = shape.aliases().len()))]
    pub fn hydrate_all<S>(
        &self,
        shape: &ResultShape,
        source: &mut S,
        factory: &mut dyn EntityFactory,
        register: &mut dyn ChangeRegister,
    ) -> Result<Hydration>
    where
        S: RowSource + ?Sized,
    {
        let bound = BoundShape::bind(shape, self.registry)?;
        self.hydrate_bound(&bound, source, factory, register)
    }

    /// Hydrate with a shape that was bound ahead of time.
    pub fn hydrate_bound<S>(
        &self,
        shape: &BoundShape,
        source: &mut S,
        factory: &mut dyn EntityFactory,
        register: &mut dyn ChangeRegister,
    ) -> Result<Hydration>
    where
        S: RowSource + ?Sized,
    {
        let start = Instant::now();
        tracing::debug!(
            mixed = shape.is_mixed(),
            simple = shape.is_simple(),
            refresh = self.config.refresh,
            "Starting hydration"
        );

        let mut decoder = RowDecoder::new(shape);
        let mut assembler = GraphAssembler::new(shape, &self.config, factory, register);
        while let Some(row) = source.pull()? {
            let decoded = decoder.decode(&row);
            assembler.hydrate_row(&decoded)?;
        }

        let (result, mut stats) = assembler.finish();
        stats.elapsed = start.elapsed();
        tracing::debug!(
            rows = stats.rows,
            entities = stats.entities,
            collections = stats.collections,
            results = result.len(),
            elapsed_us = u64::try_from(stats.elapsed.as_micros()).unwrap_or(u64::MAX),
            "Hydration finished"
        );

        Ok(Hydration { result, stats })
    }
}
