//! The route report pipeline
//!
//! Collect → normalize → summarize → assemble, under one deadline.
//! Any failure aborts the report; nothing collected before it is returned.
//!
//! Collection runs in three steps:
//! 1. directions, which gate everything else
//! 2. places and geocoding, concurrently with traffic and roadworks
//! 3. elevation and weather, which need the geocoded endpoints

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use crate::Result;
use crate::config::AppConfig;
use crate::enrichment::{ContextEnrichment, RouteContext};
use crate::error::RouteError;
use crate::geospatial::{GeospatialAggregator, GeospatialData, GoogleMaps};
use crate::http::build_client;
use crate::models::{Place, RouteReport};
use crate::report::ReportAssembler;
use crate::summary::{SummarizationClient, TextNormalizer};

pub struct RoutePipeline {
    aggregator: GeospatialAggregator,
    enrichment: ContextEnrichment,
    normalizer: Arc<TextNormalizer>,
    summarizer: SummarizationClient,
    assembler: ReportAssembler,
    deadline: Duration,
}

impl RoutePipeline {
    /// Wire every stage from configuration, sharing one HTTP client
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = build_client(&config.http)?;

        Ok(Self {
            aggregator: GeospatialAggregator::new(
                GoogleMaps::new(client.clone(), &config.google),
                config.aggregation.clone(),
            ),
            enrichment: ContextEnrichment::new(client.clone(), config),
            normalizer: Arc::new(TextNormalizer::new(config.openai.max_prompt_tokens)?),
            summarizer: SummarizationClient::new(client, &config.openai),
            assembler: ReportAssembler::new(config.aggregation.calories_per_km),
            deadline: Duration::from_secs(config.http.pipeline_timeout_seconds),
        })
    }

    /// Produce the report for a raw start/end pair
    #[instrument(skip(self))]
    pub async fn route_info(&self, start: &str, end: &str) -> Result<RouteReport> {
        let start = Place::parse("start", start)?;
        let end = Place::parse("end", end)?;

        let started = Instant::now();
        let report = tokio::time::timeout(self.deadline, self.run(&start, &end))
            .await
            .map_err(|_| {
                warn!("Route report exceeded {}s deadline", self.deadline.as_secs());
                RouteError::Timeout {
                    seconds: self.deadline.as_secs(),
                }
            })??;

        info!(
            "Route report for '{}' -> '{}' ready in {:.3}s",
            start,
            end,
            started.elapsed().as_secs_f64()
        );
        Ok(report)
    }

    async fn collect(&self, start: &Place, end: &Place) -> Result<(GeospatialData, RouteContext)> {
        let directions = self.aggregator.route(start, end).await?;

        let (survey, (traffic, roadworks)) = futures::try_join!(
            self.aggregator.survey(&directions, start, end),
            self.enrichment.road_conditions(start, end),
        )?;

        let (elevation, weather) = futures::try_join!(
            self.aggregator.elevation(survey.start, survey.end),
            self.enrichment.weather(survey.start),
        )?;

        let geo = GeospatialData {
            directions,
            places: survey.places,
            start: survey.start,
            end: survey.end,
            elevation,
        };
        let context = RouteContext {
            weather,
            traffic,
            roadworks,
        };
        Ok((geo, context))
    }

    async fn run(&self, start: &Place, end: &Place) -> Result<RouteReport> {
        let (geo, context) = self.collect(start, end).await?;

        let prompt = TextNormalizer::build_prompt(start, end, &geo, &context);
        // Tokenizing the whole aggregate is CPU bound
        let normalizer = Arc::clone(&self.normalizer);
        let prompt = tokio::task::spawn_blocking(move || normalizer.truncate(&prompt))
            .await
            .map_err(|e| RouteError::general(format!("Prompt normalization failed: {e}")))?;

        let summary = self.summarizer.summarize(&prompt).await?;

        Ok(self.assembler.assemble(start, end, &geo, context, &summary))
    }
}
