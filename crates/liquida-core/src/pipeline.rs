use crate::aggregate::{Aggregator, BatchResult};
use crate::config::BatchConfig;
use crate::error::LiquidaError;
use crate::extraction::PdfExtractor;
use crate::layouts::catalog::Catalog;
use crate::layouts::{builtin, LayoutRegistry};
use crate::model::{ClassifiedDocument, NormalizedDocument};
use crate::parsing::result::ExtractionResult;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;

/// A named PDF buffer submitted to a batch.
#[derive(Debug, Clone)]
pub struct BatchInput {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl BatchInput {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        BatchInput {
            name: name.into(),
            bytes,
        }
    }
}

/// Everything a batch needs. Cheap to clone; all state is shared read-only.
#[derive(Clone)]
pub struct Pipeline {
    registry: Arc<LayoutRegistry>,
    catalog: Arc<Catalog>,
    extractor: Arc<dyn PdfExtractor>,
    config: BatchConfig,
}

impl Pipeline {
    pub fn new(
        registry: LayoutRegistry,
        catalog: Catalog,
        extractor: Arc<dyn PdfExtractor>,
        config: BatchConfig,
    ) -> Self {
        Pipeline {
            registry: Arc::new(registry),
            catalog: Arc::new(catalog),
            extractor,
            config,
        }
    }

    /// Built-in catalog, built-in layouts merged with `config.layout_dirs`,
    /// and the configured backend.
    pub fn from_config(config: BatchConfig) -> Result<Self, LiquidaError> {
        config.validate().map_err(LiquidaError::ContractViolation)?;
        let registry = LayoutRegistry::load(&config.layout_dirs)?;
        let catalog = builtin::catalog()?;
        let extractor = config.backend.extractor();
        Ok(Self::new(registry, catalog, extractor, config))
    }

    pub fn registry(&self) -> &LayoutRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Load, classify, extract and normalize one document.
    pub fn process_document(
        &self,
        name: &str,
        bytes: &[u8],
    ) -> Result<NormalizedDocument, LiquidaError> {
        crate::process_pdf(
            name,
            bytes,
            self.extractor.as_ref(),
            &self.registry,
            &self.catalog,
        )
    }

    /// Stop after extraction and return every field as found.
    pub fn inspect(
        &self,
        name: &str,
        bytes: &[u8],
    ) -> Result<(ClassifiedDocument, ExtractionResult), LiquidaError> {
        crate::parse_pdf(
            name,
            bytes,
            self.extractor.as_ref(),
            &self.registry,
            &self.catalog,
        )
    }

    /// Run a batch.
    ///
    /// Up to `concurrency` documents are in flight at once, each on a
    /// blocking task under the per-file timeout. Outcomes are drained in
    /// submission order, so the ledgers do not depend on which document
    /// finishes first. Only an empty batch or a contract violation fails the
    /// whole run.
    pub async fn run_batch(&self, inputs: Vec<BatchInput>) -> Result<BatchResult, LiquidaError> {
        if inputs.is_empty() {
            return Err(LiquidaError::EmptyBatch);
        }

        let concurrency = self.config.concurrency.max(1);
        let seconds = self.config.timeout_secs;
        tracing::info!(files = inputs.len(), concurrency, timeout_secs = seconds, "batch started");

        let outcomes = stream::iter(inputs.into_iter().map(|input| {
            let pipeline = self.clone();
            async move {
                let name = input.name.clone();
                let outcome = pipeline.process_with_timeout(input, seconds).await;
                (name, outcome)
            }
        }))
        .buffered(concurrency);
        let mut outcomes = std::pin::pin!(outcomes);

        let mut aggregator = Aggregator::new();
        while let Some((name, outcome)) = outcomes.next().await {
            aggregator.accept(&name, outcome)?;
        }
        Ok(aggregator.finish())
    }

    async fn process_with_timeout(
        self,
        input: BatchInput,
        seconds: u64,
    ) -> Result<NormalizedDocument, LiquidaError> {
        let name = input.name.clone();
        let task = tokio::task::spawn_blocking(move || {
            self.process_document(&input.name, &input.bytes)
        });

        // A timed-out task is abandoned; its result is never read.
        match tokio::time::timeout(Duration::from_secs(seconds), task).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_error)) => {
                tracing::error!(file = %name, error = %join_error, "document worker panicked");
                Err(LiquidaError::WorkerFailed(join_error.to_string()))
            }
            Err(_elapsed) => Err(LiquidaError::Timeout { seconds }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::SkipReason;
    use crate::extraction::PageContent;

    /// Sleeps before returning a single page of text.
    struct Slow(Duration);

    impl PdfExtractor for Slow {
        fn extract_pages(&self, _pdf_bytes: &[u8]) -> Result<Vec<PageContent>, LiquidaError> {
            std::thread::sleep(self.0);
            Ok(vec![PageContent::new(1, vec!["hoja en blanco".into()])])
        }

        fn backend_name(&self) -> &str {
            "slow"
        }
    }

    fn pipeline(delay: Duration, timeout_secs: u64) -> Pipeline {
        Pipeline::new(
            LayoutRegistry::builtin().unwrap(),
            builtin::catalog().unwrap(),
            Arc::new(Slow(delay)),
            BatchConfig {
                timeout_secs,
                ..BatchConfig::default()
            },
        )
    }

    struct Crashing;

    impl PdfExtractor for Crashing {
        fn extract_pages(&self, _pdf_bytes: &[u8]) -> Result<Vec<PageContent>, LiquidaError> {
            panic!("backend bug");
        }

        fn backend_name(&self) -> &str {
            "crashing"
        }
    }

    #[tokio::test]
    async fn test_crashed_worker_is_not_a_bad_file() {
        let pipeline = Pipeline::new(
            LayoutRegistry::builtin().unwrap(),
            builtin::catalog().unwrap(),
            Arc::new(Crashing),
            BatchConfig::default(),
        );
        let result = pipeline
            .run_batch(vec![BatchInput::new("a.pdf", b"%PDF-1.4 a".to_vec())])
            .await
            .unwrap();
        assert_eq!(result.skipped.len(), 1);
        assert!(matches!(
            result.skipped[0].reason,
            SkipReason::WorkerFailed { .. }
        ));
    }

    #[test]
    fn test_zero_timeout_config_is_rejected() {
        let config = BatchConfig {
            timeout_secs: 0,
            ..BatchConfig::default()
        };
        assert!(matches!(
            Pipeline::from_config(config),
            Err(LiquidaError::ContractViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_batch_is_fatal() {
        let err = pipeline(Duration::ZERO, 60).run_batch(Vec::new()).await.unwrap_err();
        assert!(matches!(err, LiquidaError::EmptyBatch));
    }

    #[tokio::test]
    async fn test_timeout_skips_only_that_file() {
        let result = pipeline(Duration::from_millis(1500), 1)
            .run_batch(vec![
                BatchInput::new("lento.pdf", b"%PDF-1.4 a".to_vec()),
                BatchInput::new("roto.pdf", b"garbage".to_vec()),
            ])
            .await
            .unwrap();
        assert_eq!(result.skipped.len(), 2);
        assert_eq!(result.skipped[0].filename, "lento.pdf");
        assert_eq!(result.skipped[0].reason, SkipReason::Timeout { seconds: 1 });
        assert!(matches!(
            result.skipped[1].reason,
            SkipReason::UnreadableDocument { .. }
        ));
    }

    #[tokio::test]
    async fn test_unrecognised_text_is_unclassified() {
        let result = pipeline(Duration::ZERO, 60)
            .run_batch(vec![BatchInput::new("otro.pdf", b"%PDF-1.7".to_vec())])
            .await
            .unwrap();
        assert_eq!(result.skipped[0].reason, SkipReason::UnclassifiedDocument);
        assert!(result.sales.is_empty());
    }
}
