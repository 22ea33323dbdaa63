use anyhow::{Context, Result};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::GridError;
use crate::model::{GridFeature, Identifier, LayerExtent};
use crate::params::identify_feature;

/// Smallest depth the CLI accepts.
pub const MIN_DEPTH: u32 = 1;
/// Largest depth the CLI accepts.
pub const MAX_DEPTH: u32 = 10;

/// Supplies the features of a grid layer.
pub trait FeatureSource {
    /// Field names of every feature's `attributes`, in order.
    fn fields(&self) -> &[String];
    fn layer_extent(&self) -> LayerExtent;
    fn features(&self) -> &[GridFeature];
}

/// Receives each feature together with its identifier.
pub trait FeatureSink {
    fn add_feature(&mut self, feature: &GridFeature, identifier: &Identifier) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Progress reporting and cancellation, polled between features.
pub trait Feedback {
    fn is_canceled(&self) -> bool {
        false
    }

    fn set_progress(&mut self, _percent: f64) {}
}

/// What to do with a feature whose identifier cannot be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    #[default]
    Abort,
    Skip,
}

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub depth: u32,
    pub uppercase_rows: bool,
    pub error_policy: ErrorPolicy,
    pub parallel: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            depth: MIN_DEPTH,
            uppercase_rows: true,
            error_policy: ErrorPolicy::Abort,
            parallel: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessSummary {
    pub written: usize,
    pub skipped: usize,
    pub canceled: bool,
}

/// Annotates every feature of a grid layer with its row and column identifier.
pub struct GridIdentifierProcessor {
    config: ProcessorConfig,
}

impl GridIdentifierProcessor {
    pub fn new(config: ProcessorConfig) -> Self {
        Self { config }
    }

    pub fn process<S, K, F>(
        &self,
        source: &S,
        sink: &mut K,
        feedback: &mut F,
    ) -> Result<ProcessSummary>
    where
        S: FeatureSource + ?Sized,
        K: FeatureSink + ?Sized,
        F: Feedback + ?Sized,
    {
        let layer = source.layer_extent();
        let features = source.features();
        let depth = self.config.depth;

        info!(
            "Generating identifiers for {} features (depth {}, layer {} x {})",
            features.len(),
            depth,
            layer.width,
            layer.height
        );

        // 各フィーチャーは独立なので先にまとめて計算できる
        let precomputed: Option<Vec<Result<Identifier, GridError>>> = if self.config.parallel {
            Some(
                features
                    .par_iter()
                    .map(|feature| identify_feature(feature, &layer, depth))
                    .collect(),
            )
        } else {
            None
        };

        let total = if features.is_empty() {
            0.0
        } else {
            100.0 / features.len() as f64
        };
        let mut summary = ProcessSummary::default();

        for (current, feature) in features.iter().enumerate() {
            if feedback.is_canceled() {
                info!("Canceled after {} features", current);
                summary.canceled = true;
                break;
            }

            let identified = match &precomputed {
                Some(results) => results[current].clone(),
                None => identify_feature(feature, &layer, depth),
            };

            match identified {
                Ok(identifier) => {
                    let identifier = if self.config.uppercase_rows {
                        identifier.to_uppercase_rows()
                    } else {
                        identifier
                    };
                    debug!(
                        "Feature {}: row_id={} col_id={}",
                        feature.id, identifier.row_part, identifier.col_part
                    );
                    sink.add_feature(feature, &identifier)
                        .with_context(|| format!("Failed to write feature {}", feature.id))?;
                    summary.written += 1;
                }
                Err(e) => match self.config.error_policy {
                    ErrorPolicy::Abort => {
                        return Err(e).with_context(|| {
                            format!("Failed to compute identifier for feature {}", feature.id)
                        });
                    }
                    ErrorPolicy::Skip => {
                        warn!("Skipping feature {}: {}", feature.id, e);
                        summary.skipped += 1;
                    }
                },
            }

            feedback.set_progress(current as f64 * total);
        }

        sink.finish().context("Failed to finish output")?;

        info!(
            "Wrote {} features, skipped {}",
            summary.written, summary.skipped
        );

        Ok(summary)
    }
}

/// [`Feedback`] that logs progress and honours a shared cancel flag.
#[derive(Debug, Default)]
pub struct LogFeedback {
    cancel: Option<Arc<AtomicBool>>,
    last_percent: Option<u32>,
}

impl LogFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_flag(cancel: Arc<AtomicBool>) -> Self {
        Self {
            cancel: Some(cancel),
            last_percent: None,
        }
    }
}

impl Feedback for LogFeedback {
    fn is_canceled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn set_progress(&mut self, percent: f64) {
        let percent = percent as u32;
        // 同じ値を繰り返し出さない
        if self.last_percent != Some(percent) {
            self.last_percent = Some(percent);
            debug!("Progress: {}%", percent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CellExtent;

    struct VecSource {
        fields: Vec<String>,
        layer: LayerExtent,
        features: Vec<GridFeature>,
    }

    impl FeatureSource for VecSource {
        fn fields(&self) -> &[String] {
            &self.fields
        }

        fn layer_extent(&self) -> LayerExtent {
            self.layer
        }

        fn features(&self) -> &[GridFeature] {
            &self.features
        }
    }

    #[derive(Default)]
    struct VecSink {
        records: Vec<(u64, Identifier)>,
        finished: bool,
    }

    impl FeatureSink for VecSink {
        fn add_feature(&mut self, feature: &GridFeature, identifier: &Identifier) -> Result<()> {
            self.records.push((feature.id, identifier.clone()));
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingFeedback {
        progress: Vec<f64>,
        cancel_after: Option<usize>,
    }

    impl Feedback for RecordingFeedback {
        fn is_canceled(&self) -> bool {
            self.cancel_after
                .is_some_and(|limit| self.progress.len() >= limit)
        }

        fn set_progress(&mut self, percent: f64) {
            self.progress.push(percent);
        }
    }

    /// 4行 x 2列、セル 10 x 10 のグリッド（列方向に番号付け）
    fn grid_source() -> VecSource {
        let mut features = Vec::new();
        for id in 1..=8u64 {
            let row = (id - 1) % 4;
            let col = (id - 1) / 4;
            let left = col as f64 * 10.0;
            let top = 40.0 - row as f64 * 10.0;
            features.push(GridFeature {
                id,
                cell: CellExtent {
                    left,
                    right: left + 10.0,
                    top,
                    bottom: top - 10.0,
                },
                attributes: vec![id.to_string()],
            });
        }

        VecSource {
            fields: vec!["id".to_string()],
            layer: LayerExtent {
                width: 20.0,
                height: 40.0,
            },
            features,
        }
    }

    #[test]
    fn test_process_writes_every_feature() {
        let source = grid_source();
        let mut sink = VecSink::default();
        let mut feedback = RecordingFeedback::default();

        let processor = GridIdentifierProcessor::new(ProcessorConfig {
            depth: 2,
            ..Default::default()
        });
        let summary = processor.process(&source, &mut sink, &mut feedback).unwrap();

        assert_eq!(
            summary,
            ProcessSummary {
                written: 8,
                skipped: 0,
                canceled: false
            }
        );
        assert!(sink.finished);

        let (id, first) = &sink.records[0];
        assert_eq!(*id, 1);
        assert_eq!(first.row_part, "AA");
        assert_eq!(first.col_part, "11");

        let (id, last) = &sink.records[7];
        assert_eq!(*id, 8);
        assert_eq!(last.row_part, "BB");
        assert_eq!(last.col_part, "12");

        assert_eq!(feedback.progress.first(), Some(&0.0));
        assert_eq!(feedback.progress.last(), Some(&87.5));
    }

    #[test]
    fn test_process_keeps_case_when_asked() {
        let source = grid_source();
        let mut sink = VecSink::default();

        let processor = GridIdentifierProcessor::new(ProcessorConfig {
            depth: 2,
            uppercase_rows: false,
            ..Default::default()
        });
        processor
            .process(&source, &mut sink, &mut LogFeedback::new())
            .unwrap();

        assert_eq!(sink.records[3].1.row_part, "bb");
    }

    #[test]
    fn test_process_stops_when_canceled() {
        let source = grid_source();
        let mut sink = VecSink::default();
        let mut feedback = RecordingFeedback {
            cancel_after: Some(3),
            ..Default::default()
        };

        let processor = GridIdentifierProcessor::new(ProcessorConfig::default());
        let summary = processor.process(&source, &mut sink, &mut feedback).unwrap();

        assert!(summary.canceled);
        assert_eq!(summary.written, 3);
        assert_eq!(sink.records.len(), 3);
    }

    #[test]
    fn test_process_honours_cancel_flag() {
        let source = grid_source();
        let mut sink = VecSink::default();
        let flag = Arc::new(AtomicBool::new(true));
        let mut feedback = LogFeedback::with_cancel_flag(flag.clone());

        let processor = GridIdentifierProcessor::new(ProcessorConfig::default());
        let summary = processor.process(&source, &mut sink, &mut feedback).unwrap();

        assert!(summary.canceled);
        assert!(sink.records.is_empty());
    }

    #[test]
    fn test_process_aborts_on_invalid_feature() {
        let mut source = grid_source();
        source.features[2].cell.right = source.features[2].cell.left;
        let mut sink = VecSink::default();

        let processor = GridIdentifierProcessor::new(ProcessorConfig::default());
        let err = processor
            .process(&source, &mut sink, &mut LogFeedback::new())
            .unwrap_err();

        assert!(err.to_string().contains("feature 3"));
        assert!(matches!(
            err.downcast_ref::<GridError>(),
            Some(GridError::InvalidCellGeometry { .. })
        ));
        assert_eq!(sink.records.len(), 2);
        assert!(!sink.finished);
    }

    #[test]
    fn test_process_skips_invalid_features() {
        let mut source = grid_source();
        source.features[2].cell.right = source.features[2].cell.left;
        source.features[5].id = 99;
        let mut sink = VecSink::default();

        let processor = GridIdentifierProcessor::new(ProcessorConfig {
            error_policy: ErrorPolicy::Skip,
            ..Default::default()
        });
        let summary = processor
            .process(&source, &mut sink, &mut LogFeedback::new())
            .unwrap();

        assert_eq!(summary.written, 6);
        assert_eq!(summary.skipped, 2);
        assert!(sink.records.iter().all(|(id, _)| *id != 3 && *id != 99));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let source = grid_source();

        let mut sequential = VecSink::default();
        GridIdentifierProcessor::new(ProcessorConfig {
            depth: 3,
            ..Default::default()
        })
        .process(&source, &mut sequential, &mut LogFeedback::new())
        .unwrap();

        let mut parallel = VecSink::default();
        GridIdentifierProcessor::new(ProcessorConfig {
            depth: 3,
            parallel: true,
            ..Default::default()
        })
        .process(&source, &mut parallel, &mut LogFeedback::new())
        .unwrap();

        assert_eq!(sequential.records, parallel.records);
    }

    #[test]
    fn test_process_empty_layer() {
        let mut source = grid_source();
        source.features.clear();
        let mut sink = VecSink::default();

        let summary = GridIdentifierProcessor::new(ProcessorConfig::default())
            .process(&source, &mut sink, &mut LogFeedback::new())
            .unwrap();

        assert_eq!(summary, ProcessSummary::default());
        assert!(sink.finished);
    }
}
