pub mod encoder;
pub mod error;
pub mod model;
pub mod params;
pub mod parser;
pub mod processor;
pub mod writer;

pub use encoder::{build_identifier, decompose, resolve};
pub use error::GridError;
pub use model::{CellExtent, GridDimensions, GridFeature, GridPosition, Identifier, LayerExtent};
pub use params::{derive_grid_params, identify_feature};
pub use parser::{read_grid_csv, CsvFeatureSource};
pub use processor::{
    ErrorPolicy, FeatureSink, FeatureSource, Feedback, GridIdentifierProcessor, LogFeedback,
    ProcessSummary, ProcessorConfig,
};
pub use writer::{CsvFeatureSink, CsvOutputFile};
