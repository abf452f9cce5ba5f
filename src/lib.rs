pub mod channel;
pub mod records;
pub mod source;
pub mod sqlite_source;
pub mod csv_source;
pub mod dedup;
pub mod mapping;
pub mod overhead;
pub mod config;
pub mod aggregate;
pub mod allocation;
pub mod cost;
pub mod error;
pub mod pipeline;
pub mod server;

pub use channel::{ChannelLabel, ChannelLabelError};
pub use records::{CustomerRecord, RecordId, SpendRecord, TouchpointRecord};
pub use source::{InMemoryRecordSource, RawRecord, RecordSource, SourceError, SourceName};
pub use sqlite_source::SqliteRecordSource;
pub use csv_source::CsvRecordSource;
pub use dedup::{dedup_first, union_dedup, UniqueKey};
pub use mapping::{AttributionMode, ChannelMapping};
pub use overhead::{OverheadEntry, OverheadTable};
pub use config::{ConfigError, ExtraSources, PipelineConfig, DEFAULT_INDIRECT_POOL};
pub use cost::{ChannelCostSummary, CostReport, CostTotals, SortKey};
pub use error::PipelineError;
pub use pipeline::{compute_channel_costs, load_inputs, run_pipeline, PipelineInputs};
pub use server::{run_server, ApiError, AppState, ServerConfig};
