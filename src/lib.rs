//! Scans a tree of purchase logs, extracts one record per purchase sentence,
//! aggregates them and renders a three-sheet workbook.
//!
//! The pipeline has three stages: [`dispatcher::WorkDispatcher::run`] fans
//! files out to a bounded pool and joins their record batches,
//! [`summary::summarize`] derives the counters, and [`report::write_report`]
//! publishes the workbook.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod extractor;
pub mod record;
pub mod report;
pub mod summary;

pub use config::RunConfiguration;
pub use dispatcher::{Dispatch, Notice, WorkDispatcher};
pub use error::{ConfigError, DispatchError, ExtractError, ReportError};
pub use extractor::RecordExtractor;
pub use record::{DeliveryStatus, InputFile, PurchaseRecord};
pub use report::{render, write_report, SheetBuffer, TabularSink, XlsxSink};
pub use summary::{summarize, AggregationStore};
