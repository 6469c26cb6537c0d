//! Application layer - use cases and orchestration.
//!
//! This layer contains format migration, the import merge and the
//! exporters, written against the collaborator traits of the domain layer.

pub mod cleaner;
pub mod exporter;
pub mod formatter;
pub mod importer;
pub mod migration;

pub use exporter::{write_data_export, write_markdown_export};
pub use formatter::{
    format_conversations_json, format_conversations_table, format_import_summary, format_status,
    OutputFormat, StoreSummary,
};
pub use importer::{clear_conversations, import_data, ImportOptions};
pub use migration::SupportedExport;
