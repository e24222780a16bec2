// Ledger Sync - Core Library
// Links Notion transaction pages to their Month and Category pages.
// Exposes all modules for use in the daemon, the status server, and tests.

pub mod config;
pub mod error;
pub mod store;          // Record store seam: Notion client (+ in-memory store for tests)
pub mod records;        // Typed views over store records
pub mod registry;       // Category Name Registry
pub mod linker;         // Month Linker
pub mod categorizer;    // Category Linker
pub mod retry;          // Bounded retry per pass
pub mod report;         // Pass / tick reports
pub mod scheduler;      // Tick loop + status board

// Re-export commonly used types
pub use config::{Config, ConfigError, RetrySettings};
pub use error::{SyncError, SyncResult};
pub use store::{
    FieldAssignment, Filter, NotionClient, PropertyValue, Record, RecordStore,
};
pub use records::{CategoryRecord, MonthRecord, TransactionRecord};
pub use registry::CategoryNameRegistry;
pub use linker::MonthLinker;
pub use categorizer::CategoryLinker;
pub use retry::{RetryPolicy, RetryState};
pub use report::{PassOutcome, PassReport, TickReport};
pub use scheduler::{Scheduler, StatusBoard, SyncPass, SyncStatus};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Load the category registry named by the config, or the built-in one.
pub fn load_registry(config: &Config) -> anyhow::Result<CategoryNameRegistry> {
    match &config.category_names_file {
        Some(path) => CategoryNameRegistry::from_file(path),
        None => Ok(CategoryNameRegistry::with_defaults()),
    }
}

/// Build the scheduler the binaries run: Notion client, registry, passes.
pub fn build_scheduler(config: &Config) -> anyhow::Result<Scheduler> {
    let registry = load_registry(config)?;
    let client = NotionClient::new(config)?;
    tracing::info!(
        api = client.base_url(),
        categories = registry.len(),
        "Notion client ready"
    );

    Ok(Scheduler::from_config(config, std::sync::Arc::new(client), registry))
}
