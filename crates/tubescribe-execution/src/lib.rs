//! Execution layer: hosts the extension contexts in one process and sets up
//! logging.

pub mod logging;
pub mod runtime;
pub mod scraper;
pub mod tracing_layer;

pub use logging::init_tracing;
pub use runtime::{BrowserEvent, ExtensionRuntime, Navigation, RuntimeLink};
pub use scraper::{FixtureScraper, TranscriptLibrary};
pub use tracing_layer::{LogHistory, LogHistoryLayer, LogRecord};
