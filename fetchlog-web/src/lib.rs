//! Page scraping: HTML extraction and the scrape pipeline.
//!
//! - Title, first heading and a capped, deduplicated, absolute link list
//!   (`extract`)
//! - `PageExtract` document and the `ScrapeOutcome` union (`page`)
//! - `Scraper`, which drives one bounded acquisition per call (`pipeline`)

pub mod extract;
pub mod page;
pub mod pipeline;

pub use extract::{Extracted, LinkEntry, clean_text, extract};
pub use page::{PageExtract, ScrapeOutcome};
pub use pipeline::Scraper;
