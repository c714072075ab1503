//! Fetch ABET accreditation pages and pull structured content out of them:
//! heading-delimited sections, accordion entries, and a few fixed fragments
//! (ordered outcome lists, HTML between two headings).

pub mod config;
pub mod error;
pub mod fetcher;
pub mod output;
pub mod parser;

pub use config::{
    BodyFormat, DuplicatePolicy, ExtractConfig, PreamblePolicy, RootPolicy, Settings,
};
pub use error::{FetchError, ParseError};
pub use fetcher::{fetch, Fetcher, Page, Target};
pub use parser::accordion::AccordionEntry;
pub use parser::sections::{Section, Sections};
pub use parser::{extract_accordion_items, extract_sections, Document};
