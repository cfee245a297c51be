pub mod creator;
pub mod extractor;
pub mod matcher;
pub mod parser;

pub use creator::InvoiceService;
pub use extractor::{ExtractionService, ExtractionSummary};
pub use matcher::FuzzyMatcher;
pub use parser::InvoiceTextParser;
