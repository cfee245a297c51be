pub mod catalog;
pub mod extracted;
pub mod invoice;
pub mod upload;

pub use catalog::{CatalogEntry, Item, MatchKind, Party};
pub use extracted::{ExtractedData, ExtractedItem};
pub use invoice::{CreatedInvoice, Invoice, InvoiceItem};
pub use upload::{OcrStatus, PartyType, UploadItem, UploadRecord};
