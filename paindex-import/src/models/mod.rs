//! Domain model types for the import service

mod batch;
mod blog;
mod clinic;
mod service;

pub use batch::{BlogImportBatch, ImportBatch, Redirect};
pub use blog::{BlogCategory, BlogPost, BlogTag};
pub use clinic::{ClinicEntity, ClinicPatch, TransformedClinicRecord};
pub use service::{Service, ServiceCategory};
