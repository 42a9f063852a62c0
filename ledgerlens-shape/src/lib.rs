mod response;
mod validate;

pub use response::{ActionMapping, BatchAction, ClassificationResponse, FieldMappingResponse};
pub use validate::{validate_classification, validate_field_mapping};
