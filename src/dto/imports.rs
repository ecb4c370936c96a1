use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    inventory::StockLine,
    models::{BookImport, BookImportDetail},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateImportRequest {
    pub lines: Vec<StockLine>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportWithDetails {
    pub receipt: BookImport,
    pub details: Vec<BookImportDetail>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportList {
    pub items: Vec<BookImport>,
}
