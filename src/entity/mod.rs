pub mod audit_logs;
pub mod book_import_details;
pub mod book_imports;
pub mod books;
pub mod categories;
pub mod order_details;
pub mod orders;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use book_import_details::Entity as BookImportDetails;
pub use book_imports::Entity as BookImports;
pub use books::Entity as Books;
pub use categories::Entity as Categories;
pub use order_details::Entity as OrderDetails;
pub use orders::Entity as Orders;
pub use users::Entity as Users;
