pub mod health_handlers;
pub mod import_handlers;
pub mod object_handlers;
pub mod product_handlers;
