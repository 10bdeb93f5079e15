pub mod catalog_store;
pub mod notifier;
pub mod storage_service;
pub mod url_signer;
pub mod work_queue;
