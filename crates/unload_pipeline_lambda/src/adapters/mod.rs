pub mod query_service;
pub mod warehouse;
