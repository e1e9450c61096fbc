pub mod access;
pub mod admin_service;
pub mod ledger;
pub mod scoring;
