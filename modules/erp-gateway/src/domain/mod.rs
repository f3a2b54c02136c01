pub mod customers;
pub mod deliveries;
pub mod error;
pub mod fields;
pub mod invoices;
pub mod models;
pub mod orders;
pub mod payments;
pub mod products;
pub mod service;
