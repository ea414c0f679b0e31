pub mod autosave;
pub mod checkout;
pub mod config;
pub mod draft;
pub mod error;
pub mod gateway;
pub mod models;
pub mod payment;
pub mod quote_request;
pub mod quote_selection;
pub mod shipment;
pub mod store;
pub mod theme;
pub mod tracking;
pub mod validation;
