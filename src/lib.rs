//! Client-side data access for a project management backend.
//!
//! All data lives in a hosted record store reached through a [`gateway::RecordGateway`].
//! [`ApiClient`] translates between the backend records and the application types
//! for clients, projects, tasks and invoices, tracks time on tasks,
//! guards invoice status changes and assembles the dashboard summary.

pub mod api_client;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod gateway;
pub mod mapping;
pub mod time_tracking;
pub mod types;

mod clients;
mod invoices;
mod projects;
mod tasks;

pub use api_client::ApiClient;
pub use error::{Error, Result};
pub use invoices::parse_payment_date;
pub use tasks::encode_time_tracking;
