//! Email delivery: providers and the background worker that drains the queue.

mod factory;
mod provider;
mod sendgrid;
mod simulated;
mod worker;

pub use factory::create_email_provider;
pub use provider::{DeliveryError, EmailProvider, OutboundEmail};
pub use sendgrid::SendGridProvider;
pub use simulated::SimulatedProvider;
pub use worker::{DeliveryOutcome, DeliveryWorker, WorkerConfig};
