//! Send requests, send records and the delivery dashboard.
//!
//! A send request is validated and rendered synchronously, stored as a
//! `SendRecord` in the `queued` state and handed to the delivery queue. From
//! then on only the delivery worker changes the record:
//!
//! ```text
//! queued -> pending -> sent
//!                   -> failed
//! ```

mod postgres_store;
mod service;
mod store;
mod types;

pub use postgres_store::PostgresSendRecordRepository;
pub use service::EmailService;
pub use store::{MemorySendRecordRepository, SendRecordRepository};
pub use types::{
    EmailStats, LogFilter, LogPage, LogQuery, Pagination, SendEmailRequest, SendEmailResponse,
    SendRecord, SendStatus, StatusCounts, DEFAULT_PAGE_SIZE, DEFAULT_RECENT_LIMIT, MAX_PAGE_SIZE,
};
