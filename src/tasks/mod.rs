//! Background tasks spawned next to the HTTP server.

mod maintenance;

pub use maintenance::MaintenanceTask;
