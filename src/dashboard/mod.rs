// akeno-admin/src/dashboard/mod.rs
pub mod controller;
pub mod events;
pub mod poller;
pub mod sources;

pub use controller::{DashboardController, DashboardPhase, PURGE_CONFIRMATION};
pub use events::{DataChanged, DataEvents};
pub use poller::{LoadMode, LoadPhase, PollHandle, RefreshLoop, RefreshSource, ViewState};
