//! MEDONE Session Gate - client-side session checks for the MEDONE dashboard
//!
//! This library provides the authentication gate every MEDONE page runs on load
//! and on a timer, together with the storage ports and page runtime around it.

pub mod clock;
pub mod config;
pub mod lifecycle;
pub mod page;
pub mod session;
pub mod storage;
pub mod types;
