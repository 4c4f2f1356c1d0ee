pub mod cli;
pub mod config;
pub mod export;
pub mod fetch;
pub mod notify;
pub mod report;
pub mod store;
pub mod util;
pub mod watch;
