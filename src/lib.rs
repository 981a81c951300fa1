//! Records how much time people spend on career activities (applications, interviews, resume
//! building and training), keeps daily totals per person and builds day by day summaries.
//!

pub mod cli;
pub mod error;
pub mod storage;
pub mod tracker;
pub mod utils;
