#![forbid(unsafe_code)]

pub mod import;
pub mod model;
pub mod time;

pub use import::{ParseError, ParseErrorReason, ParseOutcome, parse};
pub use time::{Clock, SessionClock};
