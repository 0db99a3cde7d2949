//! Expectations and the store that matches requests against them.
//!
//! ## Module Structure
//!
//! - `times`: Atomic usage counter
//! - `types`: Expectation record, actions and errors
//! - `store`: ExpectationStore registry and request log

mod store;
mod times;
mod types;

#[cfg(test)]
mod tests;

pub use store::{ExpectationStore, RecordedRequest, DEFAULT_LOG_CAPACITY};
pub use times::{Times, TimesState};
pub use types::{
    Action, Cookie, Delay, Expectation, ExpectationId, Header, HttpCallback, HttpForward,
    HttpResponse, ResponseBody, Scheme, StoreError, TimeUnit,
};
