//! Request matching primitives.
//!
//! # Module Structure
//!
//! - `token` - Negatable, case-insensitive, regex-aware string values
//! - `multimap` - Ordered multi-valued map keyed by tokens
//! - `body` - Body matching (exact, regex, JSON, form parameters)
//! - `request` - Request representation and field-by-field matching

mod body;
mod multimap;
mod request;
mod token;

pub use body::{parse_form, BodyMatcher, JsonMatchType};
pub use multimap::{Entry, MatchingMap, MatchingMapError};
pub use request::{HttpRequest, RequestMatcher};
pub use token::{strings, Token};
