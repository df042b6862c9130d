//! Request authentication and access policy.
//!
//! - `token`: bearer token encoding/decoding and the `Caller` extractor
//! - `policy`: the single capability check every guarded route goes through

pub mod policy;
pub mod token;

pub use policy::{enforce, evaluate, Decision, Requirement};
pub use token::{issue_token, Caller, Claims, JwtKeys};
