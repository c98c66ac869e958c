//! Provider resolver implementations
//!
//! - [`EnvResolver`] - local environment variables (`@env:NAME`)
//! - [`DocumentResolver`] - remote JSON secret documents fetched through a
//!   [`SecretFetcher`](crate::SecretFetcher) and cached per path
//!
//! Concrete remote backends live in separate crates:
//!
//! - `aws` - AWS Secrets Manager (envsecrets-aws crate)

mod document;
mod env;

pub use document::DocumentResolver;
pub use env::EnvResolver;

pub(crate) use env::read_var;
