//! Service abstractions shared between the session and booking crates.
//!
//! The remote-service traits in the other crates return [`BoxFuture`]s so they
//! stay object safe and can be swapped for in-memory mocks in tests.

use std::future::Future;
use std::pin::Pin;

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Source of the bearer credential attached to outbound requests.
///
/// The session manager is the only production implementation. The HTTP
/// transport reads the token per request and reports rejected credentials
/// back through [`CredentialProvider::invalidate`].
pub trait CredentialProvider: Send + Sync {
    /// The current bearer token, or `None` for anonymous requests.
    fn bearer_token(&self) -> Option<String>;

    /// Called when the server answered 401 to a request that carried
    /// `rejected`. The token may already have been replaced, so implementors
    /// must only drop it if it is still the current one.
    fn invalidate(&self, _rejected: &str) {}
}

/// A fixed token, handy for tools and tests that have no session.
#[derive(Debug, Clone, Default)]
pub struct StaticCredential(pub Option<String>);

impl CredentialProvider for StaticCredential {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}
