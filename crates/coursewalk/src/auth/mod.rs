//! Authentication gateway: an ordered chain of credential handlers.

mod form;

pub use form::FormLoginAuthenticator;

use async_trait::async_trait;

use crate::driver::PageDriver;
use crate::types::CrawlResult;

/// Recognizes one kind of authentication challenge and answers it.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;
    /// Whether the current page is a challenge this authenticator handles.
    async fn is_challenge(&self, driver: &mut dyn PageDriver) -> CrawlResult<bool>;
    /// Submit credentials on the current page.
    async fn resolve(&self, driver: &mut dyn PageDriver) -> CrawlResult<()>;
}

/// Chain of authenticators, evaluated in registration order.
#[derive(Default)]
pub struct AuthGateway {
    authenticators: Vec<Box<dyn Authenticator>>,
}

impl AuthGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration.
    pub fn with(mut self, auth: impl Authenticator + 'static) -> Self {
        self.add(auth);
        self
    }

    pub fn add(&mut self, auth: impl Authenticator + 'static) {
        self.authenticators.push(Box::new(auth));
    }

    /// Number of registered authenticators.
    pub fn len(&self) -> usize {
        self.authenticators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authenticators.is_empty()
    }

    /// Whether any registered authenticator recognizes the current page.
    pub async fn is_challenge(&self, driver: &mut dyn PageDriver) -> CrawlResult<bool> {
        for auth in &self.authenticators {
            if auth.is_challenge(driver).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Let the first matching authenticator resolve the current page.
    ///
    /// Returns the name of the authenticator that ran, or `None` if the page
    /// was not a challenge.
    pub async fn handle(&self, driver: &mut dyn PageDriver) -> CrawlResult<Option<String>> {
        for auth in &self.authenticators {
            if auth.is_challenge(driver).await? {
                tracing::info!("Login page detected, authenticating via {}", auth.name());
                auth.resolve(driver).await?;
                return Ok(Some(auth.name().to_string()));
            }
        }
        Ok(None)
    }
}
