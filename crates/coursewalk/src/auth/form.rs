//! Username/password form login, recognized by page title.

use async_trait::async_trait;

use super::Authenticator;
use crate::driver::{script, PageDriver};
use crate::types::{CrawlError, CrawlResult};

/// Login form handler for SAML identity providers that render a plain
/// username/password form.
pub struct FormLoginAuthenticator {
    page_title: String,
    username: String,
    password: String,
    username_selector: String,
    password_selector: String,
    submit_selector: String,
}

impl FormLoginAuthenticator {
    pub fn new(
        page_title: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            page_title: page_title.into(),
            username: username.into(),
            password: password.into(),
            username_selector: "#username".to_string(),
            password_selector: "#password".to_string(),
            submit_selector: "#submitbutton".to_string(),
        }
    }

    async fn require(&self, driver: &mut dyn PageDriver, js: String, what: &str) -> CrawlResult<()> {
        match driver.evaluate(&js).await? {
            serde_json::Value::Bool(true) => Ok(()),
            _ => Err(CrawlError::Authentication(format!(
                "login form has no {what} element"
            ))),
        }
    }
}

#[async_trait]
impl Authenticator for FormLoginAuthenticator {
    fn name(&self) -> &str {
        "form-login"
    }

    async fn is_challenge(&self, driver: &mut dyn PageDriver) -> CrawlResult<bool> {
        Ok(driver.title().await? == self.page_title)
    }

    async fn resolve(&self, driver: &mut dyn PageDriver) -> CrawlResult<()> {
        let fill_user = script::fill(&self.username_selector, &self.username);
        self.require(driver, fill_user, "username").await?;
        let fill_pass = script::fill(&self.password_selector, &self.password);
        self.require(driver, fill_pass, "password").await?;
        let submit = script::click(&self.submit_selector);
        self.require(driver, submit, "submit").await?;
        driver.wait_for_load().await
    }
}
