use async_trait::async_trait;
use pgwire::api::auth::{AuthSource, LoginInfo, Password};
use pgwire::error::PgWireResult;
use tracing::debug;

/// One shared password for every login; the user name only selects the actor.
#[derive(Debug)]
pub struct LidoAuthSource {
    password: String,
}

impl LidoAuthSource {
    pub fn new(password: String) -> Self {
        Self { password }
    }
}

#[async_trait]
impl AuthSource for LidoAuthSource {
    async fn get_password(&self, login: &LoginInfo) -> PgWireResult<Password> {
        debug!(user = login.user().unwrap_or("<none>"), "password login");
        Ok(Password::new(None, self.password.as_bytes().to_vec()))
    }
}
