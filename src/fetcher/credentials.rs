use std::env;

use async_trait::async_trait;

use crate::fetcher::{
    error::{FetchError, missing_api_key},
    types::CredentialRef,
};

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn resolve(&self, reference: &CredentialRef) -> Result<String, FetchError>;
}

#[derive(Default)]
pub struct EnvCredentialProvider;

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn resolve(&self, reference: &CredentialRef) -> Result<String, FetchError> {
        match reference {
            CredentialRef::Env { var } => match env::var(var) {
                Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
                _ => {
                    tracing::warn!(
                        target: "fetcher",
                        var = %var,
                        "api_key_env_missing"
                    );
                    Err(missing_api_key())
                }
            },
            CredentialRef::InlineToken { token } => {
                if token.trim().is_empty() {
                    return Err(missing_api_key());
                }
                Ok(token.trim().to_string())
            }
            CredentialRef::None => Err(missing_api_key()),
        }
    }
}
