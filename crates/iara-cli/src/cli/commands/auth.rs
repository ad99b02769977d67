//! Auth command handlers: login, register, logout.

use anyhow::{Context, Result};
use iara_core::config::Config;
use iara_core::gateway::ApiClient;
use iara_core::session::TokenStore;

pub async fn login(config: &Config, username: &str, password: &str) -> Result<()> {
    let base_url = config.resolve_api_base_url()?;
    let tokens = TokenStore::new();
    let api = ApiClient::new(base_url, tokens.clone());

    let token = api
        .login(username, password)
        .await
        .context("login failed")?;
    tokens.save(&token).context("store access token")?;

    tracing::info!("logged in as {username}");
    println!("Login realizado com sucesso.");
    Ok(())
}

pub async fn register(config: &Config, email: &str, password: &str) -> Result<()> {
    let base_url = config.resolve_api_base_url()?;
    let api = ApiClient::new(base_url, TokenStore::new());

    api.register(email, password)
        .await
        .context("registration failed")?;

    println!("Conta criada. Agora use `iara login` para entrar.");
    Ok(())
}

pub fn logout() -> Result<()> {
    TokenStore::new().clear();
    println!("Você saiu da sua conta.");
    Ok(())
}
