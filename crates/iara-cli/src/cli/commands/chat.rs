//! Chat command handler: wires the engine runtime to stdin/stdout.

use anyhow::{Context, Result};
use iara_core::config::Config;
use iara_core::gateway::ApiClient;
use iara_core::session::{Session, TokenStore};
use iara_engine::{EngineRuntime, EngineState};

use crate::ui;

pub async fn run(config: &Config, guest: bool, compact: bool) -> Result<()> {
    let base_url = config.resolve_api_base_url()?;
    let tokens = TokenStore::new();
    let session = Session::from_store(&tokens, guest);
    let api = ApiClient::new(base_url, tokens);

    let state = EngineState::new(config.clone(), session, compact);
    let runtime = EngineRuntime::new(state, api);

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    ui::chat::run_chat(stdin.lock(), &mut stdout, runtime)
        .await
        .context("chat loop failed")
}
