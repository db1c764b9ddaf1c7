//! Fetch a stable access_token and test the credentials.
//!
//! Run:
//!   cargo run --example get_token
//!
//! Environment (a `.env` file is loaded when present):
//! - WX_APPID, WX_APPSECRET
//! - WX_OA_BASE_URL (optional, default api.weixin.qq.com)

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;
use wxoa_rs::{Credentials, OaClient, OperationRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let creds = Credentials::from_env().context("set WX_APPID and WX_APPSECRET")?;
    let client = OaClient::default();

    match client.test_credentials(&creds).await {
        Ok(()) => println!("[OK] credential test passed"),
        Err(e) => eprintln!("[WARN] credential test: {e}"),
    }

    let token = client.get_stable_token(&creds, false).await?;
    println!(
        "[OK] access_token: {}... (expires_in {}s)",
        token.access_token.chars().take(20).collect::<String>(),
        token.expires_in
    );

    let out = OperationRegistry::default()
        .execute("auth:getAccessToken", &client, &creds, 0)
        .await?;
    println!("[OK] auth:getAccessToken returned {} field(s)", out.as_object().map_or(0, |o| o.len()));

    Ok(())
}
