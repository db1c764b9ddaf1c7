//! Call /cgi-bin/user/info with a freshly fetched token.
//!
//! Run:
//!   WX_OPENID=o... cargo run --example user_info

use std::env;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use wxoa_rs::{Credentials, OaClient, RequestOptions, errors};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    tracing_subscriber::fmt::init();

    let creds = Credentials::from_env()?;
    let openid = env::var("WX_OPENID").context("set WX_OPENID")?;

    let client = OaClient::default();
    let opts = RequestOptions::get("/cgi-bin/user/info")
        .query("openid", openid)
        .query("lang", "zh_CN");

    match client.dispatch(&creds, opts).await {
        Ok(info) => println!("{}", serde_json::to_string_pretty(&info)?),
        Err(e) => {
            eprintln!("[ERR] {e}");
            if let Some(code) = e.errcode() {
                eprintln!("      {}", errors::explain(code, &e.to_string()));
            }
        }
    }
    Ok(())
}
