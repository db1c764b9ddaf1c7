#![doc = r#"
wxoa-rs

Client for the WeChat Official Account (公众号) API.

Every call fetches a fresh access_token from `/cgi-bin/stable_token`, attaches
it as the `access_token` query parameter and checks the `{errcode, errmsg}`
envelope of the response. Credentials are passed explicitly to every call;
nothing is cached.

Modules:
- credentials: credential fields, validation and the credential test request.
- token: `OaClient`, the unified `Error` and access_token acquisition.
- request: authenticated request dispatch.
- envelope: success/error decoding of provider responses.
- operation: host-facing resource operations (`auth:getAccessToken`).
- errors: errcode hints.

Quick usage:

```ignore
use wxoa_rs::{Credentials, OaClient, RequestOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = OaClient::default();
    let creds = Credentials::new("api.weixin.qq.com", "your_appid", "your_appsecret");

    let token = client.fetch_access_token(&creds).await?;
    println!("access_token length: {}", token.len());

    let info = client
        .dispatch(&creds, RequestOptions::get("/cgi-bin/user/info").query("openid", "OPENID"))
        .await?;
    println!("{info}");
    Ok(())
}
```
"#]

pub mod credentials;
pub mod envelope;
pub mod errors;
pub mod operation;
pub mod request;
pub mod token;

pub use credentials::{CredentialField, Credentials};
pub use envelope::Envelope;
pub use operation::{GetAccessToken, OperationRegistry, ResourceOperation};
pub use request::{RawResponse, RequestBody, RequestOptions};
pub use token::*;
