//! `sdesk token`: mint an access token for local testing.

use anyhow::{Result, bail};
use console::style;

use stockdesk_core::repository::user::UserRepository;

use crate::state::AppContext;

/// Print a signed token for the account with `email`.
///
/// Pending or rejected clients still get a token; the gate refuses it at
/// connect time, which is what the auth service would do too.
pub async fn issue_token(ctx: &AppContext, email: &str, json: bool) -> Result<()> {
    let resolver = ctx.token_resolver()?;
    let Some(account) = resolver.users().get_by_email(email).await? else {
        bail!("no account with email '{email}'");
    };
    let token = resolver.issue_token(&account)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "access_token": token,
                "token_type": "bearer",
                "expires_in": ctx.config.jwt_expiration_secs,
            })
        );
    } else {
        eprintln!(
            "  {} Token for '{}' (expires in {}s):",
            style("🔑").bold(),
            style(&account.username).cyan(),
            ctx.config.jwt_expiration_secs
        );
        println!("{token}");
    }
    Ok(())
}
