//! Account management CLI commands: create, approve, reject, list.
//!
//! These seed the user store for local runs; in a full deployment the auth
//! service owns registration.

use anyhow::{Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use stockdesk_core::repository::user::UserRepository;
use stockdesk_types::identity::{ApprovalStatus, NewUserAccount, Role, UserAccount};

use crate::state::AppContext;

/// Create an account.
///
/// Admins are always created approved; clients start pending unless
/// `approved` is set.
pub async fn create_user(
    ctx: &AppContext,
    email: &str,
    username: &str,
    role: Role,
    approved: bool,
    json: bool,
) -> Result<()> {
    let approval_status = if approved || role == Role::Admin {
        ApprovalStatus::Approved
    } else {
        ApprovalStatus::Pending
    };

    let account = ctx
        .users
        .create(&NewUserAccount {
            email: email.to_string(),
            username: username.to_string(),
            role,
            approval_status,
        })
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&account)?);
    } else {
        println!(
            "  {} Created {} '{}' (id {}, {})",
            style("✓").green().bold(),
            account.role,
            style(&account.username).cyan(),
            account.id,
            status_label(account.approval_status)
        );
    }
    Ok(())
}

/// Set the approval status of the account with `email`.
pub async fn set_approval(
    ctx: &AppContext,
    email: &str,
    status: ApprovalStatus,
    json: bool,
) -> Result<()> {
    let Some(account) = ctx.users.get_by_email(email).await? else {
        bail!("no account with email '{email}'");
    };
    if account.role == Role::Admin {
        bail!("'{email}' is an admin; approval only applies to clients");
    }

    ctx.users.set_approval(account.id, status).await?;
    tracing::info!(user_id = %account.id, %status, "approval status changed");

    if json {
        println!(
            "{}",
            serde_json::json!({"id": account.id, "email": email, "approval_status": status})
        );
    } else {
        println!(
            "  {} '{}' is now {}",
            style("✓").green().bold(),
            style(&account.username).cyan(),
            status_label(status)
        );
    }
    Ok(())
}

/// List all accounts.
pub async fn list_users(ctx: &AppContext, json: bool) -> Result<()> {
    let accounts = ctx.users.list_all().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&accounts)?);
        return Ok(());
    }

    if accounts.is_empty() {
        println!();
        println!(
            "  {} No accounts yet. Add one with: {}",
            style("i").blue().bold(),
            style("sdesk user create admin@example.com admin --role admin").yellow()
        );
        println!();
        return Ok(());
    }

    println!();
    println!("{}", accounts_table(&accounts));
    println!();
    println!(
        "  {} account{}",
        style(accounts.len()).bold(),
        if accounts.len() == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}

fn accounts_table(accounts: &[UserAccount]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Username").fg(Color::White),
        Cell::new("Email").fg(Color::White),
        Cell::new("Role").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Created").fg(Color::White),
    ]);

    for account in accounts {
        let status_color = match account.approval_status {
            ApprovalStatus::Approved => Color::Green,
            ApprovalStatus::Pending => Color::Yellow,
            ApprovalStatus::Rejected => Color::Red,
        };
        table.add_row(vec![
            Cell::new(account.id),
            Cell::new(&account.username).fg(Color::Cyan),
            Cell::new(&account.email),
            Cell::new(account.role),
            Cell::new(account.approval_status).fg(status_color),
            Cell::new(account.created_at.format("%Y-%m-%d").to_string()).fg(Color::DarkGrey),
        ]);
    }
    table
}

fn status_label(status: ApprovalStatus) -> String {
    match status {
        ApprovalStatus::Approved => style("approved").green().to_string(),
        ApprovalStatus::Pending => style("pending").yellow().to_string(),
        ApprovalStatus::Rejected => style("rejected").red().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stockdesk_types::identity::UserId;

    #[test]
    fn table_lists_every_account() {
        let accounts = vec![
            UserAccount {
                id: UserId(1),
                email: "a@example.com".to_string(),
                username: "alice".to_string(),
                role: Role::Admin,
                approval_status: ApprovalStatus::Approved,
                created_at: Utc::now(),
            },
            UserAccount {
                id: UserId(2),
                email: "b@example.com".to_string(),
                username: "bob".to_string(),
                role: Role::Client,
                approval_status: ApprovalStatus::Pending,
                created_at: Utc::now(),
            },
        ];
        let rendered = accounts_table(&accounts).to_string();
        assert!(rendered.contains("alice"));
        assert!(rendered.contains("b@example.com"));
        assert!(rendered.contains("pending"));
    }
}
