//! User command handlers.

use tabled::Tabled;

use ecmcli_api::models::User;
use ecmcli_api::record_id;

use crate::cli::{GlobalOpts, UsersArgs, UsersCommand};
use crate::error::CliError;
use crate::output;
use crate::session::{Context, prompt_err};

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Email")]
    email: String,
}

impl From<&User> for UserRow {
    fn from(u: &User) -> Self {
        Self {
            name: format!("{} ({})", u.full_name(), u.username),
            id: u.id.clone(),
            email: u.email.clone().unwrap_or_default(),
        }
    }
}

/// Ask twice for the new user's password.
fn prompt_new_password() -> Result<String, CliError> {
    let password = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
    let again = rpassword::prompt_password("Confirm password: ").map_err(prompt_err)?;
    if password != again {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "passwords do not match".into(),
        });
    }
    if password.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "password cannot be empty".into(),
        });
    }
    Ok(password)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: UsersArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command.unwrap_or(UsersCommand::Ls) {
        UsersCommand::Ls => {
            let users = ctx.client.list_users().await?;
            let out = output::render_list(global.output, &users, UserRow::from, |u| u.id.clone());
            output::print_paged(&out, global.quiet, global.no_pager);
            Ok(())
        }

        UsersCommand::Create {
            username,
            email,
            first_name,
            last_name,
            in_account,
        } => {
            let account_urn = util::account_urn(ctx, in_account.as_deref()).await?;
            let email = email.unwrap_or_else(|| username.clone());
            let password = prompt_new_password()?;
            let created = ctx
                .client
                .create_user(
                    &username,
                    &email,
                    &first_name,
                    &last_name,
                    &password,
                    &account_urn,
                )
                .await?;
            if !global.quiet {
                eprintln!("✓ User created: {}", util::label(&username, &record_id(&created)));
            }
            Ok(())
        }

        UsersCommand::Delete { user, force } => {
            let user = ctx.client.get_user(&user).await?;
            let label = format!("{} ({})", user.full_name(), user.username);
            if !force && !util::confirm(&format!("Delete user: {label}"), global.yes)? {
                return Err(CliError::Aborted);
            }
            ctx.client.delete_user(&user.id).await?;
            if !global.quiet {
                eprintln!("✓ User deleted: {label}");
            }
            Ok(())
        }
    }
}
