//! Authorization and role command handlers.

use std::collections::BTreeMap;
use std::io::IsTerminal;

use dialoguer::Input;
use owo_colors::OwoColorize;
use serde_json::{Map, Value};
use tabled::Tabled;

use ecmcli_api::models::{Authorization, Related, Role};
use ecmcli_api::record_str;
use ecmcli_api::resources::{AuthorizationFilter, Beneficiary};

use crate::cli::{AuthorizationsArgs, AuthorizationsCommand, GlobalOpts, RolesCommand};
use crate::error::CliError;
use crate::output;
use crate::session::{Context, prompt_err};

use super::util;

const UNASSIGNED: &str = "<unassigned>";

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct AuthorizationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Beneficiary (user/token)")]
    beneficiary: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Rights on (account)")]
    rights_on: String,
    #[tabled(rename = "Inactive")]
    inactive: String,
}

#[derive(Tabled)]
struct AuthorizationDetailRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Beneficiary (user/token)")]
    beneficiary: String,
    #[tabled(rename = "Originating Account")]
    origin: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Rights on (account)")]
    rights_on: String,
    #[tabled(rename = "Cascades")]
    cascades: String,
    #[tabled(rename = "Inactive")]
    inactive: String,
}

#[derive(Tabled)]
struct RoleRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "GETs")]
    gets: usize,
    #[tabled(rename = "PUTs")]
    puts: usize,
    #[tabled(rename = "POSTs")]
    posts: usize,
    #[tabled(rename = "DELETEs")]
    deletes: usize,
    #[tabled(rename = "PATCHes")]
    patches: usize,
}

#[derive(Tabled)]
struct PermissionRow {
    #[tabled(rename = "API Resource")]
    resource: String,
    #[tabled(rename = "GET")]
    get: String,
    #[tabled(rename = "PUT")]
    put: String,
    #[tabled(rename = "POST")]
    post: String,
    #[tabled(rename = "DELETE")]
    delete: String,
    #[tabled(rename = "PATCH")]
    patch: String,
}

fn check(flag: bool) -> String {
    if flag { "✓".into() } else { String::new() }
}

/// Name of an expanded relation, or `(id)` when only the URN is known.
fn related_name(rel: Option<&Related>, key: &str) -> Option<String> {
    let rel = rel?;
    match rel.str_field(key) {
        Some(name) => Some(name.to_owned()),
        None => rel.id().map(|id| format!("({id})")),
    }
}

fn beneficiary(auth: &Authorization) -> String {
    related_name(auth.user.as_ref(), "username")
        .or_else(|| related_name(auth.securitytoken.as_ref(), "label"))
        .unwrap_or_else(|| UNASSIGNED.to_owned())
}

/// Account the user or token hails from.
fn origin(auth: &Authorization) -> String {
    let account = match (auth.user.as_ref(), auth.securitytoken.as_ref()) {
        (Some(user), _) => user.field("profile").and_then(|p| p.get("account")),
        (None, Some(token)) => token.field("account"),
        (None, None) => None,
    };
    match account {
        Some(Value::Object(obj)) => obj
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        Some(Value::String(urn)) => Related::Urn(urn.clone())
            .id()
            .map_or_else(|| UNASSIGNED.to_owned(), |id| format!("({id})")),
        _ => UNASSIGNED.to_owned(),
    }
}

impl From<&Authorization> for AuthorizationRow {
    fn from(a: &Authorization) -> Self {
        Self {
            id: a.id.clone(),
            beneficiary: beneficiary(a),
            role: related_name(a.role.as_ref(), "name").unwrap_or_default(),
            rights_on: related_name(a.account.as_ref(), "name").unwrap_or_default(),
            inactive: check(!a.active),
        }
    }
}

impl From<&Authorization> for AuthorizationDetailRow {
    fn from(a: &Authorization) -> Self {
        Self {
            id: a.id.clone(),
            beneficiary: beneficiary(a),
            origin: origin(a),
            role: related_name(a.role.as_ref(), "name").unwrap_or_default(),
            rights_on: related_name(a.account.as_ref(), "name").unwrap_or_default(),
            cascades: check(a.cascade),
            inactive: check(!a.active),
        }
    }
}

impl From<&Role> for RoleRow {
    fn from(r: &Role) -> Self {
        let count = |op: &str| {
            r.permissions
                .iter()
                .filter(|p| p.operation.eq_ignore_ascii_case(op))
                .count()
        };
        Self {
            id: r.id.clone(),
            name: r.name.clone(),
            gets: count("get"),
            puts: count("put"),
            posts: count("post"),
            deletes: count("delete"),
            patches: count("patch"),
        }
    }
}

/// `id [beneficiary -> account]` summary used in prompts.
fn summary(auth: &Authorization) -> String {
    format!(
        "{} [{} -> {}]",
        auth.id,
        beneficiary(auth),
        related_name(auth.account.as_ref(), "name").unwrap_or_default()
    )
}

fn method_cell(method: &str, color: bool) -> String {
    let text = method.to_uppercase();
    if !color {
        return text;
    }
    match method {
        "get" => text.green().to_string(),
        "put" | "post" | "patch" => text.magenta().to_string(),
        "delete" => text.red().to_string(),
        _ => text.yellow().to_string(),
    }
}

/// One row per API resource, keeping the requested resources and methods.
fn permission_rows(
    role: &Role,
    resources: &[String],
    methods: &[String],
    color: bool,
) -> Vec<PermissionRow> {
    let methods: Vec<String> = methods.iter().map(|m| m.to_lowercase()).collect();
    let mut by_resource: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for perm in &role.permissions {
        let op = perm.operation.to_lowercase();
        if !resources.is_empty() && !resources.iter().any(|r| *r == perm.subject) {
            continue;
        }
        if !methods.is_empty() && !methods.contains(&op) {
            continue;
        }
        by_resource.entry(perm.subject.as_str()).or_default().push(op);
    }
    by_resource
        .into_iter()
        .map(|(resource, ops)| {
            let cell = |m: &str| {
                if ops.iter().any(|op| op == m) {
                    method_cell(m, color)
                } else {
                    String::new()
                }
            };
            PermissionRow {
                resource: resource.to_owned(),
                get: cell("get"),
                put: cell("put"),
                post: cell("post"),
                delete: cell("delete"),
                patch: cell("patch"),
            }
        })
        .collect()
}

/// Flag value, or an interactive prompt for it.
fn value_or_prompt(value: Option<String>, prompt: &str) -> Result<String, CliError> {
    if let Some(value) = value {
        return Ok(value);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::Usage(format!("{prompt} required")));
    }
    Input::<String>::new()
        .with_prompt(prompt)
        .interact_text()
        .map_err(prompt_err)
}

async fn resolve_beneficiary(
    ctx: &Context,
    user: Option<String>,
    token: Option<String>,
    foreign: bool,
) -> Result<Beneficiary, CliError> {
    if foreign {
        let username = value_or_prompt(user, "Collaborator username")?;
        return Ok(Beneficiary::Foreign(username));
    }
    if let Some(token) = token {
        let token = ctx.client.get_security_token(&token).await?;
        return Ok(Beneficiary::Token(record_str(&token, "resource_uri").to_owned()));
    }
    let user = value_or_prompt(user, "Beneficiary username")?;
    let user = ctx.client.get_user(&user).await?;
    let urn = user.resource_uri.ok_or_else(|| CliError::Validation {
        field: "beneficiary-user".into(),
        reason: format!("user {} has no resource URI", user.id),
    })?;
    Ok(Beneficiary::User(urn))
}

async fn role_urn(ctx: &Context, ident: &str) -> Result<String, CliError> {
    let role = ctx.client.get_role(ident).await?;
    role.resource_uri.ok_or_else(|| CliError::Validation {
        field: "role".into(),
        reason: format!("role {} has no resource URI", role.id),
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    ctx: &Context,
    args: AuthorizationsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let command = args.command.unwrap_or(AuthorizationsCommand::Ls {
        beneficiary: None,
        role: None,
        rights_on: None,
        inactive: false,
        long: false,
    });
    match command {
        AuthorizationsCommand::Ls {
            beneficiary,
            role,
            rights_on,
            inactive,
            long,
        } => {
            let filter = AuthorizationFilter {
                beneficiary,
                role,
                rights_on,
                inactive,
            };
            let auths = ctx.client.list_authorizations(&filter).await?;
            let out = if long {
                output::render_list(global.output, &auths, AuthorizationDetailRow::from, |a| {
                    a.id.clone()
                })
            } else {
                output::render_list(global.output, &auths, AuthorizationRow::from, |a| a.id.clone())
            };
            output::print_paged(&out, global.quiet, global.no_pager);
            Ok(())
        }

        AuthorizationsCommand::Create {
            beneficiary_user,
            beneficiary_token,
            role,
            rights_on,
            no_cascade,
            foreign,
        } => {
            let beneficiary =
                resolve_beneficiary(ctx, beneficiary_user, beneficiary_token, foreign).await?;
            let role = value_or_prompt(role, "Role")?;
            let role = role_urn(ctx, &role).await?;
            let rights_on = value_or_prompt(rights_on, "Account (rights on)")?;
            let account = util::account_urn(ctx, Some(&rights_on)).await?;
            let created = ctx
                .client
                .create_authorization(&beneficiary, &role, &account, !no_cascade)
                .await?;
            if !global.quiet {
                eprintln!("✓ Authorization created: {}", ecmcli_api::record_id(&created));
            }
            Ok(())
        }

        AuthorizationsCommand::Edit {
            id,
            role,
            rights_on,
            cascade,
            no_cascade,
            activate,
            deactivate,
        } => {
            let auth = ctx.client.get_authorization(&id).await?;
            let mut changes = Map::new();
            if let Some(role) = role {
                changes.insert("role".into(), Value::String(role_urn(ctx, &role).await?));
            }
            if let Some(account) = rights_on {
                let urn = util::account_urn(ctx, Some(&account)).await?;
                changes.insert("account".into(), Value::String(urn));
            }
            if cascade || no_cascade {
                changes.insert("cascade".into(), Value::Bool(cascade));
            }
            if activate || deactivate {
                changes.insert("active".into(), Value::Bool(activate));
            }
            if changes.is_empty() {
                return Err(CliError::Usage("Nothing to change".into()));
            }
            ctx.client.edit_authorization(&auth.id, &changes).await?;
            if !global.quiet {
                eprintln!("✓ Authorization updated: {}", auth.id);
            }
            Ok(())
        }

        AuthorizationsCommand::Rm { ids, force } => {
            for id in ids {
                let auth = ctx.client.get_authorization(&id).await?;
                let label = summary(&auth);
                let prompt = format!("Delete authorization: {label}");
                if !force && !util::confirm(&prompt, global.yes)? {
                    return Err(CliError::Aborted);
                }
                ctx.client.delete_authorization(&auth.id).await?;
                if !global.quiet {
                    eprintln!("✓ Authorization deleted: {label}");
                }
            }
            Ok(())
        }

        AuthorizationsCommand::Roles { command } => match command.unwrap_or(RolesCommand::Ls) {
            RolesCommand::Ls => {
                let roles = ctx.client.list_roles().await?;
                let out =
                    output::render_list(global.output, &roles, RoleRow::from, |r| r.id.clone());
                output::print_paged(&out, global.quiet, global.no_pager);
                Ok(())
            }
            RolesCommand::Examine {
                role,
                resources,
                methods,
            } => {
                let role = ctx.client.get_role(&role).await?;
                let out = output::render_single(
                    global.output,
                    &role,
                    |r| {
                        let title = format!("Permissions for: {}", util::label(&r.name, &r.id));
                        let rows = permission_rows(r, &resources, &methods, ctx.color);
                        format!(
                            "{}\n{}",
                            output::bold(&title, ctx.color),
                            output::render_table(&rows)
                        )
                    },
                    |r| r.id.clone(),
                );
                output::print_paged(&out, global.quiet, global.no_pager);
                Ok(())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn auth(value: Value) -> Authorization {
        serde_json::from_value(value).expect("authorization")
    }

    #[test]
    fn beneficiary_prefers_user_then_token() {
        let by_user = auth(json!({
            "id": 1,
            "user": {"username": "ops", "profile": {"account": {"name": "Acme"}}},
            "account": {"name": "Branch"},
            "role": {"name": "Admin"},
            "cascade": true,
        }));
        assert_eq!(beneficiary(&by_user), "ops");
        assert_eq!(origin(&by_user), "Acme");
        let row = AuthorizationDetailRow::from(&by_user);
        assert_eq!(row.cascades, "✓");
        assert_eq!(row.inactive, "");

        let by_token = auth(json!({
            "id": 2,
            "securitytoken": {"label": "ci", "account": "/api/v1/accounts/9/"},
            "account": "/api/v1/accounts/9/",
            "active": false,
        }));
        assert_eq!(beneficiary(&by_token), "ci");
        assert_eq!(origin(&by_token), "(9)");
        assert_eq!(summary(&by_token), "2 [ci -> (9)]");
        assert_eq!(AuthorizationRow::from(&by_token).inactive, "✓");
    }

    #[test]
    fn unexpanded_user_shows_id() {
        let a = auth(json!({"id": 3, "user": "/api/v1/users/44/"}));
        assert_eq!(beneficiary(&a), "(44)");
        let empty = auth(json!({"id": 4}));
        assert_eq!(beneficiary(&empty), UNASSIGNED);
    }

    fn role() -> Role {
        serde_json::from_value(json!({
            "id": 5,
            "name": "Viewer",
            "permissions": [
                {"subject": "routers", "operation": "get"},
                {"subject": "routers", "operation": "put"},
                {"subject": "accounts", "operation": "get"},
            ]
        }))
        .expect("role")
    }

    #[test]
    fn role_row_counts_operations() {
        let row = RoleRow::from(&role());
        assert_eq!((row.gets, row.puts, row.posts), (2, 1, 0));
    }

    #[test]
    fn permission_rows_filter_and_sort() {
        let rows = permission_rows(&role(), &[], &[], false);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].resource, "accounts");
        assert_eq!(rows[1].put, "PUT");

        let rows = permission_rows(&role(), &[], &["PUT".into()], false);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get, "");

        let rows = permission_rows(&role(), &["accounts".into()], &[], false);
        assert_eq!(rows.len(), 1);
    }
}
