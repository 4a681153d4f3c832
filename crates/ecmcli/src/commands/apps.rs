//! Router SDK application command handlers.

use serde_json::Value;
use tabled::Tabled;

use ecmcli_api::models::{AppDeploy, AppVersion, Router};
use ecmcli_api::resources::AppIdent;
use ecmcli_api::{record_id, record_str};

use crate::cli::{AppsArgs, AppsCommand, DeploysCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;
use crate::session::Context;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct AppRow {
    #[tabled(rename = "Version ID")]
    id: String,
    #[tabled(rename = "App ID")]
    app_id: String,
    #[tabled(rename = "App Ident")]
    ident: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "State")]
    state: String,
}

#[derive(Tabled)]
struct DeployRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "App Ident")]
    ident: String,
}

fn ago(ts: Option<chrono::DateTime<chrono::Utc>>) -> String {
    ts.map(|t| format!("{} ago", output::time_since(t)))
        .unwrap_or_default()
}

impl From<&AppVersion> for AppRow {
    fn from(a: &AppVersion) -> Self {
        Self {
            id: a.id.clone(),
            app_id: a.app.as_ref().and_then(|r| r.id()).unwrap_or_default(),
            ident: a.ident(),
            created: ago(a.created_at),
            state: a.state.clone(),
        }
    }
}

impl From<&AppDeploy> for DeployRow {
    fn from(d: &AppDeploy) -> Self {
        let ident = d
            .app_version
            .clone()
            .and_then(|v| serde_json::from_value::<AppVersion>(v).ok())
            .map(|v| v.ident())
            .unwrap_or_default();
        Self {
            id: d.id.clone(),
            created: ago(d.created_at),
            group: d
                .group
                .as_ref()
                .and_then(|g| g.str_field("name"))
                .unwrap_or_default()
                .to_owned(),
            ident,
        }
    }
}

fn app_field(app: &AppVersion, key: &str) -> String {
    app.app
        .as_ref()
        .and_then(|a| a.field(key))
        .map(output::value_text)
        .unwrap_or_default()
}

fn names(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| record_str(v, "name"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn detail(app: &AppVersion, routers: &[Router]) -> String {
    let groups = match app.groups.as_ref() {
        Some(Value::Array(groups)) => names(groups),
        _ => String::new(),
    };
    let state = match app.state_details.as_deref() {
        Some(details) if !details.is_empty() => format!("{} {details}", app.state),
        _ => app.state.clone(),
    };
    let fields: Vec<(&str, String)> = vec![
        ("Version ID", app.id.clone()),
        ("App ID", app_field(app, "id")),
        ("Name", app_field(app, "name")),
        ("UUID", app_field(app, "uuid")),
        ("Description", app_field(app, "description")),
        ("Version", format!("{}.{}", app.major_version, app.minor_version)),
        (
            "Account",
            app.account
                .as_ref()
                .and_then(|a| a.str_field("name"))
                .unwrap_or_default()
                .to_owned(),
        ),
        ("Created", output::format_ts(app.created_at)),
        ("Updated", output::format_ts(app.updated_at)),
        ("State", state),
        ("Groups", groups),
        (
            "Routers",
            routers
                .iter()
                .map(|r| r.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        ),
    ];
    let width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0) + 2;
    let mut lines = vec![format!("{}:", app.ident())];
    lines.extend(
        fields
            .into_iter()
            .map(|(k, v)| format!("    {k:<width$}: {v}")),
    );
    lines.join("\n")
}

async fn find_app(ctx: &Context, ident: &str) -> Result<AppVersion, CliError> {
    let ident: AppIdent = ident.parse()?;
    Ok(ctx.client.get_app_version(&ident).await?)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: AppsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command.unwrap_or(AppsCommand::Ls) {
        AppsCommand::Ls => {
            let apps = ctx.client.list_app_versions().await?;
            let out = output::render_list(global.output, &apps, AppRow::from, |a| a.id.clone());
            output::print_paged(&out, global.quiet, global.no_pager);
            Ok(())
        }

        AppsCommand::Examine { app } => {
            let app = find_app(ctx, &app).await?;
            let routers = ctx.client.app_routers(&app).await?;
            let out = output::render_single(
                global.output,
                &app,
                |a| detail(a, &routers),
                |a| a.id.clone(),
            );
            output::print_paged(&out, global.quiet, global.no_pager);
            Ok(())
        }

        AppsCommand::Upload { package } => {
            let bytes = std::fs::read(&package)?;
            let file_name = package
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "package.tar.gz".into());
            let app = ctx.client.upload_app(&file_name, &bytes).await?;
            if !global.quiet {
                let state = app.state.to_uppercase();
                if app.state == "ready" {
                    eprintln!("✓ {}: {}", app.ident(), output::success(&state, ctx.color));
                } else {
                    eprintln!("{}: {state}", app.ident());
                    if let Some(details) = app.state_details.as_deref() {
                        eprintln!("{details}");
                    }
                }
            }
            Ok(())
        }

        AppsCommand::Rm { app, force } => {
            let version = find_app(ctx, &app).await?;
            let prompt = format!("Delete {app} ({})", version.id);
            if !force && !util::confirm(&prompt, global.yes)? {
                return Err(CliError::Aborted);
            }
            ctx.client.delete_app_version(&version.id).await?;
            if !global.quiet {
                eprintln!("✓ App version deleted: {app}");
            }
            Ok(())
        }

        AppsCommand::Deploys { command } => deploys(ctx, command, global).await,
    }
}

async fn deploys(
    ctx: &Context,
    command: Option<DeploysCommand>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match command.unwrap_or(DeploysCommand::Ls) {
        DeploysCommand::Ls => {
            let deploys = ctx.client.list_app_deploys().await?;
            let out =
                output::render_list(global.output, &deploys, DeployRow::from, |d| d.id.clone());
            output::print_paged(&out, global.quiet, global.no_pager);
            Ok(())
        }

        DeploysCommand::Install { app, group } => {
            let version = find_app(ctx, &app).await?;
            let group = ctx.client.get_by_id_or_name("groups", &group).await?;
            let urn = version.resource_uri.clone().ok_or_else(|| CliError::Validation {
                field: "app".into(),
                reason: format!("app version {} has no resource URI", version.id),
            })?;
            ctx.client.install_app(&urn, &group).await?;
            if !global.quiet {
                eprintln!(
                    "✓ {app} installed on {}",
                    util::label(record_str(&group, "name"), &record_id(&group))
                );
            }
            Ok(())
        }

        DeploysCommand::Rm {
            deploy_id,
            app_ident,
            group,
            force,
        } => {
            let ids = match (deploy_id, app_ident) {
                (Some(id), _) => vec![id],
                (None, Some(app)) => {
                    let version = find_app(ctx, &app).await?;
                    let group_id = match group.as_deref() {
                        Some(ident) => {
                            let group = ctx.client.get_by_id_or_name("groups", ident).await?;
                            Some(record_id(&group))
                        }
                        None => None,
                    };
                    let found = ctx
                        .client
                        .find_app_deploys(&version.id, group_id.as_deref())
                        .await?;
                    if found.is_empty() {
                        return Err(CliError::Usage("No deploys to remove".into()));
                    }
                    found.into_iter().map(|d| d.id).collect()
                }
                (None, None) => {
                    return Err(CliError::Usage(
                        "--deploy-id or --app-ident required".into(),
                    ));
                }
            };
            let prompt = format!("Delete {}", ids.join(", "));
            if !force && !util::confirm(&prompt, global.yes)? {
                return Err(CliError::Aborted);
            }
            for id in &ids {
                ctx.client.delete_app_deploy(id).await?;
            }
            if !global.quiet {
                eprintln!("✓ Removed {} deploy(s)", ids.len());
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn app() -> AppVersion {
        serde_json::from_value(json!({
            "id": 12,
            "major_version": 0,
            "minor_version": 3,
            "state": "error",
            "state_details": "bad manifest",
            "app": {"id": 4, "name": "hello", "uuid": "u-1"},
            "account": {"name": "Acme"},
            "groups": [{"name": "east"}, {"name": "west"}],
        }))
        .expect("app")
    }

    #[test]
    fn row_shows_ident_and_app_id() {
        let row = AppRow::from(&app());
        assert_eq!(row.ident, "hello:0.3");
        assert_eq!(row.app_id, "4");
        assert_eq!(row.state, "error");
    }

    #[test]
    fn detail_lists_groups_routers_and_state() {
        let router: Router =
            serde_json::from_value(json!({"id": 1, "name": "hq"})).expect("router");
        let text = detail(&app(), &[router]);
        assert!(text.starts_with("hello:0.3:"));
        assert!(text.contains("east, west"));
        assert!(text.contains("error bad manifest"));
        assert!(text.contains(": hq"));
    }

    #[test]
    fn deploy_row_reads_nested_version() {
        let deploy: AppDeploy = serde_json::from_value(json!({
            "id": 8,
            "group": {"name": "east"},
            "app_version": {
                "id": 12, "major_version": 1, "minor_version": 0,
                "app": {"name": "hello"}
            },
        }))
        .expect("deploy");
        let row = DeployRow::from(&deploy);
        assert_eq!(row.group, "east");
        assert_eq!(row.ident, "hello:1.0");
    }
}
