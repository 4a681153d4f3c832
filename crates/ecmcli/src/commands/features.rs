//! Feature binding command handlers.

use tabled::Tabled;

use ecmcli_api::client::API_PREFIX;
use ecmcli_api::models::{FeatureBinding, Router};

use crate::cli::{FeaturesArgs, FeaturesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;
use crate::session::Context;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Age")]
    age: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "TOS Accepted")]
    tos_accepted: String,
}

#[derive(Tabled)]
struct FeatureDetailRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Age")]
    age: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "TOS Accepted")]
    tos_accepted: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "Locked")]
    locked: String,
}

#[derive(Tabled)]
struct BoundRouterRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
}

fn check(flag: bool) -> String {
    if flag { "✓".into() } else { String::new() }
}

fn feature_field(b: &FeatureBinding, key: &str) -> String {
    b.feature
        .as_ref()
        .and_then(|f| f.field(key))
        .map(output::value_text)
        .unwrap_or_default()
}

impl From<&FeatureBinding> for FeatureRow {
    fn from(b: &FeatureBinding) -> Self {
        Self {
            id: b.id.clone(),
            name: b.feature_name(),
            age: b.created.map(output::time_since).unwrap_or_default(),
            category: feature_field(b, "category"),
            enabled: check(b.enabled),
            tos_accepted: check(b.tos_accepted),
        }
    }
}

impl From<&FeatureBinding> for FeatureDetailRow {
    fn from(b: &FeatureBinding) -> Self {
        let row = FeatureRow::from(b);
        Self {
            id: row.id,
            name: row.name,
            age: row.age,
            category: row.category,
            enabled: row.enabled,
            tos_accepted: row.tos_accepted,
            version: feature_field(b, "version"),
            account: b
                .account
                .as_ref()
                .and_then(|a| a.str_field("name"))
                .unwrap_or_default()
                .to_owned(),
            locked: check(b.locked),
        }
    }
}

impl From<&Router> for BoundRouterRow {
    fn from(r: &Router) -> Self {
        Self {
            id: r.id.clone(),
            name: r.name.clone(),
        }
    }
}

fn router_urn(router: &Router) -> String {
    router
        .resource_uri
        .clone()
        .unwrap_or_else(|| format!("{API_PREFIX}/routers/{}/", router.id))
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    ctx: &Context,
    args: FeaturesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let command = args.command.unwrap_or(FeaturesCommand::Ls {
        all: false,
        long: false,
    });
    match command {
        FeaturesCommand::Ls { all, long } => {
            let bindings = ctx.client.list_feature_bindings(all).await?;
            let out = if long {
                output::render_list(global.output, &bindings, FeatureDetailRow::from, |b| {
                    b.id.clone()
                })
            } else {
                output::render_list(global.output, &bindings, FeatureRow::from, |b| b.id.clone())
            };
            output::print_paged(&out, global.quiet, global.no_pager);
            Ok(())
        }

        FeaturesCommand::Rm { id, force } => {
            let binding = ctx.client.get_feature_binding(&id).await?;
            let label = util::label(&binding.feature_name(), &binding.id);
            let prompt = format!("Delete feature (binding): {label}");
            if !force && !util::confirm(&prompt, global.yes)? {
                return Err(CliError::Aborted);
            }
            ctx.client.delete_feature_binding(&binding.id).await?;
            if !global.quiet {
                eprintln!("✓ Feature binding deleted: {label}");
            }
            Ok(())
        }

        FeaturesCommand::Routers { id } => {
            let binding = ctx.client.get_feature_binding(&id).await?;
            let routers = ctx.client.feature_routers(&binding).await?;
            let out = output::render_list(global.output, &routers, BoundRouterRow::from, |r| {
                r.id.clone()
            });
            output::print_paged(&out, global.quiet, global.no_pager);
            Ok(())
        }

        FeaturesCommand::Addrouter { id, router } => {
            let binding = ctx.client.get_feature_binding(&id).await?;
            let router = ctx.client.get_router(&router).await?;
            ctx.client
                .add_feature_router(&binding.id, &router_urn(&router))
                .await?;
            if !global.quiet {
                eprintln!(
                    "✓ Router {} bound to {}",
                    util::label(&router.name, &router.id),
                    binding.feature_name()
                );
            }
            Ok(())
        }

        FeaturesCommand::Removerouter { id, router } => {
            let binding = ctx.client.get_feature_binding(&id).await?;
            let router = ctx.client.get_router(&router).await?;
            ctx.client
                .remove_feature_router(&binding.id, &router_urn(&router))
                .await?;
            if !global.quiet {
                eprintln!(
                    "✓ Router {} unbound from {}",
                    util::label(&router.name, &router.id),
                    binding.feature_name()
                );
            }
            Ok(())
        }
    }
}
