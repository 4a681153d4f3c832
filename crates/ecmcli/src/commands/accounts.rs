//! Account command handlers.

use std::collections::{HashMap, HashSet};

use futures_util::{StreamExt, stream};
use tabled::Tabled;

use ecmcli_api::client::API_PREFIX;
use ecmcli_api::models::Account;
use ecmcli_api::{AccountCounts, Query, record_id};

use crate::cli::{AccountsArgs, AccountsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, TreeNode};
use crate::session::Context;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct AccountRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
}

#[derive(Tabled)]
struct AccountCountsRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Routers")]
    routers: u64,
    #[tabled(rename = "Groups")]
    groups: u64,
    #[tabled(rename = "Users")]
    users: u64,
    #[tabled(rename = "Subaccounts")]
    subaccounts: u64,
}

impl From<&Account> for AccountRow {
    fn from(a: &Account) -> Self {
        Self {
            id: a.id.clone(),
            name: a.name.clone(),
        }
    }
}

impl From<&(Account, AccountCounts)> for AccountCountsRow {
    fn from((a, c): &(Account, AccountCounts)) -> Self {
        Self {
            id: a.id.clone(),
            name: a.name.clone(),
            routers: c.routers,
            groups: c.groups,
            users: c.users,
            subaccounts: c.subaccounts,
        }
    }
}

// ── Labels & tree ───────────────────────────────────────────────────

fn terse_label(a: &Account) -> String {
    format!("{} (id:{})", a.name, a.id)
}

fn verbose_label(a: &Account, c: &AccountCounts) -> String {
    format!(
        "{} (id:{}, routers:{} groups:{}, users:{}, subaccounts:{})",
        a.name, a.id, c.routers, c.groups, c.users, c.subaccounts
    )
}

/// Arrange accounts into a forest keyed on the parent `account` URN.
///
/// With `root` set, the forest is the single subtree under that account.
/// Otherwise every account whose parent is not in the set is a root.
/// Siblings are sorted by name.
fn build_tree(
    accounts: &[Account],
    root: Option<&str>,
    label: &impl Fn(&Account) -> String,
) -> Vec<TreeNode> {
    let known: HashSet<&str> = accounts.iter().map(|a| a.resource_uri.as_str()).collect();
    let mut children: HashMap<&str, Vec<&Account>> = HashMap::new();
    let mut roots: Vec<&Account> = Vec::new();
    for account in accounts {
        match account.account.as_deref() {
            Some(parent) if known.contains(parent) => {
                children.entry(parent).or_default().push(account);
            }
            _ => roots.push(account),
        }
    }
    if let Some(root) = root {
        roots = accounts.iter().filter(|a| a.resource_uri == root).collect();
    }
    roots.sort_by(|a, b| a.name.cmp(&b.name));
    roots
        .into_iter()
        .map(|a| subtree(a, &children, label))
        .collect()
}

/// Default tree root: the account the session is scoped to, if any.
fn scope_root(scope: Option<&str>) -> Option<String> {
    scope.map(|id| format!("{API_PREFIX}/accounts/{id}/"))
}

fn subtree(
    account: &Account,
    children: &HashMap<&str, Vec<&Account>>,
    label: &impl Fn(&Account) -> String,
) -> TreeNode {
    let mut node = TreeNode::new(label(account));
    if let Some(kids) = children.get(account.resource_uri.as_str()) {
        let mut kids = kids.clone();
        kids.sort_by(|a, b| a.name.cmp(&b.name));
        node.children = kids
            .into_iter()
            .map(|kid| subtree(kid, children, label))
            .collect();
    }
    node
}

fn flatten_labels(nodes: &[TreeNode], out: &mut Vec<String>) {
    for node in nodes {
        out.push(node.label.clone());
        flatten_labels(&node.children, out);
    }
}

/// Counts for many accounts, fetched concurrently in input order.
async fn counts_for(
    ctx: &Context,
    accounts: &[Account],
) -> Result<HashMap<String, AccountCounts>, CliError> {
    let client = &ctx.client;
    let fetched: Vec<Result<(String, AccountCounts), ecmcli_api::Error>> =
        stream::iter(accounts)
            .map(|a| async move {
                let counts = client.account_counts(a).await?;
                Ok::<_, ecmcli_api::Error>((a.id.clone(), counts))
            })
            .buffered(ctx.settings.concurrency)
            .collect()
            .await;
    let mut counts = HashMap::new();
    for entry in fetched {
        let (id, c) = entry?;
        counts.insert(id, c);
    }
    Ok(counts)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: AccountsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let command = args.command.unwrap_or(AccountsCommand::Ls {
        account: None,
        long: false,
    });
    match command {
        AccountsCommand::Ls { account, long } => {
            let accounts = ctx.client.list_accounts().await?;
            let root = match account.as_deref() {
                Some(ident) => Some(ctx.client.get_account(ident).await?.resource_uri),
                None => scope_root(ctx.client.parent_account().as_deref()),
            };
            let forest = if long {
                let counts = counts_for(ctx, &accounts).await?;
                build_tree(&accounts, root.as_deref(), &|a: &Account| {
                    verbose_label(a, &counts.get(&a.id).copied().unwrap_or_default())
                })
            } else {
                build_tree(&accounts, root.as_deref(), &terse_label)
            };
            let out = output::render_single(
                global.output,
                forest.as_slice(),
                output::render_tree,
                |nodes| {
                    let mut labels = Vec::new();
                    flatten_labels(nodes, &mut labels);
                    labels.join("\n")
                },
            );
            output::print_paged(&out, global.quiet, global.no_pager);
            Ok(())
        }

        AccountsCommand::Create { name, parent } => {
            let parent_urn = match parent.as_deref() {
                Some(ident) => Some(ctx.client.get_account(ident).await?.resource_uri),
                None => None,
            };
            let created = ctx.client.create_account(&name, parent_urn.as_deref()).await?;
            if !global.quiet {
                eprintln!("✓ Account created: {}", util::label(&name, &record_id(&created)));
            }
            Ok(())
        }

        AccountsCommand::Delete { account, force } => {
            let account = ctx.client.get_account(&account).await?;
            if !force {
                let counts = ctx.client.account_counts(&account).await?;
                let prompt = format!("Delete account: {}", verbose_label(&account, &counts));
                if !util::confirm(&prompt, global.yes)? {
                    return Err(CliError::Aborted);
                }
            }
            ctx.client.delete_account(&account.id).await?;
            if !global.quiet {
                eprintln!("✓ Account deleted: {}", terse_label(&account));
            }
            Ok(())
        }

        AccountsCommand::Move {
            account,
            new_parent,
        } => {
            let account = ctx.client.get_account(&account).await?;
            let parent = ctx.client.get_account(&new_parent).await?;
            ctx.client
                .move_account(&account.id, &parent.resource_uri)
                .await?;
            if !global.quiet {
                eprintln!("✓ Moved {} under {}", terse_label(&account), terse_label(&parent));
            }
            Ok(())
        }

        AccountsCommand::Rename { account, new_name } => {
            let account = ctx.client.get_account(&account).await?;
            ctx.client.rename_account(&account.id, &new_name).await?;
            if !global.quiet {
                eprintln!("✓ Renamed {} to {new_name}", terse_label(&account));
            }
            Ok(())
        }

        AccountsCommand::Search { criteria, long } => {
            let mut found: Vec<Account> = Vec::new();
            for needle in &criteria {
                let hits = ctx
                    .client
                    .search("accounts", &["name"], needle, Query::new())
                    .await?;
                for hit in hits {
                    let account: Account = serde_json::from_value(hit)?;
                    if !found.iter().any(|a| a.id == account.id) {
                        found.push(account);
                    }
                }
            }
            let out = if long {
                let counts = counts_for(ctx, &found).await?;
                let rows: Vec<(Account, AccountCounts)> = found
                    .into_iter()
                    .map(|a| {
                        let c = counts.get(&a.id).copied().unwrap_or_default();
                        (a, c)
                    })
                    .collect();
                output::render_list(
                    global.output,
                    &rows,
                    AccountCountsRow::from,
                    |(a, _)| a.id.clone(),
                )
            } else {
                output::render_list(global.output, &found, AccountRow::from, |a| a.id.clone())
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn account(id: u32, name: &str, parent: Option<u32>) -> Account {
        serde_json::from_value(json!({
            "id": id,
            "name": name,
            "account": parent.map(|p| format!("/api/v1/accounts/{p}/")),
            "resource_uri": format!("/api/v1/accounts/{id}/"),
        }))
        .expect("account")
    }

    fn fixture() -> Vec<Account> {
        vec![
            account(1, "Root", None),
            account(4, "West", Some(1)),
            account(2, "East", Some(1)),
            account(3, "Store 9", Some(2)),
        ]
    }

    #[test]
    fn tree_sorts_siblings_by_name() {
        let forest = build_tree(&fixture(), None, &terse_label);
        insta::assert_snapshot!(output::render_tree(&forest), @r"
        Root (id:1)
        ├── East (id:2)
        │   └── Store 9 (id:3)
        └── West (id:4)
        ");
    }

    #[test]
    fn tree_can_be_rooted_at_a_subaccount() {
        let forest = build_tree(&fixture(), Some("/api/v1/accounts/2/"), &terse_label);
        assert_eq!(
            output::render_tree(&forest),
            "East (id:2)\n└── Store 9 (id:3)"
        );
    }

    #[test]
    fn account_scope_roots_the_tree() {
        let root = scope_root(Some("2"));
        assert_eq!(root.as_deref(), Some("/api/v1/accounts/2/"));
        let forest = build_tree(&fixture(), root.as_deref(), &terse_label);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].label, "East (id:2)");
        assert_eq!(scope_root(None), None);
    }

    #[test]
    fn verbose_label_lists_counts() {
        let counts = AccountCounts {
            routers: 3,
            groups: 1,
            users: 2,
            subaccounts: 0,
        };
        assert_eq!(
            verbose_label(&account(7, "Lab", None), &counts),
            "Lab (id:7, routers:3 groups:1, users:2, subaccounts:0)"
        );
    }
}
