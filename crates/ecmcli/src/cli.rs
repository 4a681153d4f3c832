//! Clap derive structures for the `ecm` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// ecm -- command line interface for Cradlepoint ECM
#[derive(Debug, Parser)]
#[command(
    name = "ecm",
    version,
    about = "Manage Cradlepoint ECM accounts, routers and devices",
    long_about = "A collection of commands to perform against the Cradlepoint ECM \
        service.\n\nYou must already have a valid ECM username/password. Run with \
        no command on a terminal to start an interactive session.",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Option<Command>,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Clone, Args)]
pub struct GlobalOpts {
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "ECM_PROFILE", global = true)]
    pub profile: Option<String>,

    /// ECM API site, e.g. https://www.cradlepointecm.com
    #[arg(long, env = "ECM_API_SITE", global = true)]
    pub api_site: Option<String>,

    /// ECM login (email)
    #[arg(long, env = "ECM_API_USERNAME", global = true)]
    pub api_username: Option<String>,

    /// ECM password
    #[arg(long, env = "ECM_API_PASSWORD", global = true, hide_env_values = true)]
    pub api_password: Option<String>,

    /// Parent account scope (id or name) for all requests
    #[arg(long, env = "ECM_ACCOUNT", global = true)]
    pub account: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ECM_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "ECM_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "ECM_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,

    /// Never pipe output through a pager
    #[arg(long, global = true)]
    pub no_pager: bool,

    /// Trace API calls to stderr
    #[arg(long, global = true)]
    pub trace: bool,

    /// Debug logging (same as -vv)
    #[arg(long, global = true)]
    pub debug: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Login to ECM
    Login(LoginArgs),

    /// Logout from ECM
    Logout,

    /// Manage ECM accounts
    #[command(alias = "account")]
    Accounts(AccountsArgs),

    /// Manage ECM routers
    #[command(alias = "router")]
    Routers(RoutersArgs),

    /// Manage ECM groups
    #[command(alias = "group")]
    Groups(GroupsArgs),

    /// Manage ECM users
    #[command(alias = "user")]
    Users(UsersArgs),

    /// Firmware versions
    #[command(alias = "fw")]
    Firmware(FirmwareArgs),

    /// Show router logs
    Logs(LogsArgs),

    /// Show the current WAN bitrate of connected routers
    Wanrate(WanrateArgs),

    /// Reboot routers
    Reboot(RebootArgs),

    /// Flash the LEDs of routers
    Flashleds(FlashledsArgs),

    /// Get or set the output GPIO of a router
    Gpio(GpioArgs),

    /// WiFi access points and site surveys
    Wifi(WifiArgs),

    /// Show clients connected to online routers
    #[command(alias = "client")]
    Clients(ClientsArgs),

    /// Interact with router config stores
    Remote(RemoteArgs),

    /// Feature bindings (add-ons and collaborations)
    #[command(alias = "feature")]
    Features(FeaturesArgs),

    /// Manage authorizations and roles
    #[command(alias = "auth")]
    Authorizations(AuthorizationsArgs),

    /// Router SDK applications
    #[command(alias = "app")]
    Apps(AppsArgs),

    /// Show account or group settings
    Settings(SettingsArgs),

    /// Run a router CLI command
    Cli(CliArgs),

    /// Interactive shell on a remote router
    Shell(ShellArgs),

    /// Analyze and report alerts
    Alerts,

    /// Activity log
    ActivityLog(ActivityLogArgs),

    /// Read and acknowledge messages
    Messages(MessagesArgs),

    /// Review and accept the terms of service
    Tos(TosArgs),

    /// Trace API calls
    Trace(TraceArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    #[command(alias = "completions")]
    Completion(CompletionArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

/// Device selection for commands that act on many routers at once.
#[derive(Debug, Clone, Default, Args)]
pub struct SelectorArgs {
    /// Router id or name
    #[arg(long)]
    pub router: Option<String>,

    /// Group id or name
    #[arg(long)]
    pub group: Option<String>,

    /// Account id or name
    #[arg(long = "in-account", value_name = "ACCOUNT")]
    pub in_account: Option<String>,

    /// Product id or name
    #[arg(long)]
    pub product: Option<String>,

    /// Actual firmware version
    #[arg(long)]
    pub firmware: Option<String>,

    /// Logical OR the selection arguments
    #[arg(long, visible_alias = "or")]
    pub disjunction: bool,

    /// Ignore devices that are offline
    #[arg(long)]
    pub skip_offline: bool,

    /// Concurrent remote requests
    #[arg(long)]
    pub concurrency: Option<usize>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SESSION
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Login (email); defaults to the last user on this site
    pub username: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ACCOUNTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AccountsArgs {
    #[command(subcommand)]
    pub command: Option<AccountsCommand>,
}

#[derive(Debug, Subcommand)]
pub enum AccountsCommand {
    /// Show the account tree (default)
    #[command(alias = "show")]
    Ls {
        /// Root the tree at this account
        #[arg(value_name = "ID_OR_NAME")]
        account: Option<String>,

        /// Include router, group, user and subaccount counts
        #[arg(long, short = 'l')]
        long: bool,
    },

    /// Create an account
    Create {
        name: String,

        /// Parent account id or name
        #[arg(long, value_name = "ID_OR_NAME")]
        parent: Option<String>,
    },

    /// Delete an account
    Delete {
        #[arg(value_name = "ID_OR_NAME")]
        account: String,

        /// Do not prompt for confirmation
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Move an account under a new parent
    Move {
        #[arg(value_name = "ID_OR_NAME")]
        account: String,

        #[arg(value_name = "NEW_PARENT_ID_OR_NAME")]
        new_parent: String,
    },

    /// Rename an account
    Rename {
        #[arg(value_name = "ID_OR_NAME")]
        account: String,

        new_name: String,
    },

    /// Search accounts by name
    Search {
        #[arg(required = true, value_name = "SEARCH_CRITERIA")]
        criteria: Vec<String>,

        #[arg(long, short = 'l')]
        long: bool,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ROUTERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct RoutersArgs {
    #[command(subcommand)]
    pub command: Option<RoutersCommand>,
}

#[derive(Debug, Subcommand)]
pub enum RoutersCommand {
    /// Show routers (default)
    #[command(alias = "show")]
    Ls {
        /// Router names or glob patterns, e.g. 'hq-*' or 'store-{1,2}'
        #[arg(value_name = "PATTERN")]
        patterns: Vec<String>,

        /// Detailed view
        #[arg(long, short = 'l')]
        long: bool,
    },

    /// Edit router attributes
    Edit {
        #[arg(value_name = "ROUTER_ID_OR_NAME")]
        router: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        desc: Option<String>,

        #[arg(long)]
        asset_id: Option<String>,

        #[arg(long)]
        custom1: Option<String>,

        #[arg(long)]
        custom2: Option<String>,
    },

    /// Move a router into a different account
    Move {
        #[arg(value_name = "ROUTER_ID_OR_NAME")]
        router: String,

        #[arg(value_name = "NEW_ACCOUNT_ID_OR_NAME")]
        account: String,
    },

    /// Delete a router
    Delete {
        #[arg(value_name = "ROUTER_ID_OR_NAME")]
        router: String,

        /// Do not prompt for confirmation
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Search for routers
    Search {
        #[arg(required = true, value_name = "SEARCH_CRITERIA")]
        criteria: Vec<String>,

        #[arg(long, short = 'l')]
        long: bool,
    },

    /// Assign a router to a group
    Groupassign {
        #[arg(value_name = "ROUTER_ID_OR_NAME")]
        router: String,

        #[arg(value_name = "NEW_GROUP_ID_OR_NAME")]
        group: String,
    },

    /// Unassign a router from its group
    Groupunassign {
        #[arg(value_name = "ROUTER_ID_OR_NAME")]
        router: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  GROUPS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct GroupsArgs {
    #[command(subcommand)]
    pub command: Option<GroupsCommand>,
}

#[derive(Debug, Subcommand)]
pub enum GroupsCommand {
    /// Show groups with sync and online statistics (default)
    #[command(alias = "show")]
    Ls,

    /// Create a group
    Create {
        name: String,

        /// Product name or id, e.g. MBR1400
        #[arg(long)]
        product: String,

        /// Target firmware version, e.g. 6.1.0
        #[arg(long)]
        firmware: String,

        /// Owning account id or name
        #[arg(long = "in-account", value_name = "ACCOUNT")]
        in_account: Option<String>,
    },

    /// Delete a group
    Delete {
        #[arg(value_name = "GROUP_ID_OR_NAME")]
        group: String,

        /// Do not prompt for confirmation
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Edit a group
    Edit {
        #[arg(value_name = "GROUP_ID_OR_NAME")]
        group: String,

        #[arg(long)]
        name: Option<String>,

        /// New target firmware version
        #[arg(long)]
        firmware: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  USERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: Option<UsersCommand>,
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// List users (default)
    #[command(alias = "show")]
    Ls,

    /// Create a user
    Create {
        /// Login name
        username: String,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        /// Owning account id or name
        #[arg(long = "in-account", value_name = "ACCOUNT")]
        in_account: Option<String>,
    },

    /// Delete a user
    Delete {
        #[arg(value_name = "USER_ID_OR_USERNAME")]
        user: String,

        /// Do not prompt for confirmation
        #[arg(long, short = 'f')]
        force: bool,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  FIRMWARE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct FirmwareArgs {
    #[command(subcommand)]
    pub command: Option<FirmwareCommand>,
}

#[derive(Debug, Subcommand)]
pub enum FirmwareCommand {
    /// Show firmware versions (default)
    Active,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICE OPERATIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LogsArgs {
    /// Routers (id, name or glob); all routers when omitted
    #[arg(value_name = "ROUTER")]
    pub routers: Vec<String>,

    /// Keep polling for new log entries
    #[arg(long, short = 'f')]
    pub follow: bool,

    /// Seconds between polls when following
    #[arg(long, default_value = "5", value_name = "SECS")]
    pub interval: f64,
}

#[derive(Debug, Args)]
pub struct WanrateArgs {
    #[arg(required = true, value_name = "ROUTER_ID_OR_NAME")]
    pub routers: Vec<String>,

    /// Seconds between samples
    #[arg(long, short = 's', default_value = "1", value_name = "SECS")]
    pub sampletime: f64,
}

#[derive(Debug, Args)]
pub struct RebootArgs {
    /// Routers (id, name or glob); all routers when omitted
    #[arg(value_name = "ROUTER")]
    pub routers: Vec<String>,

    /// Do not prompt for confirmation
    #[arg(long, short = 'f')]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct FlashledsArgs {
    /// Routers (id, name or glob); all routers when omitted
    #[arg(value_name = "ROUTER")]
    pub routers: Vec<String>,

    /// Stop after this many seconds (runs until interrupted otherwise)
    #[arg(long, value_name = "SECS")]
    pub duration: Option<f64>,
}

#[derive(Debug, Args)]
pub struct GpioArgs {
    #[arg(value_name = "ROUTER_ID_OR_NAME")]
    pub router: String,

    /// Set the output GPIO to this value first
    #[arg(long, value_name = "GPIO_VALUE")]
    pub value: Option<i64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WIFI
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WifiArgs {
    #[command(subcommand)]
    pub command: Option<WifiCommand>,
}

#[derive(Debug, Subcommand)]
pub enum WifiCommand {
    /// List access points seen by site surveys (default)
    Aps {
        #[arg(value_name = "ROUTER_ID_OR_NAME")]
        routers: Vec<String>,

        /// More columns
        #[arg(long, short = 'l')]
        long: bool,
    },

    /// Start a WiFi site survey
    Survey {
        #[arg(value_name = "ROUTER_ID_OR_NAME")]
        routers: Vec<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CLIENTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ClientsArgs {
    /// Routers (id, name or glob); every online router when omitted
    #[arg(value_name = "ROUTER")]
    pub routers: Vec<String>,

    /// Add WiFi link columns
    #[arg(long, short = 'l')]
    pub long: bool,

    /// Concurrent remote requests
    #[arg(long)]
    pub concurrency: Option<usize>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  FEATURES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct FeaturesArgs {
    #[command(subcommand)]
    pub command: Option<FeaturesCommand>,
}

#[derive(Debug, Subcommand)]
pub enum FeaturesCommand {
    /// List feature bindings (default)
    #[command(alias = "show")]
    Ls {
        /// Include internal features
        #[arg(long, short = 'a')]
        all: bool,

        /// More columns
        #[arg(long, short = 'l')]
        long: bool,
    },

    /// Delete a feature binding
    Rm {
        #[arg(value_name = "FEATURE_BINDING_ID")]
        id: String,

        /// Do not prompt for confirmation
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// List routers bound to a feature
    Routers {
        #[arg(value_name = "FEATURE_BINDING_ID")]
        id: String,
    },

    /// Bind a router to a feature
    Addrouter {
        #[arg(value_name = "FEATURE_BINDING_ID")]
        id: String,

        #[arg(value_name = "ROUTER_ID_OR_NAME")]
        router: String,
    },

    /// Unbind a router from a feature
    Removerouter {
        #[arg(value_name = "FEATURE_BINDING_ID")]
        id: String,

        #[arg(value_name = "ROUTER_ID_OR_NAME")]
        router: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  AUTHORIZATIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AuthorizationsArgs {
    #[command(subcommand)]
    pub command: Option<AuthorizationsCommand>,
}

#[derive(Debug, Subcommand)]
pub enum AuthorizationsCommand {
    /// List authorizations (default)
    #[command(alias = "show")]
    Ls {
        /// Username or security token label
        #[arg(long)]
        beneficiary: Option<String>,

        /// Role name
        #[arg(long)]
        role: Option<String>,

        /// Name of the account the rights apply to
        #[arg(long, value_name = "ACCOUNT")]
        rights_on: Option<String>,

        /// Only inactive authorizations
        #[arg(long)]
        inactive: bool,

        /// More columns
        #[arg(long, short = 'l')]
        long: bool,
    },

    /// Create an authorization
    Create {
        /// User id or username receiving the role
        #[arg(long, conflicts_with = "beneficiary_token", value_name = "USER")]
        beneficiary_user: Option<String>,

        /// Security token id or label receiving the role
        #[arg(long, value_name = "TOKEN")]
        beneficiary_token: Option<String>,

        /// Role id or name
        #[arg(long)]
        role: Option<String>,

        /// Account id or name the rights apply to
        #[arg(long, value_name = "ACCOUNT")]
        rights_on: Option<String>,

        /// Do not extend the rights to subaccounts
        #[arg(long)]
        no_cascade: bool,

        /// The user belongs to another account
        #[arg(long, conflicts_with = "beneficiary_token")]
        foreign: bool,
    },

    /// Edit an authorization
    Edit {
        #[arg(value_name = "AUTHORIZATION_ID")]
        id: String,

        /// New role id or name
        #[arg(long)]
        role: Option<String>,

        /// New account id or name the rights apply to
        #[arg(long, value_name = "ACCOUNT")]
        rights_on: Option<String>,

        #[arg(long, conflicts_with = "no_cascade")]
        cascade: bool,

        #[arg(long)]
        no_cascade: bool,

        #[arg(long, conflicts_with = "deactivate")]
        activate: bool,

        #[arg(long)]
        deactivate: bool,
    },

    /// Delete authorizations
    Rm {
        #[arg(required = true, value_name = "AUTHORIZATION_ID")]
        ids: Vec<String>,

        /// Do not prompt for confirmation
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Roles and their permissions
    Roles {
        #[command(subcommand)]
        command: Option<RolesCommand>,
    },
}

#[derive(Debug, Subcommand)]
pub enum RolesCommand {
    /// List roles with permission counts (default)
    Ls,

    /// Show the permissions of a role
    Examine {
        #[arg(value_name = "ROLE_ID_OR_NAME")]
        role: String,

        /// Only these API resources
        #[arg(long = "resource", value_name = "RESOURCE")]
        resources: Vec<String>,

        /// Only these methods (get, put, ...)
        #[arg(long = "method", value_name = "METHOD")]
        methods: Vec<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  APPS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AppsArgs {
    #[command(subcommand)]
    pub command: Option<AppsCommand>,
}

#[derive(Debug, Subcommand)]
pub enum AppsCommand {
    /// List uploaded app versions (default)
    Ls,

    /// Show one app version
    Examine {
        #[arg(value_name = "APP:VERSION")]
        app: String,
    },

    /// Upload an app package
    Upload {
        package: PathBuf,
    },

    /// Delete an app version
    Rm {
        #[arg(value_name = "APP:VERSION")]
        app: String,

        /// Do not prompt for confirmation
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// App deployments to groups
    Deploys {
        #[command(subcommand)]
        command: Option<DeploysCommand>,
    },
}

#[derive(Debug, Subcommand)]
pub enum DeploysCommand {
    /// List deployments (default)
    Ls,

    /// Install an app version on a group of routers
    Install {
        #[arg(value_name = "APP:VERSION")]
        app: String,

        #[arg(value_name = "GROUP_ID_OR_NAME")]
        group: String,
    },

    /// Remove deployments
    #[command(group = clap::ArgGroup::new("target").required(true))]
    Rm {
        #[arg(long, group = "target", value_name = "DEPLOY_ID")]
        deploy_id: Option<String>,

        #[arg(long, group = "target", value_name = "APP:VERSION")]
        app_ident: Option<String>,

        /// Only remove the app from this group
        #[arg(long, requires = "app_ident", value_name = "GROUP_ID_OR_NAME")]
        group: Option<String>,

        /// Do not prompt for confirmation
        #[arg(long, short = 'f')]
        force: bool,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  REMOTE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct RemoteArgs {
    #[command(subcommand)]
    pub command: Option<RemoteCommand>,
}

#[derive(Debug, Subcommand)]
pub enum RemoteCommand {
    /// Get config or status data from selected routers (default)
    Get {
        /// Dot notation path with optional globs, e.g. config.wan.rules.*.enabled
        #[arg(value_name = "REMOTE_PATH", default_value = "")]
        path: String,

        #[command(flatten)]
        selector: SelectorArgs,
    },

    /// Set a config value on selected routers
    Set {
        /// Dot notation config path, e.g. config.system.desc
        #[arg(value_name = "REMOTE_PATH")]
        path: String,

        /// JSON formatted value
        #[arg(long, short = 'd', value_name = "INPUT_DATA", conflicts_with = "input_file")]
        input_data: Option<String>,

        /// File holding the JSON value
        #[arg(long, short = 'i', value_name = "INPUT_FILE")]
        input_file: Option<PathBuf>,

        /// Show what would be changed without changing it
        #[arg(long, visible_alias = "manifest")]
        dry_run: bool,

        #[command(flatten)]
        selector: SelectorArgs,
    },

    /// Show the config data definition for a product and firmware
    Dtd {
        /// Dot notation path into the definition
        #[arg(value_name = "PATH")]
        path: Option<String>,

        #[arg(long, default_value = "MBR1400")]
        product: String,

        #[arg(long, default_value = "5.4.1")]
        firmware: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SETTINGS / CLI / SHELL
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SettingsArgs {
    /// Group id or name
    #[arg(long, conflicts_with = "in_account")]
    pub group: Option<String>,

    /// Account id or name (defaults to your own account)
    #[arg(long = "in-account", value_name = "ACCOUNT")]
    pub in_account: Option<String>,
}

#[derive(Debug, Args)]
pub struct CliArgs {
    #[arg(required = true, value_name = "ROUTER_ID_OR_NAME")]
    pub routers: Vec<String>,

    /// Command to run on the routers
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ShellArgs {
    #[arg(value_name = "ROUTER_ID_OR_NAME")]
    pub router: String,

    /// Start a new session
    #[arg(long, short = 'n')]
    pub new: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ACTIVITY / MESSAGES / TOS / TRACE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ActivityLogArgs {
    #[command(subcommand)]
    pub command: Option<ActivityLogCommand>,
}

#[derive(Debug, Subcommand)]
pub enum ActivityLogCommand {
    /// Tabulate the activity log (default)
    Ls {
        /// Stop after this many entries
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },
}

#[derive(Debug, Args)]
pub struct MessagesArgs {
    #[command(subcommand)]
    pub command: Option<MessagesCommand>,
}

#[derive(Debug, Subcommand)]
pub enum MessagesCommand {
    /// List messages (default)
    Ls,

    /// Read and acknowledge a message
    Read {
        /// Message id, e.g. sys-12 or usr-3
        #[arg(value_name = "MESSAGE_ID")]
        ident: String,
    },
}

#[derive(Debug, Args)]
pub struct TosArgs {
    #[command(subcommand)]
    pub command: Option<TosCommand>,
}

#[derive(Debug, Subcommand)]
pub enum TosCommand {
    /// Review the terms of service (default)
    Review {
        /// Save the raw terms to a file
        #[arg(long, value_name = "FILE")]
        download: Option<PathBuf>,
    },

    /// Accept the terms of service
    Accept {
        /// Accept without the interactive confirmation
        #[arg(long = "i-accept-the-ecm-terms-of-service")]
        accept: bool,
    },
}

#[derive(Debug, Args)]
pub struct TraceArgs {
    #[command(subcommand)]
    pub command: Option<TraceCommand>,
}

#[derive(Debug, Subcommand)]
pub enum TraceCommand {
    /// Enable API tracing
    Enable,
    /// Disable API tracing
    Disable,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive configuration wizard
    Init,

    /// Show the current configuration (secrets masked)
    Show,

    /// Set a profile value
    Set {
        /// site, accounts_url, username, account, insecure or timeout
        key: String,
        value: String,
    },

    /// List profiles
    Profiles,

    /// Set the default profile
    Use { name: String },

    /// Store the profile password in the system keyring
    SetPassword {
        /// Profile to update (defaults to the active one)
        #[arg(long = "for-profile", value_name = "PROFILE")]
        profile: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETION
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["ecm"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("parse")
    }

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn remote_get_takes_a_selector() {
        let cli = parse(&[
            "remote",
            "get",
            "config.system.desc",
            "--group",
            "stores",
            "--or",
            "--skip-offline",
        ]);
        let Some(Command::Remote(RemoteArgs {
            command: Some(RemoteCommand::Get { path, selector }),
        })) = cli.command
        else {
            panic!("expected remote get");
        };
        assert_eq!(path, "config.system.desc");
        assert_eq!(selector.group.as_deref(), Some("stores"));
        assert!(selector.disjunction);
        assert!(selector.skip_offline);
    }

    #[test]
    fn cli_command_follows_the_separator() {
        let cli = parse(&["cli", "hq", "lab", "--", "status", "-v"]);
        let Some(Command::Cli(args)) = cli.command else {
            panic!("expected cli");
        };
        assert_eq!(args.routers, ["hq", "lab"]);
        assert_eq!(args.command, ["status", "-v"]);
    }

    #[test]
    fn authorization_edit_flags_pair_up() {
        let cli = parse(&["authorizations", "edit", "7", "--no-cascade", "--activate"]);
        let Some(Command::Authorizations(AuthorizationsArgs {
            command:
                Some(AuthorizationsCommand::Edit {
                    id,
                    cascade,
                    no_cascade,
                    activate,
                    ..
                }),
        })) = cli.command
        else {
            panic!("expected authorizations edit");
        };
        assert_eq!(id, "7");
        assert!(!cascade && no_cascade && activate);
        let mut argv = vec!["ecm", "authorizations", "edit", "7", "--cascade", "--no-cascade"];
        assert!(Cli::try_parse_from(argv.clone()).is_err());
        argv.truncate(4);
        argv.extend(["--beneficiary-user", "x"]);
        assert!(Cli::try_parse_from(argv.clone()).is_err());
    }

    #[test]
    fn deploy_rm_needs_a_target() {
        assert!(Cli::try_parse_from(["ecm", "apps", "deploys", "rm"]).is_err());
        assert!(
            Cli::try_parse_from(["ecm", "apps", "deploys", "rm", "--group", "east"]).is_err()
        );
        let cli = parse(&["apps", "deploys", "rm", "--app-ident", "hello:1.0", "--group", "east"]);
        let Some(Command::Apps(AppsArgs {
            command: Some(AppsCommand::Deploys {
                command: Some(DeploysCommand::Rm { app_ident, group, .. }),
            }),
        })) = cli.command
        else {
            panic!("expected deploys rm");
        };
        assert_eq!(app_ident.as_deref(), Some("hello:1.0"));
        assert_eq!(group.as_deref(), Some("east"));
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let cli = parse(&["routers", "ls", "-o", "json", "-y"]);
        assert_eq!(cli.global.output, OutputFormat::Json);
        assert!(cli.global.yes);
    }
}
