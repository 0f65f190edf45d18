//! gmail-assistant - command-line shell for the Gmail assistant tools
//!
//! Tool results are printed to stdout as JSON; logs and the OAuth prompt go to
//! stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, warn};
use mail::{
    AssistantSettings, ClientSecrets, CredentialManager, FileTokenStore, GmailClient,
    GoogleAuthorizer, MailQueryService, MailTools, TokenStore,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

mod shell;

use shell::Query;

#[derive(Parser)]
#[command(name = "gmail-assistant", version, about = "Ask your Gmail inbox simple questions")]
struct Cli {
    /// Google OAuth client secrets JSON (default: config directory)
    #[arg(long, global = true, value_name = "PATH")]
    client_secrets: Option<PathBuf>,

    /// Where the OAuth token is stored
    #[arg(long, global = true, value_name = "PATH")]
    token_path: Option<PathBuf>,

    /// Seconds to wait for the browser sign-in
    #[arg(long, global = true, value_name = "SECS")]
    auth_timeout: Option<u64>,

    /// Never open the browser sign-in flow
    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Estimated number of unread emails
    Unread,
    /// Subject and body of the latest unread primary email
    Latest,
    /// Find an email by keywords (prompts when none are given)
    Search { keywords: Vec<String> },
    /// Print the tool definitions exposed to an agent
    Tools,
    /// Invoke a tool by name with JSON arguments
    Call {
        tool: String,
        #[arg(value_name = "JSON")]
        args: Option<String>,
    },
    /// Interactive session
    Chat,
    /// Remove the stored OAuth token
    Logout,
}

/// Commands answered without signing in
#[derive(Debug, PartialEq)]
enum Local {
    Tools,
    Logout,
}

impl Command {
    fn into_query(self) -> Result<Query, Local> {
        match self {
            Command::Unread => Ok(Query::Unread),
            Command::Latest => Ok(Query::Latest),
            Command::Search { keywords } => Ok(Query::Search { keywords }),
            Command::Call { tool, args } => Ok(Query::Call { tool, args }),
            Command::Chat => Ok(Query::Chat),
            Command::Tools => Err(Local::Tools),
            Command::Logout => Err(Local::Logout),
        }
    }
}

struct AuthOptions {
    client_secrets: Option<PathBuf>,
    token_path: PathBuf,
    auth_timeout: Duration,
    scopes: Vec<String>,
    interactive: bool,
}

fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let settings = AssistantSettings::load().unwrap_or_else(|e| {
        warn!("Ignoring unreadable settings: {:#}", e);
        AssistantSettings::default()
    });

    let token_path = match cli.token_path {
        Some(path) => path,
        None => settings.token_path()?,
    };

    let query = match cli.command.into_query() {
        Ok(query) => query,
        Err(Local::Tools) => {
            shell::print_json(&serde_json::to_value(MailTools::definitions())?)?;
            return Ok(ExitCode::SUCCESS);
        }
        Err(Local::Logout) => {
            FileTokenStore::new(&token_path).clear()?;
            eprintln!("Signed out.");
            return Ok(ExitCode::SUCCESS);
        }
    };

    let options = AuthOptions {
        client_secrets: cli.client_secrets,
        token_path,
        auth_timeout: cli
            .auth_timeout
            .map(Duration::from_secs)
            .unwrap_or_else(|| settings.auth_timeout()),
        scopes: settings.scopes(),
        interactive: !cli.non_interactive,
    };
    let tools = build_tools(options)?;
    shell::run(query, &tools)
}

/// Wire secrets, token store, authorizer and API client into the tool facade
fn build_tools(options: AuthOptions) -> Result<MailTools> {
    let secrets = match ClientSecrets::load(options.client_secrets.as_deref()) {
        Ok(secrets) => secrets,
        Err(e) => {
            if let Some(path) = ClientSecrets::default_path() {
                warn!(
                    "To configure Gmail access, either:\n\
                     1. Place your Google OAuth client secrets at: {}\n\
                     2. Or set environment variables: GMAIL_CLIENT_ID and GMAIL_CLIENT_SECRET",
                    path.display()
                );
            }
            return Err(e).context("Gmail client secrets not found");
        }
    };

    let authorizer = GoogleAuthorizer::new(secrets)
        .with_callback_timeout(options.auth_timeout)
        .with_interactive(options.interactive);

    let credentials = CredentialManager::new(
        Box::new(FileTokenStore::new(options.token_path)),
        Box::new(authorizer),
    )
    .with_scopes(options.scopes);

    let service = MailQueryService::new(Box::new(GmailClient::new()), credentials);
    Ok(MailTools::new(Arc::new(service)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Command {
        Cli::try_parse_from(std::iter::once("gmail-assistant").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn test_tools_and_logout_skip_sign_in() {
        assert_eq!(parse(&["tools"]).into_query().err(), Some(Local::Tools));
        assert_eq!(parse(&["logout"]).into_query().err(), Some(Local::Logout));
    }

    #[test]
    fn test_mailbox_commands_become_queries() {
        assert!(matches!(parse(&["unread"]).into_query(), Ok(Query::Unread)));
        assert!(matches!(parse(&["chat"]).into_query(), Ok(Query::Chat)));
        match parse(&["search", "quarterly", "report"]).into_query() {
            Ok(Query::Search { keywords }) => assert_eq!(keywords, ["quarterly", "report"]),
            _ => panic!("expected a search query"),
        }
        match parse(&["--non-interactive", "call", "find_email_by_keywords", "{}"]).into_query() {
            Ok(Query::Call { tool, args }) => {
                assert_eq!(tool, "find_email_by_keywords");
                assert_eq!(args.as_deref(), Some("{}"));
            }
            _ => panic!("expected a tool call"),
        }
    }
}
