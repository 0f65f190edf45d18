//! Command dispatch and the interactive chat loop

use anyhow::{Context, Result};
use mail::MailTools;
use mail::tools::{self, GREETING, KEYWORD_PROMPT};
use serde_json::{Value, json};
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

/// Commands that need a signed-in mailbox
pub enum Query {
    Unread,
    Latest,
    Search { keywords: Vec<String> },
    Call { tool: String, args: Option<String> },
    Chat,
}

/// Run a one-shot query (or the chat loop) against the tools
pub fn run(query: Query, mail_tools: &MailTools) -> Result<ExitCode> {
    let result = match query {
        Query::Unread => mail_tools.unread_count(),
        Query::Latest => mail_tools.latest_unread_primary_message(),
        Query::Search { keywords } => {
            let keywords = if keywords.is_empty() {
                let stdin = io::stdin();
                let mut lines = stdin.lock().lines();
                prompt_keywords(&mut lines)?
            } else {
                keywords.join(" ")
            };
            mail_tools.find_by_keywords(&keywords)
        }
        Query::Call { tool, args } => {
            let args: Value = match args {
                Some(raw) => serde_json::from_str(&raw).context("Tool arguments must be JSON")?,
                None => json!({}),
            };
            mail_tools.invoke(&tool, &args)
        }
        Query::Chat => {
            chat(mail_tools)?;
            return Ok(ExitCode::SUCCESS);
        }
    };

    print_json(&result)?;
    Ok(if is_error(&result) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Line-oriented session: greet, then answer commands until EOF or `quit`
fn chat(mail_tools: &MailTools) -> Result<()> {
    println!("{}", GREETING);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let (command, rest) = split_command(&line);

        let result = match command {
            "" => continue,
            "quit" | "exit" => break,
            "help" => {
                print_help();
                continue;
            }
            "unread" => mail_tools.invoke(tools::UNREAD_COUNT, &json!({})),
            "latest" => mail_tools.invoke(tools::LATEST_UNREAD_PRIMARY, &json!({})),
            "search" => {
                let keywords = if rest.is_empty() {
                    prompt_keywords(&mut lines)?
                } else {
                    rest.to_string()
                };
                mail_tools.invoke(tools::FIND_BY_KEYWORDS, &json!({ "keywords": keywords }))
            }
            "logout" => match mail_tools.service().logout() {
                Ok(()) => json!({}),
                Err(e) => json!({ "error": e.to_string() }),
            },
            other => json!({ "error": format!("Unknown command: {}", other) }),
        };

        print_json(&result)?;
    }

    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  unread            number of unread emails");
    println!("  latest            latest unread email in the primary inbox");
    println!("  search [WORDS]    find an email by keywords");
    println!("  logout            forget the stored sign-in");
    println!("  quit              leave");
}

/// Ask for keywords and read one line; EOF yields an empty string
fn prompt_keywords<I>(lines: &mut I) -> Result<String>
where
    I: Iterator<Item = io::Result<String>>,
{
    println!("{}", KEYWORD_PROMPT);
    print!("> ");
    io::stdout().flush()?;

    match lines.next() {
        Some(line) => Ok(line?.trim().to_string()),
        None => Ok(String::new()),
    }
}

/// Split `search foo bar` into (`search`, `foo bar`)
fn split_command(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    }
}

fn is_error(value: &Value) -> bool {
    value.get("error").is_some()
}

pub fn print_json(value: &Value) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_command() {
        assert_eq!(split_command("search  quarterly report "), ("search", "quarterly report"));
        assert_eq!(split_command("unread"), ("unread", ""));
        assert_eq!(split_command("   "), ("", ""));
    }

    #[test]
    fn test_prompt_keywords_reads_one_line() {
        let mut lines =
            vec![Ok("  invoice march ".to_string()), Ok("next".to_string())].into_iter();
        assert_eq!(prompt_keywords(&mut lines).unwrap(), "invoice march");
        assert_eq!(lines.next().unwrap().unwrap(), "next");
    }

    #[test]
    fn test_prompt_keywords_eof() {
        let mut lines = std::iter::empty::<io::Result<String>>();
        assert_eq!(prompt_keywords(&mut lines).unwrap(), "");
    }

    #[test]
    fn test_is_error() {
        assert!(is_error(&json!({ "error": "boom" })));
        assert!(!is_error(&json!({})));
        assert!(!is_error(&json!({ "unread_count": 2 })));
    }
}
