use libmgit_core::{walk_history, MgitError, ObjectRecord};
use serde::Serialize;

use crate::cli::Cli;
use crate::context::MgitContext;
use crate::output::{output_success, print_human, print_warning};

#[derive(Serialize)]
struct LogOutput {
    commits: Vec<LogEntry>,
    unreadable: Vec<UnreadableEntry>,
}

#[derive(Serialize)]
pub struct LogEntry {
    pub identity_hash: String,
    pub native_hash: String,
    pub parents: Vec<String>,
    pub author_name: String,
    pub author_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_key: Option<String>,
    pub date: String,
    pub message: String,
}

impl LogEntry {
    pub fn from_record(record: &ObjectRecord) -> Self {
        Self {
            identity_hash: record.identity_hash.to_hex(),
            native_hash: record.native_hash.to_hex(),
            parents: record.parent_hashes.iter().map(|h| h.to_hex()).collect(),
            author_name: record.author.name.clone(),
            author_email: record.author.email.clone(),
            identity_key: record.identity_key().map(|k| k.to_string()),
            date: record.author.when.to_rfc3339(),
            message: record.message.clone(),
        }
    }
}

#[derive(Serialize)]
struct UnreadableEntry {
    identity_hash: String,
    reason: String,
}

pub fn run(cli: &Cli, max_count: usize) -> Result<(), MgitError> {
    let ctx = MgitContext::discover(cli)?;
    let store = ctx.open_store()?;

    let Some(head) = store.resolve_head()? else {
        output_success(cli, LogOutput { commits: Vec::new(), unreadable: Vec::new() })?;
        print_human(cli, "No identity commits yet");
        return Ok(());
    };

    let history = walk_history(&store, head, Some(max_count));
    output_success(
        cli,
        LogOutput {
            commits: history.commits.iter().map(LogEntry::from_record).collect(),
            unreadable: history
                .unreadable
                .iter()
                .map(|(hash, reason)| UnreadableEntry {
                    identity_hash: hash.to_hex(),
                    reason: reason.clone(),
                })
                .collect(),
        },
    )?;

    for record in &history.commits {
        print_human(cli, &format_record(record));
    }
    for (hash, reason) in &history.unreadable {
        print_warning(cli, &format!("cannot read identity commit {}: {}", hash, reason));
    }
    Ok(())
}

/// Multi-line human rendering shared with `show`
pub fn format_record(record: &ObjectRecord) -> String {
    let mut out = format!("commit {}\n", record.identity_hash);
    out.push_str(&format!("Native: {}\n", record.native_hash));
    let author = match record.identity_key() {
        Some(key) => format!("{} [{}]", record.author.display_name(), key),
        None => record.author.display_name(),
    };
    out.push_str(&format!("Author: {}\n", author));
    out.push_str(&format!("Date:   {}\n\n", record.author.when.to_rfc2822()));
    out.push_str(&indent_message(&record.message));
    out
}

pub fn indent_message(message: &str) -> String {
    message
        .trim_end()
        .lines()
        .map(|line| format!("    {}\n", line))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indent_message() {
        assert_eq!(indent_message("title\n\nbody\n"), "    title\n    \n    body\n");
        assert_eq!(indent_message(""), "");
    }
}
