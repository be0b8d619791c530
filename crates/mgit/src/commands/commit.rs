use chrono::Local;
use libmgit_core::{bind_commit, CommitIdentity, MgitError, NativeHead, NativeRepository};
use libmgit_git::commit_staged;
use serde::Serialize;

use crate::cli::Cli;
use crate::context::MgitContext;
use crate::output::{output_success, print_human, print_warning};

#[derive(Serialize)]
struct CommitOutput {
    native_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    identity_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    identity_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<String>,
    summary: String,
}

pub fn run(cli: &Cli, message: &str, allow_empty: bool) -> Result<(), MgitError> {
    let message = normalize_message(message)?;
    let ctx = MgitContext::discover(cli)?;
    let identity = ctx.identity()?;
    let now = Local::now();
    let author = identity.author_signature(now.with_timezone(now.offset()))?;

    let store = ctx.open_store()?;
    let _lock = store.lock()?;
    let mut mappings = ctx.open_mappings()?;

    let native = commit_staged(&ctx.git, &message, &author, allow_empty)?;
    let head = ctx.git.head()?;
    let bound = bind_commit(
        &store,
        &mut mappings,
        &native,
        identity.identity_key.as_ref(),
        &head,
    )?;

    let branch = match &head {
        NativeHead::Symbolic(branch) => Some(branch.clone()),
        NativeHead::Detached(_) => None,
    };
    let summary = message.lines().next().unwrap_or_default().to_string();
    let (identity_hash, identity_key) = match &bound {
        CommitIdentity::Bound { identity, key, .. } => (Some(*identity), Some(key.to_string())),
        CommitIdentity::Native(_) => (None, None),
    };

    output_success(
        cli,
        CommitOutput {
            native_hash: native.hash.to_hex(),
            identity_hash: identity_hash.map(|h| h.to_hex()),
            identity_key: identity_key.clone(),
            branch: branch.clone(),
            summary: summary.clone(),
        },
    )?;

    let location = branch.unwrap_or_else(|| "detached HEAD".to_string());
    print_human(cli, &format!("[{} {}] {}", location, bound.canonical().short(), summary));
    match (identity_hash, identity_key) {
        (Some(hash), Some(key)) => {
            print_human(cli, &format!(" identity {} ({})", hash, key));
            print_human(cli, &format!(" native   {}", native.hash));
        }
        _ => print_warning(cli, "user.pubkey is not set; commit is not identity-bound"),
    }
    Ok(())
}

/// Trailing whitespace trimmed and a single final newline, as git does
fn normalize_message(message: &str) -> Result<String, MgitError> {
    let trimmed = message.trim_end();
    if trimmed.trim().is_empty() {
        return Err(MgitError::InvalidArgs("empty commit message".to_string()));
    }
    Ok(format!("{}\n", trimmed))
}
