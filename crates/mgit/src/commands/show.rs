use libmgit_core::{
    CommitStore, Hash, MgitError, NativeCommit, NativeRepository, ObjectRecord, RevisionResolver,
};
use serde::Serialize;

use super::log::{format_record, indent_message, LogEntry};
use crate::cli::Cli;
use crate::context::MgitContext;
use crate::output::{output_success, print_human, print_warning};

#[derive(Serialize)]
struct ShowOutput {
    revision: String,
    resolved_by: String,
    native_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    identity: Option<LogEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    native: Option<NativeView>,
}

/// Native commit shown when no identity record is available
#[derive(Serialize)]
struct NativeView {
    parents: Vec<String>,
    author_name: String,
    author_email: String,
    date: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    mapped_identity: Option<String>,
}

pub fn run(cli: &Cli, revision: &str) -> Result<(), MgitError> {
    let ctx = MgitContext::discover(cli)?;
    let identity = ctx.identity()?;
    let mappings = ctx.open_mappings()?;
    let resolver = RevisionResolver::new(&ctx.git, &mappings, identity.identity_key.as_ref());
    let resolution = resolver.resolve(revision)?;

    let record = match (resolution.identity_hash, ctx.open_store().ok()) {
        (Some(hash), Some(store)) => load_record(&store, &hash, cli)?,
        _ => None,
    };

    if let Some(record) = record {
        output_success(
            cli,
            ShowOutput {
                revision: revision.to_string(),
                resolved_by: resolution.resolved_by.to_string(),
                native_hash: resolution.native_hash.to_hex(),
                identity: Some(LogEntry::from_record(&record)),
                native: None,
            },
        )?;
        print_human(cli, &format_record(&record));
        if !record.parent_hashes.is_empty() {
            let parents: Vec<String> = record.parent_hashes.iter().map(|h| h.to_string()).collect();
            print_human(cli, &format!("Parents: {}", parents.join(" ")));
        }
        return Ok(());
    }

    let commit = ctx
        .git
        .find_commit(&resolution.native_hash)?
        .ok_or_else(|| MgitError::object_not_found(&resolution.native_hash))?;
    let mapped_identity = resolution.identity_hash;
    output_success(
        cli,
        ShowOutput {
            revision: revision.to_string(),
            resolved_by: resolution.resolved_by.to_string(),
            native_hash: commit.hash.to_hex(),
            identity: None,
            native: Some(native_view(&commit, mapped_identity.map(|h| h.to_hex()))),
        },
    )?;
    print_human(cli, &format_native(&commit));
    match mapped_identity {
        Some(hash) => print_human(cli, &format!("Identity: {} (record missing, run 'mgit reconstruct')", hash)),
        None => print_human(cli, "Identity: not bound"),
    }
    Ok(())
}

/// The stored record for `hash`; a mapped but unmaterialized commit is not an error
fn load_record(store: &CommitStore, hash: &Hash, cli: &Cli) -> Result<Option<ObjectRecord>, MgitError> {
    match store.get(hash) {
        Ok(record) => Ok(Some(record)),
        Err(MgitError::NotFound(_)) => {
            print_warning(cli, &format!("identity commit {} is mapped but not in the store", hash.short()));
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn native_view(commit: &NativeCommit, mapped_identity: Option<String>) -> NativeView {
    NativeView {
        parents: commit.parent_hashes.iter().map(|h| h.to_hex()).collect(),
        author_name: commit.author.name.clone(),
        author_email: commit.author.email.clone(),
        date: commit.author.when.to_rfc3339(),
        message: commit.message.clone(),
        mapped_identity,
    }
}

fn format_native(commit: &NativeCommit) -> String {
    let mut out = format!("native commit {}\n", commit.hash);
    out.push_str(&format!("Author: {}\n", commit.author.display_name()));
    out.push_str(&format!("Date:   {}\n\n", commit.author.when.to_rfc2822()));
    out.push_str(&indent_message(&commit.message));
    out
}
