use std::fs;
use std::io::Write;
use std::path::Path;

use libmgit_core::{CommitStore, MgitError};
use serde::Serialize;

use crate::cli::Cli;
use crate::context::{MgitContext, STORE_DIR};
use crate::output::{output_success, print_human};

#[derive(Serialize)]
struct InitOutput {
    store: String,
    already_initialized: bool,
    exclude_action: &'static str,
}

/// What happened to the store entry in `.git/info/exclude`
#[derive(Clone, Copy)]
enum ExcludeAction {
    Added,
    Present,
}

impl ExcludeAction {
    fn as_str(&self) -> &'static str {
        match self {
            ExcludeAction::Added => "added",
            ExcludeAction::Present => "present",
        }
    }
}

pub fn run(cli: &Cli) -> Result<(), MgitError> {
    let ctx = MgitContext::discover(cli)?;
    let already_initialized = CommitStore::open(&ctx.store_root).is_ok();
    let store = CommitStore::initialize(&ctx.store_root)?;
    let exclude = exclude_store(ctx.git.git_dir())?;

    output_success(
        cli,
        InitOutput {
            store: store.root().to_string_lossy().into_owned(),
            already_initialized,
            exclude_action: exclude.as_str(),
        },
    )?;
    if already_initialized {
        print_human(cli, &format!("Reinitialized identity store in {}", store.root().display()));
    } else {
        print_human(cli, &format!("Initialized identity store in {}", store.root().display()));
    }
    Ok(())
}

/// Keep the store out of `git status` by listing it in `info/exclude`
fn exclude_store(git_dir: &Path) -> Result<ExcludeAction, MgitError> {
    let entry = format!("/{}/", STORE_DIR);
    let path = git_dir.join("info").join("exclude");
    let existing = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    if existing.lines().any(|line| line.trim() == entry) {
        return Ok(ExcludeAction::Present);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::OpenOptions::new().create(true).append(true).open(&path)?;
    if !existing.is_empty() && !existing.ends_with('\n') {
        writeln!(file)?;
    }
    writeln!(file, "{}", entry)?;
    Ok(ExcludeAction::Added)
}
