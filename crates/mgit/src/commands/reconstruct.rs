use std::path::Path;

use libmgit_core::{CommitStore, IngestReport, MgitError, Reconstructor};
use serde::Serialize;
use tracing::info;

use crate::cli::Cli;
use crate::context::MgitContext;
use crate::output::{output_success, print_human, print_warning};

#[derive(Serialize)]
struct ReconstructOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    imported: Option<ImportCounts>,
    commits_written: usize,
    commits_unchanged: usize,
    branches: Vec<BranchOutput>,
    branches_removed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    head: Option<String>,
    complete: bool,
    warnings: Vec<String>,
}

#[derive(Serialize, Clone, Copy)]
pub struct ImportCounts {
    pub appended: usize,
    pub already_present: usize,
}

impl From<IngestReport> for ImportCounts {
    fn from(report: IngestReport) -> Self {
        Self {
            appended: report.appended,
            already_present: report.already_present,
        }
    }
}

#[derive(Serialize)]
struct BranchOutput {
    name: String,
    identity_hash: String,
}

pub fn run(cli: &Cli, from: Option<&Path>) -> Result<(), MgitError> {
    let ctx = MgitContext::discover(cli)?;
    let store = CommitStore::initialize(&ctx.store_root)?;
    let _lock = store.lock()?;
    let mut mappings = ctx.open_mappings()?;

    let imported = match from {
        Some(path) => {
            let payload = std::fs::read(path)?;
            let report = mappings.ingest(&payload, &ctx.git)?;
            info!(appended = report.appended, path = %path.display(), "imported mappings");
            Some(ImportCounts::from(report))
        }
        None => None,
    };

    let report = Reconstructor::new(&ctx.git, &store, &mappings).run()?;

    output_success(
        cli,
        ReconstructOutput {
            imported,
            commits_written: report.commits_written,
            commits_unchanged: report.commits_unchanged,
            branches: report
                .branches
                .iter()
                .map(|(name, hash)| BranchOutput {
                    name: name.clone(),
                    identity_hash: hash.to_hex(),
                })
                .collect(),
            branches_removed: report.branches_removed.clone(),
            head: report.head.as_ref().map(|h| h.to_string()),
            complete: report.is_complete(),
            warnings: report.warnings.iter().map(|w| w.to_string()).collect(),
        },
    )?;

    if let Some(counts) = &imported {
        print_human(
            cli,
            &format!("Imported {} mapping(s), {} already present", counts.appended, counts.already_present),
        );
    }
    print_human(
        cli,
        &format!(
            "Reconstructed {} identity commit(s) ({} unchanged) and {} branch(es)",
            report.commits_written,
            report.commits_unchanged,
            report.branches.len()
        ),
    );
    for name in &report.branches_removed {
        print_human(cli, &format!("Removed stale branch {}", name));
    }
    if let Some(head) = &report.head {
        print_human(cli, &format!("HEAD is {}", head));
    }
    for warning in &report.warnings {
        print_warning(cli, &warning.to_string());
    }
    Ok(())
}
