use libmgit_core::{verify_chain, MgitError};
use serde::Serialize;

use crate::cli::Cli;
use crate::context::MgitContext;
use crate::output::{output_success, print_human};

#[derive(Serialize)]
struct VerifyOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    head: Option<String>,
    checked: usize,
    valid: usize,
    healthy: bool,
    issues: Vec<IssueOutput>,
}

#[derive(Serialize)]
struct IssueOutput {
    kind: &'static str,
    identity_hash: String,
    message: String,
}

pub fn run(cli: &Cli) -> Result<(), MgitError> {
    let ctx = MgitContext::discover(cli)?;
    let store = ctx.open_store()?;
    let mappings = ctx.open_mappings()?;
    let report = verify_chain(&store, &mappings, &ctx.git)?;

    output_success(
        cli,
        VerifyOutput {
            head: report.head.map(|h| h.to_hex()),
            checked: report.checked,
            valid: report.valid,
            healthy: report.is_healthy(),
            issues: report
                .issues
                .iter()
                .map(|issue| IssueOutput {
                    kind: issue.kind(),
                    identity_hash: issue.hash().to_hex(),
                    message: issue.to_string(),
                })
                .collect(),
        },
    )?;

    if report.head.is_none() {
        print_human(cli, "No identity commits to verify");
        return Ok(());
    }
    for issue in &report.issues {
        print_human(cli, &format!("[{}] {}", issue.kind(), issue));
    }
    print_human(
        cli,
        &format!("Checked {} identity commit(s): {} valid, {} issue(s)", report.checked, report.valid, report.issues.len()),
    );

    if report.is_healthy() {
        Ok(())
    } else {
        Err(MgitError::VerificationFailed(report.issues.len()))
    }
}
