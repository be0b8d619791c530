use libmgit_core::{MgitError, RevisionResolver};
use serde::Serialize;

use crate::cli::Cli;
use crate::context::MgitContext;
use crate::output::{output_success, print_human};

#[derive(Serialize)]
struct RevParseOutput {
    revision: String,
    native_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    identity_hash: Option<String>,
    resolved_by: String,
}

pub fn run(cli: &Cli, revision: &str) -> Result<(), MgitError> {
    let ctx = MgitContext::discover(cli)?;
    let identity = ctx.identity()?;
    let mappings = ctx.open_mappings()?;
    let resolution =
        RevisionResolver::new(&ctx.git, &mappings, identity.identity_key.as_ref()).resolve(revision)?;

    output_success(
        cli,
        RevParseOutput {
            revision: revision.to_string(),
            native_hash: resolution.native_hash.to_hex(),
            identity_hash: resolution.identity_hash.map(|h| h.to_hex()),
            resolved_by: resolution.resolved_by.to_string(),
        },
    )?;
    print_human(cli, &resolution.native_hash.to_hex());
    Ok(())
}
