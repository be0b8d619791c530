use std::path::PathBuf;

use comfy_table::{presets::UTF8_FULL, Table};
use libmgit_core::{CommitStore, IdentityKey, MappingEntry, MgitError};
use serde::Serialize;

use super::reconstruct::ImportCounts;
use crate::cli::{Cli, MappingsCommand};
use crate::context::MgitContext;
use crate::output::{output_success, print_human};

#[derive(Serialize)]
struct ListOutput<'a> {
    count: usize,
    mappings: Vec<&'a MappingEntry>,
}

#[derive(Serialize)]
struct ExportOutput {
    count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

pub fn run(cli: &Cli, cmd: MappingsCommand) -> Result<(), MgitError> {
    match cmd {
        MappingsCommand::List { key } => run_list(cli, key),
        MappingsCommand::Import { file } => run_import(cli, file),
        MappingsCommand::Export { output } => run_export(cli, output),
    }
}

fn run_list(cli: &Cli, key: Option<String>) -> Result<(), MgitError> {
    let ctx = MgitContext::discover(cli)?;
    let mappings = ctx.open_mappings()?;
    let entries: Vec<&MappingEntry> = match key {
        Some(key) => mappings.lookup_by_identity_key(&IdentityKey::new(key)?),
        None => mappings.all().iter().collect(),
    };

    if cli.json {
        return output_success(
            cli,
            ListOutput {
                count: entries.len(),
                mappings: entries,
            },
        );
    }
    if entries.is_empty() {
        print_human(cli, "No mappings");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Native", "Identity", "Key"]);
    for entry in &entries {
        table.add_row(vec![
            entry.native_hash.to_hex(),
            entry.identity_hash.to_hex(),
            entry.identity_key.to_string(),
        ]);
    }
    print_human(cli, &table.to_string());
    Ok(())
}

fn run_import(cli: &Cli, file: PathBuf) -> Result<(), MgitError> {
    let ctx = MgitContext::discover(cli)?;
    let store = CommitStore::initialize(&ctx.store_root)?;
    let _lock = store.lock()?;
    let mut mappings = ctx.open_mappings()?;

    let payload = std::fs::read(&file)?;
    let counts = ImportCounts::from(mappings.ingest(&payload, &ctx.git)?);

    output_success(cli, counts)?;
    print_human(
        cli,
        &format!(
            "Imported {} mapping(s), {} already present",
            counts.appended, counts.already_present
        ),
    );
    if counts.appended > 0 {
        print_human(cli, "Run 'mgit reconstruct' to rebuild identity commits");
    }
    Ok(())
}

fn run_export(cli: &Cli, output: Option<PathBuf>) -> Result<(), MgitError> {
    let ctx = MgitContext::discover(cli)?;
    let mappings = ctx.open_mappings()?;
    let payload = mappings.export_json()?;

    match &output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", payload))?;
            output_success(
                cli,
                ExportOutput {
                    count: mappings.len(),
                    path: Some(path.to_string_lossy().into_owned()),
                },
            )?;
            print_human(cli, &format!("Exported {} mapping(s) to {}", mappings.len(), path.display()));
        }
        None if cli.json => output_success(cli, mappings.all())?,
        None => println!("{}", payload),
    }
    Ok(())
}
