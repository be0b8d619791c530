use libmgit_core::config::IDENTITY_KEYS;
use libmgit_core::MgitError;
use libmgit_git::{ConfigFiles, ConfigScope};
use serde::Serialize;

use crate::cli::Cli;
use crate::context::{global_only_config, MgitContext};
use crate::output::{output_success, print_human};

#[derive(Serialize)]
struct ConfigEntry {
    key: String,
    value: String,
    scope: String,
}

#[derive(Serialize)]
struct ConfigListOutput {
    entries: Vec<ConfigEntry>,
}

pub fn run(
    cli: &Cli,
    global: bool,
    list: bool,
    key: Option<&str>,
    value: Option<&str>,
) -> Result<(), MgitError> {
    let files = config_files(cli, global)?;
    let scope = if global { ConfigScope::Global } else { ConfigScope::Local };

    if list {
        return run_list(cli, &files, global);
    }
    let key = key.ok_or_else(|| MgitError::InvalidArgs("config key required".to_string()))?;

    match value {
        Some(value) => {
            files.set(scope, key, value)?;
            output_success(
                cli,
                ConfigEntry {
                    key: key.to_string(),
                    value: value.to_string(),
                    scope: scope.to_string(),
                },
            )?;
            print_human(cli, &format!("Set {} ({})", key, scope));
        }
        None => {
            let found = if global {
                files
                    .read_scope(ConfigScope::Global)?
                    .get(key)
                    .map(|v| (v.to_string(), ConfigScope::Global))
            } else {
                files.get(key)?
            };
            let (value, scope) =
                found.ok_or_else(|| MgitError::NotFound(format!("config value '{}'", key)))?;
            output_success(
                cli,
                ConfigEntry {
                    key: key.to_string(),
                    value: value.clone(),
                    scope: scope.to_string(),
                },
            )?;
            print_human(cli, &value);
        }
    }
    Ok(())
}

fn run_list(cli: &Cli, files: &ConfigFiles, global: bool) -> Result<(), MgitError> {
    let entries: Vec<ConfigEntry> = if global {
        let values = files.read_scope(ConfigScope::Global)?;
        IDENTITY_KEYS
            .iter()
            .filter_map(|key| {
                values.get(key).map(|value| ConfigEntry {
                    key: key.to_string(),
                    value: value.to_string(),
                    scope: ConfigScope::Global.to_string(),
                })
            })
            .collect()
    } else {
        files
            .list()?
            .into_iter()
            .map(|(key, value, scope)| ConfigEntry {
                key,
                value,
                scope: scope.to_string(),
            })
            .collect()
    };

    for entry in &entries {
        print_human(cli, &format!("{}={}\t({})", entry.key, entry.value, entry.scope));
    }
    output_success(cli, ConfigListOutput { entries })
}

/// Repository config when inside one; `--global` also works outside
fn config_files(cli: &Cli, global: bool) -> Result<ConfigFiles, MgitError> {
    match MgitContext::discover(cli) {
        Ok(ctx) => Ok(ctx.config),
        Err(_) if global => global_only_config(cli),
        Err(e) => Err(e),
    }
}
