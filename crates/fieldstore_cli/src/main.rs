//! CLI smoke entry point.
//!
//! Opens (or creates) a store, bootstraps it, and prints the top of the tree.
//!
//! Usage: `fieldstore_cli [db_path | config.json]`

use fieldstore_core::{
    core_version, init_logging, open_provider, open_provider_in_memory, AppConfig, ItemId,
    ProviderConfig, ProviderResult, SqliteItemProvider,
};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("fieldstore_core version={}", core_version());

    let provider = match open_from_args(std::env::args().nth(1)) {
        Ok(provider) => provider,
        Err(err) => {
            eprintln!("failed to open store: {err}");
            return ExitCode::FAILURE;
        }
    };

    match print_tree(&provider) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("failed to read store: {err}");
            ExitCode::FAILURE
        }
    }
}

fn open_from_args(arg: Option<String>) -> Result<SqliteItemProvider, String> {
    let Some(arg) = arg else {
        return open_provider_in_memory(&ProviderConfig::default()).map_err(|err| err.to_string());
    };

    let path = Path::new(&arg);
    if path.extension().is_some_and(|ext| ext == "json") {
        let config = AppConfig::from_json_file(path).map_err(|err| err.to_string())?;
        if let Some(logging) = &config.logging {
            init_logging(logging)?;
        }
        return open_provider(&config.database_path, &config.provider)
            .map_err(|err| err.to_string());
    }

    open_provider(path, &ProviderConfig::default()).map_err(|err| err.to_string())
}

fn print_tree(provider: &SqliteItemProvider) -> ProviderResult<()> {
    let root_id = provider.get_root_id();
    println!("join_parent={}", provider.join_parent_id());
    print_item(provider, root_id, 0)?;
    for child_id in provider.get_child_ids(root_id)? {
        print_item(provider, child_id, 1)?;
    }
    Ok(())
}

fn print_item(provider: &SqliteItemProvider, item_id: ItemId, depth: usize) -> ProviderResult<()> {
    let indent = "  ".repeat(depth);
    match provider.get_item_definition(item_id)? {
        Some(definition) => {
            let versions = provider
                .get_item_versions(item_id)?
                .unwrap_or_default()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            println!(
                "{indent}{} id={} template={} versions=[{}]",
                definition.name, definition.id, definition.template_id, versions
            );
        }
        None => println!("{indent}<missing> id={item_id}"),
    }
    Ok(())
}
