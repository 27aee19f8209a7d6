//! Subcommand execution.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tracing::info;
use treegraft_core::{
    export, safe_clone, Catalog, CloneOutcome, Cloner, CollectConfig, Collector, Error, Identity,
    Importer, RunReport, SledStorage, Storage, Transaction,
};

use crate::config::{collect_config, Args, AutoFind, Command};
use crate::error::CliError;
use crate::formatter::{format_report, format_shared};

/// Run the parsed command line.
pub fn run(args: Args) -> Result<(), CliError> {
    let catalog = load_catalog(&args.catalog)?;
    let mut storage = SledStorage::open(&args.storage_config())?;

    match args.command {
        Command::CloneTree {
            type_name,
            identity,
            exclude,
            safe,
            max_depth,
            dry_run,
        } => {
            let config = collect_config(&exclude, max_depth);
            let outcome = clone_tree(
                &catalog,
                &mut storage,
                &type_name,
                Identity(identity),
                &config,
                safe,
                dry_run,
            );
            let outcome = match outcome {
                Err(Error::CrossLinkedClone { shared }) => {
                    println!("{}", format_shared(&shared));
                    return Err(Error::CrossLinkedClone { shared }.into());
                }
                other => other?,
            };
            println!("{}", format_report(&outcome.report, !dry_run));
        }

        Command::ImportTree {
            file,
            reuse,
            dry_run,
            quiet,
        } => {
            let json = fs::read_to_string(&file).map_err(|e| CliError::file(&file, e))?;
            let report = import_tree(&catalog, &mut storage, &json, &reuse, dry_run)?;
            if !quiet {
                println!("{}", format_report(&report, !dry_run));
            }
        }

        Command::ExportTree {
            type_name,
            identity,
            exclude,
            output,
        } => {
            let json = export_tree(
                &catalog,
                &storage,
                &type_name,
                Identity(identity),
                &collect_config(&exclude, None),
            )?;
            match output {
                Some(path) => {
                    fs::write(&path, json).map_err(|e| CliError::file(&path, e))?;
                    info!(path = %path.display(), "tree exported");
                }
                None => writeln!(io::stdout().lock(), "{json}")?,
            }
        }
    }

    storage.flush()?;
    Ok(())
}

/// Load and validate a catalog file.
pub fn load_catalog(path: &Path) -> Result<Catalog, CliError> {
    let json = fs::read_to_string(path).map_err(|e| CliError::file(path, e))?;
    Ok(Catalog::from_json(&json)?)
}

/// Clone the tree under `seed`, committing unless `dry_run`.
pub fn clone_tree(
    catalog: &Catalog,
    storage: &mut dyn Storage,
    type_name: &str,
    seed: Identity,
    config: &CollectConfig,
    safe: bool,
    dry_run: bool,
) -> Result<CloneOutcome, Error> {
    let mut cloner = Cloner::new(catalog);
    let mut tx = Transaction::begin(storage);

    let outcome = if safe {
        safe_clone(&mut tx, type_name, seed, config, &mut cloner)?
    } else {
        let set = Collector::new(catalog, &tx)
            .with_config(config.clone())
            .collect_from(type_name, seed)?;
        cloner.clone(&mut tx, &set)?
    };

    if dry_run {
        tx.rollback();
    } else {
        tx.commit()?;
    }
    Ok(outcome)
}

/// Import a JSON dataset, committing unless `dry_run`.
pub fn import_tree(
    catalog: &Catalog,
    storage: &mut dyn Storage,
    json: &str,
    reuse: &[AutoFind],
    dry_run: bool,
) -> Result<RunReport, CliError> {
    let mut importer = Importer::from_serialized(catalog, json)?;
    for lookup in reuse {
        let fields: Vec<&str> = lookup.fields.iter().map(String::as_str).collect();
        importer.add_auto_find_existing(&lookup.type_name, &fields)?;
    }

    let mut tx = Transaction::begin(storage);
    let outcome = importer.run(&mut tx)?;
    if dry_run {
        tx.rollback();
    } else {
        tx.commit()?;
    }
    Ok(outcome.report)
}

/// Collect the tree under `seed` and serialize it.
pub fn export_tree(
    catalog: &Catalog,
    storage: &dyn Storage,
    type_name: &str,
    seed: Identity,
    config: &CollectConfig,
) -> Result<String, CliError> {
    let set = Collector::new(catalog, storage)
        .with_config(config.clone())
        .collect_from(type_name, seed)?;
    Ok(export(&set).to_json()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use treegraft_core::{FieldDef, MemoryStorage, Record, RelationDef, TypeDef};

    fn catalog() -> Catalog {
        Catalog::new()
            .with_type(TypeDef::new("Organisation").with_field(FieldDef::new("name")))
            .with_type(TypeDef::new("Meeting"))
            .with_relation(RelationDef::one("Meeting", "organisation", "Organisation").required())
    }

    fn storage() -> MemoryStorage {
        let mut storage = MemoryStorage::new();
        storage
            .insert(&Record::new("Organisation", Identity(1)).with_field("name", "Acme"))
            .unwrap();
        storage
            .insert(&Record::new("Meeting", Identity(1)).with_field("organisation", Identity(1)))
            .unwrap();
        storage
    }

    #[test]
    fn test_dry_run_clone_writes_nothing() {
        let catalog = catalog();
        let mut storage = storage();
        let config = collect_config(&["Organisation".to_string()], None);

        let outcome = clone_tree(
            &catalog,
            &mut storage,
            "Meeting",
            Identity(1),
            &config,
            false,
            true,
        )
        .unwrap();

        assert_eq!(outcome.report.total_created(), 1);
        assert_eq!(storage.count("Meeting").unwrap(), 1);
    }

    #[test]
    fn test_safe_clone_commits() {
        let catalog = catalog();
        let mut storage = storage();
        let config = collect_config(&["Organisation".to_string()], None);

        clone_tree(&catalog, &mut storage, "Meeting", Identity(1), &config, true, false).unwrap();

        assert_eq!(storage.count("Meeting").unwrap(), 2);
        assert_eq!(storage.count("Organisation").unwrap(), 1);
    }

    #[test]
    fn test_export_then_import_with_reuse() {
        let catalog = catalog();
        let source = storage();
        let json = export_tree(
            &catalog,
            &source,
            "Meeting",
            Identity(1),
            &CollectConfig::new(),
        )
        .unwrap();

        let mut target = storage();
        let reuse = vec!["Organisation:name".parse::<AutoFind>().unwrap()];
        let report = import_tree(&catalog, &mut target, &json, &reuse, false).unwrap();

        assert_eq!(report.total_reused(), 1);
        assert_eq!(report.total_created(), 1);
        assert_eq!(target.count("Organisation").unwrap(), 1);
        assert_eq!(target.count("Meeting").unwrap(), 2);
    }

    #[test]
    fn test_malformed_dataset_is_rejected() {
        let catalog = catalog();
        let mut target = storage();

        let err = import_tree(&catalog, &mut target, "{\"type\": 1}", &[], false).unwrap_err();

        assert!(matches!(err, CliError::Core(Error::Deserialization(_))));
        assert_eq!(target.count("Meeting").unwrap(), 1);
    }

    #[test]
    fn test_load_catalog_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_catalog(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, CliError::File { .. }));
    }
}
