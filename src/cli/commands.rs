//! Command dispatch: maps parsed arguments onto the services.

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::cli::args::{
    Cli, Commands, ConfigCommands, ContactArgs, ProductCommands, SupplierCommands,
};
use crate::cli::error::{CliError, CliResult};
use crate::cli::{output, render};
use crate::config::{self, Settings};
use crate::domain::{
    Address, Deletability, NewProduct, NewSupplier, ProductPatch, SupplierFilter, SupplierPatch,
};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::{FileSystem, InfraError, RealFileSystem};

/// Execute the parsed command line.
pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Some(Commands::Config { command }) => {
            let settings = load_settings(cli)?;
            let ledger = ledger_path(cli, &settings);
            execute_config(command, &settings, &ledger)
        }
        Some(Commands::Supplier { command }) => {
            let container = build_container(cli)?;
            execute_supplier(command, &container)
        }
        Some(Commands::Product { command }) => {
            let container = build_container(cli)?;
            execute_product(command, &container)
        }
        None => Err(CliError::Usage(
            "no command given, see supplynet --help".into(),
        )),
    }
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let ledger_dir = cli
        .ledger
        .as_deref()
        .and_then(|p| p.parent())
        .filter(|p| !p.as_os_str().is_empty());
    Ok(Settings::load(ledger_dir)?)
}

fn build_container(cli: &Cli) -> CliResult<ServiceContainer> {
    let settings = load_settings(cli)?;
    let ledger = ledger_path(cli, &settings);
    debug!("build_container: ledger={}", ledger.display());
    Ok(ServiceContainer::new(settings, &ledger))
}

fn ledger_path(cli: &Cli, settings: &Settings) -> PathBuf {
    cli.ledger
        .clone()
        .unwrap_or_else(|| settings.ledger_path())
}

fn require(value: Option<String>, flag: &str) -> CliResult<String> {
    value.ok_or_else(|| CliError::InvalidArgs(format!("--{flag} is required")))
}

fn address(contact: &ContactArgs) -> CliResult<Address> {
    Ok(Address {
        country: require(contact.country.clone(), "country")?,
        city: require(contact.city.clone(), "city")?,
        street: require(contact.street.clone(), "street")?,
        house_number: require(contact.house_number.clone(), "house-number")?,
    })
}

#[instrument(level = "debug", skip(container))]
fn execute_supplier(command: &SupplierCommands, container: &ServiceContainer) -> CliResult<()> {
    let hierarchy = &container.hierarchy;
    let currency = container.settings.display.currency.as_str();

    match command {
        SupplierCommands::Create {
            category,
            name,
            contact,
            debt,
            parent,
        } => {
            let node = hierarchy.create(NewSupplier {
                category: *category,
                name: name.clone(),
                email: require(contact.email.clone(), "email")?,
                address: address(contact)?,
                debt: *debt,
                parent: *parent,
            })?;
            output::action("Created", &output::supplier_line(&node, currency));
        }
        SupplierCommands::Update {
            id,
            category,
            name,
            contact,
            debt,
            parent,
            root,
        } => {
            let parent = match (parent, root) {
                (_, true) => Some(None),
                (Some(p), false) => Some(Some(*p)),
                (None, false) => None,
            };
            let patch = SupplierPatch {
                category: *category,
                name: name.clone(),
                email: contact.email.clone(),
                country: contact.country.clone(),
                city: contact.city.clone(),
                street: contact.street.clone(),
                house_number: contact.house_number.clone(),
                debt: *debt,
                parent,
            };
            if patch.is_empty() {
                return Err(CliError::InvalidArgs("nothing to update".into()));
            }
            let node = hierarchy.update(*id, patch)?;
            output::action("Updated", &output::supplier_line(&node, currency));
        }
        SupplierCommands::Delete { ids } => {
            if let [id] = ids.as_slice() {
                let node = hierarchy.delete(*id)?;
                output::success(&format!("Deleted {} ({})", node, node.id));
                return Ok(());
            }
            let outcome = hierarchy.delete_many(ids)?;
            for node in &outcome.deleted {
                output::success_detail(&format!("deleted {} ({})", node, node.id));
            }
            for refusal in &outcome.refused {
                output::failure(&refusal.to_error());
            }
            if !outcome.refused.is_empty() {
                output::warning(&format!(
                    "{} of {} suppliers could not be deleted",
                    outcome.refused.len(),
                    outcome.refused.len() + outcome.deleted.len()
                ));
            }
        }
        SupplierCommands::ClearDebt { ids } => {
            for node in hierarchy.clear_debt(ids)? {
                output::success_detail(&format!("debt of {} cleared", node));
            }
        }
        SupplierCommands::List { country, city } => {
            let filter = SupplierFilter {
                country: country.clone(),
                city: city.clone(),
            };
            for node in hierarchy.list(&filter)? {
                output::info(&output::supplier_line(&node, currency));
            }
        }
        SupplierCommands::Show { id } => {
            let node = hierarchy.get(*id)?;
            output::header(&node);
            output::detail(&format!("id: {}", node.id));
            output::detail(&format!("category: {}", node.category));
            output::detail(&format!("email: {}", node.email));
            output::detail(&format!(
                "address: {}, {}, {} {}",
                node.address.country,
                node.address.city,
                node.address.street,
                node.address.house_number
            ));
            output::detail(&format!("debt: {}", output::debt(node.debt, currency)));
            output::detail(&format!("created: {}", node.created_at.to_rfc3339()));
            output::detail(&format!(
                "tree {} lft {} rght {} level {}",
                node.tree_id(),
                node.left_bound(),
                node.right_bound(),
                node.depth()
            ));
            match node.intermediaries() {
                None => output::detail(&"first link of its chain"),
                Some(n) => output::detail(&format!("intermediaries to the head: {n}")),
            }
            let chain = hierarchy.ancestors(*id)?;
            if !chain.is_empty() {
                let names: Vec<String> = chain.iter().map(|n| n.name.clone()).collect();
                output::detail(&format!("chain: {}", names.join(" > ")));
            }
            let products = container.products.list(Some(*id))?;
            if !products.is_empty() {
                output::header(&"Products");
                for product in &products {
                    output::detail(&output::product_line(product));
                }
            }
        }
        SupplierCommands::Tree { id } => {
            let index = hierarchy.forest()?;
            let label = |n: &crate::domain::SupplierNode| {
                format!("{} ({}) {}", n, n.id, output::debt(n.debt, currency))
            };
            match id {
                Some(id) => {
                    let node = hierarchy.get(*id)?;
                    let root = index.get(node.id).unwrap_or(&node);
                    output::info(&render::subtree(&index, root, label));
                }
                None => {
                    for tree in render::forest(&index, label) {
                        output::info(&tree);
                    }
                }
            }
        }
        SupplierCommands::CanDelete { id } => match hierarchy.can_delete(*id)? {
            Deletability::Allowed => output::success(&format!("supplier {id} can be deleted")),
            Deletability::Blocked(blocker) => {
                let kind = if blocker.is_own_debt() {
                    "own debt"
                } else {
                    "next-level supplier debt"
                };
                output::failure(&format!(
                    "blocked by {} ({}): {}",
                    blocker.blocking_name(),
                    blocker.blocking_id(),
                    kind
                ));
            }
        },
        SupplierCommands::Rebuild => {
            let stats = hierarchy.rebuild()?;
            output::success(&format!(
                "rebuilt {} suppliers in {} trees",
                stats.nodes, stats.trees
            ));
        }
        SupplierCommands::Verify => {
            hierarchy.verify()?;
            output::success(&"tree encoding is consistent");
        }
    }
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn execute_product(command: &ProductCommands, container: &ServiceContainer) -> CliResult<()> {
    let products = &container.products;

    match command {
        ProductCommands::Create {
            name,
            model,
            release_date,
            supplier,
        } => {
            let product = products.create(NewProduct {
                name: name.clone(),
                model: model.clone(),
                release_date: *release_date,
                supplier: *supplier,
            })?;
            output::action("Created", &output::product_line(&product));
        }
        ProductCommands::Update {
            id,
            name,
            model,
            release_date,
            supplier,
        } => {
            let product = products.update(
                *id,
                ProductPatch {
                    name: name.clone(),
                    model: model.clone(),
                    release_date: *release_date,
                    supplier: *supplier,
                },
            )?;
            output::action("Updated", &output::product_line(&product));
        }
        ProductCommands::Delete { id } => {
            let product = products.delete(*id)?;
            output::success(&format!("Deleted product {} ({})", product, product.id));
        }
        ProductCommands::List { supplier } => {
            for product in products.list(*supplier)? {
                output::info(&output::product_line(&product));
            }
        }
        ProductCommands::Show { id } => {
            output::info(&output::product_line(&products.get(*id)?));
        }
    }
    Ok(())
}

fn execute_config(command: &ConfigCommands, settings: &Settings, ledger: &Path) -> CliResult<()> {
    match command {
        ConfigCommands::Show => output::info(&settings.to_toml()?),
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Init { global } => {
            let path = if *global {
                config::global_config_path().ok_or_else(|| {
                    CliError::InvalidArgs("no config directory for this platform".into())
                })?
            } else {
                config::local_config_path(ledger.parent().unwrap_or(Path::new(".")))
            };
            write_template(&RealFileSystem, &path)?;
            output::success(&format!("config template written to {}", path.display()));
        }
        ConfigCommands::Path => {
            match config::global_config_path() {
                Some(path) => output::detail(&format!("global: {}", path.display())),
                None => output::warning(&"no config directory for this platform"),
            }
            if let Some(dir) = ledger.parent() {
                output::detail(&format!(
                    "local:  {}",
                    config::local_config_path(dir).display()
                ));
            }
            output::detail(&format!("ledger: {}", ledger.display()));
        }
    }
    Ok(())
}

/// Existing config files are never overwritten.
fn write_template(fs: &dyn FileSystem, path: &Path) -> CliResult<()> {
    if fs.exists(path) {
        return Err(CliError::InvalidArgs(format!(
            "{} already exists",
            path.display()
        )));
    }
    let context = || format!("write config template {}", path.display());
    fs.ensure_parent(path)
        .map_err(|e| InfraError::io(context(), e))?;
    fs.write_atomic(path, &Settings::template())
        .map_err(|e| InfraError::io(context(), e))?;
    debug!("write_template: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn given_existing_config_when_writing_template_then_refused_and_kept() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let path = config::local_config_path(&dir.path().join("nested"));

        // Act
        write_template(&RealFileSystem, &path).unwrap();
        std::fs::write(&path, "ledger_file = \"mine.toml\"\n").unwrap();
        let err = write_template(&RealFileSystem, &path).unwrap_err();

        // Assert
        assert_eq!(err.exit_code(), crate::exitcode::USAGE);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "ledger_file = \"mine.toml\"\n"
        );
    }
}
