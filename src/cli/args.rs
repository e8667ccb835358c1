//! CLI argument definitions using clap

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueHint};

use crate::domain::{Amount, Category, ProductId, SupplierId};

/// Supplier hierarchy ledger: factories, retail chains, entrepreneurs and their debts
#[derive(Parser, Debug)]
#[command(name = "supplynet")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short = 'd', long = "debug", action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Ledger file (default: from config)
    #[arg(long, global = true, env = "SUPPLYNET_LEDGER", value_hint = ValueHint::FilePath)]
    pub ledger: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage suppliers and their hierarchy
    Supplier {
        #[command(subcommand)]
        command: SupplierCommands,
    },

    /// Manage products
    Product {
        #[command(subcommand)]
        command: ProductCommands,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Address and contact fields shared by create and update.
#[derive(Args, Debug, Clone, Default)]
pub struct ContactArgs {
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub street: Option<String>,
    #[arg(long)]
    pub house_number: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum SupplierCommands {
    /// Create a supplier
    Create {
        /// factory, retail or entrepreneur
        #[arg(long)]
        category: Category,
        #[arg(long)]
        name: String,
        #[command(flatten)]
        contact: ContactArgs,
        /// Debt owed to the parent, e.g. 1250.50
        #[arg(long, default_value = "0")]
        debt: Amount,
        /// Parent supplier id
        #[arg(long)]
        parent: Option<SupplierId>,
    },
    /// Change supplier fields or move it in the hierarchy
    Update {
        id: SupplierId,
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        contact: ContactArgs,
        /// Rejected unless equal to the current debt, use clear-debt
        #[arg(long)]
        debt: Option<Amount>,
        /// New parent supplier id
        #[arg(long, conflicts_with = "root")]
        parent: Option<SupplierId>,
        /// Detach from the parent and become a root
        #[arg(long)]
        root: bool,
    },
    /// Delete suppliers, promoting their children
    Delete {
        #[arg(required = true)]
        ids: Vec<SupplierId>,
    },
    /// Reset debt to zero
    ClearDebt {
        #[arg(required = true)]
        ids: Vec<SupplierId>,
    },
    /// List suppliers in hierarchy order
    List {
        /// Country contains (case-insensitive)
        #[arg(long)]
        country: Option<String>,
        /// City equals (case-insensitive)
        #[arg(long)]
        city: Option<String>,
    },
    /// Show one supplier with its chain and products
    Show { id: SupplierId },
    /// Show the forest, or the subtree below one supplier
    Tree { id: Option<SupplierId> },
    /// Check whether a supplier could be deleted
    CanDelete { id: SupplierId },
    /// Renumber the tree encoding from parent links
    Rebuild,
    /// Check the stored tree encoding
    Verify,
}

#[derive(Subcommand, Debug)]
pub enum ProductCommands {
    /// Create a product
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        model: String,
        /// Release date (YYYY-MM-DD)
        #[arg(long)]
        release_date: NaiveDate,
        /// Owning supplier id
        #[arg(long)]
        supplier: SupplierId,
    },
    /// Change product fields
    Update {
        id: ProductId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        release_date: Option<NaiveDate>,
        #[arg(long)]
        supplier: Option<SupplierId>,
    },
    /// Delete a product
    Delete { id: ProductId },
    /// List products
    List {
        /// Only products of this supplier
        #[arg(long)]
        supplier: Option<SupplierId>,
    },
    /// Show one product
    Show { id: ProductId },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Print a commented config template
    Template,
    /// Write the template to a config file
    Init {
        /// Write the global file instead of the one next to the ledger
        #[arg(short, long)]
        global: bool,
    },
    /// Show config file locations
    Path,
}
