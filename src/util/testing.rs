//! Shared test setup: logging and small fixtures.

use std::env;
use std::sync::Once;

use chrono::Utc;
use tracing::{debug, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::{Address, Amount, Category, NewSupplier, SupplierId, SupplierNode};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "debug");
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_test_writer()
            .with_filter(env_filter),
    );

    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Creation input with a unique email and a fixed Moscow address.
///
/// Roots become factories, attached nodes retail chains.
pub fn draft(name: &str, parent: Option<SupplierId>, debt_cents: i64) -> NewSupplier {
    NewSupplier {
        category: if parent.is_some() {
            Category::Retail
        } else {
            Category::Factory
        },
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase().replace(' ', "_")),
        address: Address {
            country: "Russia".into(),
            city: "Moscow".into(),
            street: "Lenina".into(),
            house_number: "1".into(),
        },
        debt: Amount::from_cents(debt_cents),
        parent,
    }
}

/// Unplaced node for exercising the tree index directly.
pub fn supplier(id: u64, name: &str, parent: Option<u64>) -> SupplierNode {
    SupplierNode::new(
        SupplierId(id),
        draft(name, parent.map(SupplierId), 0),
        Utc::now(),
    )
}
