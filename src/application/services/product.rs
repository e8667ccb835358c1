//! Product service
//!
//! Products hang off exactly one supplier and have no structural role.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::guard;
use crate::domain::{
    DomainError, EntityKind, NewProduct, Product, ProductId, ProductPatch, SupplierId,
};
use crate::infrastructure::traits::{LedgerStore, SupplierRepository};

pub struct ProductService {
    store: Arc<dyn LedgerStore>,
}

impl ProductService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// No two products of one supplier share name, model and release date.
    fn ensure_unique(repo: &dyn SupplierRepository, candidate: &Product) -> ApplicationResult<()> {
        let clash = repo.products_of(candidate.supplier).into_iter().any(|p| {
            p.id != candidate.id
                && p.name == candidate.name
                && p.model == candidate.model
                && p.release_date == candidate.release_date
        });
        if clash {
            return Err(DomainError::validation(
                "name",
                "product with this name, model, release date and supplier already exists",
            )
            .into());
        }
        Ok(())
    }

    fn ensure_owner(repo: &dyn SupplierRepository, supplier: SupplierId) -> ApplicationResult<()> {
        match repo.get_supplier(supplier) {
            Ok(_) => Ok(()),
            Err(ApplicationError::Domain(DomainError::NotFound { .. })) => {
                Err(DomainError::not_found(EntityKind::Owner, supplier).into())
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(level = "debug", skip(self, draft), fields(name = %draft.name))]
    pub fn create(&self, draft: NewProduct) -> ApplicationResult<Product> {
        guard::validate_product(&draft.name, &draft.model)?;
        let product = self.store.run_in_transaction(|repo| {
            Self::ensure_owner(repo, draft.supplier)?;
            // Id 0 is never assigned, so the candidate cannot match itself
            Self::ensure_unique(repo, &Product::new(ProductId(0), draft.clone()))?;
            let id = repo.insert_product(draft)?;
            repo.get_product(id)
        })?;
        info!("created product {} '{}' for supplier {}", product.id, product.name, product.supplier);
        Ok(product)
    }

    #[instrument(level = "debug", skip(self, patch))]
    pub fn update(&self, id: ProductId, patch: ProductPatch) -> ApplicationResult<Product> {
        let product = self.store.run_in_transaction(|repo| {
            let mut product = repo.get_product(id)?;
            if let Some(name) = patch.name {
                product.name = name;
            }
            if let Some(model) = patch.model {
                product.model = model;
            }
            if let Some(release_date) = patch.release_date {
                product.release_date = release_date;
            }
            if let Some(supplier) = patch.supplier {
                Self::ensure_owner(repo, supplier)?;
                product.supplier = supplier;
            }
            guard::validate_product(&product.name, &product.model)?;
            Self::ensure_unique(repo, &product)?;
            repo.update_product(product.clone())?;
            Ok(product)
        })?;
        info!("updated product {} '{}'", product.id, product.name);
        Ok(product)
    }

    pub fn delete(&self, id: ProductId) -> ApplicationResult<Product> {
        let product = self
            .store
            .run_in_transaction(|repo| repo.delete_product(id))?;
        info!("deleted product {} '{}'", product.id, product.name);
        Ok(product)
    }

    pub fn get(&self, id: ProductId) -> ApplicationResult<Product> {
        self.store.snapshot()?.get_product(id)
    }

    /// All products, or those of one supplier.
    pub fn list(&self, supplier: Option<SupplierId>) -> ApplicationResult<Vec<Product>> {
        let ledger = self.store.snapshot()?;
        match supplier {
            Some(id) => {
                ledger.get_supplier(id)?;
                Ok(ledger.products_of(id))
            }
            None => Ok(ledger.all_products()),
        }
    }
}
