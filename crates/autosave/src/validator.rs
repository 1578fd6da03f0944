use stocktake_catalog::Catalog;
use stocktake_records::CyclicItem;
use stocktake_validation::validate;

/// Gate run before every write.
///
/// A rejection aborts the save with the first blocking error and is **never
/// retried** — the user has to fix the data, not wait it out.
pub trait SaveValidator: Send + Sync + 'static {
    fn validate_batch(&self, batch: &[CyclicItem]) -> Result<(), String>;
}

/// Standard gate: the validation engine against a catalog collaborator.
pub struct CatalogValidator<C> {
    catalog: C,
}

impl<C: Catalog + Send + Sync + 'static> CatalogValidator<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }
}

impl<C: Catalog + Send + Sync + 'static> SaveValidator for CatalogValidator<C> {
    fn validate_batch(&self, batch: &[CyclicItem]) -> Result<(), String> {
        let report = validate(batch, &self.catalog);
        match report.first_error() {
            Some(err) => Err(err.to_string()),
            None => Ok(()),
        }
    }
}
