pub mod catalog;
pub mod leads;

#[cfg(test)]
mod catalog_test;

pub use catalog::CatalogService;
pub use leads::LeadService;
