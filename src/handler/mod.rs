pub mod ingest;
pub mod reconcile;
