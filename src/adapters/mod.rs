// Adapters layer: concrete implementations for external systems (input files, output files, storage).

pub mod readers;
pub mod storage;
pub mod writer;
