//! Library half of the `saleradar` binary, split out so commands and
//! wiring can be exercised directly from integration tests.

pub mod commands;
pub mod wiring;
