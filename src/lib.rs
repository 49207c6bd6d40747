pub mod binning;
pub mod chunks;
pub mod data;
pub mod options;
pub mod region;
pub mod sequences;
pub mod store;
