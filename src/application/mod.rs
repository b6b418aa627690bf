pub mod dom_scanner;
pub mod network_extractor;
pub mod reconciler;
pub mod signal;
