pub mod monitor;

pub use monitor::{load_config_default, load_config_from, AdapterSettings, MonitorConfig};
