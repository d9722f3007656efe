pub mod logging;
pub mod placeholder;
