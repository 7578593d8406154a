pub mod context;
pub mod error;
pub mod logging;

pub use context::AppContext;
pub use error::{ExtractError, Result};
pub use logging::init_logging;
