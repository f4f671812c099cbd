pub mod cli;
pub mod errors;
pub mod loader;

pub use cli::{CliRequest, run};
pub use errors::FrontendError;
pub use loader::{LoadedDrawing, load_drawing};
