pub mod record;
pub mod run;
pub mod slate;

// Re-exports for convenience
pub use record::*;
pub use run::*;
pub use slate::*;
