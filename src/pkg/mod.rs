pub mod library;
pub mod symbol;
