pub mod value;
pub mod env;
pub mod host;
pub mod builtins;
pub mod interpreter;
