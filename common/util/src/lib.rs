pub mod assert;
pub mod decimal;
pub mod sorting;
pub mod source;
