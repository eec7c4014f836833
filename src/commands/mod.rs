pub mod function;
pub mod stack;
