pub mod badge;
pub mod printer;
