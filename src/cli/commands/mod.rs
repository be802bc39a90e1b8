pub mod dump;
pub mod filter;
pub mod generate;
pub mod measure;
pub mod run;
pub mod select;
