pub mod operator;
pub mod plan;
pub mod resolve;
pub mod translate;
