pub mod matcher;
pub mod search;
pub mod token;
