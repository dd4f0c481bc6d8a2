pub mod anthropic;
pub mod base;
pub mod configs;
pub mod perplexity;

#[cfg(any(test, feature = "testing"))]
pub mod mock;
