pub mod apply;
pub mod audit;
pub mod config;
pub mod dom;
pub mod element;
pub mod error;
pub mod generate;
pub mod index;
pub mod issue;
pub mod locator;
pub mod manager;
pub mod pipeline;
pub mod report;
pub mod standards;
pub mod strategies;

pub mod prelude {
    pub use crate::error::*;
    pub use crate::issue::*;
}
