// Core modules implementing URL mapping, the tree rewriter, and error modeling.
pub mod error;
pub mod location;
pub mod stage;
pub mod transfer;
pub mod visit;
