//! Query compilation and execution.

mod compile;
mod executor;

pub use compile::{
    ColumnRef, CompiledCondition, CompiledJoin, CompiledMutation, CompiledOrder, CompiledQuery,
    Compiler,
};
pub use executor::Executor;
