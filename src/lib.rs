//! beryl lowers ordered binding-target lists — method parameter lists
//! and the left-hand sides of multiple assignments — into flat
//! stack-machine instruction sequences, and ships a reference machine
//! that executes them.
//!
//! The pipeline: [`arity::Arity`] flattens a parameter list into the
//! order the binder expects, [`bind::ArgBinder`] lowers the list into
//! [`instr::Instr`] sequences (delegating default expressions to an
//! [`expr::ExprCompiler`]), and [`machine::Machine`] runs the result
//! against an argument array.

pub mod arity;
pub mod ast;
pub mod bind;
pub mod diagnostic;
pub mod expr;
pub mod instr;
pub mod machine;
