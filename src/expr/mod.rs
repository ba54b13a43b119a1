use crate::ast::{Expr, Spanned};
use crate::bind::BindError;
use crate::instr::Instr;

/// The expression-compilation seam the binding pass depends on.
///
/// When `used` is true the returned sequence leaves exactly one value on
/// the evaluation stack; otherwise it is stack-neutral. The sequence must
/// be self-contained — the binder splices it into its own stream as-is.
pub trait ExprCompiler {
    fn compile_expr(
        &mut self,
        expr: &Spanned<Expr>,
        used: bool,
    ) -> Result<Vec<Instr>, BindError>;
}

/// Compiler for the closed `Expr` set the node tree defines: literals,
/// `self`, local reads, and array literals. The full language's
/// expression pass plugs in through the same trait.
pub struct BasicExprCompiler;

impl ExprCompiler for BasicExprCompiler {
    fn compile_expr(
        &mut self,
        expr: &Spanned<Expr>,
        used: bool,
    ) -> Result<Vec<Instr>, BindError> {
        // Everything in the closed set is side-effect-free.
        if !used {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        emit(expr, &mut out);
        Ok(out)
    }
}

fn emit(expr: &Spanned<Expr>, out: &mut Vec<Instr>) {
    match &expr.node {
        Expr::Nil => out.push(Instr::PushNil),
        Expr::Bool(b) => out.push(Instr::PushBool(*b)),
        Expr::Integer(i) => out.push(Instr::PushInt(*i)),
        Expr::Float(x) => out.push(Instr::PushFloat(*x)),
        Expr::Str(s) => out.push(Instr::PushStr(s.clone())),
        Expr::SelfRef => out.push(Instr::PushSelf),
        Expr::LocalRead(name) => out.push(Instr::VariableGet { name: name.clone() }),
        Expr::Array(elements) => {
            for element in elements {
                emit(element, out);
            }
            out.push(Instr::ArrayNew(elements.len()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(expr: Expr, used: bool) -> Vec<Instr> {
        BasicExprCompiler
            .compile_expr(&Spanned::unknown(expr), used)
            .unwrap()
    }

    #[test]
    fn literals_push_one_value() {
        assert_eq!(compile(Expr::Nil, true), vec![Instr::PushNil]);
        assert_eq!(compile(Expr::Integer(7), true), vec![Instr::PushInt(7)]);
        assert_eq!(
            compile(Expr::Str("hi".into()), true),
            vec![Instr::PushStr("hi".into())]
        );
    }

    #[test]
    fn local_read_becomes_variable_get() {
        assert_eq!(
            compile(Expr::LocalRead("x".into()), true),
            vec![Instr::VariableGet { name: "x".into() }]
        );
    }

    #[test]
    fn array_literal_builds_elements_then_array() {
        let e = Expr::Array(vec![
            Spanned::unknown(Expr::Integer(1)),
            Spanned::unknown(Expr::Integer(2)),
        ]);
        assert_eq!(
            compile(e, true),
            vec![Instr::PushInt(1), Instr::PushInt(2), Instr::ArrayNew(2)]
        );
    }

    #[test]
    fn unused_expression_emits_nothing() {
        assert_eq!(compile(Expr::Integer(5), false), Vec::<Instr>::new());
    }
}
