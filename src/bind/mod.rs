use std::collections::VecDeque;
use std::sync::OnceLock;

use regex::Regex;

use crate::ast::{Expr, Span, Spanned, Target};
use crate::expr::ExprCompiler;
use crate::instr::Instr;

#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("{file}: unhandled assignment target: {kind}")]
    UnhandledTarget {
        file: String,
        span: Span,
        kind: &'static str,
    },
    #[error("{file}: cannot splat {kind}; expected {expected}")]
    IllegalSplatTarget {
        file: String,
        span: Span,
        kind: &'static str,
        expected: &'static str,
    },
    #[error("{file}: circular argument reference - {name}")]
    CircularDefault {
        file: String,
        span: Span,
        name: String,
    },
    #[error("{file}: malformed variable name: {name:?}")]
    MalformedName {
        file: String,
        span: Span,
        name: String,
    },
}

impl BindError {
    pub fn file(&self) -> &str {
        match self {
            BindError::UnhandledTarget { file, .. }
            | BindError::IllegalSplatTarget { file, .. }
            | BindError::CircularDefault { file, .. }
            | BindError::MalformedName { file, .. } => file,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            BindError::UnhandledTarget { span, .. }
            | BindError::IllegalSplatTarget { span, .. }
            | BindError::CircularDefault { span, .. }
            | BindError::MalformedName { span, .. } => *span,
        }
    }

    /// Stable diagnostic code (see `diagnostic::registry`).
    pub fn code(&self) -> &'static str {
        match self {
            BindError::UnhandledTarget { .. } => "BRL-B001",
            BindError::IllegalSplatTarget { .. } => "BRL-B002",
            BindError::CircularDefault { .. } => "BRL-B003",
            BindError::MalformedName { .. } => "BRL-B004",
        }
    }
}

type Result<T> = std::result::Result<T, BindError>;

/// Which end of the working list is being consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn flip(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Whether a target's lowering flips the consumption direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Next,
    Reverse,
}

/// Per-invocation working state. A nested destructuring target gets a
/// fresh one, so sibling and nested compilations cannot interfere.
struct State<'t> {
    work: VecDeque<&'t Spanned<Target>>,
    out: Vec<Instr>,
    side: Side,
    kwhash_on_stack: bool,
    has_kwsplat: bool,
    underscore_bound: bool,
}

impl<'t> State<'t> {
    fn new(work: VecDeque<&'t Spanned<Target>>) -> Self {
        State {
            work,
            out: Vec::new(),
            side: Side::Left,
            kwhash_on_stack: false,
            has_kwsplat: false,
            underscore_bound: false,
        }
    }

    fn emit(&mut self, instr: Instr) {
        self.out.push(instr);
    }

    /// Required positionals still waiting in the working list. Local
    /// variable targets don't count: optional parameters never coexist
    /// with them.
    fn pending_requireds(&self) -> bool {
        self.work
            .iter()
            .any(|t| matches!(t.node, Target::Required { .. }))
    }

    fn pending_keywords(&self) -> bool {
        self.work.iter().any(|t| {
            matches!(
                t.node,
                Target::RequiredKeyword { .. } | Target::OptionalKeyword { .. }
            )
        })
    }

    fn pending_kwrest(&self) -> bool {
        self.work
            .iter()
            .any(|t| matches!(t.node, Target::KeywordRest { .. }))
    }

    /// One positional element off the argument array, from the active end.
    fn shift_or_pop(&mut self) {
        self.emit(match self.side {
            Side::Left => Instr::ArrayShift,
            Side::Right => Instr::ArrayPop,
        });
    }

    /// Same, but the variant that falls back to an already-pushed default
    /// when the array is exhausted.
    fn shift_or_pop_with_default(&mut self) {
        self.emit(match self.side {
            Side::Left => Instr::ArrayShiftWithDefault,
            Side::Right => Instr::ArrayPopWithDefault,
        });
    }

    /// Bring the keyword hash to the top of the stack. Happens at most
    /// once per invocation; every keyword-bearing target shares it.
    fn relocate_kwhash(&mut self) {
        if !self.kwhash_on_stack {
            self.emit(Instr::Swap);
            self.kwhash_on_stack = true;
        }
    }

    /// Discharge a relocated keyword hash: unless a keyword splat
    /// absorbed the leftovers, extra keys are a runtime error; either way
    /// the hash comes off the stack.
    fn cleanup_keywords(&mut self) {
        if self.kwhash_on_stack {
            if !self.has_kwsplat {
                self.emit(Instr::CheckExtraKeywords);
            }
            self.emit(Instr::Pop);
        }
        self.kwhash_on_stack = false;
    }
}

/// Lowers a parameter list or multiple-assignment target list into the
/// instruction sequence that binds incoming arguments at call time.
///
/// The working list is consumed from one end at a time; rest-like targets
/// flip the active end so everything after them in list order is
/// satisfied from the tail of the runtime argument array. See
/// `Flow::Reverse` returns below for the exact flip set.
pub struct ArgBinder<'a> {
    expr: &'a mut dyn ExprCompiler,
    file: String,
    local_only: bool,
    inside_block: bool,
}

impl<'a> ArgBinder<'a> {
    /// `local_only` is passed through to every emitted variable store;
    /// `inside_block` relaxes which targets a splat may wrap.
    pub fn new(
        expr: &'a mut dyn ExprCompiler,
        file: impl Into<String>,
        local_only: bool,
        inside_block: bool,
    ) -> Self {
        ArgBinder {
            expr,
            file: file.into(),
            local_only,
            inside_block,
        }
    }

    /// Lower an ordered target list (a flattened parameter list, or the
    /// elements of a multiple assignment).
    pub fn compile(&mut self, targets: &[Spanned<Target>]) -> Result<Vec<Instr>> {
        self.run(State::new(targets.iter().collect()))
    }

    /// Lower a single destructuring node (`Multi` or `ArrayPattern`).
    /// Anything else is an upstream compiler bug, not a user error.
    pub fn compile_target(&mut self, target: &Spanned<Target>) -> Result<Vec<Instr>> {
        match &target.node {
            Target::Multi { lefts, rest, rights }
            | Target::ArrayPattern { lefts, rest, rights } => {
                let mut work: VecDeque<&Spanned<Target>> = lefts.iter().collect();
                if let Some(rest) = rest {
                    work.push_back(rest);
                }
                work.extend(rights.iter());
                self.run(State::new(work))
            }
            _ => Err(BindError::UnhandledTarget {
                file: self.file.clone(),
                span: target.span,
                kind: target.kind(),
            }),
        }
    }

    fn run<'t>(&mut self, mut st: State<'t>) -> Result<Vec<Instr>> {
        loop {
            let next = match st.side {
                Side::Left => st.work.pop_front(),
                Side::Right => st.work.pop_back(),
            };
            let Some(target) = next else { break };
            if self.lower(&mut st, target)? == Flow::Reverse {
                st.side = st.side.flip();
            }
        }
        st.cleanup_keywords();
        // Consume the argument array itself.
        st.emit(Instr::Pop);
        Ok(st.out)
    }

    fn lower<'t>(&mut self, st: &mut State<'t>, target: &'t Spanned<Target>) -> Result<Flow> {
        let span = target.span;
        match &target.node {
            Target::Required { name } | Target::LocalVariable { name } => {
                st.cleanup_keywords();
                st.shift_or_pop();
                self.variable_set(st, name, span)?;
                Ok(Flow::Next)
            }
            Target::Optional { name, default } => {
                st.cleanup_keywords();
                self.lower_optional(st, target, name, default)
            }
            Target::Multi { .. } | Target::ArrayPattern { .. } => {
                st.cleanup_keywords();
                self.lower_destructured(st, target)
            }
            Target::Rest { name } => {
                st.cleanup_keywords();
                self.lower_collector(st, name.as_deref(), span)?;
                Ok(Flow::Reverse)
            }
            Target::Splat { target: inner } => {
                st.cleanup_keywords();
                let name = self.splat_name(inner.as_deref())?;
                self.lower_collector(st, name, span)?;
                Ok(Flow::Reverse)
            }
            Target::Numbered { maximum } => {
                for i in 1..=*maximum {
                    st.shift_or_pop();
                    self.variable_set(st, &format!("_{i}"), span)?;
                }
                Ok(Flow::Next)
            }
            Target::InstanceVariable { name } => {
                st.emit(Instr::ArrayShift);
                st.emit(Instr::InstanceVariableSet { name: name.clone() });
                Ok(Flow::Next)
            }
            Target::ClassVariable { name } => {
                st.emit(Instr::ArrayShift);
                st.emit(Instr::ClassVariableSet { name: name.clone() });
                Ok(Flow::Next)
            }
            Target::GlobalVariable { name } => {
                st.emit(Instr::ArrayShift);
                st.emit(Instr::GlobalVariableSet { name: name.clone() });
                Ok(Flow::Next)
            }
            Target::Constant { name } => {
                st.emit(Instr::ArrayShift);
                st.emit(Instr::PushSelf);
                st.emit(Instr::ConstSet { name: name.clone() });
                Ok(Flow::Next)
            }
            Target::Call { receiver, method, safe_navigation } => {
                self.lower_call(st, receiver, method, *safe_navigation, span)?;
                Ok(Flow::Next)
            }
            Target::Index { receiver, arguments } => {
                self.lower_index(st, receiver, arguments, span)?;
                Ok(Flow::Next)
            }
            Target::RequiredKeyword { name } => {
                st.relocate_kwhash();
                st.emit(Instr::HashDelete { name: name.clone() });
                self.variable_set(st, name, span)?;
                Ok(Flow::Next)
            }
            Target::OptionalKeyword { name, default } => {
                st.relocate_kwhash();
                // Default first, so the delete can fall back to it.
                let code = self.expr.compile_expr(default, true)?;
                st.out.extend(code);
                st.emit(Instr::HashDeleteWithDefault { name: name.clone() });
                self.variable_set(st, name, span)?;
                Ok(Flow::Next)
            }
            Target::KeywordRest { name } => {
                st.relocate_kwhash();
                if let Some(name) = name {
                    self.variable_set(st, name, span)?;
                    st.emit(Instr::VariableGet { name: name.clone() });
                }
                st.has_kwsplat = true;
                if st.pending_keywords() {
                    Ok(Flow::Next)
                } else {
                    Ok(Flow::Reverse)
                }
            }
            Target::NoKeywords => {
                // Relocating with zero declared keys forces the
                // extra-keys check at cleanup.
                st.relocate_kwhash();
                Ok(Flow::Next)
            }
            Target::ImplicitRest => {
                st.cleanup_keywords();
                Ok(Flow::Reverse)
            }
        }
    }

    /// An optional positional binds only once no required positional and
    /// no keyword target is left to claim elements; until then it is put
    /// back and the pass works the other end.
    fn lower_optional<'t>(
        &mut self,
        st: &mut State<'t>,
        target: &'t Spanned<Target>,
        name: &str,
        default: &Spanned<Expr>,
    ) -> Result<Flow> {
        if st.pending_requireds() || st.pending_keywords() || st.pending_kwrest() {
            st.work.push_front(target);
            return Ok(Flow::Reverse);
        }
        if st.side == Side::Right {
            // Reached while draining the tail: force it back around to
            // the left end.
            st.work.push_back(target);
            return Ok(Flow::Reverse);
        }

        if let Expr::LocalRead(read) = &default.node {
            if read == name {
                return Err(BindError::CircularDefault {
                    file: self.file.clone(),
                    span: target.span,
                    name: name.to_string(),
                });
            }
        }

        let code = self.expr.compile_expr(default, true)?;
        st.out.extend(code);
        st.shift_or_pop_with_default();
        self.variable_set(st, name, target.span)?;
        Ok(Flow::Next)
    }

    /// Nested destructuring: coerce one element to an array and run a
    /// fresh invocation of the pass against it.
    fn lower_destructured<'t>(
        &mut self,
        st: &mut State<'t>,
        target: &'t Spanned<Target>,
    ) -> Result<Flow> {
        st.emit(Instr::ArrayShift);
        st.emit(Instr::Dup);
        st.emit(Instr::ToArray);
        let nested = self.compile_target(target)?;
        st.out.extend(nested);
        st.emit(Instr::Pop);
        Ok(Flow::Next)
    }

    /// Rest/splat body: a named collector stores the remaining array and
    /// immediately re-reads it, keeping a live reference on the stack so
    /// post targets keep consuming from the same array.
    fn lower_collector(&mut self, st: &mut State, name: Option<&str>, span: Span) -> Result<()> {
        if let Some(name) = name {
            self.variable_set(st, name, span)?;
            st.emit(Instr::VariableGet { name: name.to_string() });
        }
        Ok(())
    }

    fn splat_name<'t>(&self, inner: Option<&'t Spanned<Target>>) -> Result<Option<&'t str>> {
        let Some(inner) = inner else { return Ok(None) };
        match &inner.node {
            Target::Required { name } => Ok(Some(name)),
            Target::LocalVariable { name } if self.inside_block => Ok(Some(name)),
            _ => Err(BindError::IllegalSplatTarget {
                file: self.file.clone(),
                span: inner.span,
                kind: inner.kind(),
                expected: if self.inside_block {
                    "a local variable or required parameter"
                } else {
                    "a required parameter"
                },
            }),
        }
    }

    fn lower_call(
        &mut self,
        st: &mut State,
        receiver: &Spanned<Expr>,
        method: &str,
        safe_navigation: bool,
        span: Span,
    ) -> Result<()> {
        st.emit(Instr::ArrayShift);
        let code = self.expr.compile_expr(receiver, true)?;
        st.out.extend(code);
        if safe_navigation {
            st.emit(Instr::Dup);
            st.emit(Instr::IsNil);
            st.emit(Instr::If);
            st.emit(Instr::Pop);
            st.emit(Instr::Else);
        }
        st.emit(Instr::Swap);
        st.emit(Instr::PushArgc(1));
        st.emit(Instr::Send {
            name: method.to_string(),
            receiver_is_self: matches!(receiver.node, Expr::SelfRef),
            file: self.file.clone(),
            span,
        });
        if safe_navigation {
            st.emit(Instr::EndIf);
        }
        // Discard the writer's return value; both branches of a
        // safe-navigation guard leave exactly one value here.
        st.emit(Instr::Pop);
        Ok(())
    }

    fn lower_index(
        &mut self,
        st: &mut State,
        receiver: &Spanned<Expr>,
        arguments: &[Spanned<Expr>],
        span: Span,
    ) -> Result<()> {
        st.emit(Instr::ArrayShift);
        let code = self.expr.compile_expr(receiver, true)?;
        st.out.extend(code);
        st.emit(Instr::Swap);
        for argument in arguments {
            let code = self.expr.compile_expr(argument, true)?;
            st.out.extend(code);
            st.emit(Instr::Swap);
        }
        st.emit(Instr::PushArgc(arguments.len() + 1));
        st.emit(Instr::Send {
            name: "[]=".to_string(),
            receiver_is_self: matches!(receiver.node, Expr::SelfRef),
            file: self.file.clone(),
            span,
        });
        st.emit(Instr::Pop);
        Ok(())
    }

    /// Emit a store for `name`, validating it first. The name `_` binds
    /// on its first occurrence only; later occurrences discard the value.
    fn variable_set(&self, st: &mut State, name: &str, span: Span) -> Result<()> {
        static NAME: OnceLock<Regex> = OnceLock::new();
        let re = NAME.get_or_init(|| {
            Regex::new(r"^[[:alpha:]_][[:alnum:]_]*$").expect("static pattern")
        });
        if !re.is_match(name) {
            return Err(BindError::MalformedName {
                file: self.file.clone(),
                span,
                name: name.to_string(),
            });
        }

        if name == "_" {
            if st.underscore_bound {
                st.emit(Instr::Pop);
                return Ok(());
            }
            st.underscore_bound = true;
        }

        st.emit(Instr::VariableSet {
            name: name.to_string(),
            local_only: self.local_only,
        });
        Ok(())
    }
}
