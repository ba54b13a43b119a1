use std::fmt;

use crate::ast::Span;

/// One instruction for the beryl stack machine.
///
/// The binding pass emits a flat sequence of these; the caller splices it
/// into the surrounding method or block body. Branching uses structured
/// `If`/`Else`/`EndIf` markers rather than resolved jump offsets — offset
/// resolution belongs to a later assembly step.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    // ---- stack ----
    PushNil,
    PushBool(bool),
    PushInt(i64),
    PushFloat(f64),
    PushStr(String),
    PushSelf,
    /// Pushes the argument count consumed by a following `Send`.
    PushArgc(usize),
    Pop,
    Dup,
    Swap,

    // ---- argument array ----
    /// Remove the first element of the top-of-stack array and push it.
    /// An exhausted array yields nil.
    ArrayShift,
    /// Remove the last element of the top-of-stack array and push it.
    ArrayPop,
    /// Pop a precomputed default, then shift; the default is pushed back
    /// instead when the array is exhausted.
    ArrayShiftWithDefault,
    /// Pop a precomputed default, then pop from the back; the default is
    /// pushed back instead when the array is exhausted.
    ArrayPopWithDefault,
    /// Coerce the top of the stack to a fresh array (nil becomes `[]`,
    /// a non-array value becomes a one-element array).
    ToArray,
    /// Pop `n` values and push an array of them, first-pushed first.
    ArrayNew(usize),

    // ---- stores ----
    VariableSet { name: String, local_only: bool },
    VariableGet { name: String },
    InstanceVariableSet { name: String },
    ClassVariableSet { name: String },
    GlobalVariableSet { name: String },
    /// Pops the namespace (pushed as `self`), then the value.
    ConstSet { name: String },

    // ---- keyword hash ----
    /// Delete `name` from the top-of-stack hash and push its value;
    /// a missing key is a runtime error.
    HashDelete { name: String },
    /// Pop a precomputed default, delete `name` from the top-of-stack
    /// hash, and push the deleted value or the default.
    HashDeleteWithDefault { name: String },
    /// Runtime error unless the top-of-stack hash is empty.
    CheckExtraKeywords,

    // ---- control ----
    /// Pop a value, push whether it is nil.
    IsNil,
    If,
    Else,
    EndIf,

    // ---- dispatch ----
    /// Invoke `name` on a receiver: pops the argc pushed by `PushArgc`,
    /// that many arguments, then the receiver; pushes the result.
    Send {
        name: String,
        receiver_is_self: bool,
        file: String,
        span: Span,
    },
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::PushNil => write!(f, "push_nil"),
            Instr::PushBool(b) => write!(f, "push_bool {b}"),
            Instr::PushInt(i) => write!(f, "push_int {i}"),
            Instr::PushFloat(x) => write!(f, "push_float {x}"),
            Instr::PushStr(s) => write!(f, "push_str {s:?}"),
            Instr::PushSelf => write!(f, "push_self"),
            Instr::PushArgc(n) => write!(f, "push_argc {n}"),
            Instr::Pop => write!(f, "pop"),
            Instr::Dup => write!(f, "dup"),
            Instr::Swap => write!(f, "swap"),
            Instr::ArrayShift => write!(f, "array_shift"),
            Instr::ArrayPop => write!(f, "array_pop"),
            Instr::ArrayShiftWithDefault => write!(f, "array_shift_with_default"),
            Instr::ArrayPopWithDefault => write!(f, "array_pop_with_default"),
            Instr::ToArray => write!(f, "to_array"),
            Instr::ArrayNew(n) => write!(f, "array_new {n}"),
            Instr::VariableSet { name, local_only } => {
                if *local_only {
                    write!(f, "variable_set {name} (local)")
                } else {
                    write!(f, "variable_set {name}")
                }
            }
            Instr::VariableGet { name } => write!(f, "variable_get {name}"),
            Instr::InstanceVariableSet { name } => write!(f, "ivar_set @{name}"),
            Instr::ClassVariableSet { name } => write!(f, "cvar_set @@{name}"),
            Instr::GlobalVariableSet { name } => write!(f, "gvar_set ${name}"),
            Instr::ConstSet { name } => write!(f, "const_set {name}"),
            Instr::HashDelete { name } => write!(f, "hash_delete {name}"),
            Instr::HashDeleteWithDefault { name } => write!(f, "hash_delete_with_default {name}"),
            Instr::CheckExtraKeywords => write!(f, "check_extra_keywords"),
            Instr::IsNil => write!(f, "is_nil"),
            Instr::If => write!(f, "if"),
            Instr::Else => write!(f, "else"),
            Instr::EndIf => write!(f, "end_if"),
            Instr::Send { name, receiver_is_self, .. } => {
                if *receiver_is_self {
                    write!(f, "send {name} (self)")
                } else {
                    write!(f, "send {name}")
                }
            }
        }
    }
}

/// One instruction per line, numbered, for `--dump` style output.
pub fn listing(instrs: &[Instr]) -> String {
    let mut out = String::new();
    for (i, instr) in instrs.iter().enumerate() {
        out.push_str(&format!("{i:4}  {instr}\n"));
    }
    out
}
