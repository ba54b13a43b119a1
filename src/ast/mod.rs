use serde::{Deserialize, Serialize};

pub mod source_map;
pub use source_map::SourceMap;

// ---- Span infrastructure ----

/// Byte range within source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const UNKNOWN: Span = Span { start: 0, end: 0 };

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Wraps a node with its source span. Transparent to serde (serializes as inner node only).
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Spanned { node, span }
    }

    pub fn unknown(node: T) -> Self {
        Spanned { node, span: Span::UNKNOWN }
    }
}

impl<T> std::ops::Deref for Spanned<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.node
    }
}

impl<T: Serialize> Serialize for Spanned<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.node.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Spanned<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(|node| Spanned { node, span: Span::UNKNOWN })
    }
}

// ---- Binding targets ----

/// One binding site in a parameter list or on the left-hand side of a
/// multiple assignment. These arrive from the parser fully formed and are
/// never mutated by the compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Target {
    /// Required positional parameter: `def f(a)`. Post parameters (after a
    /// rest) are syntactically the same node.
    Required { name: String },

    /// Local variable target in a multiple assignment: `a, b = ...`.
    LocalVariable { name: String },

    /// Optional positional parameter with a default: `def f(a = 1)`.
    Optional { name: String, default: Box<Spanned<Expr>> },

    /// Rest parameter: `*a`, or bare `*` when anonymous.
    Rest { name: Option<String> },

    /// Splat target in a multiple assignment: `a, *b = ...`. The wrapped
    /// target may be absent for a bare `*`.
    Splat { target: Option<Box<Spanned<Target>>> },

    /// Required keyword parameter: `def f(a:)`.
    RequiredKeyword { name: String },

    /// Optional keyword parameter: `def f(a: 1)`.
    OptionalKeyword { name: String, default: Box<Spanned<Expr>> },

    /// Keyword rest: `**opts`, or bare `**` when anonymous.
    KeywordRest { name: Option<String> },

    /// `**nil` — the method accepts no keyword arguments at all.
    NoKeywords,

    /// Numbered block parameters `_1` .. `_N`; `maximum` is N.
    Numbered { maximum: u8 },

    /// Nested destructuring: `def f((a, b))` or `(a, b), c = ...`.
    Multi {
        lefts: Vec<Spanned<Target>>,
        rest: Option<Box<Spanned<Target>>>,
        rights: Vec<Spanned<Target>>,
    },

    /// Array-literal destructuring pattern; binds exactly like `Multi`.
    ArrayPattern {
        lefts: Vec<Spanned<Target>>,
        rest: Option<Box<Spanned<Target>>>,
        rights: Vec<Spanned<Target>>,
    },

    /// `@ivar, ... = ...`
    InstanceVariable { name: String },

    /// `@@cvar, ... = ...`
    ClassVariable { name: String },

    /// `$gvar, ... = ...`
    GlobalVariable { name: String },

    /// `CONST, ... = ...` — assigned relative to the enclosing `self`.
    Constant { name: String },

    /// Attribute-write target: `obj.name, ... = ...`. `method` is the
    /// writer method name (`name=`).
    Call {
        receiver: Box<Spanned<Expr>>,
        method: String,
        safe_navigation: bool,
    },

    /// Index-write target: `obj[i], ... = ...`, lowered to an `[]=` send.
    Index {
        receiver: Box<Spanned<Expr>>,
        arguments: Vec<Spanned<Expr>>,
    },

    /// Elided trailing rest from a trailing comma: `a, = ...`.
    ImplicitRest,
}

impl Target {
    /// Stable kind name, used in error messages and listings.
    pub fn kind(&self) -> &'static str {
        match self {
            Target::Required { .. } => "required parameter",
            Target::LocalVariable { .. } => "local variable target",
            Target::Optional { .. } => "optional parameter",
            Target::Rest { .. } => "rest parameter",
            Target::Splat { .. } => "splat target",
            Target::RequiredKeyword { .. } => "required keyword parameter",
            Target::OptionalKeyword { .. } => "optional keyword parameter",
            Target::KeywordRest { .. } => "keyword rest parameter",
            Target::NoKeywords => "no-keywords marker",
            Target::Numbered { .. } => "numbered parameters",
            Target::Multi { .. } => "destructuring target",
            Target::ArrayPattern { .. } => "array pattern target",
            Target::InstanceVariable { .. } => "instance variable target",
            Target::ClassVariable { .. } => "class variable target",
            Target::GlobalVariable { .. } => "global variable target",
            Target::Constant { .. } => "constant target",
            Target::Call { .. } => "attribute target",
            Target::Index { .. } => "index target",
            Target::ImplicitRest => "implicit rest",
        }
    }
}

// ---- Value expressions ----

/// Value-producing expressions reachable from a binding target: default
/// values, call/index receivers, and index arguments. The surrounding
/// compiler handles the full expression language; this closed set is what
/// the binding pass and its tests need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Nil,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Str(String),
    /// The enclosing receiver, `self`.
    SelfRef,
    /// Read of a local variable (or parameter) by name.
    LocalRead(String),
    /// Array literal.
    Array(Vec<Spanned<Expr>>),
}

// ---- Structured parameter lists ----

/// A method or block parameter list as parsed, grouped by role. The
/// binding pass consumes the flattened form (see `arity::Arity`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params {
    #[serde(default)]
    pub requireds: Vec<Spanned<Target>>,
    #[serde(default)]
    pub optionals: Vec<Spanned<Target>>,
    #[serde(default)]
    pub rest: Option<Spanned<Target>>,
    #[serde(default)]
    pub posts: Vec<Spanned<Target>>,
    #[serde(default)]
    pub keywords: Vec<Spanned<Target>>,
    #[serde(default)]
    pub keyword_rest: Option<Spanned<Target>>,
}

/// Block parameter wrapper: `{ |a, b| ... }`. `params` is `None` for a
/// bare block with no parameter list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockParams {
    #[serde(default)]
    pub params: Option<Params>,
}
