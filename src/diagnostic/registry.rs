/// An entry in the error code registry.
#[allow(dead_code)] // `short` is used by --list-errors; `long` by --explain
pub struct ErrorEntry {
    pub code: &'static str,
    pub short: &'static str,
    pub long: &'static str,
}

/// All stable error codes for the beryl binding pass and its reference
/// machine.
pub static REGISTRY: &[ErrorEntry] = &[
    // ── Binding ──────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "BRL-B001",
        short: "unhandled assignment target",
        long: r#"## BRL-B001: unhandled assignment target

The binding pass was handed a node kind it cannot lower, such as a
numbered-parameter placeholder appearing directly in a target list.
Numbered parameters are expanded by the arity layer before binding;
seeing one here means the list was compiled without that expansion.
"#,
    },
    ErrorEntry {
        code: "BRL-B002",
        short: "illegal splat target",
        long: r#"## BRL-B002: illegal splat target

A splat was applied to something that cannot collect values. In a
multiple assignment a splat may name a local variable; in a method
parameter list only a plain parameter name may follow the `*`.

**Example:**

    a, *B = list      -- constants cannot be splat targets
    a, *rest = list   -- correct

Inside a block, `*rest` may also re-bind an existing local variable.
"#,
    },
    ErrorEntry {
        code: "BRL-B003",
        short: "circular argument reference",
        long: r#"## BRL-B003: circular argument reference

An optional parameter's default expression reads the parameter being
defined, so there is no value to fall back to.

**Example:**

    def f(x = x)      -- 'x' has no prior value here

**Fix:** reference a different variable or a literal in the default.
"#,
    },
    ErrorEntry {
        code: "BRL-B004",
        short: "malformed variable name",
        long: r#"## BRL-B004: malformed variable name

A binding target's name is not a valid identifier. Names must start
with a letter or underscore and contain only letters, digits, and
underscores. A front end that builds target lists programmatically
(for example from serialized node trees) can produce this.
"#,
    },

    // ── Runtime ──────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "BRL-R001",
        short: "unknown keywords",
        long: r#"## BRL-R001: unknown keywords

The caller passed keyword arguments the parameter list does not
declare, and no `**rest` collector is present to absorb them. The
message lists the offending keys in sorted order.

**Example:**

    def f(x:)
    f(x: 1, z: 9)     -- 'z' is not accepted

**Fix:** remove the extra keywords, or add a `**rest` parameter.
"#,
    },
    ErrorEntry {
        code: "BRL-R002",
        short: "missing keyword",
        long: r#"## BRL-R002: missing keyword

A required keyword parameter was not supplied by the caller.

**Example:**

    def f(x:)
    f()               -- 'x' was not passed

**Fix:** pass the keyword, or give the parameter a default value.
"#,
    },
];

/// Look up an error entry by code (e.g. `"BRL-B003"`).
pub fn lookup(code: &str) -> Option<&'static ErrorEntry> {
    REGISTRY.iter().find(|e| e.code == code)
}
