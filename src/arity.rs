use crate::ast::{BlockParams, Params, Span, Spanned, Target};

/// Flattened view of a parameter list, used to answer "how many arguments
/// does this accept" questions and to feed the binding pass.
///
/// Flatten order is requireds, rest, optionals, posts, keywords, keyword
/// rest — the order the binder's optional-deferral logic expects.
pub struct Arity {
    args: Vec<Spanned<Target>>,
}

impl Arity {
    pub fn from_params(params: Option<&Params>) -> Self {
        let mut args = Vec::new();
        if let Some(p) = params {
            args.extend(p.requireds.iter().cloned());
            args.extend(p.rest.iter().cloned());
            args.extend(p.optionals.iter().cloned());
            args.extend(p.posts.iter().cloned());
            args.extend(p.keywords.iter().cloned());
            args.extend(p.keyword_rest.iter().cloned());
        }
        Arity { args }
    }

    /// Unwrap a block's parameter wrapper to its inner list.
    pub fn from_block(block: &BlockParams) -> Self {
        Self::from_params(block.params.as_ref())
    }

    /// Expand numbered parameters into N synthetic requireds `_1` .. `_N`.
    pub fn from_numbered(maximum: u8, span: Span) -> Self {
        let args = (1..=maximum)
            .map(|i| Spanned::new(Target::Required { name: format!("_{i}") }, span))
            .collect();
        Arity { args }
    }

    /// The flattened effective parameter list, ready for the binder.
    pub fn args(&self) -> &[Spanned<Target>] {
        &self.args
    }

    /// Minimum accepted positional count: requireds plus posts (which
    /// flatten to the same variant).
    pub fn min(&self) -> usize {
        self.args
            .iter()
            .filter(|t| matches!(t.node, Target::Required { .. }))
            .count()
    }

    /// Maximum accepted positional count; `None` when a rest or keyword
    /// rest makes it unbounded.
    pub fn max(&self) -> Option<usize> {
        let unbounded = self.args.iter().any(|t| {
            matches!(t.node, Target::Rest { .. } | Target::KeywordRest { .. })
        });
        if unbounded {
            None
        } else {
            Some(self.min() + self.optionals())
        }
    }

    pub fn accepts_keywords(&self) -> bool {
        self.args.iter().any(|t| {
            matches!(
                t.node,
                Target::RequiredKeyword { .. }
                    | Target::OptionalKeyword { .. }
                    | Target::KeywordRest { .. }
            )
        })
    }

    /// Ruby-style signed arity: non-negative for a fixed count, `-(n+1)`
    /// when optionals, a rest, or optional keywords make it open-ended.
    /// Required keywords occupy one slot.
    pub fn arity(&self) -> i64 {
        let mut n = self.min() as i64;
        if self
            .args
            .iter()
            .any(|t| matches!(t.node, Target::RequiredKeyword { .. }))
        {
            n += 1;
        }
        let open = self.optionals() > 0
            || self.args.iter().any(|t| {
                matches!(
                    t.node,
                    Target::Rest { .. }
                        | Target::OptionalKeyword { .. }
                        | Target::KeywordRest { .. }
                )
            });
        if open { -(n + 1) } else { n }
    }

    fn optionals(&self) -> usize {
        self.args
            .iter()
            .filter(|t| matches!(t.node, Target::Optional { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    fn required(name: &str) -> Spanned<Target> {
        Spanned::unknown(Target::Required { name: name.into() })
    }

    fn optional(name: &str) -> Spanned<Target> {
        Spanned::unknown(Target::Optional {
            name: name.into(),
            default: Box::new(Spanned::unknown(Expr::Nil)),
        })
    }

    fn params() -> Params {
        Params {
            requireds: vec![required("a")],
            optionals: vec![optional("b")],
            rest: Some(Spanned::unknown(Target::Rest { name: Some("r".into()) })),
            posts: vec![required("c")],
            keywords: vec![Spanned::unknown(Target::RequiredKeyword { name: "k".into() })],
            keyword_rest: None,
        }
    }

    #[test]
    fn flatten_puts_rest_before_optionals() {
        let arity = Arity::from_params(Some(&params()));
        let kinds: Vec<&str> = arity.args().iter().map(|t| t.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                "required parameter",
                "rest parameter",
                "optional parameter",
                "required parameter",
                "required keyword parameter",
            ]
        );
    }

    #[test]
    fn empty_params_flatten_empty() {
        let arity = Arity::from_params(None);
        assert!(arity.args().is_empty());
        assert_eq!(arity.min(), 0);
        assert_eq!(arity.max(), Some(0));
        assert_eq!(arity.arity(), 0);
    }

    #[test]
    fn block_wrapper_unwraps() {
        let block = BlockParams { params: Some(params()) };
        assert_eq!(Arity::from_block(&block).args().len(), 5);
        let bare = BlockParams { params: None };
        assert!(Arity::from_block(&bare).args().is_empty());
    }

    #[test]
    fn numbered_expands_to_synthetic_names() {
        let arity = Arity::from_numbered(3, Span::UNKNOWN);
        let names: Vec<_> = arity
            .args()
            .iter()
            .map(|t| match &t.node {
                Target::Required { name } => name.clone(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(names, vec!["_1", "_2", "_3"]);
        assert_eq!(arity.min(), 3);
        assert_eq!(arity.max(), Some(3));
    }

    #[test]
    fn min_counts_requireds_and_posts() {
        assert_eq!(Arity::from_params(Some(&params())).min(), 2);
    }

    #[test]
    fn rest_makes_max_unbounded() {
        assert_eq!(Arity::from_params(Some(&params())).max(), None);

        let fixed = Params {
            requireds: vec![required("a")],
            optionals: vec![optional("b"), optional("c")],
            ..Params::default()
        };
        assert_eq!(Arity::from_params(Some(&fixed)).max(), Some(3));
    }

    #[test]
    fn keyword_rest_makes_max_unbounded() {
        let p = Params {
            requireds: vec![required("a")],
            keyword_rest: Some(Spanned::unknown(Target::KeywordRest { name: None })),
            ..Params::default()
        };
        assert_eq!(Arity::from_params(Some(&p)).max(), None);
    }

    #[test]
    fn keyword_acceptance() {
        assert!(Arity::from_params(Some(&params())).accepts_keywords());
        let p = Params {
            requireds: vec![required("a")],
            ..Params::default()
        };
        assert!(!Arity::from_params(Some(&p)).accepts_keywords());
    }

    #[test]
    fn signed_arity() {
        let fixed = Params {
            requireds: vec![required("a"), required("b")],
            ..Params::default()
        };
        assert_eq!(Arity::from_params(Some(&fixed)).arity(), 2);

        assert_eq!(Arity::from_params(Some(&params())).arity(), -4);

        let kw = Params {
            requireds: vec![required("a")],
            keywords: vec![Spanned::unknown(Target::RequiredKeyword { name: "k".into() })],
            ..Params::default()
        };
        assert_eq!(Arity::from_params(Some(&kw)).arity(), 2);
    }
}
