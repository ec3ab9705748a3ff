use crate::codegen;
use crate::context::Context;
use crate::element;
use crate::error::CompileError;
use crate::quotes;

/// One filter of a chain, its parameter already resolved to an expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterCall {
    pub name: String,
    pub parameter: Option<String>,
}

/// A `{{ ... }}` interpolation or a single tag parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variable {
    raw: String,
    base: String,
    expr: String,
    filters: Vec<FilterCall>,
    escaped: bool,
}

impl Variable {
    /// Parse interpolation text (`name|upper`). The value is escaped unless
    /// `safe` is in the chain.
    pub fn interpolation(raw: &str, cx: &mut Context<'_>) -> Result<Self, CompileError> {
        Self::build(raw, true, cx)
    }

    /// Parse a tag parameter. Parameters are never escaped.
    pub fn parameter(raw: &str, cx: &mut Context<'_>) -> Result<Self, CompileError> {
        Self::build(raw, false, cx)
    }

    /// Parse and emit an interpolation in one go.
    pub fn compile(raw: &str, cx: &mut Context<'_>) -> Result<(), CompileError> {
        Self::interpolation(raw, cx)?.write(cx)
    }

    fn build(raw: &str, escape: bool, cx: &mut Context<'_>) -> Result<Self, CompileError> {
        let (base, chain) = split_filters(raw);
        let mut escape = escape;
        let mut filters = Vec::with_capacity(chain.len());

        for (name, argument) in chain {
            if name == "safe" {
                escape = false;
                continue;
            }
            let parameter = argument
                .map(|argument| element::resolve(argument, false, cx))
                .transpose()?;
            filters.push(FilterCall {
                name: name.to_string(),
                parameter,
            });
        }

        if escape && cx.options().is_legacy_unescaped(base) {
            if cx.options().debug {
                return Err(CompileError::DeprecatedUnescaped {
                    name: base.to_string(),
                    location: cx.location(),
                });
            }
            cx.warning(format!("deprecated: {{{{{base}}}}} is missing the |safe filter"));
            escape = false;
        }

        let expr = element::resolve(base, escape, cx)?;

        Ok(Self {
            raw: raw.to_string(),
            base: base.to_string(),
            expr,
            filters,
            escaped: escape && cx.options().escaping,
        })
    }

    /// Evaluate the base expression into the filter slot and run the filter
    /// chain over it, in declared order.
    pub fn prepare(&self, cx: &mut Context<'_>) -> Result<(), CompileError> {
        let library = cx.library();
        cx.write(&format!(
            "{}{} = {}; ",
            codegen::OPEN,
            codegen::FILTER_SLOT,
            self.expr
        ))?;

        for (index, filter) in self.filters.iter().enumerate() {
            let Some(handler) = library.filter(&filter.name) else {
                return Err(CompileError::UnknownFilter {
                    name: filter.name.clone(),
                    location: cx.location(),
                });
            };
            handler.compile(filter, index + 1, cx)?;
        }

        cx.write("?>")
    }

    pub fn write(&self, cx: &mut Context<'_>) -> Result<(), CompileError> {
        if self.filters.is_empty() {
            cx.write(&codegen::echo(&self.expr))
        } else {
            self.prepare(cx)?;
            cx.write(&codegen::echo(codegen::FILTER_SLOT))
        }
    }

    /// The text as written, filters included.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The text with the filter chain stripped.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The resolved expression, escape wrapper included when it applies.
    #[must_use]
    pub fn expr(&self) -> &str {
        &self.expr
    }

    #[must_use]
    pub fn filters(&self) -> &[FilterCall] {
        &self.filters
    }

    #[must_use]
    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    #[must_use]
    pub fn is_escaped(&self) -> bool {
        self.escaped
    }

    /// The contents of an unfiltered quoted literal.
    #[must_use]
    pub fn unquoted(&self) -> Option<&str> {
        (quotes::is_quoted(&self.base) && self.filters.is_empty())
            .then(|| &self.base[1..self.base.len() - 1])
    }
}

fn split_filters(raw: &str) -> (&str, Vec<(&str, Option<&str>)>) {
    let mut pieces = quotes::split_unquoted(raw, '|').into_iter();
    let base = pieces.next().unwrap_or_default().trim();

    let chain = pieces
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(|piece| match quotes::find_unquoted(piece, ':') {
            Some(colon) => {
                let argument = piece[colon + 1..].trim();
                (
                    piece[..colon].trim(),
                    (!argument.is_empty()).then_some(argument),
                )
            }
            None => (piece, None),
        })
        .collect();

    (base, chain)
}
