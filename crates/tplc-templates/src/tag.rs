use crate::codegen;
use crate::context::Context;
use crate::error::CompileError;
use crate::params;
use crate::variable::Variable;

/// A `{% name params %}` occurrence with its parameters parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    name: String,
    text: String,
    params: Vec<Variable>,
}

impl Tag {
    pub fn parse(name: &str, text: &str, cx: &mut Context<'_>) -> Result<Self, CompileError> {
        let tokens = params::tokenize(text);
        for ch in tokens.skipped {
            cx.warning(format!("unexpected character `{ch}` in {name} parameters skipped"));
        }

        let params = tokens
            .tokens
            .into_iter()
            .map(|token| Variable::parameter(token, cx))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: name.to_string(),
            text: text.to_string(),
            params,
        })
    }

    /// Parse and dispatch in one go.
    pub fn compile(name: &str, text: &str, cx: &mut Context<'_>) -> Result<(), CompileError> {
        Self::parse(name, text, cx)?.write(cx)
    }

    /// Run the handler registered for this tag.
    ///
    /// Filtered parameters are evaluated first, each into its own slot, and
    /// the handler sees the slot in their place.
    pub fn write(mut self, cx: &mut Context<'_>) -> Result<(), CompileError> {
        let library = cx.library();
        let Some(handler) = library.tag(&self.name) else {
            return Err(CompileError::UnknownTag {
                name: self.name,
                location: cx.location(),
            });
        };

        for param in &mut self.params {
            if !param.has_filters() {
                continue;
            }
            param.prepare(cx)?;
            let slot = cx.next_slot();
            cx.write(&codegen::code(&format!(
                "{} = {};",
                codegen::property(codegen::NAMESPACE, &slot),
                codegen::FILTER_SLOT
            )))?;
            *param = Variable::parameter(&slot, cx)?;
        }

        handler.compile(&self, cx)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parameter text as written.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn params(&self) -> &[Variable] {
        &self.params
    }

    #[must_use]
    pub fn param(&self, index: usize) -> Option<&Variable> {
        self.params.get(index)
    }
}
