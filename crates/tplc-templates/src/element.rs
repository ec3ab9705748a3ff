//! Resolution of one template expression (`a.b.c`, `'text'`, `#name#`, `42`,
//! `>=`) into an artifact expression.

use crate::codegen;
use crate::context::Context;
use crate::error::CompileError;
use crate::params::OPERATORS;

/// Resolve `text` into an expression, wrapping it in the runtime escape call
/// when `escape` is set and escaping is enabled for this compile.
pub fn resolve(text: &str, escape: bool, cx: &mut Context<'_>) -> Result<String, CompileError> {
    if text.starts_with(['\'', '"']) {
        return Ok(text.to_string());
    }

    if let Some(name) = text.strip_prefix('#') {
        return Ok(codegen::config(name.trim_end_matches('#')));
    }

    let mut expr = codegen::NAMESPACE.to_string();
    for part in text.split('.') {
        if is_identifier(part) {
            expr = codegen::property(&expr, part);
        } else if OPERATORS.contains(&part) {
            if !cx.options().allows_operators(cx.current_tag()) {
                let allowed = cx.options().operator_tags.join(", ");
                cx.warning(format!(
                    "operator `{text}` is only supported for these tags: {allowed}"
                ));
                return Ok(codegen::EMPTY.to_string());
            }
            expr = part.to_string();
        } else if is_numeric(text) {
            expr = text.to_string();
            break;
        } else {
            return Err(CompileError::InvalidVariable {
                text: text.to_string(),
                location: cx.location(),
            });
        }
    }

    if escape && cx.options().escaping {
        let requested = cx.source().requested().to_string();
        let line = cx.source().line_number();
        expr = codegen::escape(&expr, text, &requested, line);
    }

    Ok(expr)
}

pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || !c.is_ascii())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || !c.is_ascii())
}

fn is_numeric(s: &str) -> bool {
    s.bytes().any(|b| b.is_ascii_digit()) && s.trim().parse::<f64>().is_ok()
}
