use crate::codegen::FILTER_SLOT as SLOT;
use crate::context::Context;
use crate::error::CompileError;
use crate::registry::Library;
use crate::variable::FilterCall;

pub(super) fn register(library: &mut Library) {
    library
        .register_filter("upper", upper)
        .register_filter("lower", lower)
        .register_filter("capfirst", capfirst)
        .register_filter("title", title)
        .register_filter("trim", trim)
        .register_filter("length", length)
        .register_filter("default", default)
        .register_filter("join", join)
        .register_filter("first", first)
        .register_filter("last", last)
        .register_filter("truncate", truncate)
        .register_filter("date", date)
        .register_filter("json", json)
        .register_filter("urlencode", urlencode)
        .register_filter("escape", escape)
        .register_filter("add", add);
}

/// `$filter_var = value;`
fn assign(cx: &mut Context<'_>, value: &str) -> Result<(), CompileError> {
    cx.write(&format!("{SLOT} = {value}; "))
}

fn required<'f>(filter: &'f FilterCall, cx: &Context<'_>) -> Result<&'f str, CompileError> {
    filter
        .parameter
        .as_deref()
        .ok_or_else(|| cx.error(format!("filter {} requires a parameter", filter.name)))
}

fn upper(_: &FilterCall, _: usize, cx: &mut Context<'_>) -> Result<(), CompileError> {
    assign(cx, &format!("mb_strtoupper({SLOT})"))
}

fn lower(_: &FilterCall, _: usize, cx: &mut Context<'_>) -> Result<(), CompileError> {
    assign(cx, &format!("mb_strtolower({SLOT})"))
}

fn capfirst(_: &FilterCall, _: usize, cx: &mut Context<'_>) -> Result<(), CompileError> {
    assign(cx, &format!("ucfirst({SLOT})"))
}

fn title(_: &FilterCall, _: usize, cx: &mut Context<'_>) -> Result<(), CompileError> {
    assign(cx, &format!("mb_convert_case({SLOT}, MB_CASE_TITLE)"))
}

fn trim(_: &FilterCall, _: usize, cx: &mut Context<'_>) -> Result<(), CompileError> {
    assign(cx, &format!("trim({SLOT})"))
}

fn length(_: &FilterCall, _: usize, cx: &mut Context<'_>) -> Result<(), CompileError> {
    assign(
        cx,
        &format!("is_countable({SLOT}) ? count({SLOT}) : mb_strlen({SLOT})"),
    )
}

fn default(filter: &FilterCall, _: usize, cx: &mut Context<'_>) -> Result<(), CompileError> {
    let fallback = required(filter, cx)?;
    cx.write(&format!("if(empty({SLOT})) {SLOT} = {fallback}; "))
}

fn join(filter: &FilterCall, _: usize, cx: &mut Context<'_>) -> Result<(), CompileError> {
    let separator = filter.parameter.as_deref().unwrap_or("''");
    assign(cx, &format!("implode({separator}, (array) {SLOT})"))
}

fn first(_: &FilterCall, _: usize, cx: &mut Context<'_>) -> Result<(), CompileError> {
    assign(
        cx,
        &format!("is_array({SLOT}) ? reset({SLOT}) : mb_substr({SLOT}, 0, 1)"),
    )
}

fn last(_: &FilterCall, _: usize, cx: &mut Context<'_>) -> Result<(), CompileError> {
    assign(
        cx,
        &format!("is_array({SLOT}) ? end({SLOT}) : mb_substr({SLOT}, -1)"),
    )
}

fn truncate(filter: &FilterCall, _: usize, cx: &mut Context<'_>) -> Result<(), CompileError> {
    let limit = required(filter, cx)?;
    cx.write(&format!(
        "if(mb_strlen({SLOT}) > {limit}) {SLOT} = mb_substr({SLOT}, 0, {limit}).'...'; "
    ))
}

fn date(filter: &FilterCall, _: usize, cx: &mut Context<'_>) -> Result<(), CompileError> {
    let format = required(filter, cx)?;
    assign(
        cx,
        &format!("date({format}, is_numeric({SLOT}) ? {SLOT} : strtotime({SLOT}))"),
    )
}

fn json(_: &FilterCall, _: usize, cx: &mut Context<'_>) -> Result<(), CompileError> {
    assign(cx, &format!("json_encode({SLOT})"))
}

fn urlencode(_: &FilterCall, _: usize, cx: &mut Context<'_>) -> Result<(), CompileError> {
    assign(cx, &format!("urlencode({SLOT})"))
}

fn escape(_: &FilterCall, _: usize, cx: &mut Context<'_>) -> Result<(), CompileError> {
    assign(cx, &format!("htmlspecialchars({SLOT}, ENT_QUOTES)"))
}

fn add(filter: &FilterCall, _: usize, cx: &mut Context<'_>) -> Result<(), CompileError> {
    let amount = required(filter, cx)?;
    assign(cx, &format!("{SLOT} + {amount}"))
}

#[cfg(test)]
mod tests {
    use crate::testing::Harness;

    fn compile(body: &str) -> String {
        let mut harness = Harness::new();
        harness.add_file("app/view/page.html", body);
        harness.finish()
    }

    #[test]
    fn test_default_and_join() {
        insta::assert_snapshot!(
            compile("{{ tags|default:'none'|join:', '|safe }}"),
            @"<?php $filter_var = $this->vars->tags; if(empty($filter_var)) $filter_var = 'none'; $filter_var = implode(', ', (array) $filter_var); ?><?php echo $filter_var; ?>"
        );
    }

    #[test]
    fn test_date_with_config_format() {
        insta::assert_snapshot!(
            compile("{{ post.created|date:#date_format#|safe }}"),
            @"<?php $filter_var = $this->vars->post->created; $filter_var = date($this->config->date_format, is_numeric($filter_var) ? $filter_var : strtotime($filter_var)); ?><?php echo $filter_var; ?>"
        );
    }

    #[test]
    fn test_missing_parameter() {
        let mut harness = Harness::new();
        harness.add_file("app/view/page.html", "{{ a|truncate }}");
        let err = harness.try_finish().unwrap_err();
        assert!(err.to_string().starts_with("filter truncate requires a parameter"));
    }
}
