use camino::Utf8Path;

use crate::cache::ArtifactCache;
use crate::codegen;
use crate::context::Context;
use crate::element::is_identifier;
use crate::error::CompileError;
use crate::registry::Library;
use crate::session::PauseState;
use crate::session::Session;
use crate::session::SourceId;
use crate::tag::Tag;

const IF: &str = "if";
const FOR: &str = "for";
const WITH: &str = "with";
const BLOCK: &str = "block";
const LITERAL: &str = "literal";
const COMMENT: &str = "comment";

pub(super) fn register(library: &mut Library) {
    library
        .register_tag("if", tag_if)
        .register_tag("elseif", tag_elseif)
        .register_tag("else", tag_else)
        .register_tag("endif", tag_endif)
        .register_tag("for", tag_for)
        .register_tag("empty", tag_empty)
        .register_tag("endfor", tag_endfor)
        .register_tag("with", tag_with)
        .register_tag("endwith", tag_endwith)
        .register_tag("block", tag_block)
        .register_tag("endblock", tag_endblock)
        .register_tag("extends", tag_extends)
        .register_tag("include", tag_include)
        .register_tag("insert", tag_insert)
        .register_tag("literal", tag_literal)
        .register_tag("endliteral", tag_endliteral)
        .register_tag("comment", tag_comment)
        .register_tag("endcomment", tag_endcomment);
}

/// The parameters joined into one boolean expression, with `and`, `or` and
/// `not` spelled the runtime's way.
fn condition(tag: &Tag, cx: &Context<'_>) -> Result<String, CompileError> {
    if tag.params().is_empty() {
        return Err(cx.error(format!("{} tag requires a condition", tag.name())));
    }
    let parts: Vec<&str> = tag
        .params()
        .iter()
        .map(|param| match param.raw() {
            "and" => "&&",
            "or" => "||",
            "not" => "!",
            _ => param.expr(),
        })
        .collect();
    Ok(parts.join(" "))
}

fn tag_if(tag: &Tag, cx: &mut Context<'_>) -> Result<(), CompileError> {
    let condition = condition(tag, cx)?;
    cx.write(&codegen::code(&format!("if({condition}):")))?;
    cx.push(IF, ());
    Ok(())
}

fn tag_elseif(tag: &Tag, cx: &mut Context<'_>) -> Result<(), CompileError> {
    cx.peek::<()>(IF)?;
    let condition = condition(tag, cx)?;
    cx.write(&codegen::code(&format!("elseif({condition}):")))
}

fn tag_else(_: &Tag, cx: &mut Context<'_>) -> Result<(), CompileError> {
    cx.peek::<()>(IF)?;
    cx.write(&codegen::code("else:"))
}

fn tag_endif(_: &Tag, cx: &mut Context<'_>) -> Result<(), CompileError> {
    cx.pop::<()>(IF)?;
    cx.write(&codegen::code("endif;"))
}

struct ForFrame {
    has_empty: bool,
}

fn tag_for(tag: &Tag, cx: &mut Context<'_>) -> Result<(), CompileError> {
    let [item, keyword, list] = tag.params() else {
        return Err(cx.error("for tag expects `item in list`"));
    };
    if keyword.raw() != "in" || !is_identifier(item.raw()) {
        return Err(cx.error("for tag expects `item in list`"));
    }

    let target = codegen::property(codegen::NAMESPACE, item.raw());
    let list = list.expr();
    cx.write(&codegen::code(&format!(
        "if(!empty({list})): foreach({list} as {target}):"
    )))?;
    cx.push(FOR, ForFrame { has_empty: false });
    Ok(())
}

fn tag_empty(_: &Tag, cx: &mut Context<'_>) -> Result<(), CompileError> {
    let frame = cx.peek::<ForFrame>(FOR)?;
    if frame.has_empty {
        return Err(cx.error("for tag may only have one empty branch"));
    }
    frame.has_empty = true;
    cx.write(&codegen::code("endforeach; else:"))
}

fn tag_endfor(_: &Tag, cx: &mut Context<'_>) -> Result<(), CompileError> {
    let frame: ForFrame = cx.pop(FOR)?;
    if frame.has_empty {
        cx.write(&codegen::code("endif;"))
    } else {
        cx.write(&codegen::code("endforeach; endif;"))
    }
}

fn tag_with(tag: &Tag, cx: &mut Context<'_>) -> Result<(), CompileError> {
    let [value, keyword, name] = tag.params() else {
        return Err(cx.error("with tag expects `value as name`"));
    };
    if keyword.raw() != "as" || !is_identifier(name.raw()) {
        return Err(cx.error("with tag expects `value as name`"));
    }

    let target = codegen::property(codegen::NAMESPACE, name.raw());
    cx.write(&codegen::code(&format!("{target} = {};", value.expr())))?;
    cx.push(WITH, ());
    Ok(())
}

fn tag_endwith(_: &Tag, cx: &mut Context<'_>) -> Result<(), CompileError> {
    cx.pop::<()>(WITH)
}

struct BlockFrame {
    name: String,
    destination: String,
    paused: Option<PauseState>,
}

/// Blocks capture their content into a temporary artifact as well, so the
/// template this one extends can pick it up. When that artifact already
/// exists, a template further down the chain has overridden the block: its
/// content is used and ours is dropped.
fn tag_block(tag: &Tag, cx: &mut Context<'_>) -> Result<(), CompileError> {
    let name = single_name(tag, cx)?.to_string();

    let session = cx.session();
    let destination = ArtifactCache::block_name(session.id().as_str(), session.template(), &name);
    let paused = if session.add_destination(&destination, true)? {
        let path = session.cache().temp_path(&destination)?;
        session.insert_artifact(&path)?;
        Some(session.pause_all())
    } else {
        None
    };

    cx.push(
        BLOCK,
        BlockFrame {
            name,
            destination,
            paused,
        },
    );
    Ok(())
}

fn tag_endblock(tag: &Tag, cx: &mut Context<'_>) -> Result<(), CompileError> {
    let frame: BlockFrame = cx.pop(BLOCK)?;
    if let Some(name) = tag.param(0) {
        if name.raw() != frame.name {
            return Err(cx.error(format!(
                "endblock {} does not match block {}",
                name.raw(),
                frame.name
            )));
        }
    }

    let session = cx.session();
    session.remove_destination(&frame.destination)?;
    if let Some(state) = frame.paused {
        session.restore(&state);
    }
    Ok(())
}

fn tag_extends(tag: &Tag, cx: &mut Context<'_>) -> Result<(), CompileError> {
    let parent = quoted_path(tag, cx)?.trim_matches('/').to_string();
    if cx.source().tags_seen() > 1 || cx.source().extends().is_some() {
        return Err(cx.error("extends must be the first tag in a template"));
    }

    let id = cx.source().id();
    let ignore_level = (parent == cx.source().requested()).then(|| cx.source().level().to_string());

    let Some(resolved) = cx.session().resolve(&parent, ignore_level.as_deref())? else {
        return Err(CompileError::TemplateNotFound {
            path: parent,
            below: ignore_level,
        });
    };
    if chain_contains(cx.session(), id, &resolved.path) {
        return Err(CompileError::CircularExtends {
            path: parent,
            location: cx.location(),
        });
    }

    cx.session().main_destination_mut().pause();
    cx.session()
        .add_source(&parent, ignore_level.as_deref(), Some(id))?;
    cx.source().set_extends(&parent);
    Ok(())
}

/// Whether `path` is `start` or one of the templates that extend it.
fn chain_contains(session: &Session, start: SourceId, path: &Utf8Path) -> bool {
    let mut link = Some(start);
    while let Some(id) = link {
        let Some(meta) = session.source_meta(id) else {
            return false;
        };
        if meta.path == path {
            return true;
        }
        link = meta.child;
    }
    false
}

fn tag_include(tag: &Tag, cx: &mut Context<'_>) -> Result<(), CompileError> {
    let [path] = tag.params() else {
        return Err(cx.error("include tag expects one template path"));
    };
    cx.write(&codegen::code(&format!("$this->include({});", path.expr())))
}

fn tag_insert(tag: &Tag, cx: &mut Context<'_>) -> Result<(), CompileError> {
    let path = quoted_path(tag, cx)?.to_string();
    cx.session().insert_file(&path)
}

fn tag_literal(_: &Tag, cx: &mut Context<'_>) -> Result<(), CompileError> {
    cx.source().set_parse(false, Some("endliteral"));
    cx.push(LITERAL, ());
    Ok(())
}

fn tag_endliteral(_: &Tag, cx: &mut Context<'_>) -> Result<(), CompileError> {
    cx.pop::<()>(LITERAL)?;
    cx.source().set_parse(true, None);
    Ok(())
}

fn tag_comment(_: &Tag, cx: &mut Context<'_>) -> Result<(), CompileError> {
    let state = cx.session().pause_all();
    cx.source().set_parse(false, Some("endcomment"));
    cx.push(COMMENT, state);
    Ok(())
}

fn tag_endcomment(_: &Tag, cx: &mut Context<'_>) -> Result<(), CompileError> {
    let state: PauseState = cx.pop(COMMENT)?;
    cx.session().restore(&state);
    cx.source().set_parse(true, None);
    Ok(())
}

fn single_name<'t>(tag: &'t Tag, cx: &Context<'_>) -> Result<&'t str, CompileError> {
    match tag.params() {
        [name] if is_identifier(name.raw()) => Ok(name.raw()),
        _ => Err(cx.error(format!("{} tag expects a single name", tag.name()))),
    }
}

fn quoted_path<'t>(tag: &'t Tag, cx: &Context<'_>) -> Result<&'t str, CompileError> {
    match tag.params() {
        [path] => path
            .unquoted()
            .ok_or_else(|| cx.error(format!("{} tag expects a quoted template path", tag.name()))),
        _ => Err(cx.error(format!("{} tag expects one template path", tag.name()))),
    }
}
