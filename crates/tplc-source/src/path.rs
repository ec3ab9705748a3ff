//! Lexical path normalisation, vendored and adapted from the `path-clean`
//! crate, <https://github.com/danreeves/path-clean>
//!
//! path-clean LICENSE-MIT:
//! Copyright (c) 2018 Dan Reeves
//!
//! Permission is hereby granted, free of charge, to any person obtaining a copy
//! of this software and associated documentation files (the "Software"), to deal
//! in the Software without restriction, including without limitation the rights
//! to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//! copies of the Software, and to permit persons to whom the Software is
//! furnished to do so, subject to the following conditions:
//!
//! The above copyright notice and this permission notice shall be included in all
//! copies or substantial portions of the Software.
//!
//! THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//! IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//! FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//! AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//! LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//! OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//! SOFTWARE.

use std::path::Component;
use std::path::PathBuf;

use camino::Utf8Path;
use camino::Utf8PathBuf;

/// Resolve `.` and `..` components without touching the file system.
#[must_use]
pub fn clean_utf8_path(path: &Utf8Path) -> Utf8PathBuf {
    let mut out = Vec::new();

    for comp in path.as_std_path().components() {
        match comp {
            Component::CurDir => (),
            Component::ParentDir => match out.last() {
                Some(Component::RootDir) => (),
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                None | Some(Component::CurDir | Component::ParentDir | Component::Prefix(_)) => {
                    out.push(comp);
                }
            },
            comp => out.push(comp),
        }
    }

    if out.is_empty() {
        return Utf8PathBuf::from(".");
    }

    let cleaned: PathBuf = out.iter().collect();
    // every component came from a UTF-8 path
    Utf8PathBuf::from_path_buf(cleaned)
        .unwrap_or_else(|p| Utf8PathBuf::from(p.to_string_lossy().into_owned()))
}

/// Join a requested template or artifact name onto `base`, refusing anything
/// that would land outside of it.
///
/// Leading and trailing slashes on `name` are ignored, so `/shop/list.html`
/// is looked up relative to `base` like `shop/list.html`.
pub fn safe_join(base: &Utf8Path, name: &str) -> Result<Utf8PathBuf, SafeJoinError> {
    let trimmed = name.trim_matches('/');
    if trimmed.is_empty() {
        return Err(SafeJoinError::Empty {
            base: base.to_path_buf(),
        });
    }

    let base = clean_utf8_path(base);
    let cleaned = clean_utf8_path(&base.join(trimmed));

    if cleaned.starts_with(&base) && cleaned != base {
        Ok(cleaned)
    } else {
        Err(SafeJoinError::OutsideBase {
            base,
            attempted: name.to_string(),
            resolved: cleaned,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SafeJoinError {
    #[error("Path '{attempted}' would resolve to '{resolved}' which is outside base '{base}'")]
    OutsideBase {
        base: Utf8PathBuf,
        attempted: String,
        resolved: Utf8PathBuf,
    },
    #[error("Empty path requested below '{base}'")]
    Empty { base: Utf8PathBuf },
}
