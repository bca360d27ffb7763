//! Rewriting of pasted-image placeholders to relocated screenshots

use std::sync::OnceLock;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use regex_lite::{NoExpand, Regex};

use super::ResourceSync;
use crate::core::document::Editor;

/// Characters that break a markdown link target
const LINK_TARGET: &AsciiSet = &CONTROLS.add(b' ').add(b'(').add(b')').add(b'<').add(b'>');

const MARKDOWN_PLACEHOLDER: &str = "![](pasted image";
const WIKI_PLACEHOLDER: &str = "![[pasted image";

fn link_target() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\([^)]*\)").unwrap())
}

fn wiki_target() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[\[[^\]|]*(\|[^\]]*)?\]\]").unwrap())
}

/// Link syntax of a host-inserted placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `![](Pasted%20image%20....png)`
    Markdown,
    /// `![[Pasted image ....png]]`
    Wiki,
}

/// Recognize a freshly pasted image placeholder on `line`
pub fn placeholder(line: &str) -> Option<Placeholder> {
    let decoded = percent_decode_str(line.trim()).decode_utf8_lossy().to_lowercase();
    if decoded.starts_with(MARKDOWN_PLACEHOLDER) {
        Some(Placeholder::Markdown)
    } else if decoded.starts_with(WIKI_PLACEHOLDER) {
        Some(Placeholder::Wiki)
    } else {
        None
    }
}

/// Point the placeholder on `line` at `target`. `None` if `line` holds no
/// placeholder.
pub fn rewrite(line: &str, target: &str) -> Option<String> {
    match placeholder(line)? {
        Placeholder::Markdown => {
            let encoded = utf8_percent_encode(target, LINK_TARGET).to_string();
            let replacement = format!("({})", encoded);
            Some(link_target().replace(line, NoExpand(&replacement)).into_owned())
        }
        Placeholder::Wiki => {
            let caps = wiki_target().captures(line)?;
            let whole = caps.get(0)?;
            let alias = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            Some(format!(
                "{}[[{}{}]]{}",
                &line[..whole.start()],
                target,
                alias,
                &line[whole.end()..]
            ))
        }
    }
}

/// Replace links into `old_folder` with links into `new_folder`, except
/// links into the `kept` sub-folders of `old_folder`. `None` when nothing
/// changed.
pub fn retarget(content: &str, old_folder: &str, new_folder: &str, kept: &[String]) -> Option<String> {
    let encode = |s: &str| utf8_percent_encode(s, LINK_TARGET).to_string();
    let mut pairs = vec![(old_folder.to_string(), new_folder.to_string())];
    let encoded = (encode(old_folder), encode(new_folder));
    if encoded != pairs[0] {
        pairs.push(encoded);
    }
    let kept: Vec<String> = kept
        .iter()
        .cloned()
        .chain(kept.iter().map(|k| encode(k)))
        .collect();

    let mut updated = content.to_string();
    for (old, new) in &pairs {
        for open in ["(", "[["] {
            let from = format!("{}{}/", open, old);
            let to = format!("{}{}/", open, new);
            updated = replace_prefix(&updated, &from, &to, &kept);
        }
    }
    (updated != content).then_some(updated)
}

/// Replace each `from` with `to` unless the text after it continues into
/// one of the `kept` names
fn replace_prefix(content: &str, from: &str, to: &str, kept: &[String]) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(i) = rest.find(from) {
        out.push_str(&rest[..i]);
        let after = &rest[i + from.len()..];
        let into_kept = kept.iter().any(|k| {
            after
                .strip_prefix(k.as_str())
                .map(|tail| tail.starts_with('/'))
                .unwrap_or(false)
        });
        out.push_str(if into_kept { from } else { to });
        rest = after;
    }
    out.push_str(rest);
    out
}

impl ResourceSync {
    /// Point a placeholder under the cursor at the document's relocated
    /// screenshot. The pending path is consumed.
    pub(super) fn handle_editor_change(&mut self, editor: &mut dyn Editor, path: &str) {
        let cursor = editor.cursor();
        let Some(line) = editor.line(cursor.line).map(str::to_string) else {
            return;
        };
        if placeholder(&line).is_none() {
            return;
        }
        let Some(target) = self.contexts.take_pending_screenshot(path) else {
            tracing::debug!("Placeholder in {} has no relocated screenshot", path);
            return;
        };
        if let Some(rewritten) = rewrite(&line, &target) {
            editor.set_line(cursor.line, &rewritten);
            tracing::info!("Linked {} in {}", target, path);
        }
    }
}
