//! Detection of image references removed between two versions of a document

use std::collections::HashSet;
use std::ops::Range;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use percent_encoding::percent_decode_str;
use pulldown_cmark::{Event, Parser, Tag};
use regex_lite::Regex;

use super::path::ResourceLayout;
use super::ResourceSync;
use crate::plugin::api::PluginContext;

fn wiki_embed() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Match ![[target]] or ![[target|size]]
    PATTERN.get_or_init(|| Regex::new(r"!\[\[([^\]|]+)(?:\|[^\]]*)?\]\]").unwrap())
}

/// Resource images referenced by `content`, in order of first appearance.
///
/// Markdown images come from a CommonMark parse, so references inside code
/// are not counted. Wiki embeds are matched by pattern outside code.
pub fn image_references(content: &str, layout: &ResourceLayout) -> Vec<String> {
    let mut found: Vec<(usize, String)> = Vec::new();
    let mut code: Vec<Range<usize>> = Vec::new();

    for (event, range) in Parser::new(content).into_offset_iter() {
        match event {
            Event::Start(Tag::Image { dest_url, .. }) => {
                found.push((range.start, decode(&dest_url)));
            }
            Event::Start(Tag::CodeBlock(_)) | Event::Code(_) => code.push(range),
            _ => {}
        }
    }

    for cap in wiki_embed().captures_iter(content) {
        let (Some(whole), Some(target)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        if code.iter().any(|r| r.contains(&whole.start())) {
            continue;
        }
        found.push((whole.start(), decode(target.as_str())));
    }

    found.sort_by_key(|(offset, _)| *offset);

    let mut seen = HashSet::new();
    found
        .into_iter()
        .map(|(_, target)| target)
        .filter(|target| layout.is_inside_root(target) && layout.is_image(target))
        .filter(|target| seen.insert(target.clone()))
        .collect()
}

/// References present in `before` that `after` no longer mentions
pub fn removed_references(before: &str, after: &str, layout: &ResourceLayout) -> Vec<String> {
    let remaining: HashSet<String> = image_references(after, layout).into_iter().collect();
    image_references(before, layout)
        .into_iter()
        .filter(|target| !remaining.contains(target))
        .collect()
}

fn decode(target: &str) -> String {
    let decoded = percent_decode_str(target.trim()).decode_utf8_lossy();
    decoded
        .trim()
        .trim_start_matches("./")
        .trim_start_matches('/')
        .to_string()
}

impl ResourceSync {
    /// Take the "before" snapshot of an opened document
    pub(super) fn handle_file_open(&mut self, ctx: &mut PluginContext<'_>, path: &str) -> Result<()> {
        if !self.layout.is_document(path) {
            return Ok(());
        }
        let content = ctx
            .vault
            .read(path)
            .with_context(|| format!("Failed to read {}", path))?;
        self.contexts.set_snapshot(path, content);
        Ok(())
    }

    /// Delete resource files whose references disappeared from `path`
    pub(super) fn handle_modify(&mut self, ctx: &mut PluginContext<'_>, path: &str) -> Result<()> {
        if !self.layout.is_document(path) {
            return Ok(());
        }
        let Some(before) = self.contexts.snapshot(path).map(str::to_string) else {
            tracing::debug!("No snapshot of {}, skipping diff", path);
            return Ok(());
        };
        let after = ctx
            .vault
            .read(path)
            .with_context(|| format!("Failed to read {}", path))?;

        let removed = removed_references(&before, &after, &self.layout);
        self.contexts.set_snapshot(path, after);

        let mut failure = None;
        for target in removed {
            if !ctx.vault.is_file(&target) {
                tracing::debug!("Unlinked {} is already gone", target);
                continue;
            }
            match ctx.vault.delete(&target, false) {
                Ok(()) => tracing::info!("Deleted unlinked resource {}", target),
                Err(e) => {
                    let e = anyhow::Error::from(e).context(format!("Failed to delete {}", target));
                    failure.get_or_insert(e);
                }
            }
        }
        failure.map_or(Ok(()), Err)
    }
}
