//! Filling in the values of `'key': 'value',` lines in a translation file.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Cursor, Write};
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::config::NameKind;
use crate::report::{tips, ErrorKey};
use crate::resolve::{Resolution, Resolver};
use crate::token::{Loc, Token};

static ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<indent>\s*)'(?P<key>(?:[^'\\]|\\.)*)': '(?:[^'\\]|\\.)*',$")
        .expect("entry regex")
});

/// The order in which [`rewrite_all`] applies the name kinds.
pub const REWRITE_ORDER: [NameKind; 3] = [NameKind::Action, NameKind::Npc, NameKind::Place];

/// Counts from one pass over a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    pub lines: usize,
    pub entries: usize,
    pub rewritten: usize,
}

#[derive(Debug)]
pub struct Rewriter<'a> {
    resolver: &'a Resolver<'a>,
    kind: NameKind,
    locale: &'a str,
}

/// Escape a value for use inside a single-quoted literal. Line breaks become escapes so that a
/// value never spans more than one line.
pub(crate) fn escape_literal(s: &str) -> Cow<str> {
    if !s.contains(['\\', '\'', '\n', '\r']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 4);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// The key of an entry line, located just after its opening quote.
fn key_token(key: &str, indent: &str, loc: &Loc) -> Token {
    let mut loc = loc.clone();
    loc.column = u32::try_from(indent.chars().count() + 2).unwrap_or(u32::MAX);
    Token::new(key, loc)
}

impl<'a> Rewriter<'a> {
    pub fn new(resolver: &'a Resolver<'a>, kind: NameKind, locale: &'a str) -> Self {
        Rewriter { resolver, kind, locale }
    }

    /// Rewrite a single line, given without its line terminator. Lines that are not entries, and
    /// entries whose key is not in the tables, come back unchanged so that passes for different
    /// name kinds can be chained.
    ///
    /// If the key is known but its translation is still a placeholder, the value becomes the key.
    pub fn rewrite_line<'b>(&self, line: &'b str, loc: &Loc) -> Cow<'b, str> {
        let Some(caps) = ENTRY.captures(line) else {
            return Cow::Borrowed(line);
        };
        let indent = &caps["indent"];
        let raw_key = &caps["key"];

        let mut key = Cow::Borrowed(raw_key);
        for (from, to) in &self.resolver.config().key_substitutions {
            if key.contains(from.as_str()) {
                key = Cow::Owned(key.replace(from.as_str(), to));
            }
        }

        let value = match self.resolver.lookup(&key, self.kind, self.locale) {
            Resolution::Found(value) => escape_literal(value),
            Resolution::Reserved(placeholder) => {
                let msg = format!("the {} translation is still a reserved value", self.locale);
                let info = format!("{placeholder} is not in the registry; the name is kept as is");
                let token = key_token(raw_key, indent, loc);
                tips(ErrorKey::ReservedValue).msg(msg).info(info).loc(token).push();
                Cow::Borrowed(raw_key)
            }
            Resolution::Missing => {
                let msg = format!("no {} translation for this {}", self.locale, self.kind);
                let token = key_token(raw_key, indent, loc);
                tips(ErrorKey::Unresolved).msg(msg).loc(token).push();
                return Cow::Borrowed(line);
            }
        };
        Cow::Owned(format!("{indent}'{raw_key}': '{value}',"))
    }

    /// Copy `input` to `output` line by line, rewriting entries. Line terminators are kept as
    /// they were, so the output has exactly as many lines as the input.
    pub fn rewrite<R: BufRead, W: Write>(
        &self,
        mut input: R,
        output: &mut W,
        loc: &Loc,
    ) -> Result<RewriteStats> {
        let mut stats = RewriteStats::default();
        let mut buf = String::new();
        loop {
            buf.clear();
            if input.read_line(&mut buf).context("reading input")? == 0 {
                break;
            }
            stats.lines += 1;
            let body = buf.trim_end_matches(['\n', '\r']);
            let terminator = &buf[body.len()..];
            let line_loc = loc.at_line(u32::try_from(stats.lines).unwrap_or(u32::MAX));
            let new = self.rewrite_line(body, &line_loc);
            if ENTRY.is_match(body) {
                stats.entries += 1;
            }
            if new != body {
                stats.rewritten += 1;
            }
            output.write_all(new.as_bytes()).context("writing output")?;
            output.write_all(terminator.as_bytes()).context("writing output")?;
        }
        Ok(stats)
    }

    pub fn rewrite_file(&self, input: &Path, output: &Path) -> Result<RewriteStats> {
        let reader = File::open(input).with_context(|| format!("opening {}", input.display()))?;
        let writer =
            File::create(output).with_context(|| format!("creating {}", output.display()))?;
        let reader = BufReader::new(reader);
        let mut writer = BufWriter::new(writer);
        let stats = self.rewrite(reader, &mut writer, &Loc::for_file(input))?;
        writer.flush().with_context(|| format!("writing {}", output.display()))?;
        Ok(stats)
    }
}

/// Rewrite a file for actions, then monster names, then place names.
pub fn rewrite_all(
    resolver: &Resolver,
    locale: &str,
    input: &Path,
    output: &Path,
) -> Result<RewriteStats> {
    let mut text = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let loc = Loc::for_file(input);
    let mut total = RewriteStats::default();
    for kind in REWRITE_ORDER {
        let mut next = Vec::with_capacity(text.len());
        let rewriter = Rewriter::new(resolver, kind, locale);
        let stats = rewriter.rewrite(Cursor::new(&text), &mut next, &loc)?;
        total.lines = stats.lines;
        total.entries = stats.entries;
        total.rewritten += stats.rewritten;
        text = next;
    }
    std::fs::write(output, &text).with_context(|| format!("writing {}", output.display()))?;
    Ok(total)
}
