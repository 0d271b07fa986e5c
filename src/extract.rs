//! Mining a timeline for the names of the actions and monsters it mentions.
//!
//! A timeline comes as a pair of resources with the same base name: the trigger file (`.ts` or
//! `.js`) whose lines carry object fragments such as `{ id: '1234', source: 'Hesperos' }`, and
//! the timeline text (`.txt`) whose cue lines look like `123.4 "Fire/Fire II" Ability { ... }`.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::fetch::{Fetch, FetchError};
use crate::parse::json::{parse_json5, ParseError};
use crate::report::{cache_source, tips, warn, ErrorKey};
use crate::token::Loc;

static FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^}]*\}").expect("fragment regex"));
static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)""#).expect("quoted regex"));
static COUNTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\d+$").expect("counter regex"));
static ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(.*?\)$").expect("annotation regex"));

/// Fields of a trigger fragment that name monsters.
const NAME_FIELDS: &[&str] = &["source", "target"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelinePair {
    pub literal_resource: String,
    pub literal: String,
    pub narrative_resource: String,
    /// The timeline text is optional; some encounters have only triggers.
    pub narrative: Option<String>,
}

impl TimelinePair {
    /// Fetch both members of the pair, given the resource name of either one.
    pub fn fetch<F: Fetch>(fetcher: &F, resource: &str) -> Result<Self, FetchError> {
        let literal_ext = if extension(resource) == Some("js") { "js" } else { "ts" };
        let literal_resource = with_extension(resource, literal_ext);
        let narrative_resource = with_extension(resource, "txt");

        let literal = fetcher.fetch_text(&literal_resource)?;
        let narrative = match fetcher.fetch_text(&narrative_resource) {
            Ok(text) => Some(text),
            Err(e) if e.is_not_found() => {
                let msg = "timeline text not found; only the triggers are scanned";
                warn(ErrorKey::MissingFile).msg(msg).loc(Loc::for_file(&narrative_resource)).push();
                None
            }
            Err(e) => return Err(e),
        };
        Ok(Self::from_parts(literal_resource, literal, narrative_resource, narrative))
    }

    pub fn from_parts(
        literal_resource: String,
        literal: String,
        narrative_resource: String,
        narrative: Option<String>,
    ) -> Self {
        cache_source(&literal_resource, &literal);
        if let Some(narrative) = &narrative {
            cache_source(&narrative_resource, narrative);
        }
        TimelinePair { literal_resource, literal, narrative_resource, narrative }
    }
}

fn extension(resource: &str) -> Option<&str> {
    let name = &resource[resource.rfind('/').map_or(0, |i| i + 1)..];
    name.rfind('.').filter(|&i| i > 0).map(|i| &name[i + 1..])
}

/// Replace the extension of the last path segment, or add one if there is none.
fn with_extension(resource: &str, ext: &str) -> String {
    let start = resource.rfind('/').map_or(0, |i| i + 1);
    let base = match resource[start..].rfind('.') {
        Some(dot) if dot > 0 => &resource[..start + dot],
        _ => resource,
    };
    format!("{base}.{ext}")
}

/// The names found in a timeline, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedEntities {
    pub actions: BTreeSet<String>,
    pub npcs: BTreeSet<String>,
}

impl ExtractedEntities {
    fn add_npcs(&mut self, fragment: &Map<String, Value>) {
        for field in NAME_FIELDS {
            match fragment.get(*field) {
                Some(Value::String(name)) => add_trimmed(&mut self.npcs, name),
                Some(Value::Array(names)) => {
                    for name in names.iter().filter_map(Value::as_str) {
                        add_trimmed(&mut self.npcs, name);
                    }
                }
                _ => (),
            }
        }
    }
}

fn add_trimmed(set: &mut BTreeSet<String>, name: &str) {
    let name = name.trim();
    if !name.is_empty() {
        set.insert(name.to_owned());
    }
}

/// Parse a brace-delimited fragment. Only objects are accepted.
pub fn parse_fragment(text: &str) -> Result<Map<String, Value>, ParseError> {
    match parse_json5(text)? {
        Value::Object(map) => Ok(map),
        _ => Err(ParseError { offset: 0, msg: "fragment is not an object".to_owned() }),
    }
}

/// Find and parse the first fragment on a line. A fragment that doesn't parse is reported and
/// otherwise ignored.
fn line_fragment(line: &str, loc: &Loc, nr: usize) -> Option<Map<String, Value>> {
    let m = FRAGMENT.find(line)?;
    match parse_fragment(m.as_str()) {
        Ok(map) => Some(map),
        Err(e) => {
            let mut loc = loc.at_line(line_number(nr));
            loc.column = column_number(&line[..m.start() + e.offset.min(m.len())]);
            let msg = format!("could not parse fragment: {}", e.msg);
            tips(ErrorKey::ParseError).weak().msg(msg).loc(loc).push();
            None
        }
    }
}

fn line_number(nr: usize) -> u32 {
    u32::try_from(nr + 1).unwrap_or(u32::MAX)
}

fn column_number(prefix: &str) -> u32 {
    u32::try_from(prefix.chars().count() + 1).unwrap_or(u32::MAX)
}

/// Turn the text of a timeline cue into the action names it stands for.
///
/// Cues starting with `-` are markers such as `--sync--` and name nothing. Otherwise a trailing
/// repetition counter, a trailing `?` and a trailing parenthetical are removed, in that order,
/// and the rest is split on `/`.
pub fn clean_action(cue: &str) -> Vec<String> {
    if cue.starts_with('-') {
        return Vec::new();
    }
    let cue = COUNTER.replace(cue, "");
    let cue = cue.strip_suffix('?').unwrap_or(&*cue);
    let cue = ANNOTATION.replace(cue, "");
    cue.split('/').map(str::trim).filter(|name| !name.is_empty()).map(str::to_owned).collect()
}

/// Collect the action and monster names from both members of a timeline pair.
pub fn extract(pair: &TimelinePair) -> ExtractedEntities {
    let mut entities = ExtractedEntities::default();

    let loc = Loc::for_file(&pair.literal_resource);
    for (nr, line) in pair.literal.lines().enumerate() {
        if let Some(fragment) = line_fragment(line, &loc, nr) {
            entities.add_npcs(&fragment);
        }
    }

    if let Some(narrative) = &pair.narrative {
        let loc = Loc::for_file(&pair.narrative_resource);
        for (nr, line) in narrative.lines().enumerate() {
            if !line.starts_with(|c: char| c.is_ascii_digit()) {
                continue;
            }
            if let Some(caps) = QUOTED.captures(line) {
                for name in clean_action(&caps[1]) {
                    entities.actions.insert(name);
                }
            }
            if let Some(fragment) = line_fragment(line, &loc, nr) {
                entities.add_npcs(&fragment);
            }
        }
    }
    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_action() {
        assert_eq!(clean_action("Fireball/Fireball II (cast)"), ["Fireball", "Fireball II"]);
        assert!(clean_action("- nothing").is_empty());
        assert!(clean_action("--sync--").is_empty());
        assert_eq!(clean_action("Hell's Sting 2"), ["Hell's Sting"]);
        assert_eq!(clean_action("Ultimate Impulse?"), ["Ultimate Impulse"]);
        assert_eq!(clean_action("Decollation (enrage) 3"), ["Decollation"]);
        assert_eq!(clean_action("Bloodrake / Belone Bursts"), ["Bloodrake", "Belone Bursts"]);
    }

    #[test]
    fn test_extensions() {
        assert_eq!(extension("https://host/ui/raidboss/data/p4s.txt"), Some("txt"));
        assert_eq!(extension("https://host.io/p4s"), None);
        assert_eq!(
            with_extension("https://host/data/06-ew/raid/p4s.txt", "ts"),
            "https://host/data/06-ew/raid/p4s.ts"
        );
        assert_eq!(with_extension("data/p4s", "txt"), "data/p4s.txt");
        assert_eq!(with_extension("./p4s.js", "txt"), "./p4s.txt");
    }

    #[test]
    fn test_extract() {
        let literal = "\
      netRegex: { id: '6A0C', source: 'Hesperos' },
      netRegex: { id: ['6A0D', '6A0E'], source: ['Hesperos', ' Hesperos '], target: 'Pinax' },
      netRegex: { id: '6A0F', source: },
      regex: /nothing here/,
";
        let narrative = "\
0.0 \"--sync--\" InCombat { inGameCombat: \"1\" } window 0,1
14.1 \"Decollation\" Ability { id: \"6A09\", source: \"Hesperos\" }
22.5 \"Bloodrake/Belone Bursts 2\" Ability { id: \"69D8\", source: \"Hesperos\" }
# 30.0 \"Commented Out\"
hideall \"--Reset--\"
40.0 \"Elegant Evisceration?\" { broken
";
        let pair = TimelinePair {
            literal_resource: "p4s.ts".to_owned(),
            literal: literal.to_owned(),
            narrative_resource: "p4s.txt".to_owned(),
            narrative: Some(narrative.to_owned()),
        };
        let entities = extract(&pair);
        let actions: Vec<_> = entities.actions.iter().map(String::as_str).collect();
        assert_eq!(actions, ["Belone Bursts", "Bloodrake", "Decollation", "Elegant Evisceration"]);
        let npcs: Vec<_> = entities.npcs.iter().map(String::as_str).collect();
        assert_eq!(npcs, ["Hesperos", "Pinax"]);
    }

    #[test]
    fn test_narrative_is_optional() {
        let pair = TimelinePair {
            literal_resource: "p4s.ts".to_owned(),
            literal: "{ source: 'Hesperos' }".to_owned(),
            narrative_resource: "p4s.txt".to_owned(),
            narrative: None,
        };
        let entities = extract(&pair);
        assert!(entities.actions.is_empty());
        assert_eq!(entities.npcs.len(), 1);
    }
}
