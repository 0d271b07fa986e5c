//! Producing the per-locale translation blocks of a raidboss trigger file.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::config::NameKind;
use crate::extract::ExtractedEntities;
use crate::resolve::Resolver;
use crate::rewrite::escape_literal;

/// The translations for one locale. Names without a translation are left out, which is why
/// every block is marked as having missing translations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalizedBlock {
    pub locale: String,
    /// Monster names, as used in `replaceSync`.
    pub sync: BTreeMap<String, String>,
    /// Action names, as used in `replaceText`.
    pub text: BTreeMap<String, String>,
}

/// Build one block for every target locale in the config, in configured order.
pub fn localize(entities: &ExtractedEntities, resolver: &Resolver) -> Vec<LocalizedBlock> {
    resolver
        .config()
        .target_locales()
        .map(|locale| {
            let mut block =
                LocalizedBlock { locale: locale.to_owned(), ..LocalizedBlock::default() };
            for name in &entities.npcs {
                if let Some(value) = resolver.translate(name, NameKind::Npc, locale) {
                    block.sync.insert(name.clone(), value.to_owned());
                }
            }
            for name in &entities.actions {
                if let Some(value) = resolver.translate(name, NameKind::Action, locale) {
                    block.text.insert(name.clone(), value.to_owned());
                }
            }
            block
        })
        .collect()
}

fn render_group(out: &mut String, label: &str, entries: &BTreeMap<String, String>) {
    _ = writeln!(out, "      '{label}': {{");
    for (key, value) in entries {
        _ = writeln!(out, "        '{}': '{}',", escape_literal(key), escape_literal(value));
    }
    out.push_str("      },\n");
}

/// Render the blocks as they are pasted into the `timelineReplace` list of a trigger file.
pub fn render_blocks(blocks: &[LocalizedBlock]) -> String {
    let mut out = String::new();
    for block in blocks {
        out.push_str("    {\n");
        _ = writeln!(out, "      'locale': '{}',", escape_literal(&block.locale));
        out.push_str("      'missingTranslations': true,\n");
        render_group(&mut out, "replaceSync", &block.sync);
        render_group(&mut out, "replaceText", &block.text);
        out.push_str("    },\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use ahash::AHashMap;

    use super::*;
    use crate::config::{Config, LocaleSource};
    use crate::rsv::ReservedValues;
    use crate::table::Table;
    use crate::token::Loc;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|&cell| cell.to_owned()).collect()
    }

    #[test]
    fn test_unresolved_names_are_left_out() {
        let config = Config {
            locales: vec![
                LocaleSource { code: "en".to_owned(), url: String::new() },
                LocaleSource { code: "de".to_owned(), url: String::new() },
                LocaleSource { code: "ko".to_owned(), url: String::new() },
            ],
            ..Config::default()
        };
        let mut action = Table::new(row(&["#", "Name_en", "Name_de", "Name_ko"]));
        action.push_row(row(&["1", "Hell's Sting", "Höllenstich", ""]));
        let mut npc = Table::new(row(&["#", "Singular_en", "Singular_de"]));
        npc.push_row(row(&["1", "Hesperos", "Hesperos"]));
        let tables = AHashMap::from([("Action".to_owned(), action), ("BNpcName".to_owned(), npc)]);
        let resolver = Resolver::new(&config, &tables);

        let mut entities = ExtractedEntities::default();
        entities.actions.insert("Hell's Sting".to_owned());
        entities.actions.insert("Decollation".to_owned());
        entities.npcs.insert("Hesperos".to_owned());

        let blocks = localize(&entities, &resolver);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text.len(), 1);
        assert!(blocks[0].text.get("Decollation").is_none());
        assert!(blocks[1].sync.is_empty() && blocks[1].text.is_empty());

        let expected = "    {
      'locale': 'de',
      'missingTranslations': true,
      'replaceSync': {
        'Hesperos': 'Hesperos',
      },
      'replaceText': {
        'Hell\\'s Sting': 'Höllenstich',
      },
    },
";
        assert_eq!(render_blocks(&blocks[..1]), expected);
    }

    #[test]
    fn test_multiline_values_stay_on_one_line() {
        let config = Config {
            locales: vec![
                LocaleSource { code: "en".to_owned(), url: String::new() },
                LocaleSource { code: "ko".to_owned(), url: String::new() },
            ],
            ..Config::default()
        };
        let mut action = Table::new(row(&["#", "Name_en", "Name_ko"]));
        action.push_row(row(&["1", "Ravenous Spark", "_rsv_106_-1_1_0_1"]));
        let tables = AHashMap::from([("Action".to_owned(), action)]);
        let mut registry = ReservedValues::new();
        let record = "262|2024-01-01|3|1|_rsv_106_-1_1_0_1|굶주린\u{2}\u{10}\u{1}\u{3}불꽃|0f";
        registry.parse_log_text(record, &Loc::for_file("Network.log"), &config.reserved);
        let resolver = Resolver::new(&config, &tables).with_registry(&registry);

        let mut entities = ExtractedEntities::default();
        entities.actions.insert("Ravenous Spark".to_owned());
        let rendered = render_blocks(&localize(&entities, &resolver));
        assert!(rendered.contains("        'Ravenous Spark': '굶주린\\n불꽃',\n"));
        assert_eq!(rendered.lines().count(), 9);
    }
}
