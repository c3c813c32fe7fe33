//! Rebuilding a numbered Notes block from raw OCR lines.
//!
//! OCR on drawing sheets yields lines that are noisy, duplicated, and often
//! missing their item numbers. Reconstruction runs in fixed passes:
//!
//! 1. normalize whitespace and drop noise (short lines, "Drawing No." headers
//!    leaking in from the title block, symbol-only lines)
//! 2. drop duplicates by an alphanumeric, case-folded key
//! 3. classify each line as header, numbered item, parenthesized translation,
//!    or remainder
//! 4. give keyword-bearing remainder lines the lowest free item numbers
//! 5. attach translations to the item they translate using [`TranslationRule`]s
//! 6. assemble header, items, remainder, then unmatched translations
//!
//! None of this can fail; unrecognizable input degrades to fewer or unordered
//! lines.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Canonical header line.
pub const NOTES_HEADER: &str = "Notes:";

const MIN_LINE_CHARS: usize = 3;
const MIN_KEY_CHARS: usize = 2;
const GAP_FILL_MARGIN: usize = 3;

static HEADER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^notes?\s*[:：]?$").expect("header regex is valid")
});

static DRAWING_NO_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bdrawing\s*no\b").expect("drawing number regex is valid")
});

static FRACTION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9０-９]+\s*/\s*[0-9０-９]").expect("fraction regex is valid"));

static NUMBERED_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        ^(?P<index>[0-9０-９]{1,2})   # ASCII or full-width digits
        (?:\s*[.)）:：]|\s)   # separator
        \s*
        (?P<body>\S.*)$
    ",
    )
    .expect("numbered item regex is valid")
});

static TRANSLATION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[(（].*[)）]$").expect("translation regex is valid"));

/// Maps keywords in a translated line to keywords in the item it translates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRule {
    /// Keywords looked for in the parenthesized translation
    pub source: Vec<String>,
    /// Keywords looked for (case-insensitively) in numbered item bodies
    pub target: Vec<String>,
}

impl TranslationRule {
    /// Creates a rule from keyword slices.
    pub fn new(source: &[&str], target: &[&str]) -> Self {
        Self {
            source: source.iter().map(|s| s.to_string()).collect(),
            target: target.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn matches_source(&self, line: &str) -> bool {
        self.source.iter().any(|kw| line.contains(kw.as_str()))
    }

    fn matches_target(&self, body: &str) -> bool {
        let body = body.to_lowercase();
        self.target
            .iter()
            .any(|kw| body.contains(&kw.to_lowercase()))
    }
}

/// Chinese annotation keywords and the English item terms they translate.
///
/// More specific rules come first; the first rule whose source matches wins.
pub fn default_translation_rules() -> Vec<TranslationRule> {
    vec![
        TranslationRule::new(&["材質", "材料", "材质"], &["material"]),
        TranslationRule::new(&["表面硬度"], &["surface hardness"]),
        TranslationRule::new(&["心部硬度", "芯部硬度"], &["core hardness"]),
        TranslationRule::new(&["硬度"], &["hardness"]),
        TranslationRule::new(&["熱處理", "热处理"], &["heat treat"]),
        TranslationRule::new(&["電鍍", "电镀", "鍍", "镀"], &["plating", "plated"]),
        TranslationRule::new(&["螺紋", "螺纹", "牙"], &["thread"]),
        TranslationRule::new(&["氫脆", "氢脆", "脫氫", "脱氢"], &["hydrogen"]),
        TranslationRule::new(&["衝擊", "冲击"], &["impact"]),
        TranslationRule::new(&["彎曲", "弯曲"], &["bending", "bend"]),
        TranslationRule::new(&["依據", "依据", "根據", "根据"], &["according"]),
        TranslationRule::new(&["測試", "测试", "試驗", "试验"], &["test"]),
        TranslationRule::new(&["頭部", "头部"], &["head"]),
    ]
}

/// Keywords marking a remainder line as a numbered item that lost its number.
pub fn default_gap_fill_keywords() -> Vec<String> {
    [
        "material",
        "hardness",
        "thread",
        "hydrogen",
        "impact",
        "bending",
        "according",
        "test",
        "head",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// How a cleaned line is treated during reconstruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LineKind {
    Header,
    Numbered { index: u32, body: String },
    Translation,
    Remainder,
}

/// Classifies one normalized line. Header wins over numbered.
pub(crate) fn classify_line(line: &str) -> LineKind {
    if HEADER_REGEX.is_match(line) {
        return LineKind::Header;
    }
    if !FRACTION_REGEX.is_match(line) {
        if let Some(caps) = NUMBERED_REGEX.captures(line) {
            let index = parse_index(&caps["index"]);
            if index > 0 {
                return LineKind::Numbered {
                    index,
                    body: caps["body"].trim_end().to_string(),
                };
            }
        }
    }
    if TRANSLATION_REGEX.is_match(line) {
        return LineKind::Translation;
    }
    LineKind::Remainder
}

/// Reads an item index written in ASCII or full-width digits.
fn parse_index(digits: &str) -> u32 {
    digits.chars().fold(0, |acc, c| {
        let digit = match c {
            '0'..='9' => c as u32 - '0' as u32,
            '０'..='９' => c as u32 - '０' as u32,
            _ => 0,
        };
        acc * 10 + digit
    })
}

/// Collapses whitespace runs into single spaces and trims.
fn normalize_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Alphanumeric (including CJK) characters of `line`, lowercased.
fn dedup_key(line: &str) -> String {
    line.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_noise(line: &str) -> bool {
    line.chars().count() < MIN_LINE_CHARS
        || DRAWING_NO_REGEX.is_match(line)
        || !line.chars().any(char::is_alphanumeric)
}

#[derive(Debug)]
struct NoteItem {
    body: String,
    continuations: Vec<String>,
}

impl NoteItem {
    fn new(body: String) -> Self {
        Self {
            body,
            continuations: Vec::new(),
        }
    }
}

/// Turns raw OCR lines into the canonical Notes block.
#[derive(Debug, Clone)]
pub struct NotesReconstructor {
    rules: Vec<TranslationRule>,
    gap_fill_keywords: Vec<String>,
}

impl Default for NotesReconstructor {
    fn default() -> Self {
        Self::new(default_translation_rules(), default_gap_fill_keywords())
    }
}

impl NotesReconstructor {
    /// Creates a reconstructor with the given translation table and gap-fill keywords.
    pub fn new(rules: Vec<TranslationRule>, gap_fill_keywords: Vec<String>) -> Self {
        let gap_fill_keywords = gap_fill_keywords
            .into_iter()
            .map(|kw| kw.to_lowercase())
            .collect();
        Self {
            rules,
            gap_fill_keywords,
        }
    }

    /// Reconstructs the Notes block from `lines`, in their original order.
    pub fn reconstruct<S: AsRef<str>>(&self, lines: &[S]) -> Vec<String> {
        let cleaned = Self::clean(lines);

        let mut has_header = false;
        let mut items: BTreeMap<u32, NoteItem> = BTreeMap::new();
        let mut translations = Vec::new();
        let mut remainder = Vec::new();

        for line in cleaned {
            match classify_line(&line) {
                LineKind::Header => has_header = true,
                LineKind::Numbered { index, body } => match items.get_mut(&index) {
                    Some(item) => item.continuations.push(body),
                    None => {
                        items.insert(index, NoteItem::new(body));
                    }
                },
                LineKind::Translation => translations.push(line),
                LineKind::Remainder => remainder.push(line),
            }
        }

        let remainder = self.gap_fill(&mut items, remainder);
        let unmatched = self.attach_translations(&mut items, translations);

        let mut output = Vec::new();
        if has_header {
            output.push(NOTES_HEADER.to_string());
        }
        for (index, item) in items {
            output.push(format!("{index}. {}", item.body));
            output.extend(item.continuations);
        }
        output.extend(remainder);
        output.extend(unmatched);

        tracing::debug!(
            input = lines.len(),
            output = output.len(),
            "reconstructed notes"
        );
        output
    }

    /// Normalizes, drops noise, and removes duplicates.
    fn clean<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
        let mut seen = HashSet::new();
        lines
            .iter()
            .map(|line| normalize_whitespace(line.as_ref()))
            .filter(|line| !is_noise(line))
            .filter(|line| {
                let key = dedup_key(line);
                key.chars().count() >= MIN_KEY_CHARS && seen.insert(key)
            })
            .collect()
    }

    /// Promotes keyword-bearing remainder lines to numbered items, returning
    /// the lines left over.
    fn gap_fill(&self, items: &mut BTreeMap<u32, NoteItem>, remainder: Vec<String>) -> Vec<String> {
        let Some(&max_index) = items.keys().next_back() else {
            return remainder;
        };

        let candidates = remainder
            .iter()
            .filter(|line| self.has_gap_fill_keyword(line))
            .count();
        if candidates == 0 {
            return remainder;
        }

        let upper = max_index as usize + candidates + GAP_FILL_MARGIN;
        let mut free = (1..=upper as u32)
            .filter(|i| !items.contains_key(i))
            .collect::<Vec<_>>()
            .into_iter();

        let mut left = Vec::new();
        for line in remainder {
            if !self.has_gap_fill_keyword(&line) {
                left.push(line);
                continue;
            }
            match free.next() {
                Some(index) => {
                    tracing::debug!(index, line = %line, "assigned missing item number");
                    items.insert(index, NoteItem::new(line));
                }
                None => left.push(line),
            }
        }
        left
    }

    fn has_gap_fill_keyword(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        self.gap_fill_keywords
            .iter()
            .any(|kw| lower.contains(kw.as_str()))
    }

    /// Attaches each translation under its matching item, returning the
    /// translations that found no home.
    fn attach_translations(
        &self,
        items: &mut BTreeMap<u32, NoteItem>,
        translations: Vec<String>,
    ) -> Vec<String> {
        let mut unmatched = Vec::new();
        for line in translations {
            let target = self
                .rules
                .iter()
                .find(|rule| rule.matches_source(&line))
                .and_then(|rule| items.values_mut().find(|item| rule.matches_target(&item.body)));
            match target {
                Some(item) => item.continuations.push(line),
                None => unmatched.push(line),
            }
        }
        unmatched
    }
}

/// Reconstructs `lines` with the default translation table and keywords.
pub fn reconstruct_notes<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    NotesReconstructor::default().reconstruct(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_is_not_an_index() {
        assert_eq!(classify_line("5/16: C10B21"), LineKind::Remainder);
        assert_eq!(classify_line("3 / 8 UNC"), LineKind::Remainder);
        assert_eq!(
            classify_line("1. Material: Steel"),
            LineKind::Numbered {
                index: 1,
                body: "Material: Steel".to_string()
            }
        );
    }

    #[test]
    fn test_classify_separators_and_header() {
        for line in ["2) Plating", "2: Plating", "2 Plating", "2.Plating", "2）Plating"] {
            assert_eq!(
                classify_line(line),
                LineKind::Numbered {
                    index: 2,
                    body: "Plating".to_string()
                },
                "{line}"
            );
        }
        assert_eq!(classify_line("NOTES:"), LineKind::Header);
        assert_eq!(classify_line("Note"), LineKind::Header);
        assert_eq!(classify_line("(材質)"), LineKind::Translation);
        assert_eq!(classify_line("（表面硬度）"), LineKind::Translation);
        assert_eq!(classify_line("123 Main"), LineKind::Remainder);
        assert_eq!(classify_line("0. Zero"), LineKind::Remainder);
    }

    #[test]
    fn test_full_width_indices() {
        assert_eq!(
            classify_line("１. Material: Steel"),
            LineKind::Numbered {
                index: 1,
                body: "Material: Steel".to_string()
            }
        );
        assert_eq!(
            classify_line("１２）Plating"),
            LineKind::Numbered {
                index: 12,
                body: "Plating".to_string()
            }
        );
        assert_eq!(classify_line("３/８ UNC"), LineKind::Remainder);
        assert_eq!(classify_line("٣. Other digits"), LineKind::Remainder);
        assert_eq!(
            reconstruct_notes(&["Notes:", "１. Material: Steel"]),
            vec!["Notes:", "1. Material: Steel"]
        );
    }

    #[test]
    fn test_whitespace_and_case_duplicates_collapse() {
        let output = reconstruct_notes(&["1. Material: Steel", "1.  MATERIAL:  Steel "]);
        assert_eq!(output, vec!["1. Material: Steel"]);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let lines = [
            "Notes:",
            "1. Material: Steel",
            "(材質)",
            "Drawing NO. 12345",
            "2. Hardness: HRC40",
        ];
        assert_eq!(
            reconstruct_notes(&lines),
            vec!["Notes:", "1. Material: Steel", "(材質)", "2. Hardness: HRC40"]
        );
    }

    #[test]
    fn test_gap_fill_scenario() {
        let lines = [
            "Notes:",
            "1. Material: Steel",
            "Hardness: surface HRC40 according to standard",
        ];
        assert_eq!(
            reconstruct_notes(&lines),
            vec![
                "Notes:",
                "1. Material: Steel",
                "2. Hardness: surface HRC40 according to standard"
            ]
        );
    }

    #[test]
    fn test_gap_fill_uses_lowest_free_indices_in_order() {
        let lines = [
            "2. Material: Steel",
            "Thread per ISO 68-1",
            "Unrelated remark",
            "Impact test at -20C",
        ];
        assert_eq!(
            reconstruct_notes(&lines),
            vec![
                "1. Thread per ISO 68-1",
                "2. Material: Steel",
                "3. Impact test at -20C",
                "Unrelated remark"
            ]
        );
    }

    #[test]
    fn test_no_gap_fill_without_numbered_items() {
        let lines = ["Hardness HRC40", "Material steel"];
        assert_eq!(reconstruct_notes(&lines), vec!["Hardness HRC40", "Material steel"]);
    }

    #[test]
    fn test_repeated_index_becomes_continuation() {
        let lines = ["1. Material: C10B21", "1 Alternative: 10B21", "2. Thread: M8"];
        assert_eq!(
            reconstruct_notes(&lines),
            vec![
                "1. Material: C10B21",
                "Alternative: 10B21",
                "2. Thread: M8"
            ]
        );
    }

    #[test]
    fn test_items_sorted_and_gaps_kept() {
        let lines = ["3. Plating: zinc", "1. Deburr all edges"];
        assert_eq!(
            reconstruct_notes(&lines),
            vec!["1. Deburr all edges", "3. Plating: zinc"]
        );
    }

    #[test]
    fn test_unmatched_translations_come_last() {
        let lines = [
            "(未知註記)",
            "Notes",
            "1. Material: Steel",
            "(硬度)",
            "General remark",
        ];
        assert_eq!(
            reconstruct_notes(&lines),
            vec![
                "Notes:",
                "1. Material: Steel",
                "General remark",
                "(未知註記)",
                "(硬度)"
            ]
        );
    }

    #[test]
    fn test_translation_attaches_to_first_matching_item() {
        let lines = [
            "1. Material: Steel",
            "2. Surface hardness: HV 550",
            "3. Core hardness: HRC 30",
            "(表面硬度)",
            "(心部硬度)",
        ];
        assert_eq!(
            reconstruct_notes(&lines),
            vec![
                "1. Material: Steel",
                "2. Surface hardness: HV 550",
                "(表面硬度)",
                "3. Core hardness: HRC 30",
                "(心部硬度)"
            ]
        );
    }

    #[test]
    fn test_noise_is_dropped() {
        let lines = ["ab", "---", "***!!", "DRAWING No: A-1", "a.", "Keep me"];
        assert_eq!(reconstruct_notes(&lines), vec!["Keep me"]);
    }

    #[test]
    fn test_empty_input() {
        let lines: [&str; 0] = [];
        assert!(reconstruct_notes(&lines).is_empty());
    }

    #[test]
    fn test_custom_rules() {
        let reconstructor = NotesReconstructor::new(
            vec![TranslationRule::new(&["Werkstoff"], &["material"])],
            vec!["MATERIAL".to_string()],
        );
        let lines = ["1. Material: Steel", "(Werkstoff: Stahl)"];
        assert_eq!(
            reconstructor.reconstruct(&lines),
            vec!["1. Material: Steel", "(Werkstoff: Stahl)"]
        );
    }
}
