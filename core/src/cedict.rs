//! CC-CEDICT to text-dictionary conversion.
//!
//! CC-CEDICT lines look like
//! `一瞬間 一瞬间 [yi1 shun4 jian1] /split second/`. The converted dictionary
//! is keyed by the simplified form, with numbered tones rewritten as tone
//! marks and the outer slashes of the gloss removed:
//! `一瞬间<TAB>[yī shùn jiān]split second`. Words listed more than once
//! (heteronyms) are merged into one line joined by `||`.
//!
//! Source: <https://www.mdbg.net/chinese/dictionary?page=cc-cedict>
use std::io::{self, BufRead, Write};

use ahash::AHashMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::payload::SENSE_SEPARATOR;

static PINYIN_BRACKET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([a-zA-Z0-9\-: ,]+)\]").expect("valid pinyin regex"));
static GLOSS_SLASHES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\]\s*/(.+)/\s*").expect("valid gloss regex"));
static TONE_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"([1-5])\s*").expect("valid tone regex"));

/// Vowels in the order they are tried when placing a tone mark.
const VOWELS: [char; 6] = ['a', 'e', 'o', 'ü', 'i', 'u'];

fn marked(vowel: char, tone: u32) -> char {
    let row = match vowel {
        'a' => ['ā', 'á', 'ǎ', 'à', 'a'],
        'e' => ['ē', 'é', 'ě', 'è', 'e'],
        'o' => ['ō', 'ó', 'ǒ', 'ò', 'o'],
        'ü' => ['ǖ', 'ǘ', 'ǚ', 'ǜ', 'ü'],
        'i' => ['ī', 'í', 'ǐ', 'ì', 'i'],
        'u' => ['ū', 'ú', 'ǔ', 'ù', 'u'],
        other => return other,
    };
    row[(tone as usize).clamp(1, 5) - 1]
}

fn mark_syllable(word: &str) -> String {
    let Some(tone) = word
        .chars()
        .last()
        .and_then(|c| c.to_digit(10))
        .filter(|t| (1..=5).contains(t))
    else {
        return word.to_string();
    };
    let stem = &word[..word.len() - 1];
    let Some(mut vowel) = VOWELS.iter().copied().find(|v| stem.contains(*v)) else {
        return word.to_string();
    };
    if stem.contains("ui") {
        vowel = 'i';
    } else if stem.contains("iu") {
        vowel = 'u';
    }
    let mut buf = [0u8; 4];
    stem.replacen(vowel, marked(vowel, tone).encode_utf8(&mut buf), 1)
}

/// Rewrite numbered-tone pinyin with tone marks.
///
/// `u:` becomes `ü`, the neutral tone (5) drops its digit, and syllables
/// written without a space after their tone digit are separated. Syllables
/// with no vowel (`r5`, `m2`) are left as written.
///
/// # Example
/// ```
/// use libdict_core::cedict::tone_marks;
///
/// assert_eq!(tone_marks("yi1 gen1 sheng2 shang4 de5 ma4 zha5"), "yī gēn shéng shàng de mà zha");
/// assert_eq!(tone_marks("qi1yan2 lu:4shi1"), "qī yán lǜ shī");
/// ```
pub fn tone_marks(pinyin: &str) -> String {
    let lowered = pinyin.replace("u:", "ü").to_lowercase();
    let spaced = TONE_GAP.replace_all(&lowered, "${1} ");
    spaced
        .trim()
        .split(' ')
        .map(mark_syllable)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Apply [`tone_marks`] to every bracketed pinyin group in `text`.
pub fn fix_pinyin(text: &str) -> String {
    let mut out = text.to_string();
    for caps in PINYIN_BRACKET.captures_iter(text) {
        let pinyin = &caps[1];
        let fixed = tone_marks(pinyin).replace(" ,", "");
        out = out.replacen(pinyin, &fixed, 1);
    }
    out
}

/// One parsed CC-CEDICT line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CedictLine<'a> {
    pub traditional: &'a str,
    pub simplified: &'a str,
    /// Everything after the simplified form: `[pin1 yin1] /gloss/`.
    pub rest: &'a str,
}

impl<'a> CedictLine<'a> {
    pub fn parse(line: &'a str) -> Option<Self> {
        let (traditional, rest) = line.split_once(' ')?;
        let (simplified, rest) = rest.split_once(' ')?;
        if traditional.is_empty() || simplified.is_empty() {
            return None;
        }
        Some(Self {
            traditional,
            simplified,
            rest,
        })
    }

    /// The info payload for the text dictionary: `[pīn yīn]gloss/gloss`.
    pub fn info(&self) -> String {
        let cleaned = self.rest.replace('，', "").replace('\r', "");
        let unslashed = GLOSS_SLASHES.replacen(&cleaned, 1, "]${1}");
        fix_pinyin(&unslashed)
    }
}

/// Counters from [`convert`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertReport {
    pub lines: usize,
    /// Distinct simplified keys written.
    pub entries: usize,
    /// Readings appended to an existing key.
    pub merged: usize,
    /// Variant and surname lines, plus lines that do not parse.
    pub dropped: usize,
}

/// Convert a CC-CEDICT stream into the `KEY<TAB>INFO` format.
///
/// Comment and blank lines are copied through (the text loader skips them).
/// Entries keep the order in which each simplified key first appears.
pub fn convert<R: BufRead, W: Write>(reader: R, mut writer: W) -> io::Result<ConvertReport> {
    let mut report = ConvertReport::default();
    let mut lines: Vec<String> = Vec::new();
    let mut index: AHashMap<String, usize> = AHashMap::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        report.lines += 1;

        if line.is_empty() || line.starts_with('#') {
            lines.push(line.to_string());
            continue;
        }
        // Variant entries carry no translation; surname entries only romanize.
        if line.contains("variant of") || line.contains("surname") {
            report.dropped += 1;
            continue;
        }
        let Some(entry) = CedictLine::parse(line) else {
            report.dropped += 1;
            continue;
        };

        let info = entry.info();
        match index.get(entry.simplified) {
            Some(&at) => {
                let existing = &mut lines[at];
                existing.push_str(SENSE_SEPARATOR);
                existing.push_str(&info);
                report.merged += 1;
            }
            None => {
                index.insert(entry.simplified.to_string(), lines.len());
                lines.push(format!("{}\t{}", entry.simplified, info));
                report.entries += 1;
            }
        }
    }

    writer.write_all(lines.join("\n").as_bytes())?;
    writer.flush()?;
    Ok(report)
}
