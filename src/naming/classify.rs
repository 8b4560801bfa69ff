//! Ordered classifiers over link text, page context and href
//!
//! Each classifier is a list of tagged variants tried in priority order; the
//! first match wins and every list has a documented fallback.

use regex::Regex;
use std::sync::OnceLock;

fn chapter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)chapter\s+(\d+)[:;]?\s*(.*?)$").expect("chapter regex is valid"))
}

fn unit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)unit[-\s]+(\d+)").expect("unit regex is valid"))
}

fn module_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)module\s+(\d+)").expect("module regex is valid"))
}

fn initial_pages_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:initial\s*pages?|ip)\b").expect("initial pages regex is valid")
    })
}

fn sitting_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(may|nov)(?:ember)?[\s_-]*(\d{4})").expect("sitting regex is valid")
    })
}

fn paper_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[ps]([1-6])\b").expect("paper regex is valid"))
}

fn href_group_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:group-?|\bg)([12])\b").expect("href group regex is valid"))
}

fn text_group_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:group|grp)\s*[:-]?\s*([12])\b").expect("text group regex is valid")
    })
}

/// Words dropped from chapter titles before abbreviation
const STOP_WORDS: &[&str] = &[
    "and", "the", "of", "in", "for", "to", "with", "on", "a", "an",
];

/// Abbreviations stop growing once they reach this many characters
const ABBREVIATION_LIMIT: usize = 15;

/// Study-material links recognized from the link text alone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChapterKind {
    InitialPages,
    /// Abbreviated chapter title, e.g. `Accbuscom`
    Chapter(String),
    Unit(String),
    Module(String),
}

impl ChapterKind {
    /// Tries initial pages, chapter, unit and module in that order
    pub fn classify(text: &str, href: &str) -> Option<Self> {
        if initial_pages_re().is_match(text) || href.to_ascii_lowercase().contains("-ip.") {
            return Some(Self::InitialPages);
        }

        if let Some(caps) = chapter_re().captures(text) {
            let title = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            return Some(Self::Chapter(abbreviate_title(title)));
        }

        if let Some(caps) = unit_re().captures(text) {
            return Some(Self::Unit(caps[1].to_string()));
        }

        module_re()
            .captures(text)
            .map(|caps| Self::Module(caps[1].to_string()))
    }

    pub fn stem(&self) -> String {
        match self {
            Self::InitialPages => "InitialPages".to_string(),
            Self::Chapter(abbreviation) => abbreviation.clone(),
            Self::Unit(n) => format!("Unit{}", n),
            Self::Module(n) => format!("Module{}", n),
        }
    }
}

/// Builds a compact name from the first three letters of each significant word
///
/// Only the first character is upper-case. An empty result becomes `Chapter`.
fn abbreviate_title(title: &str) -> String {
    let mut abbreviation = String::new();

    let words = title
        .split_whitespace()
        .map(|word| word.chars().filter(char::is_ascii_alphabetic).collect::<String>())
        .filter(|word| !word.is_empty())
        .filter(|word| !STOP_WORDS.contains(&word.to_ascii_lowercase().as_str()));

    for word in words {
        abbreviation.extend(word.chars().take(3));
        if abbreviation.len() >= ABBREVIATION_LIMIT {
            break;
        }
    }

    let mut chars = abbreviation.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
        None => "Chapter".to_string(),
    }
}

/// What kind of exam document a link points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    MockTest,
    RevisionTest,
    SuggestedAnswer,
    QuestionPaper,
    Syllabus,
    Unknown,
}

impl DocumentKind {
    /// Priority order; the first kind whose pattern matches wins
    const ORDERED: [DocumentKind; 5] = [
        Self::MockTest,
        Self::RevisionTest,
        Self::SuggestedAnswer,
        Self::QuestionPaper,
        Self::Syllabus,
    ];

    fn pattern(self) -> Option<&'static Regex> {
        static MOCK: OnceLock<Regex> = OnceLock::new();
        static REVISION: OnceLock<Regex> = OnceLock::new();
        static ANSWER: OnceLock<Regex> = OnceLock::new();
        static QUESTION: OnceLock<Regex> = OnceLock::new();
        static SYLLABUS: OnceLock<Regex> = OnceLock::new();

        let (cell, source) = match self {
            Self::MockTest => (&MOCK, r"(?i)\b(?:mtp|mock\s*tests?)\b"),
            Self::RevisionTest => (&REVISION, r"(?i)\b(?:rtp|revision\s*tests?)\b"),
            Self::SuggestedAnswer => (&ANSWER, r"(?i)\b(?:suggested\s*answers?|solutions?)\b"),
            Self::QuestionPaper => (&QUESTION, r"(?i)\b(?:question\s*papers?|exam)\b"),
            Self::Syllabus => (&SYLLABUS, r"(?i)\b(?:syllabus|study\s*material|chapter)\b"),
            Self::Unknown => return None,
        };

        Some(cell.get_or_init(|| Regex::new(source).expect("document kind regex is valid")))
    }

    pub fn classify(text: &str) -> Self {
        Self::ORDERED
            .into_iter()
            .find(|kind| kind.pattern().is_some_and(|re| re.is_match(text)))
            .unwrap_or(Self::Unknown)
    }
}

/// Exam sitting code such as `M25` or `N24`; empty when none is found
pub fn sitting_code(text: &str) -> String {
    let Some(caps) = sitting_re().captures(text) else {
        return String::new();
    };

    let month = if caps[1].eq_ignore_ascii_case("may") { "M" } else { "N" };
    let year = &caps[2];
    format!("{}{}", month, &year[year.len() - 2..])
}

/// Final-level subjects, keyed by paper number 1 to 6
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    FinancialReporting,
    FinancialManagement,
    Audit,
    DirectTax,
    IndirectTax,
    CaseStudy,
}

impl Subject {
    pub fn code(self) -> &'static str {
        match self {
            Self::FinancialReporting => "FR",
            Self::FinancialManagement => "AFM",
            Self::Audit => "AUD",
            Self::DirectTax => "DT",
            Self::IndirectTax => "IDT",
            Self::CaseStudy => "MCD",
        }
    }

    fn from_paper(paper: u8) -> Option<Self> {
        match paper {
            1 => Some(Self::FinancialReporting),
            2 => Some(Self::FinancialManagement),
            3 => Some(Self::Audit),
            4 => Some(Self::DirectTax),
            5 => Some(Self::IndirectTax),
            6 => Some(Self::CaseStudy),
            _ => None,
        }
    }

    /// Keyword detection over lower-cased text
    ///
    /// Indirect tax is tested before direct tax because one phrase contains the other.
    fn from_keywords(text: &str) -> Option<Self> {
        let has_word = |word: &str| {
            text.split(|c: char| !c.is_ascii_alphanumeric())
                .any(|token| token == word)
        };
        let has_any = |needles: &[&str]| needles.iter().any(|n| text.contains(n));

        if has_any(&["financial reporting"]) || has_word("fr") {
            Some(Self::FinancialReporting)
        } else if has_any(&["afm", "advanced financial"]) {
            Some(Self::FinancialManagement)
        } else if has_any(&["audit", "aape", "professional ethics"]) {
            Some(Self::Audit)
        } else if has_any(&["gst", "indirect tax"]) || has_word("idt") {
            Some(Self::IndirectTax)
        } else if has_any(&["direct tax", "income tax"]) || has_word("dt") {
            Some(Self::DirectTax)
        } else if has_any(&["mcs", "mcd"])
            || (text.contains("multi") && text.contains("disciplinary") && text.contains("case"))
        {
            Some(Self::CaseStudy)
        } else {
            None
        }
    }
}

/// Group, paper and subject hints for one link
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaperInfo {
    /// `G1` or `G2`
    pub group: Option<String>,
    /// 1 to 6
    pub paper: Option<u8>,
    pub subject: Option<Subject>,
}

impl PaperInfo {
    /// Extracts hints from the lower-cased combined text and the raw href
    pub fn extract(combined: &str, href: &str) -> Self {
        let href = href.to_ascii_lowercase();

        let paper = paper_re()
            .captures(&href)
            .and_then(|caps| caps[1].parse::<u8>().ok());

        let group = href_group_re()
            .captures(&href)
            .or_else(|| text_group_re().captures(combined))
            .map(|caps| format!("G{}", &caps[1]))
            .or_else(|| paper.map(|p| if p <= 3 { "G1" } else { "G2" }.to_string()));

        let subject = paper
            .and_then(Subject::from_paper)
            .or_else(|| Subject::from_keywords(combined));

        Self {
            group,
            paper,
            subject,
        }
    }

    pub fn subject_code(&self) -> &'static str {
        self.subject.map(Subject::code).unwrap_or_default()
    }

    pub fn group_code(&self) -> &str {
        self.group.as_deref().unwrap_or_default()
    }

    /// Subject code if known, otherwise the group code
    pub fn subject_or_group(&self) -> &str {
        match self.subject {
            Some(subject) => subject.code(),
            None => self.group_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chapter_kinds_in_priority_order() {
        assert_eq!(
            ChapterKind::classify("Initial Pages", "/x.pdf"),
            Some(ChapterKind::InitialPages)
        );
        assert_eq!(
            ChapterKind::classify("Front matter", "/book-ip.pdf"),
            Some(ChapterKind::InitialPages)
        );
        assert_eq!(
            ChapterKind::classify("Unit 4", "/u4.pdf"),
            Some(ChapterKind::Unit("4".to_string()))
        );
        assert_eq!(
            ChapterKind::classify("Module 2", "/m2.pdf"),
            Some(ChapterKind::Module("2".to_string()))
        );
        assert_eq!(ChapterKind::classify("Question Paper", "/qp.pdf"), None);
    }

    #[test]
    fn test_chapter_title_abbreviation() {
        let kind = ChapterKind::classify("Chapter 3: Accounting for Business Combinations", "/c3.pdf");
        assert_eq!(kind.map(|k| k.stem()), Some("Accbuscom".to_string()));

        let kind = ChapterKind::classify("Chapter 7", "/c7.pdf");
        assert_eq!(kind.map(|k| k.stem()), Some("Chapter".to_string()));
    }

    #[test]
    fn test_abbreviation_is_capped() {
        let abbreviation =
            abbreviate_title("Professional Ethics Standards Auditing Reporting Framework Extra Words");
        assert!(abbreviation.len() <= ABBREVIATION_LIMIT);
        assert!(abbreviation.starts_with("Pro"));
    }

    #[test]
    fn test_document_kind_order() {
        assert_eq!(DocumentKind::classify("mtp series 1"), DocumentKind::MockTest);
        assert_eq!(DocumentKind::classify("revision test paper"), DocumentKind::RevisionTest);
        assert_eq!(
            DocumentKind::classify("suggested answers for question paper"),
            DocumentKind::SuggestedAnswer
        );
        assert_eq!(DocumentKind::classify("question paper"), DocumentKind::QuestionPaper);
        assert_eq!(DocumentKind::classify("new syllabus"), DocumentKind::Syllabus);
        assert_eq!(DocumentKind::classify("annual report"), DocumentKind::Unknown);
    }

    #[test]
    fn test_sitting_code() {
        assert_eq!(sitting_code("papers may2025"), "M25");
        assert_eq!(sitting_code("november 2024 exam"), "N24");
        assert_eq!(sitting_code("nov-2023"), "N23");
        assert_eq!(sitting_code("icai"), "");
    }

    #[test]
    fn test_paper_info_from_href() {
        let info = PaperInfo::extract("paper icai /final/p5.pdf", "/final/p5.pdf");
        assert_eq!(info.paper, Some(5));
        assert_eq!(info.group.as_deref(), Some("G2"));
        assert_eq!(info.subject_code(), "IDT");
    }

    #[test]
    fn test_group_from_text() {
        let info = PaperInfo::extract("mtp group 1 icai /mtp.pdf", "/mtp.pdf");
        assert_eq!(info.group_code(), "G1");
        assert_eq!(info.subject, None);
        assert_eq!(info.subject_or_group(), "G1");
    }

    #[test]
    fn test_subject_keywords() {
        assert_eq!(
            Subject::from_keywords("indirect tax laws"),
            Some(Subject::IndirectTax)
        );
        assert_eq!(Subject::from_keywords("direct tax laws"), Some(Subject::DirectTax));
        assert_eq!(Subject::from_keywords("/fr/unit1.pdf"), Some(Subject::FinancialReporting));
        assert_eq!(Subject::from_keywords("french"), None);
    }
}
