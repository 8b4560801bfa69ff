//! File-name and context resolution for discovered document links
//!
//! Names are built from heuristics over the anchor text, the page context and
//! the href. Resolution is pure: the same inputs always give the same name.
//! Collisions between different links are handled by the crawl session, not
//! here.

mod classify;
mod context;

pub use classify::{sitting_code, ChapterKind, DocumentKind, PaperInfo, Subject};
pub use context::{ContextResolver, MonthYearContextResolver};

/// Maps one document link to a target file name
pub trait NameResolver: Send + Sync {
    /// Returns a non-empty file name ending in the document extension
    ///
    /// # Arguments
    ///
    /// * `text` - Visible anchor text (may be empty)
    /// * `href` - The raw href attribute
    /// * `context` - Context label of the page the link was found on
    fn resolve_file_name(&self, text: &str, href: &str, context: &str) -> String;
}

/// Fallback stem when nothing meaningful can be derived
const FALLBACK_STEM: &str = "document";

/// Longest stem taken from an href basename
const MAX_BASENAME_LEN: usize = 40;

/// Exam-paper naming heuristics
///
/// Tries study-material chapters first (optionally prefixed by subject), then
/// classifies the document kind and composes a code such as `M25G1MTP` or
/// `N24FRQues`.
#[derive(Debug, Clone)]
pub struct DefaultNameResolver {
    extension: String,
}

impl DefaultNameResolver {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }

    fn with_extension(&self, stem: &str) -> String {
        let stem = if stem.is_empty() { FALLBACK_STEM } else { stem };
        format!("{}.{}", stem, self.extension)
    }

    fn compose(&self, kind: DocumentKind, code: &str, info: &PaperInfo, href: &str) -> String {
        match kind {
            DocumentKind::MockTest => format!("{}{}MTP", code, info.group_code()),
            DocumentKind::RevisionTest => format!("{}{}RTP", code, info.group_code()),
            DocumentKind::QuestionPaper => format!("{}{}Ques", code, info.subject_or_group()),
            DocumentKind::SuggestedAnswer => format!("{}{}Ans", code, info.subject_or_group()),
            DocumentKind::Syllabus => format!("{}Syllabus", info.subject_code()),
            DocumentKind::Unknown => {
                let subject = info.subject_code();
                if !subject.is_empty() || !code.is_empty() {
                    format!("{}{}", code, subject)
                } else {
                    let basename = self.href_basename(href);
                    if has_three_letters(&basename) {
                        basename
                    } else {
                        FALLBACK_STEM.to_string()
                    }
                }
            }
        }
    }

    /// Last path segment of the href without query or extension, sanitized
    fn href_basename(&self, href: &str) -> String {
        let path = href.split(['?', '#']).next().unwrap_or_default();
        let last = path.rsplit(['/', '\\']).next().unwrap_or_default();

        let suffix = format!(".{}", self.extension.to_ascii_lowercase());
        let stem = if last.to_ascii_lowercase().ends_with(&suffix) {
            &last[..last.len() - suffix.len()]
        } else {
            last
        };

        stem.chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .take(MAX_BASENAME_LEN)
            .collect()
    }
}

impl Default for DefaultNameResolver {
    fn default() -> Self {
        Self::new("pdf")
    }
}

impl NameResolver for DefaultNameResolver {
    fn resolve_file_name(&self, text: &str, href: &str, context: &str) -> String {
        let text = text.trim();
        let combined = format!("{} {} {}", text, context, href).to_lowercase();
        let info = PaperInfo::extract(&combined, href);

        if let Some(chapter) = ChapterKind::classify(text, href) {
            let stem = format!("{}{}", info.subject_code(), chapter.stem());
            return self.with_extension(&stem);
        }

        let kind = DocumentKind::classify(&combined);
        let code = sitting_code(&combined);
        self.with_extension(&self.compose(kind, &code, &info, href))
    }
}

fn has_three_letters(token: &str) -> bool {
    token.chars().filter(char::is_ascii_alphabetic).count() >= 3
}
