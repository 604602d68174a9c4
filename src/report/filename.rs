//! On-disk filename derivation for generated reports.
//!
//! Output of [`sanitize_filename`] contains only `[A-Za-z0-9_.-]`, never
//! starts with `.` and always ends with `.pdf`, whatever the input. It is applied right before the
//! filesystem write even when the request was already validated.

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

pub const PDF_EXTENSION: &str = ".pdf";
pub const FALLBACK_STEM: &str = "report";
const SUFFIX_LEN: usize = 8;

static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9_.-]").expect("disallowed-character pattern is valid")
});

pub fn is_allowed_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-')
}

/// Case-insensitive `.pdf` suffix check.
pub fn has_pdf_extension(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(PDF_EXTENSION)
}

/// Derive a safe filename from an optional requested name or the subject name.
///
/// A requested name keeps its final path component with disallowed characters
/// and a leading `.` replaced by `_`, so the file is never hidden from the
/// static file service. Without one, the subject name is cleaned the same way and
/// given a random 8-hex-digit suffix.
pub fn sanitize_filename(requested: Option<&str>, subject_name: &str) -> String {
    match requested.filter(|r| !r.is_empty()) {
        Some(requested) => {
            let mut filename = unhide(replace_disallowed(strip_directories(requested)));
            if !has_pdf_extension(&filename) {
                filename.push_str(PDF_EXTENSION);
            }
            filename
        }
        None => {
            let trimmed = subject_name.trim();
            let stem = if trimmed.is_empty() {
                FALLBACK_STEM.to_string()
            } else {
                unhide(replace_disallowed(trimmed))
            };
            format!("{}_{}{}", stem, random_suffix(), PDF_EXTENSION)
        }
    }
}

fn strip_directories(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

fn replace_disallowed(value: &str) -> String {
    DISALLOWED.replace_all(value, "_").into_owned()
}

fn unhide(mut value: String) -> String {
    if value.starts_with('.') {
        value.replace_range(..1, "_");
    }
    value
}

fn random_suffix() -> String {
    let mut suffix = Uuid::new_v4().simple().to_string();
    suffix.truncate(SUFFIX_LEN);
    suffix
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_safe(name: &str) {
        assert!(!name.contains('/') && !name.contains('\\'), "{}", name);
        assert!(name.chars().all(is_allowed_char), "{}", name);
        assert!(has_pdf_extension(name), "{}", name);
        assert!(!name.starts_with('.'), "{}", name);
    }

    #[test]
    fn test_requested_name_kept_when_safe() {
        assert_eq!(
            sanitize_filename(Some("alice_report.pdf"), "Alice"),
            "alice_report.pdf"
        );
        assert_eq!(sanitize_filename(Some("Report.PDF"), "Alice"), "Report.PDF");
    }

    #[test]
    fn test_requested_name_gets_extension() {
        assert_eq!(sanitize_filename(Some("summary"), "Alice"), "summary.pdf");
    }

    #[test]
    fn test_directories_are_stripped() {
        assert_eq!(
            sanitize_filename(Some("../../etc/passwd.pdf"), "Alice"),
            "passwd.pdf"
        );
        assert_eq!(
            sanitize_filename(Some("C:\\temp\\out.pdf"), "Alice"),
            "out.pdf"
        );
    }

    #[test]
    fn test_disallowed_characters_replaced() {
        assert_eq!(
            sanitize_filename(Some("my report (1).pdf"), "Alice"),
            "my_report__1_.pdf"
        );
        assert_eq!(sanitize_filename(Some("résumé.pdf"), "Alice"), "r_sum_.pdf");
    }

    #[test]
    fn test_leading_dot_is_replaced() {
        assert_eq!(sanitize_filename(Some(".pdf"), "Alice"), "_pdf.pdf");
        assert_eq!(sanitize_filename(Some("..pdf"), "Alice"), "_.pdf");
        assert_eq!(sanitize_filename(Some(".hidden.pdf"), "Alice"), "_hidden.pdf");
        assert_eq!(sanitize_filename(Some("dir/.env"), "Alice"), "_env.pdf");
        assert!(sanitize_filename(None, ".Alice").starts_with("_Alice_"));
    }

    #[test]
    fn test_fallback_uses_subject_name_and_suffix() {
        let name = sanitize_filename(None, "  Alice Example ");
        assert!(name.starts_with("Alice_Example_"));
        assert!(name.ends_with(".pdf"));

        let suffix = &name["Alice_Example_".len()..name.len() - PDF_EXTENSION.len()];
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fallback_for_blank_subject() {
        let name = sanitize_filename(None, "   ");
        assert!(name.starts_with("report_"));
        assert_safe(&name);
    }

    #[test]
    fn test_empty_requested_is_absent() {
        let name = sanitize_filename(Some(""), "Bob");
        assert!(name.starts_with("Bob_"));
    }

    #[test]
    fn test_fallback_names_differ() {
        assert_ne!(sanitize_filename(None, "Bob"), sanitize_filename(None, "Bob"));
    }

    #[test]
    fn test_output_is_always_safe() {
        let inputs = [
            "",
            "/",
            "\\",
            "..",
            "../",
            "a/b\\c",
            "$$$%%%",
            "名前",
            "\u{0000}\n\t",
            "ok.pdf",
            "dir/",
        ];

        for input in inputs {
            assert_safe(&sanitize_filename(Some(input), input));
            assert_safe(&sanitize_filename(None, input));
        }
    }

    #[test]
    fn test_idempotent_on_requested_names() {
        for input in ["alice_report.pdf", "x y/z", "../a.PDF", "plain", "%%", ".pdf", "..."] {
            let once = sanitize_filename(Some(input), "ignored");
            let twice = sanitize_filename(Some(&once), "ignored");
            assert_eq!(once, twice);
        }
    }
}
