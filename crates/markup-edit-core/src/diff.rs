use similar::{ChangeTag, TextDiff};

/// Line counts of a rendered edit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub inserted: usize,
    pub deleted: usize,
}

/// Unified diff between the file on disk and the re-rendered document, or
/// `None` when rendering reproduced the file exactly.
pub fn build_unified_diff(original: &str, rendered: &str, path: &str) -> Option<String> {
    if original == rendered {
        return None;
    }

    let diff = TextDiff::from_lines(original, rendered);
    let header_old = format!("a/{path}");
    let header_new = format!("b/{path}");
    let mut unified = diff.unified_diff();
    unified.context_radius(2).header(&header_old, &header_new);

    let mut output = unified.to_string();
    if !output.ends_with('\n') {
        output.push('\n');
    }
    Some(output)
}

pub fn diff_stats(original: &str, rendered: &str) -> DiffStats {
    TextDiff::from_lines(original, rendered)
        .iter_all_changes()
        .fold(DiffStats::default(), |mut stats, change| {
            match change.tag() {
                ChangeTag::Insert => stats.inserted += 1,
                ChangeTag::Delete => stats.deleted += 1,
                ChangeTag::Equal => {}
            }
            stats
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_markup_has_no_diff() {
        assert!(build_unified_diff("<p>a</p>", "<p>a</p>", "page.html").is_none());
    }

    #[test]
    fn changed_markup_is_reported_per_line() {
        let diff = build_unified_diff("<p>a</p>\n<p>b</p>\n", "<p>a</p>\n<p>c</p>\n", "page.html")
            .unwrap();
        assert!(diff.contains("--- a/page.html"));
        assert!(diff.contains("-<p>b</p>"));
        assert!(diff.contains("+<p>c</p>"));
        assert!(diff.ends_with('\n'));
    }

    #[test]
    fn stats_count_changed_lines() {
        let stats = diff_stats("a\nb\n", "a\nc\nd\n");
        assert_eq!(
            stats,
            DiffStats {
                inserted: 2,
                deleted: 1
            }
        );
    }
}
