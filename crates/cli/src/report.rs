use drift_engine::{Diagnostic, RegionTagReport, ValidationProblem, WrapOutcome};

pub struct TagListOptions {
    pub detected: bool,
    pub undetected: bool,
    pub test_counts: bool,
    pub filenames: bool,
}

pub fn render_region_tags(report: &RegionTagReport, options: &TagListOptions) -> String {
    let mut out = String::new();

    if options.detected {
        out.push_str("-- Detected region tags: --\n");
        for summary in &report.detected {
            out.push_str(&summary.tag);
            if options.test_counts {
                out.push_str(&format!(" ({} test(s))", summary.test_count));
            }
            if options.filenames {
                let files: Vec<&str> = summary.source_files.iter().map(String::as_str).collect();
                out.push_str(&format!(" [{}]", files.join(", ")));
            }
            out.push('\n');
        }
    }

    if options.undetected {
        out.push_str("-- Undetected region tags: --\n");
        for tag in &report.undetected {
            out.push_str(tag);
            out.push('\n');
        }
    }

    out
}

pub fn render_problems(problems: &[ValidationProblem]) -> String {
    problems.iter().map(|p| format!("{p}\n")).collect()
}

pub fn describe_wrap(outcome: &WrapOutcome) -> String {
    match outcome {
        WrapOutcome::Wrapped(lines) => format!("Wrapped test ({} lines written)", lines.len()),
        WrapOutcome::AlreadyLabelled => "Exact region tag already present, skipping".to_string(),
        WrapOutcome::ConflictingLabel(Diagnostic::ConflictingLabel {
            path,
            line,
            proposed,
        }) => format!(
            "Different region tags present at {path}:{line}, label manually (proposed tag: {proposed})"
        ),
        WrapOutcome::ConflictingLabel(other) => format!("Label conflict: {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_engine::TagSummary;
    use pretty_assertions::assert_eq;

    fn sample() -> RegionTagReport {
        RegionTagReport {
            detected: vec![TagSummary {
                tag: "storage_list".to_string(),
                test_count: 2,
                source_files: ["list.js".to_string(), "quickstart.js".to_string()]
                    .into_iter()
                    .collect(),
            }],
            undetected: vec!["yaml_only".to_string()],
        }
    }

    #[test]
    fn renders_both_sections_by_default() {
        let options = TagListOptions {
            detected: true,
            undetected: true,
            test_counts: false,
            filenames: false,
        };
        assert_eq!(
            render_region_tags(&sample(), &options),
            "-- Detected region tags: --\nstorage_list\n-- Undetected region tags: --\nyaml_only\n"
        );
    }

    #[test]
    fn renders_counts_and_filenames() {
        let options = TagListOptions {
            detected: true,
            undetected: false,
            test_counts: true,
            filenames: true,
        };
        assert_eq!(
            render_region_tags(&sample(), &options),
            "-- Detected region tags: --\nstorage_list (2 test(s)) [list.js, quickstart.js]\n"
        );
    }
}
