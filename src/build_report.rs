use dexcarve::{BuildSummary, Issue, SourceOutcome, ValidationReport};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

/// Issues listed per table before the rest is folded into a count.
const ISSUE_PREVIEW: usize = 5;

pub fn print_build(source_dir: &str, out_dir: &str, summary: &BuildSummary, color: bool) {
    let palette = ansi::Palette::new(color);
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Carving: {source_dir} → {out_dir}"), ansi::CYAN)));

    println!("\n{}", palette.paint("━━━ Sources ━━━", ansi::GRAY));
    print_outcomes(summary, &palette);

    println!("\n{}", palette.paint("━━━ Tables ━━━", ansi::GRAY));
    if summary.reports.is_empty() {
        println!("{}", palette.dim("  No tables produced"));
        println!("\n{}", palette.paint("Possible reasons:", ansi::YELLOW));
        println!("  • Source files are missing or named differently (see [sources] in the config)");
        println!("  • Every source kind was skipped");
        println!("\n{}", palette.dim("  Tip: set DEXCARVE_LOG=dexcarve=debug for details"));
    } else {
        for report in &summary.reports {
            print_table(report, summary.derived_moves && report.table == "moves", &palette);
        }
    }

    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    for m in &summary.metrics {
        println!(
            "  {}  {}  {} {}  {} {}  {} {}",
            palette.paint(format!("{:<15}", m.table), ansi::BLUE),
            palette.paint(format!("{:?}", m.total()), ansi::GREEN),
            palette.dim("assemble"),
            palette.dim(format!("{:?}", m.assemble)),
            palette.dim("validate"),
            palette.dim(format!("{:?}", m.validate)),
            palette.dim("sink"),
            palette.dim(format!("{:?}", m.sink)),
        );
    }
    println!("  Total: {}", palette.paint(format!("{:?}", summary.elapsed), ansi::GREEN));
    println!();
}

fn print_outcomes(summary: &BuildSummary, palette: &ansi::Palette) {
    for (kind, outcome) in &summary.outcomes {
        let label = palette.paint(format!("{:<19}", kind.name()), ansi::BLUE);
        let status = match outcome {
            SourceOutcome::Built { records } => palette.paint(format!("✓ {records} records"), ansi::GREEN),
            SourceOutcome::Missing => palette.paint("– not found", ansi::YELLOW),
            SourceOutcome::Skipped => palette.dim("– skipped"),
            SourceOutcome::Failed { reason } => palette.paint(format!("✗ {reason}"), ansi::RED),
        };
        println!("  {label} {status}");
    }
}

fn print_table(report: &ValidationReport, derived: bool, palette: &ansi::Palette) {
    let mark = if report.is_clean() { palette.paint("✓", ansi::GREEN) } else { palette.paint("!", ansi::YELLOW) };
    let suffix = if derived { palette.dim(" (derived from learnsets)") } else { String::new() };
    println!(
        "  {} {}{}  {} accepted  {} rejected  {} orphaned",
        mark,
        palette.bold(&report.table),
        suffix,
        palette.paint(report.rows_accepted.to_string(), ansi::GREEN),
        paint_count(report.rows_rejected, ansi::RED, palette),
        paint_count(report.rows_orphaned, ansi::YELLOW, palette),
    );

    if report.malformed_blocks > 0 || report.duplicate_keys > 0 {
        println!(
            "      {} {}  {} {}",
            palette.dim("malformed blocks:"),
            paint_count(report.malformed_blocks, ansi::RED, palette),
            palette.dim("duplicate keys:"),
            paint_count(report.duplicate_keys, ansi::RED, palette),
        );
    }
    if !report.unchecked_foreign_keys.is_empty() {
        println!("      {} {}", palette.dim("unchecked:"), palette.dim(report.unchecked_foreign_keys.join(", ")));
    }

    for issue in report.issues.iter().take(ISSUE_PREVIEW) {
        println!("      {}", fmt_issue(issue, palette));
    }
    if report.issues.len() > ISSUE_PREVIEW {
        println!("      {}", palette.dim(format!("... +{} more", report.issues.len() - ISSUE_PREVIEW)));
    }
}

fn paint_count(n: usize, color: &str, palette: &ansi::Palette) -> String {
    if n == 0 { palette.dim("0") } else { palette.paint(n.to_string(), color) }
}

fn fmt_issue(issue: &Issue, palette: &ansi::Palette) -> String {
    let color = match issue {
        Issue::OrphanReference { .. } => ansi::YELLOW,
        _ => ansi::RED,
    };
    palette.paint(issue.to_string(), color)
}
