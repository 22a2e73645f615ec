use hunt::{Outcome, RunResult, Severity};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const RED: &str = "\x1b[31m";
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

pub fn print_run(result: &RunResult, color: bool) {
    let palette = ansi::Palette::new(color);

    let (outcome_label, outcome_color) = match result.outcome {
        Outcome::Ok => ("ok", ansi::GREEN),
        Outcome::Degraded => ("degraded", ansi::YELLOW),
        Outcome::Fatal => ("fatal", ansi::RED),
    };
    println!("\n{}", palette.bold(palette.paint(format!("⚙ outcome: {outcome_label}"), outcome_color)));

    println!("\n{}", palette.paint("━━━ Components ━━━", ansi::GRAY));
    if result.model.is_empty() {
        println!("{}", palette.dim("  (none)"));
    } else {
        for root in result.model.roots() {
            print_component(&result.model, root, 0, &palette);
        }
    }

    println!("\n{}", palette.paint("━━━ Diagnostics ━━━", ansi::GRAY));
    if result.diagnostics.is_empty() {
        println!("{}", palette.dim("  (none)"));
    } else {
        for diagnostic in &result.diagnostics {
            let color = match diagnostic.severity {
                Severity::Info => ansi::CYAN,
                Severity::Warn => ansi::YELLOW,
                Severity::Error | Severity::Fatal => ansi::RED,
            };
            println!("  {} {}", palette.paint(diagnostic.kind.code(), color), diagnostic.message);
        }
    }

    if let Some(artifact) = &result.artifact {
        println!("\n{}", palette.paint(format!("━━━ Generated ({}) ━━━", artifact.framework), ansi::GRAY));
        println!("{}", artifact.text);
    }
    println!();
}

fn print_component(model: &hunt::model::Model, id: u64, depth: usize, palette: &ansi::Palette) {
    let Some(component) = model.get(id) else { return };
    let indent = "  ".repeat(depth);
    println!(
        "{indent}{} {}",
        palette.paint(format!("#{}", component.id), ansi::BLUE),
        palette.bold(&component.type_tag)
    );
    for child in model.children_of(id) {
        print_component(model, child, depth + 1, palette);
    }
}
