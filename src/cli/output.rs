use crate::cli::options::OutputFormat;
use crate::graph::DependencyReport;
use std::fmt::Write;
use std::path::Path;

/// Render a dependency report in the requested format
pub fn render_report(report: &DependencyReport, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report),
        OutputFormat::Text => Ok(render_report_text(report)),
    }
}

fn render_report_text(report: &DependencyReport) -> String {
    let mut out = String::new();

    if report.dependencies.is_empty() {
        out.push_str("No shared-library dependencies found\n");
    } else {
        let _ = writeln!(out, "Dependencies ({}):", report.dependencies.len());
        for (library, dependents) in &report.dependencies {
            let _ = writeln!(out, "  {library}");
            for dependent in dependents {
                let _ = writeln!(out, "    <- {dependent}");
            }
        }
    }

    if !report.errors.is_empty() {
        out.push('\n');
        let _ = writeln!(out, "Errors ({}):", report.errors.len());
        for (binary, message) in &report.errors {
            let _ = writeln!(out, "  {binary}: {message}");
        }
    }

    out
}

/// Render the bundle file list, one path per line for text output
pub fn render_bundle<P: AsRef<Path>>(files: &[P], format: OutputFormat) -> serde_json::Result<String> {
    let files: Vec<String> = files
        .iter()
        .map(|f| f.as_ref().display().to_string())
        .collect();
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&files),
        OutputFormat::Text => Ok(files.iter().map(|f| format!("{f}\n")).collect()),
    }
}

/// Print a dependency report to stdout
pub fn print_report(report: &DependencyReport, format: OutputFormat) -> serde_json::Result<()> {
    let rendered = render_report(report, format)?;
    print!("{}", rendered.trim_end());
    println!();
    Ok(())
}

/// Print the bundle file list to stdout
pub fn print_bundle<P: AsRef<Path>>(files: &[P], format: OutputFormat) -> serde_json::Result<()> {
    let rendered = render_bundle(files, format)?;
    if !rendered.is_empty() {
        print!("{}", rendered.trim_end());
        println!();
    }
    Ok(())
}
