//! Self-contained HTML reports built from maud markup and plotly charts.
use std::fs;
use std::path::Path;

use chrono::Utc;
use maud::{html, Markup, PreEscaped, DOCTYPE};
use plotly::Plot;

pub mod plots;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.12.1.min.js";

const STYLE: &str = "
body { font-family: Helvetica, Arial, sans-serif; margin: 0 auto; max-width: 1100px; padding: 20px; color: #222; }
header { display: flex; align-items: center; gap: 16px; border-bottom: 2px solid #ddd; margin-bottom: 20px; }
header img { height: 64px; }
section { margin-bottom: 32px; }
h2 { border-bottom: 1px solid #eee; padding-bottom: 4px; }
table { border-collapse: collapse; }
td, th { border: 1px solid #ccc; padding: 4px 10px; text-align: right; }
footer { color: #888; font-size: 0.85em; border-top: 1px solid #ddd; padding-top: 8px; }
";

/// A titled block of markup and plots.
#[derive(Debug, Clone)]
pub struct ReportSection {
    title: String,
    content: Vec<Markup>,
    n_plots: usize,
}

impl ReportSection {
    pub fn new(title: &str) -> Self {
        ReportSection {
            title: title.to_string(),
            content: Vec::new(),
            n_plots: 0,
        }
    }

    pub fn add_content(&mut self, content: Markup) {
        self.content.push(content);
    }

    pub fn add_plot(&mut self, plot: Plot) {
        let id = format!("{}-plot-{}", slug(&self.title), self.n_plots);
        self.n_plots += 1;
        self.content
            .push(PreEscaped(plot.to_inline_html(Some(id.as_str()))));
    }

    fn render(&self) -> Markup {
        html! {
            section id=(slug(&self.title)) {
                h2 { (self.title) }
                @for block in &self.content {
                    div { (block) }
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    title: String,
    version: String,
    logo: Option<String>,
    subtitle: String,
    sections: Vec<ReportSection>,
}

impl Report {
    pub fn new(title: &str, version: &str, logo: Option<&str>, subtitle: &str) -> Self {
        Report {
            title: title.to_string(),
            version: version.to_string(),
            logo: logo.map(str::to_string),
            subtitle: subtitle.to_string(),
            sections: Vec::new(),
        }
    }

    pub fn add_section(&mut self, section: ReportSection) {
        self.sections.push(section);
    }

    pub fn render(&self) -> String {
        let markup = html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="utf-8";
                    title { (self.title) " - " (self.subtitle) }
                    script src=(PLOTLY_CDN) {}
                    style { (PreEscaped(STYLE)) }
                }
                body {
                    header {
                        @if let Some(logo) = &self.logo {
                            img src=(logo) alt="logo";
                        }
                        div {
                            h1 { (self.subtitle) }
                            p { (self.title) " v" (self.version) }
                        }
                    }
                    @for section in &self.sections {
                        (section.render())
                    }
                    footer {
                        "Generated " (Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    }
                }
            }
        };
        markup.into_string()
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let path = path.as_ref();
        fs::write(path, self.render())?;
        log::info!("Report written to {}", path.display());
        Ok(())
    }
}

fn slug(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect()
}
