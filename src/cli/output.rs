//! CLI output formatting utilities.

use crate::exam::RetrievedQuestion;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print one retrieved exam question.
    pub fn question(q: &RetrievedQuestion, score: Option<f32>) {
        let label = question_label(&q.question_number, q.question_part.as_deref());
        let marks = q
            .marks
            .map(|m| format!(" ({} marks)", m))
            .unwrap_or_default();
        match score {
            Some(score) => println!(
                "\n{} {}{} (score: {:.2})",
                style(">>").green(),
                style(label).bold(),
                marks,
                score
            ),
            None => println!("\n{} {}{}", style(">>").green(), style(label).bold(), marks),
        }
        println!("   {}", content_preview(&q.question, 200));
        println!("   {}", style(format!("id {}", q.id)).dim());
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// "Question 3 (b)" or "Question 3".
fn question_label(number: &str, part: Option<&str>) -> String {
    match part {
        Some(part) if !part.is_empty() => format!("Question {} {}", number, part),
        _ => format!("Question {}", number),
    }
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_len: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_len {
        content
    } else {
        let cut: String = content.chars().take(max_len).collect();
        format!("{}...", cut)
    }
}
