//! Terminal rendering shared by the commands.

use console::{Style, style};
use ferry_mcp::{ContentItem, ExecutionResult, Source, ToolDescriptor};

pub fn print_dim(msg: &str) {
    let dim = Style::new().dim();
    println!("{}", dim.apply_to(msg));
}

pub fn print_error(msg: &str) {
    let red = Style::new().red();
    println!("{} {}", red.apply_to("Error:"), msg);
}

pub fn print_success(msg: &str) {
    let green = Style::new().green();
    println!("{} {}", green.apply_to("✓"), msg);
}

/// Truncate to `max` characters, marking the cut with an ellipsis.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}

/// `name: kind` pairs of a tool's parameters.
pub fn format_params(tool: &ToolDescriptor) -> String {
    tool.parameters
        .iter()
        .map(|(name, kind)| format!("{}: {}", name, kind.label()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Print a tool result: its content, then its sources.
pub fn print_result(result: &ExecutionResult, verbose: bool) {
    for item in &result.content {
        match item {
            ContentItem::Text { text } => println!("{}", text),
            ContentItem::Other(raw) if verbose => print_dim(&raw.to_string()),
            ContentItem::Other(_) => {}
        }
    }
    if !result.sources.is_empty() {
        print_sources(&result.sources);
    }
}

pub fn print_sources(sources: &[Source]) {
    let dim = Style::new().dim();
    println!();
    println!("{}", style(format!("Sources ({})", sources.len())).bold());
    for (i, source) in sources.iter().enumerate() {
        println!(
            "{}. {} {}",
            i + 1,
            style(&source.title).cyan(),
            dim.apply_to(format!(
                "[{}, relevance {:.2}]",
                source.category, source.relevance_score
            ))
        );
        println!("   {}", truncate(&source.content, 200));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_mcp::ParamKind;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly10!", 10), "exactly10!");
        assert_eq!(truncate("this is too long", 8), "this is…");
    }

    #[test]
    fn test_format_params_sorted() {
        let tool = ToolDescriptor::new("add", "Add")
            .with_param("b", ParamKind::Number)
            .with_param("a", ParamKind::Number)
            .with_param("label", ParamKind::String);
        assert_eq!(format_params(&tool), "a: number, b: number, label: string");
    }
}
