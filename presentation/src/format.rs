use colored::Colorize;
use domain::models::CollectionResponse;
use shared::types::Result;
use shared::utils::wrap_output;
use std::io::Write;

/// Reverse-video title, wrapped body, blank line.
pub fn print_with_title(out: &mut impl Write, title: &str, body: &str) -> Result<()> {
    print_title(out, title)?;
    writeln!(out, "{}", wrap_output(body))?;
    writeln!(out)?;
    Ok(())
}

pub fn print_title(out: &mut impl Write, title: &str) -> Result<()> {
    writeln!(out, "{}", title.reversed())?;
    Ok(())
}

pub fn print_cached_answers(out: &mut impl Write, responses: &[CollectionResponse]) -> Result<()> {
    for (idx, response) in responses.iter().enumerate() {
        print_title(out, &format!("Cached Answer {}", idx + 1))?;
        writeln!(
            out,
            "{} {}",
            format!("[{}]", relevance(response.score)).dimmed(),
            wrap_output(&response.question).italic()
        )?;
        writeln!(out, "{}", wrap_output(&response.answer))?;
        writeln!(out)?;
    }
    Ok(())
}

pub fn relevance(score: f32) -> String {
    format!("{score:.5}")
}
