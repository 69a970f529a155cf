// Colored terminal output for matched creators and dataset facets.

use colored::Colorize;

use crate::scoring::{MatchFilter, ScoredCreator};

/// Longest bio preview shown on a card.
const BIO_PREVIEW_CHARS: usize = 240;

/// Display ranked creators as cards, best match first.
pub fn display_creator_cards(creators: &[&ScoredCreator], filter: &MatchFilter) {
    println!(
        "\n{}",
        format!("=== Top Matching Creators ({filter}) ===").bold()
    );

    if creators.is_empty() {
        println!(
            "  {}",
            "No matching creators found. Adjust your filters or campaign brief.".yellow()
        );
        return;
    }

    for (i, creator) in creators.iter().enumerate() {
        let record = &creator.record;
        println!();
        println!("  {:>2}. {}", i + 1, record.name.bold());
        println!(
            "      {} {}  |  {} {}  |  {} {}",
            "Niche:".dimmed(),
            record.niche,
            "Location:".dimmed(),
            record.location,
            "Audience:".dimmed(),
            record.audience_size,
        );
        println!(
            "      {} {}",
            "Similarity Score:".dimmed(),
            colorize_score(creator.similarity_score),
        );
        println!(
            "      {}",
            super::truncate_chars(&record.bio, BIO_PREVIEW_CHARS)
                .italic()
                .dimmed()
        );
    }
    println!();
}

/// Display the niche and location values available for filtering.
pub fn display_facets(rows: usize, niches: &[String], locations: &[String]) {
    println!(
        "{} Dataset loaded successfully with {} creators.",
        "✓".green(),
        rows
    );
    println!("  {} All, {}", "Niches:".dimmed(), niches.join(", "));
    println!("  {} All, {}", "Locations:".dimmed(), locations.join(", "));
}

/// Color a similarity score by strength.
fn colorize_score(score: f32) -> colored::ColoredString {
    let text = format!("{score:.4}");
    if score >= 0.7 {
        text.green().bold()
    } else if score >= 0.5 {
        text.green()
    } else if score >= 0.3 {
        text.yellow()
    } else {
        text.dimmed()
    }
}
