use anyhow::Result;

use crate::catalog::{GENRES, LEVELS, moods_for};
use crate::palette::Palette;

pub fn run() -> Result<()> {
    println!("{}", Palette::paint(Palette::ACCENT, "Genres and their moods"));
    for genre in GENRES {
        println!(
            "  {genre:<12} {}",
            Palette::dim(moods_for(genre).join(", "))
        );
    }

    println!();
    println!("{}", Palette::paint(Palette::ACCENT, "Reading levels"));
    println!("  {}", LEVELS.join(", "));

    Ok(())
}
