use std::fs;
use std::path::{Path, PathBuf};

use pt_dicecore::{Card, CardType};

pub fn run(kind: &str, name: &str, output: Option<&Path>) -> Result<(), String> {
    let card_type =
        CardType::parse(kind).ok_or_else(|| format!("unknown card type '{kind}' (expected coc, dnd or general)"))?;
    let target = output.map_or_else(|| PathBuf::from(format!("{name}.json")), Path::to_path_buf);
    if target.exists() {
        return Err(format!("{} already exists", target.display()));
    }

    let json = Card::new(card_type, name).to_json().map_err(|e| e.to_string())?;
    fs::write(&target, json).map_err(|e| format!("cannot write {}: {e}", target.display()))?;

    println!("  Created {card_type} card '{name}' in {}", target.display());
    Ok(())
}
