pub mod card;
pub mod new;
pub mod repl;
pub mod roll;

use std::fs;
use std::path::{Path, PathBuf};

use colored::Colorize;
use tracing::debug;

use pt_dice::FixedRng;
use pt_dicecore::{Card, CardOps, Command, CommandContext, DiceEngine, Roll};

use crate::SessionArgs;
use crate::host::TerminalHost;

/// An engine prepared from the command-line options.
pub struct Session {
    pub engine: DiceEngine,
    pub context: CommandContext,
    card: Option<(String, PathBuf)>,
    save: bool,
}

impl Session {
    pub fn open(args: &SessionArgs) -> Result<Self, String> {
        let mut engine = match (args.fixed, args.seed) {
            (Some(face), _) => DiceEngine::with_rng(Box::new(FixedRng(face))),
            (None, Some(seed)) => DiceEngine::with_seed(seed),
            (None, None) => DiceEngine::new(),
        };

        if let Some(path) = &args.config {
            let json = read(path)?;
            engine
                .load_config(&args.channel, &json)
                .map_err(|e| format!("invalid config {}: {e}", path.display()))?;
        }

        let card = match &args.card {
            Some(path) => {
                let json = read(path)?;
                let name = engine
                    .load_card(&json)
                    .map_err(|e| format!("invalid card {}: {e}", path.display()))?;
                engine.cards_mut().link(&args.channel, &args.user, Some(&name));
                engine.cards_mut().drain_changes();
                debug!(card = %name, user = %args.user, "card linked");
                Some((name, path.clone()))
            }
            None => None,
        };

        Ok(Self {
            engine,
            context: CommandContext::new(&args.user, &args.name, &args.channel),
            card,
            save: args.save,
        })
    }

    /// Run one command, print its output and commit its changes.
    /// Returns false when the engine produced nothing.
    pub async fn execute(&mut self, text: &str) -> Result<bool, String> {
        let command = Command::new(text, self.context.clone());
        let Some(mut roll) = self.engine.dispatch_command(command, &TerminalHost).await else {
            return Ok(false);
        };
        println!("{}", roll.output());
        let changed = self
            .engine
            .apply_to_card(&mut roll, &TerminalHost)
            .await
            .map_err(|e| e.to_string())?;
        self.report(&roll, &changed)?;
        Ok(true)
    }

    fn report(&self, roll: &Roll, changed: &[Card]) -> Result<(), String> {
        if changed.is_empty() {
            return Ok(());
        }
        debug!(kind = ?roll.kind(), cards = changed.len(), "cards changed");
        let Some((name, path)) = &self.card else {
            return Ok(());
        };
        if !self.save || !changed.iter().any(|c| c.name() == name.as_str()) {
            return Ok(());
        }
        let json = self.engine.export_card(name).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| format!("cannot write {}: {e}", path.display()))?;
        println!("  {} {}", "Saved".green(), path.display());
        Ok(())
    }
}

fn read(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))
}
