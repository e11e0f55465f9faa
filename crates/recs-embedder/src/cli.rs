//! Command-line arguments for `recs-embedder`.

use clap::Parser;

use recs_core::EntityKind;
use recs_jobs::RegenerateMode;

fn parse_kind(s: &str) -> Result<EntityKind, String> {
    s.parse()
}

#[derive(Parser, Debug)]
#[command(name = "recs-embedder")]
#[command(
    author,
    version,
    about = "Queue embedding regeneration for recs entities and wait for it to drain"
)]
pub struct Cli {
    /// Only embed rows that have no embedding yet
    #[arg(long)]
    pub missing_only: bool,

    /// Entity kinds to regenerate (recommendation, annotation); all when omitted
    #[arg(value_parser = parse_kind)]
    pub kinds: Vec<EntityKind>,
}

impl Cli {
    pub fn mode(&self) -> RegenerateMode {
        if self.missing_only {
            RegenerateMode::MissingOnly
        } else {
            RegenerateMode::All
        }
    }

    /// Requested kinds without duplicates, in the order given.
    pub fn kinds(&self) -> Vec<EntityKind> {
        if self.kinds.is_empty() {
            return EntityKind::ALL.to_vec();
        }
        let mut kinds = Vec::new();
        for kind in &self.kinds {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
        kinds
    }
}
