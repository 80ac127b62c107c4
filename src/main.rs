//! Installment Advisor CLI
//!
//! Interactive chat demo over the conversation engine. The context is
//! threaded turn by turn exactly as a hosting application would do it.

use anyhow::{Context as _, Result};
use clap::Parser;
use installment_advisor::catalog::{load_catalog, sample_catalog};
use installment_advisor::{process_turn, ConversationContext};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "installment-advisor", about = "Seller-financing installment chat demo")]
struct Args {
    /// CSV listing sheet to use instead of the built-in sample catalog
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Print each solved plan as JSON in addition to the reply text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let catalog = match &args.catalog {
        Some(path) => load_catalog(path)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("loading catalog from {}", path.display()))?,
        None => sample_catalog(),
    };

    println!("Installment Advisor v0.1.0");
    println!("==========================\n");
    println!("Available units:");
    for p in &catalog {
        println!(
            "  {} - {} {}, {} rooms, {:.0} sqm, {}, cash price {:.0}",
            p.id, p.city, p.district, p.rooms, p.area_sqm, p.delivery_label, p.cash_price
        );
    }
    println!("\nType a message (\"quit\" to exit):\n");

    let mut context = ConversationContext::new();
    let stdin = io::stdin();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = stdin.lock().lines().next() else {
            break;
        };
        let line = line?;
        if matches!(line.trim(), "quit" | "exit") {
            break;
        }

        let outcome = process_turn(&line, context, &catalog);
        context = outcome.context;

        println!("{}\n", outcome.reply);
        if args.json {
            if let Some(result) = &outcome.result {
                println!("{}\n", serde_json::to_string_pretty(result)?);
            }
        }
    }

    Ok(())
}
