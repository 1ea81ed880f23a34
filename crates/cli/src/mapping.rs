//! `tabdiff mapping` and `tabdiff columns`: the saved mapping and the
//! column picker.

use std::path::PathBuf;

use clap::Subcommand;
use tabdiff_config::{filter_columns, MappingStore, SavedMapping};

use crate::compare::load_settings;
use crate::CliError;

#[derive(Subcommand)]
pub enum MappingCommands {
    /// Print the saved mapping
    #[command(after_help = "\
Examples:
  tabdiff mapping show
  tabdiff mapping show --json")]
    Show {
        /// Print the stored JSON document
        #[arg(long)]
        json: bool,
    },

    /// Forget the saved mapping
    Clear,

    /// Print where the mapping is stored
    Path,
}

pub fn cmd_mapping(cmd: MappingCommands) -> Result<(), CliError> {
    let store = MappingStore::open().map_err(CliError::config)?;
    match cmd {
        MappingCommands::Show { json } => cmd_mapping_show(&store, json),
        MappingCommands::Clear => {
            if store.clear().map_err(CliError::config)? {
                eprintln!("cleared {}", store.path().display());
            } else {
                eprintln!("no saved mapping");
            }
            Ok(())
        }
        MappingCommands::Path => {
            println!("{}", store.path().display());
            Ok(())
        }
    }
}

fn cmd_mapping_show(store: &MappingStore, json: bool) -> Result<(), CliError> {
    let Some(saved) = store.load().map_err(CliError::config)? else {
        eprintln!("no saved mapping");
        return Ok(());
    };

    if json {
        let text = serde_json::to_string_pretty(&saved)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{}", text);
    } else {
        print!("{}", describe(&saved));
    }
    Ok(())
}

fn describe(saved: &SavedMapping) -> String {
    let mut out = format!(
        "key A: {}\nkey B: {}\n",
        saved.primary_key_a, saved.primary_key_b
    );
    for pair in &saved.mapping {
        out.push_str(&format!("  {} -> {}\n", pair.a, pair.b));
    }
    if !saved.is_ready() {
        out.push_str("(incomplete)\n");
    }
    out
}

pub fn cmd_columns(
    file: PathBuf,
    exclude: Option<String>,
    filter: String,
    json: bool,
) -> Result<(), CliError> {
    let settings = load_settings();
    let data = tabdiff_io::load(&file, settings.max_file_bytes).map_err(CliError::file)?;
    let columns = filter_columns(&data.headers, exclude.as_deref(), &filter);

    if json {
        let text = serde_json::to_string(&columns)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{}", text);
    } else {
        for column in columns {
            println!("{}", column);
        }
    }
    Ok(())
}
