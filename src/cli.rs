use clap::{Parser, Subcommand};

/// Replay and inspect messages stored in a SQL-backed message queue.
#[derive(Parser)]
#[command(name = "replayq")]
#[command(about = "Replay and inspect stored queue messages", long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute queue messages by topic or identifier
    Process {
        /// Topic name (ie: product_alert)
        #[arg(short, long)]
        topic: Option<String>,

        /// Queue message ID
        #[arg(short = 'm', long)]
        id: Option<String>,

        /// Preferred area: global, frontend, adminhtml
        #[arg(short, long, default_value = "global")]
        area: String,

        /// Force the message while ignoring the status
        #[arg(short, long, default_value_t = 0)]
        force: u8,
    },
    /// Show status of queue messages
    Status {
        /// Topic name (ie: product_alert)
        #[arg(short, long)]
        topic: Option<String>,

        /// Queue message ID
        #[arg(short = 'm', long)]
        id: Option<String>,
    },
}

/// Handler wiring scope. Unrecognized input coerces to `Global` rather than
/// erroring, matching the lenient command surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Area {
    #[default]
    Global,
    Frontend,
    Adminhtml,
}

impl Area {
    pub fn parse_lenient(input: &str) -> Self {
        input.parse().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_process_flags() {
        let cli = Cli::parse_from([
            "replayq",
            "process",
            "--topic",
            "order_created",
            "--id",
            "42",
            "--area",
            "adminhtml",
            "--force",
            "1",
        ]);

        match cli.command {
            Commands::Process {
                topic,
                id,
                area,
                force,
            } => {
                assert_eq!(topic.as_deref(), Some("order_created"));
                assert_eq!(id.as_deref(), Some("42"));
                assert_eq!(Area::parse_lenient(&area), Area::Adminhtml);
                assert_eq!(force, 1);
            }
            _ => panic!("expected process command"),
        }
    }

    #[test]
    fn test_process_defaults() {
        let cli = Cli::parse_from(["replayq", "process"]);

        match cli.command {
            Commands::Process {
                topic,
                id,
                area,
                force,
            } => {
                assert!(topic.is_none());
                assert!(id.is_none());
                assert_eq!(Area::parse_lenient(&area), Area::Global);
                assert_eq!(force, 0);
            }
            _ => panic!("expected process command"),
        }
    }

    #[test]
    fn test_area_coerces_unknown_to_global() {
        assert_eq!(Area::parse_lenient("frontend"), Area::Frontend);
        assert_eq!(Area::parse_lenient("webapi"), Area::Global);
        assert_eq!(Area::parse_lenient(""), Area::Global);
    }
}
