#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Startup cycle, then one cycle per interval until Ctrl+C
    Run,
    /// A single cycle, alerts dispatched, report printed
    Cycle,
    Follow {
        address: String,
        subscriber: String,
    },
    Unfollow {
        address: String,
        subscriber: String,
    },
    Following {
        subscriber: String,
    },
    Status {
        address: String,
    },
    History {
        address: String,
        limit: u32,
    },
    Help,
    Version,
}
