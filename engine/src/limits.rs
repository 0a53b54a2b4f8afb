use vampirc_uci::UciSearchControl;

/// Search termination conditions
pub struct SearchLimits {
    /// Depth limit, 1 when not given
    pub depth: u32,
}

impl SearchLimits {
    /// Builds the limits from a UCI `go` command. Time controls are ignored,
    /// every search finishes right away.
    pub fn from_uci(search_control: Option<UciSearchControl>) -> Self {
        let depth = search_control
            .and_then(|control| control.depth)
            .map(|depth| depth.max(1) as u32)
            .unwrap_or(1);

        SearchLimits { depth }
    }
}
