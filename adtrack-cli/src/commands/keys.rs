//! Keys command - show the event keys a placement would produce.

use adtrack::{AdType, DedupScope, EventKind};

use crate::error::CliError;

/// Arguments for the keys command.
pub struct KeysArgs {
    pub label: String,
    pub event_name: String,
}

/// Every key for `label`/`event_name`, views first, session scope first.
pub fn event_keys(label: &str, event_name: &str) -> Vec<(EventKind, DedupScope, String)> {
    let ad_type = AdType::owned(label, label);
    [EventKind::View, EventKind::Click]
        .into_iter()
        .flat_map(|kind| {
            let ad_type = &ad_type;
            DedupScope::ALL
                .into_iter()
                .map(move |scope| (kind, scope, ad_type.event_key(kind, scope, event_name)))
        })
        .collect()
}

/// Run the keys command.
pub fn run(args: KeysArgs) -> Result<(), CliError> {
    if args.event_name.is_empty() {
        return Err(CliError::Config(
            "event name must not be empty; empty names are never sent".to_string(),
        ));
    }

    for (kind, scope, key) in event_keys(&args.label, &args.event_name) {
        println!("{:<6} {:<8} {}", kind.to_string(), scope.to_string(), key);
    }
    Ok(())
}
