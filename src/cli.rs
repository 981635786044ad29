use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Write;

use crate::spool::{ServiceState, StatusStore};

/// Default spool location when no override is given.
pub const DEFAULT_SPOOL_ROOT: &str = "/var/spool/hacheck";

#[derive(Parser)]
#[command(name = "haupdown")]
#[command(about = "Mark a service up or down via the local spool")]
pub struct Cli {
    /// Spool directory holding the down-markers
    #[arg(short = 'd', long, global = true, default_value = DEFAULT_SPOOL_ROOT)]
    pub spool_root: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clear the down-marker for a service
    Up {
        /// Service to mark up
        service: String,
    },
    /// Write a down-marker for a service
    Down {
        /// Service to mark down
        service: String,
        /// Reason text stored with the marker
        #[arg(short, long, default_value = "")]
        reason: String,
    },
    /// Print the current state of a service
    Status {
        /// Service to query
        service: String,
    },
    /// Print every service currently marked down
    StatusAll,
}

pub fn up_service(store: &mut impl StatusStore, service: &str) -> Result<()> {
    store.up(service)?;
    Ok(())
}

pub fn down_service(store: &mut impl StatusStore, service: &str, reason: &str) -> Result<()> {
    store.down(service, reason)?;
    Ok(())
}

/// Print the state line for one service and return whether it is up.
///
/// The line format is tab-separated with fixed field order; downstream
/// consumers parse it, so it must not change.
pub fn print_status(
    store: &impl StatusStore,
    service: &str,
    out: &mut impl Write,
) -> Result<bool> {
    let state = store.status(service)?;
    match &state {
        ServiceState::Up => writeln!(out, "UP\t{}", service)?,
        ServiceState::Down { reason } => writeln!(out, "DOWN\t{}\t{}", service, reason)?,
    }
    Ok(state.is_up())
}

/// Print one DOWN line per service currently marked down. Prints nothing
/// when the spool has no markers.
pub fn print_all_down(store: &impl StatusStore, out: &mut impl Write) -> Result<()> {
    for record in store.status_all_down()? {
        writeln!(out, "DOWN\t{}\t{}", record.service, record.reason)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spool::MemoryStore;

    #[test]
    fn test_up_and_down_produce_no_output() {
        let mut store = MemoryStore::new();

        down_service(&mut store, "svc", "maint").unwrap();
        up_service(&mut store, "svc").unwrap();
        // Neither call takes a sink, so there is nothing they could print
        assert!(store.status("svc").unwrap().is_up());
    }

    #[test]
    fn test_print_status_up_line() {
        let store = MemoryStore::new();
        let mut out = Vec::new();

        let is_up = print_status(&store, "svc", &mut out).unwrap();

        assert!(is_up);
        assert_eq!(String::from_utf8(out).unwrap(), "UP\tsvc\n");
    }

    #[test]
    fn test_print_status_down_line() {
        let mut store = MemoryStore::new();
        store.down("svc", "irrelevant").unwrap();
        let mut out = Vec::new();

        let is_up = print_status(&store, "svc", &mut out).unwrap();

        assert!(!is_up);
        assert_eq!(String::from_utf8(out).unwrap(), "DOWN\tsvc\tirrelevant\n");
    }

    #[test]
    fn test_print_status_down_with_empty_reason() {
        let mut store = MemoryStore::new();
        store.down("svc", "").unwrap();
        let mut out = Vec::new();

        print_status(&store, "svc", &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "DOWN\tsvc\t\n");
    }

    #[test]
    fn test_print_all_down_lists_only_down_services() {
        let mut store = MemoryStore::new();
        store.down("s1", "x").unwrap();
        store.down("s3", "y").unwrap();
        let mut out = Vec::new();

        print_all_down(&store, &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "DOWN\ts1\tx\nDOWN\ts3\ty\n");
    }

    #[test]
    fn test_print_all_down_empty_spool() {
        let store = MemoryStore::new();
        let mut out = Vec::new();

        print_all_down(&store, &mut out).unwrap();

        assert!(out.is_empty());
    }
}
