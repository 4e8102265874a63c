//! Terminal output.

use gavel_sdk::format::{format_currency, format_end_time};
use gavel_sdk::{AuctionSnapshot, AuctionSummary, ConnectionState, LoadPhase};

/// Shown once the live channel can no longer deliver updates.
pub const LIVE_UNAVAILABLE_NOTICE: &str =
    "Live updates unavailable. Showing the last known price.";

/// Renders the auction listing.
#[must_use]
pub fn auction_table(auctions: &[AuctionSummary]) -> String {
    if auctions.is_empty() {
        return "No auctions available.".to_string();
    }

    let id_width = auctions
        .iter()
        .map(|auction| auction.id.as_str().len())
        .max()
        .unwrap_or(0)
        .max(2);
    let name_width = auctions
        .iter()
        .map(|auction| auction.name.chars().count())
        .max()
        .unwrap_or(0)
        .max(4);

    let mut out = format!(
        "{:<id_width$}  {:<name_width$}  {:>14}  {:<8}  ENDS\n",
        "ID", "NAME", "PRICE", "STATUS"
    );
    for auction in auctions {
        let ends = auction
            .end_time
            .as_ref()
            .map_or_else(|| "-".to_string(), format_end_time);
        out.push_str(&format!(
            "{:<id_width$}  {:<name_width$}  {:>14}  {:<8}  {}\n",
            auction.id.as_str(),
            auction.name,
            format_currency(auction.current_price),
            auction.status().to_string(),
            ends
        ));
    }
    out.truncate(out.trim_end().len());
    out
}

/// One line per snapshot change.
#[must_use]
pub fn snapshot_line(snapshot: &AuctionSnapshot) -> String {
    let status = if snapshot.status.is_ended() {
        "ended".to_string()
    } else {
        format!("ends {}", format_end_time(&snapshot.end_time))
    };
    format!(
        "[{}] {}: {} ({})",
        snapshot.id,
        snapshot.name,
        format_currency(snapshot.current_price),
        status
    )
}

/// One line per connection state change.
#[must_use]
pub fn connection_line(state: &ConnectionState) -> String {
    format!("live updates: {}", state)
}

/// Message for a load phase that ends the watch, if any.
#[must_use]
pub fn load_failure(phase: &LoadPhase) -> Option<String> {
    match phase {
        LoadPhase::NotFound => Some("Auction not found.".to_string()),
        LoadPhase::Failed(reason) => Some(format!("Could not load auction: {}", reason)),
        LoadPhase::Loading | LoadPhase::Loaded => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use gavel_sdk::{Amount, AuctionId, AuctionStatus};

    fn end_time() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, 18, 30, 0)
            .single()
            .expect("time")
    }

    fn snapshot(status: AuctionStatus) -> AuctionSnapshot {
        AuctionSnapshot {
            id: AuctionId::new("42").expect("id"),
            name: "Carriage clock".to_string(),
            description: String::new(),
            current_price: Amount::from(1250u64),
            end_time: end_time(),
            status,
        }
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(auction_table(&[]), "No auctions available.");
    }

    #[test]
    fn test_auction_table() {
        let auctions = vec![
            AuctionSummary {
                id: AuctionId::new("1").expect("id"),
                name: "Lamp".to_string(),
                current_price: Amount::from(100u64),
                end_time: Some(end_time()),
                status: Some(1),
            },
            AuctionSummary {
                id: AuctionId::new("2").expect("id"),
                name: "Grand piano".to_string(),
                current_price: Amount::from(15000u64),
                end_time: None,
                status: Some(2),
            },
        ];

        let table = auction_table(&auctions);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[1].contains("Lamp"));
        assert!(lines[1].contains("$100.00"));
        assert!(lines[1].contains("2030-06-01 18:30 UTC"));
        assert!(lines[2].contains("$15,000.00"));
        assert!(lines[2].contains("ended"));
        assert!(lines[2].ends_with('-'));
    }

    #[test]
    fn test_snapshot_line() {
        assert_eq!(
            snapshot_line(&snapshot(AuctionStatus::Active)),
            "[42] Carriage clock: $1,250.00 (ends 2030-06-01 18:30 UTC)"
        );
        assert_eq!(
            snapshot_line(&snapshot(AuctionStatus::Ended)),
            "[42] Carriage clock: $1,250.00 (ended)"
        );
    }

    #[test]
    fn test_connection_line() {
        assert_eq!(connection_line(&ConnectionState::Joined), "live updates: live");
        assert_eq!(
            connection_line(&ConnectionState::Reconnecting { attempt: 2 }),
            "live updates: reconnecting (attempt 2)"
        );
    }

    #[test]
    fn test_load_failure() {
        assert_eq!(load_failure(&LoadPhase::Loaded), None);
        assert_eq!(
            load_failure(&LoadPhase::NotFound).as_deref(),
            Some("Auction not found.")
        );
    }
}
