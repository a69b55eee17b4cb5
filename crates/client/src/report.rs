use stockdesk_core::domain::{ChatMessage, Period, SearchResult, WatchlistEntry};
use stockdesk_core::sync::{MarketSnapshot, Selection};

const NA: &str = "N/A";

pub fn print_watchlist(entries: &[WatchlistEntry]) {
    println!("watchlist ({} symbols)", entries.len());
    for e in entries {
        println!("  {}", watchlist_row(e));
    }
}

pub fn print_search(query: &str, results: &[SearchResult]) {
    println!("search {query:?}: {} results", results.len());
    for r in results {
        println!("  {:<8} {}", r.symbol, r.name);
    }
}

pub fn print_selection(selection: &Selection, period: Period) {
    println!("{}", selection.symbol);
    if let Some(d) = &selection.detail {
        println!("  name       {}", d.company_name.as_deref().unwrap_or(NA));
        println!("  price      {}", fmt_num(d.price));
        println!("  change     {}", fmt_pct(d.change_percent));
        println!("  day range  {} - {}", fmt_num(d.day_low), fmt_num(d.day_high));
        println!("  52w range  {} - {}", fmt_num(d.year_low), fmt_num(d.year_high));
        println!("  p/e        {}", fmt_num(d.pe_ratio));
        println!("  beta       {}", fmt_num(d.beta));
        println!("  sector     {}", d.sector.as_deref().unwrap_or(NA));
    }

    match (selection.history.first(), selection.history.last()) {
        (Some(first), Some(last)) => println!(
            "  history {period}: {} points, {} .. {}, close {:.2} -> {:.2}",
            selection.history.len(),
            first.timestamp.format("%Y-%m-%d %H:%M"),
            last.timestamp.format("%Y-%m-%d %H:%M"),
            first.close,
            last.close
        ),
        _ => println!("  history {period}: no data"),
    }
}

pub fn print_reply(reply: &ChatMessage) {
    println!("assistant: {}", reply.content);
}

pub fn print_market(snapshot: &MarketSnapshot) {
    if !snapshot.indices.is_empty() {
        println!("indices");
        for i in &snapshot.indices {
            println!(
                "  {:<12} {:>12} {:>9}",
                i.label(),
                fmt_num(i.quote.price),
                fmt_pct(i.quote.change_percent)
            );
        }
    }
    if !snapshot.trending.is_empty() {
        println!("trending");
        for t in &snapshot.trending {
            println!(
                "  {:<8} {:>12} {:>9}",
                t.symbol,
                fmt_num(t.price),
                fmt_pct(t.change_percent)
            );
        }
    }
}

fn watchlist_row(e: &WatchlistEntry) -> String {
    format!(
        "{:<8} {:<28} {:>12} {:>9}",
        e.symbol,
        e.company_name.as_deref().unwrap_or(NA),
        fmt_num(e.price),
        fmt_pct(e.change_percent)
    )
}

fn fmt_num(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.2}")).unwrap_or_else(|| NA.to_string())
}

fn fmt_pct(v: Option<f64>) -> String {
    v.map(|v| format!("{v:+.2}%")).unwrap_or_else(|| NA.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_values_render_as_not_available() {
        assert_eq!(fmt_num(None), "N/A");
        assert_eq!(fmt_pct(None), "N/A");
        assert_eq!(fmt_num(Some(150.456)), "150.46");
        assert_eq!(fmt_pct(Some(-1.2)), "-1.20%");
        assert_eq!(fmt_pct(Some(0.5)), "+0.50%");
    }

    #[test]
    fn watchlist_row_includes_symbol_and_name() {
        let row = watchlist_row(&WatchlistEntry {
            symbol: "AAPL".to_string(),
            company_name: Some("Apple Inc.".to_string()),
            price: Some(150.0),
            change_percent: None,
        });
        assert!(row.starts_with("AAPL"));
        assert!(row.contains("Apple Inc."));
        assert!(row.contains("150.00"));
        assert!(row.ends_with("N/A"));
    }
}
