//! Plain-text tables for CLI output
//!
//! Cells are padded before colouring so ANSI escapes don't break alignment.

use crate::strategies::Signal;
use crate::trading::LedgerRecord;
use crate::types::{Market, OpenOrder, OrderBook, Position, Trade, WalletStatus};
use crate::wallet::ApprovalState;
use colored::{Color, Colorize};
use rust_decimal::Decimal;

const MAX_BOOK_ROWS: usize = 10;

struct Column {
    header: &'static str,
    right: bool,
}

impl Column {
    fn left(header: &'static str) -> Self {
        Self { header, right: false }
    }

    fn right(header: &'static str) -> Self {
        Self { header, right: true }
    }
}

struct Cell {
    text: String,
    color: Option<Color>,
}

impl Cell {
    fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), color: None }
    }

    fn colored(text: impl Into<String>, color: Color) -> Self {
        Self { text: text.into(), color: Some(color) }
    }
}

fn render(title: &str, columns: &[Column], rows: &[Vec<Cell>]) -> String {
    let mut widths: Vec<usize> = columns.iter().map(|c| c.header.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.text.chars().count());
        }
    }

    let pad = |text: &str, width: usize, right: bool| {
        if right {
            format!("{:>width$}", text, width = width)
        } else {
            format!("{:<width$}", text, width = width)
        }
    };

    let total: usize = widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1);
    let mut out = String::new();
    out.push_str(&format!("{}\n", title.bold()));

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| pad(c.header, *w, c.right))
        .collect();
    out.push_str(&header.join(" | "));
    out.push('\n');
    out.push_str(&"-".repeat(total));
    out.push('\n');

    for row in rows {
        let line: Vec<String> = row
            .iter()
            .zip(columns.iter().zip(&widths))
            .map(|(cell, (col, w))| {
                let padded = pad(&cell.text, *w, col.right);
                match cell.color {
                    Some(color) => padded.color(color).to_string(),
                    None => padded,
                }
            })
            .collect();
        out.push_str(line.join(" | ").trim_end());
        out.push('\n');
    }
    out
}

/// Shorten to `max` chars, marking the cut with "..."
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max).collect::<String>())
    }
}

fn side_cell(side: &str) -> Cell {
    let color = if side.eq_ignore_ascii_case("BUY") { Color::Green } else { Color::Red };
    Cell::colored(side, color)
}

fn signed(value: Decimal) -> String {
    if value >= Decimal::ZERO {
        format!("+{:.4}", value)
    } else {
        format!("{:.4}", value)
    }
}

pub fn markets_table(markets: &[Market]) -> String {
    let columns = [
        Column::left("Condition ID"),
        Column::left("Question"),
        Column::left("Active"),
        Column::left("End Date"),
    ];
    let rows: Vec<Vec<Cell>> = markets
        .iter()
        .map(|m| {
            vec![
                Cell::colored(truncate(&m.condition_id, 16), Color::Cyan),
                Cell::plain(truncate(&m.question, 60)),
                Cell::colored(m.active.to_string(), Color::Green),
                Cell::colored(
                    if m.end_date_iso.is_empty() { "N/A" } else { m.end_date_iso.as_str() },
                    Color::Yellow,
                ),
            ]
        })
        .collect();
    render("Markets", &columns, &rows)
}

pub fn market_detail(market: &Market) -> String {
    let mut out = format!("{}\n", market.question.bold());
    out.push_str(&format!("  Condition ID: {}\n", market.condition_id));
    out.push_str(&format!("  Active: {}\n", market.active));
    out.push_str(&format!("  Closed: {}\n", market.closed));
    out.push_str(&format!(
        "  End date: {}\n",
        if market.end_date_iso.is_empty() { "N/A" } else { &market.end_date_iso }
    ));
    out.push_str(&format!("  Min order size: {}\n", market.minimum_order_size));
    out.push_str(&format!("  Tick size: {}\n", market.tick_size_str()));
    out.push_str(&format!("  Neg risk: {}\n", market.neg_risk));
    if !market.tokens.is_empty() {
        out.push_str("  Tokens:\n");
        for t in &market.tokens {
            out.push_str(&format!(
                "    {}: {} price={:.4}\n",
                t.outcome,
                truncate(&t.token_id, 20),
                t.price
            ));
        }
    }
    out
}

pub fn orderbook_table(book: &OrderBook) -> String {
    let columns = [
        Column::right("Bid Price"),
        Column::right("Bid Size"),
        Column::right("Ask Price"),
        Column::right("Ask Size"),
    ];

    let depth = book.bids.len().max(book.asks.len()).min(MAX_BOOK_ROWS);
    let rows: Vec<Vec<Cell>> = (0..depth)
        .map(|i| {
            let bid = book.bids.get(i);
            let ask = book.asks.get(i);
            vec![
                Cell::colored(bid.map(|e| e.price.clone()).unwrap_or_default(), Color::Green),
                Cell::colored(bid.map(|e| e.size.clone()).unwrap_or_default(), Color::Green),
                Cell::colored(ask.map(|e| e.price.clone()).unwrap_or_default(), Color::Red),
                Cell::colored(ask.map(|e| e.size.clone()).unwrap_or_default(), Color::Red),
            ]
        })
        .collect();

    let mut out = render(
        &format!("Order Book: {}", truncate(&book.token_id, 16)),
        &columns,
        &rows,
    );
    if let Some(bid) = book.best_bid() {
        out.push_str(&format!("  Best bid: {:.4}\n", bid));
    }
    if let Some(ask) = book.best_ask() {
        out.push_str(&format!("  Best ask: {:.4}\n", ask));
    }
    if let Some(mid) = book.midpoint() {
        out.push_str(&format!("  Midpoint: {:.4}\n", mid));
    }
    out
}

pub fn positions_table(positions: &[Position]) -> String {
    let columns = [
        Column::left("Asset"),
        Column::left("Outcome"),
        Column::right("Size"),
        Column::right("Avg Price"),
        Column::right("Cur Price"),
        Column::right("P&L"),
    ];
    let rows: Vec<Vec<Cell>> = positions
        .iter()
        .map(|p| {
            let pnl = p.total_pnl();
            let pnl_color = if pnl >= Decimal::ZERO { Color::Green } else { Color::Red };
            vec![
                Cell::colored(truncate(&p.asset, 16), Color::Cyan),
                Cell::plain(p.outcome.clone()),
                Cell::colored(format!("{:.2}", p.size), Color::Green),
                Cell::plain(format!("{:.4}", p.avg_price)),
                Cell::plain(format!("{:.4}", p.cur_price)),
                Cell::colored(signed(pnl), pnl_color),
            ]
        })
        .collect();
    render("Positions", &columns, &rows)
}

pub fn open_orders_table(orders: &[OpenOrder]) -> String {
    let columns = [
        Column::left("Order ID"),
        Column::left("Side"),
        Column::right("Price"),
        Column::right("Size"),
        Column::right("Matched"),
    ];
    let rows: Vec<Vec<Cell>> = orders
        .iter()
        .map(|o| {
            vec![
                Cell::colored(truncate(&o.order_id, 16), Color::Cyan),
                side_cell(&o.side),
                Cell::plain(o.price.clone()),
                Cell::plain(o.original_size.clone()),
                Cell::plain(o.size_matched.clone()),
            ]
        })
        .collect();
    render("Open Orders", &columns, &rows)
}

pub fn trades_table(trades: &[Trade]) -> String {
    let columns = [
        Column::left("ID"),
        Column::left("Side"),
        Column::right("Price"),
        Column::right("Size"),
        Column::left("Timestamp"),
        Column::left("Status"),
    ];
    let rows: Vec<Vec<Cell>> = trades
        .iter()
        .map(|t| {
            vec![
                Cell::colored(truncate(&t.id, 16), Color::Cyan),
                side_cell(&t.side),
                Cell::plain(t.price.clone()),
                Cell::plain(t.size.clone()),
                Cell::plain(t.timestamp.clone()),
                Cell::plain(t.status.clone()),
            ]
        })
        .collect();
    render("Trade History", &columns, &rows)
}

pub fn ledger_table(records: &[LedgerRecord]) -> String {
    let columns = [
        Column::left("Timestamp"),
        Column::left("Token"),
        Column::left("Side"),
        Column::right("Price"),
        Column::right("Size"),
        Column::left("Order ID"),
        Column::left("Status"),
        Column::left("OK"),
    ];
    let rows: Vec<Vec<Cell>> = records
        .iter()
        .map(|r| {
            vec![
                Cell::plain(r.timestamp.clone()),
                Cell::colored(truncate(&r.token_id, 16), Color::Cyan),
                side_cell(&r.side),
                Cell::plain(r.price.clone()),
                Cell::plain(r.size.clone()),
                Cell::plain(truncate(&r.order_id, 16)),
                Cell::plain(r.status.clone()),
                Cell::plain(r.success.clone()),
            ]
        })
        .collect();
    render("Trade Ledger", &columns, &rows)
}

pub fn signals_table(signals: &[(&Market, Signal)]) -> String {
    let columns = [
        Column::left("Question"),
        Column::left("Token"),
        Column::right("Price"),
        Column::right("Edge"),
    ];
    let rows: Vec<Vec<Cell>> = signals
        .iter()
        .map(|(m, s)| {
            vec![
                Cell::plain(truncate(&m.question, 50)),
                Cell::colored(truncate(&s.token_id, 16), Color::Cyan),
                Cell::plain(format!("{:.2}", s.price)),
                Cell::colored(format!("{:.1}%", s.edge * Decimal::ONE_HUNDRED), Color::Green),
            ]
        })
        .collect();
    render("NO Bias Signals", &columns, &rows)
}

pub fn wallet_status(status: &WalletStatus) -> String {
    let mut out = format!("{}\n", "Wallet Status".bold());
    out.push_str(&format!("  Address:  {}\n", status.address));
    out.push_str(&format!("  POL:      {:.6}\n", status.pol_balance));
    out.push_str(&format!("  USDC:     {:.6}\n", status.usdc_balance));
    out.push_str(&format!(
        "  CTF Exchange approved:          {}\n",
        status.approvals.ctf_exchange
    ));
    out.push_str(&format!(
        "  Neg Risk CTF Exchange approved: {}\n",
        status.approvals.neg_risk_ctf_exchange
    ));
    out
}

pub fn approval_state_table(state: &ApprovalState) -> String {
    let columns = [
        Column::left("Spender"),
        Column::left("Asset"),
        Column::left("Approved"),
    ];
    let rows: Vec<Vec<Cell>> = state
        .iter()
        .map(|((spender, asset), ok)| {
            let color = if *ok { Color::Green } else { Color::Red };
            vec![
                Cell::plain(*spender),
                Cell::plain(asset.to_string()),
                Cell::colored(if *ok { "yes" } else { "no" }, color),
            ]
        })
        .collect();
    render("Approvals", &columns, &rows)
}

/// "[OK] label" / "[FAIL] label: reason"
pub fn check_line(label: &str, outcome: &std::result::Result<String, String>) -> String {
    match outcome {
        Ok(detail) if detail.is_empty() => format!("{} {}", "[OK]".green(), label),
        Ok(detail) => format!("{} {}: {}", "[OK]".green(), label, detail),
        Err(reason) => format!("{} {}: {}", "[FAIL]".red(), label, reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderBookEntry;
    use rust_decimal_macros::dec;

    fn no_color() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 16), "short");
        assert_eq!(truncate("0123456789abcdefXYZ", 16), "0123456789abcdef...");
        assert_eq!(truncate("ééééé", 3), "ééé...");
    }

    #[test]
    fn test_orderbook_table_and_summary() {
        no_color();
        let entry = |p: &str, s: &str| OrderBookEntry {
            price: p.to_string(),
            size: s.to_string(),
        };
        let book = OrderBook {
            token_id: "123456".to_string(),
            bids: vec![entry("0.48", "100"), entry("0.47", "50")],
            asks: vec![entry("0.52", "80")],
        };

        let out = orderbook_table(&book);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Order Book: 123456");
        assert!(lines[1].contains("Bid Price | Bid Size | Ask Price | Ask Size"));
        assert!(lines[3].contains("0.48") && lines[3].contains("0.52"));
        assert!(lines[4].contains("0.47"));
        assert!(out.contains("Best bid: 0.4800"));
        assert!(out.contains("Best ask: 0.5200"));
        assert!(out.contains("Midpoint: 0.5000"));
    }

    #[test]
    fn test_positions_pnl_sign() {
        no_color();
        let positions = vec![
            Position {
                asset: "1".to_string(),
                outcome: "Yes".to_string(),
                size: dec!(10),
                avg_price: dec!(0.4),
                cur_price: dec!(0.5),
                realized_pnl: dec!(0),
                unrealized_pnl: dec!(1),
                ..Default::default()
            },
            Position {
                asset: "2".to_string(),
                outcome: "No".to_string(),
                realized_pnl: dec!(-0.25),
                ..Default::default()
            },
        ];

        let out = positions_table(&positions);
        assert!(out.contains("+1.0000"));
        assert!(out.contains("-0.2500"));
        assert!(out.contains("10.00"));
    }

    #[test]
    fn test_columns_align() {
        no_color();
        let orders = vec![
            OpenOrder {
                order_id: "0xabc".to_string(),
                side: "BUY".to_string(),
                price: "0.5".to_string(),
                original_size: "10".to_string(),
                size_matched: "0".to_string(),
                ..Default::default()
            },
            OpenOrder {
                order_id: "0x0123456789abcdef0123".to_string(),
                side: "SELL".to_string(),
                price: "0.55".to_string(),
                original_size: "100".to_string(),
                size_matched: "25".to_string(),
                ..Default::default()
            },
        ];

        let out = open_orders_table(&orders);
        let lines: Vec<&str> = out.lines().collect();
        // every separator lines up with the header's
        let header_bar = lines[1].find('|').unwrap();
        assert_eq!(lines[3].find('|').unwrap(), header_bar);
        assert_eq!(lines[4].find('|').unwrap(), header_bar);
        assert!(lines[4].starts_with("0x0123456789abcd..."));
    }

    #[test]
    fn test_check_line() {
        no_color();
        assert_eq!(check_line("Gamma API", &Ok(String::new())), "[OK] Gamma API");
        assert_eq!(
            check_line("CLOB auth", &Err("401 Unauthorized".to_string())),
            "[FAIL] CLOB auth: 401 Unauthorized"
        );
    }
}
