use crate::market_stats::Analysis;
use crate::spreadsheet::{NOT_AVAILABLE, average_line};
use chrono::{DateTime, Utc};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ContentArrangement, Table,
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_BORDERS_ONLY,
};

fn format_timestamp(taken_at: DateTime<Utc>) -> String {
    taken_at.format("%d-%m-%Y %H:%M:%S").to_string()
}

fn format_usd(value: f64) -> String {
    let whole = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0.0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

/// Builds the per-cycle console summary: top 5 by market cap plus the movers.
pub fn render_summary(analysis: &Analysis, taken_at: DateTime<Utc>) -> String {
    let title = format!("(Data taken at {} UTC)", format_timestamp(taken_at));

    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Rank").add_attribute(Attribute::Bold),
            Cell::new("Coin").add_attribute(Attribute::Bold),
            Cell::new("Market Cap (USD)")
                .add_attribute(Attribute::Bold)
                .set_alignment(CellAlignment::Right),
        ]);

    for (rank, top) in (1..).zip(&analysis.top5) {
        let cap_str = top
            .market_cap_usd
            .map(format_usd)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        table.add_row(vec![
            Cell::new(rank).fg(Color::DarkGrey),
            Cell::new(&top.name).fg(Color::Cyan),
            Cell::new(cap_str)
                .fg(Color::Green)
                .set_alignment(CellAlignment::Right),
        ]);
    }

    let highest = analysis.max_change_name.as_deref().unwrap_or(NOT_AVAILABLE);
    let lowest = analysis.min_change_name.as_deref().unwrap_or(NOT_AVAILABLE);

    format!(
        "\n{}\n{}\n{}\nHighest 24h: {}  |  Lowest 24h: {}",
        title,
        table,
        average_line(analysis),
        highest,
        lowest
    )
}

pub fn print_summary(analysis: &Analysis, taken_at: DateTime<Utc>) {
    println!("{}", render_summary(analysis, taken_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_stats::TopCoin;
    use chrono::TimeZone;

    #[test]
    fn usd_grouping() {
        assert_eq!(format_usd(0.0), "$0");
        assert_eq!(format_usd(999.0), "$999");
        assert_eq!(format_usd(1_000.0), "$1,000");
        assert_eq!(format_usd(1_260_000_000_000.0), "$1,260,000,000,000");
        assert_eq!(format_usd(-12_345.4), "-$12,345");
    }

    #[test]
    fn summary_lists_top_coins_and_movers() {
        let analysis = Analysis {
            top5: vec![
                TopCoin {
                    name: "Bitcoin".into(),
                    market_cap_usd: Some(1.2e12),
                },
                TopCoin {
                    name: "Ethereum".into(),
                    market_cap_usd: None,
                },
            ],
            avg_price: Some(31500.0),
            max_change_name: Some("Ethereum".into()),
            min_change_name: None,
        };
        let taken_at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();

        let out = render_summary(&analysis, taken_at);
        assert!(out.contains("(Data taken at 09-03-2024 14:05:00 UTC)"));
        assert!(out.contains("Bitcoin"));
        assert!(out.contains("$1,200,000,000,000"));
        assert!(out.contains("Ethereum"));
        assert!(out.contains("Average Price: $31500.00"));
        assert!(out.contains("Highest 24h: Ethereum"));
        assert!(out.contains("Lowest 24h: N/A"));
    }
}
