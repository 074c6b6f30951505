//! Broker export support.
//!
//! Each supported broker is described by a profile: a predicate over the
//! header row that recognises its export, and a header translation table
//! that renames its column spellings to the names the column mapper knows.
//! Profiles are evaluated in the order of `BROKER_PROFILES`; the first match
//! wins.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::csv_parser::{is_blank_record, rows_from_records, split_records};
use super::import_errors::ImportError;
use super::import_model::SourceRows;

/// Number of leading non-blank lines searched for a broker header row.
/// Exports put account titles and timestamps above the header.
const HEADER_SCAN_LIMIT: usize = 10;

/// First-cell prefixes of summary and disclaimer lines at the end of exports.
const FOOTER_MARKERS: &[&str] = &[
    "account total",
    "cash & cash investments",
    "pending activity",
    "the data and information",
    "brokerage services",
    "date downloaded",
    "***",
];

/// First cells that mark a totals line only when they are the whole cell.
/// Fund names such as "Total Bond Market" start with the same word.
const FOOTER_LABELS: &[&str] = &["total", "totals", "grand total"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Broker {
    Fidelity,
    Schwab,
    Vanguard,
    Etrade,
    TdAmeritrade,
    Robinhood,
}

impl Broker {
    pub const ALL: [Broker; 6] = [
        Broker::Fidelity,
        Broker::Schwab,
        Broker::Vanguard,
        Broker::Etrade,
        Broker::TdAmeritrade,
        Broker::Robinhood,
    ];

    /// Stable identifier used in `broker:<id>` import methods.
    pub fn id(&self) -> &'static str {
        match self {
            Broker::Fidelity => "fidelity",
            Broker::Schwab => "schwab",
            Broker::Vanguard => "vanguard",
            Broker::Etrade => "etrade",
            Broker::TdAmeritrade => "tdameritrade",
            Broker::Robinhood => "robinhood",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Broker::Fidelity => "Fidelity",
            Broker::Schwab => "Schwab",
            Broker::Vanguard => "Vanguard",
            Broker::Etrade => "E*TRADE",
            Broker::TdAmeritrade => "TD Ameritrade",
            Broker::Robinhood => "Robinhood",
        }
    }
}

impl fmt::Display for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Broker {
    type Err = ImportError;

    /// Accepts ids and display names in any case, ignoring punctuation and
    /// spaces, so "E*TRADE", "td-ameritrade" and "Charles Schwab" all resolve.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "fidelity" | "fidelityinvestments" => Ok(Broker::Fidelity),
            "schwab" | "charlesschwab" => Ok(Broker::Schwab),
            "vanguard" => Ok(Broker::Vanguard),
            "etrade" => Ok(Broker::Etrade),
            "tdameritrade" | "tda" | "td" => Ok(Broker::TdAmeritrade),
            "robinhood" => Ok(Broker::Robinhood),
            _ => Err(ImportError::UnknownBroker(s.to_string())),
        }
    }
}

// =============================================================================
// Profiles
// =============================================================================

/// Case-insensitive view over one candidate header row.
struct HeaderSet<'a> {
    raw: &'a [String],
    lower: Vec<String>,
}

impl<'a> HeaderSet<'a> {
    fn new(raw: &'a [String]) -> Self {
        Self {
            raw,
            lower: raw.iter().map(|h| h.trim().to_lowercase()).collect(),
        }
    }

    fn has(&self, name: &str) -> bool {
        self.lower.iter().any(|h| h == name)
    }

    fn has_prefix(&self, prefix: &str) -> bool {
        self.lower.iter().any(|h| h.starts_with(prefix))
    }

    /// True when every header with letters is written in upper case.
    fn all_uppercase(&self) -> bool {
        self.raw
            .iter()
            .filter(|h| h.chars().any(|c| c.is_alphabetic()))
            .all(|h| !h.chars().any(|c| c.is_lowercase()))
    }
}

struct BrokerProfile {
    broker: Broker,
    matches: fn(&HeaderSet) -> bool,
    /// Broker header spelling to normalized header, compared case-insensitively.
    translations: &'static [(&'static str, &'static str)],
}

fn is_etrade(h: &HeaderSet) -> bool {
    h.has("price paid $") || (h.has("symbol") && h.has("last price $"))
}

fn is_fidelity(h: &HeaderSet) -> bool {
    h.has("symbol") && (h.has("average cost basis") || h.has("cost basis total"))
}

fn is_schwab(h: &HeaderSet) -> bool {
    h.has("symbol")
        && (h.has("qty (quantity)") || h.has("quantity"))
        && h.has("market value")
        && (h.has_prefix("price chng") || h.has_prefix("price change"))
}

/// TD Ameritrade writes every header in upper case.
fn is_td_ameritrade(h: &HeaderSet) -> bool {
    h.all_uppercase() && h.has("symbol") && h.has("quantity")
}

fn is_vanguard(h: &HeaderSet) -> bool {
    h.has("fund name") || (h.has("investment name") && h.has("share price"))
}

fn is_robinhood(h: &HeaderSet) -> bool {
    h.has("instrument") && (h.has("trans code") || h.has("average cost") || h.has("activity date"))
}

const BROKER_PROFILES: &[BrokerProfile] = &[
    BrokerProfile {
        broker: Broker::Etrade,
        matches: is_etrade,
        translations: &[
            ("Price Paid $", "Cost Basis"),
            ("Last Price $", "Current Price"),
            ("Quantity", "Shares"),
            ("Date Acquired", "Purchase Date"),
        ],
    },
    BrokerProfile {
        broker: Broker::Fidelity,
        matches: is_fidelity,
        translations: &[
            ("Quantity", "Shares"),
            ("Average Cost Basis", "Cost Basis"),
            ("Cost Basis Total", "Total Cost Basis"),
            ("Last Price", "Current Price"),
            ("Date Acquired", "Purchase Date"),
            ("Description", "Security Name"),
        ],
    },
    BrokerProfile {
        broker: Broker::Schwab,
        matches: is_schwab,
        translations: &[
            ("Qty (Quantity)", "Shares"),
            ("Quantity", "Shares"),
            ("Price", "Current Price"),
            ("Date Acquired", "Purchase Date"),
            ("Description", "Security Name"),
        ],
    },
    BrokerProfile {
        broker: Broker::TdAmeritrade,
        matches: is_td_ameritrade,
        translations: &[
            ("SYMBOL", "Symbol"),
            ("QUANTITY", "Shares"),
            ("PRICE", "Cost Basis"),
            ("DATE", "Purchase Date"),
            ("DESCRIPTION", "Security Name"),
        ],
    },
    BrokerProfile {
        broker: Broker::Vanguard,
        matches: is_vanguard,
        translations: &[
            ("Share Balance", "Shares"),
            ("Share Price", "Current Price"),
            ("Price", "Current Price"),
            ("Investment Name", "Security Name"),
            ("Trade Date", "Purchase Date"),
        ],
    },
    BrokerProfile {
        broker: Broker::Robinhood,
        matches: is_robinhood,
        translations: &[
            ("Instrument", "Symbol"),
            ("Quantity", "Shares"),
            ("Average Cost", "Cost Basis"),
            ("Price", "Cost Basis"),
            ("Activity Date", "Purchase Date"),
            ("Description", "Security Name"),
            ("Equity", "Market Value"),
        ],
    },
];

fn profile_for(broker: Broker) -> &'static BrokerProfile {
    BROKER_PROFILES
        .iter()
        .find(|p| p.broker == broker)
        .unwrap_or(&BROKER_PROFILES[0])
}

/// Returns the broker whose signature matches `headers`, if any.
pub fn detect_broker(headers: &[String]) -> Option<Broker> {
    let set = HeaderSet::new(headers);
    BROKER_PROFILES
        .iter()
        .find(|p| (p.matches)(&set))
        .map(|p| p.broker)
}

/// Renames broker header spellings to normalized headers.
pub fn translate_headers(broker: Broker, headers: &[String]) -> Vec<String> {
    let profile = profile_for(broker);
    headers
        .iter()
        .map(|header| {
            let trimmed = header.trim();
            profile
                .translations
                .iter()
                .find(|(from, _)| from.eq_ignore_ascii_case(trimmed))
                .map(|(_, to)| to.to_string())
                .unwrap_or_else(|| trimmed.to_string())
        })
        .collect()
}

// =============================================================================
// Reading
// =============================================================================

/// Reads a broker CSV export.
///
/// With a hint, that broker's translation table is applied. Without one the
/// broker is detected from the header row; when nothing matches the input
/// is read as generic CSV and no broker is reported.
pub fn read_broker_format(
    text: &str,
    broker_hint: Option<&str>,
) -> Result<(SourceRows, Option<Broker>), ImportError> {
    let hint = broker_hint
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(|h| {
            h.parse::<Broker>().inspect_err(|_| {
                warn!("Rejecting unknown broker hint '{}'", h);
            })
        })
        .transpose()?;
    read_broker_export(text, hint)
}

/// Typed form of [`read_broker_format`].
pub fn read_broker_export(
    text: &str,
    hint: Option<Broker>,
) -> Result<(SourceRows, Option<Broker>), ImportError> {
    let records = split_records(text, b',');
    let candidates: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| !is_blank_record(record))
        .map(|(idx, _)| idx)
        .take(HEADER_SCAN_LIMIT)
        .collect();
    let first = *candidates.first().ok_or(ImportError::EmptyInput)?;

    let matched = match hint {
        Some(broker) => {
            let profile = profile_for(broker);
            let header_index = candidates
                .iter()
                .copied()
                .find(|&idx| (profile.matches)(&HeaderSet::new(&records[idx])))
                .unwrap_or(first);
            Some((broker, header_index))
        }
        None => candidates.iter().copied().find_map(|idx| {
            detect_broker(&records[idx]).map(|broker| (broker, idx))
        }),
    };

    let Some((broker, header_index)) = matched else {
        debug!("No broker signature matched; reading as generic CSV");
        return Ok((rows_from_records(records, first), None));
    };

    debug!(
        "Reading {} export with header on line {}",
        broker.display_name(),
        header_index + 1
    );

    let width = records[header_index].len();
    let mut records: Vec<Vec<String>> = records
        .into_iter()
        .enumerate()
        .filter(|(idx, record)| *idx <= header_index || !is_footer_record(record, width))
        .map(|(_, record)| record)
        .collect();
    records[header_index] = translate_headers(broker, &records[header_index]);

    Ok((rows_from_records(records, header_index), Some(broker)))
}

fn is_footer_record(record: &[String], width: usize) -> bool {
    let first = record
        .first()
        .map(|c| c.trim().to_lowercase())
        .unwrap_or_default();
    if FOOTER_MARKERS.iter().any(|m| first.starts_with(m)) {
        return true;
    }
    if FOOTER_LABELS.contains(&first.trim_end_matches(':').trim_end()) {
        return true;
    }
    let populated = record.iter().filter(|c| !c.trim().is_empty()).count();
    width > 1 && populated == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_broker_from_str_is_lenient() {
        assert_eq!("E*TRADE".parse::<Broker>().unwrap(), Broker::Etrade);
        assert_eq!("td-ameritrade".parse::<Broker>().unwrap(), Broker::TdAmeritrade);
        assert_eq!("Charles Schwab".parse::<Broker>().unwrap(), Broker::Schwab);
        assert_eq!(
            "Interactive Brokers".parse::<Broker>(),
            Err(ImportError::UnknownBroker("Interactive Brokers".to_string()))
        );
    }

    #[test]
    fn test_detect_each_broker() {
        let cases = [
            (
                headers(&["Symbol", "Last Price $", "Quantity", "Price Paid $"]),
                Broker::Etrade,
            ),
            (
                headers(&["Account Name", "Symbol", "Quantity", "Average Cost Basis"]),
                Broker::Fidelity,
            ),
            (
                headers(&["Symbol", "Qty (Quantity)", "Price", "Price Chng %", "Market Value"]),
                Broker::Schwab,
            ),
            (
                headers(&["DATE", "DESCRIPTION", "QUANTITY", "SYMBOL", "PRICE"]),
                Broker::TdAmeritrade,
            ),
            (
                headers(&["Fund Name", "Share Balance", "Price"]),
                Broker::Vanguard,
            ),
            (
                headers(&["Activity Date", "Instrument", "Trans Code", "Quantity", "Price"]),
                Broker::Robinhood,
            ),
        ];
        for (row, expected) in cases {
            assert_eq!(detect_broker(&row), Some(expected), "{:?}", row);
        }
    }

    #[test]
    fn test_generic_headers_match_no_broker() {
        let row = headers(&["Symbol", "Shares", "Cost Basis", "Purchase Date"]);
        assert_eq!(detect_broker(&row), None);
    }

    #[test]
    fn test_translate_headers() {
        let translated = translate_headers(
            Broker::TdAmeritrade,
            &headers(&["DATE", "QUANTITY", "SYMBOL", "PRICE", "COMMISSION"]),
        );
        assert_eq!(
            translated,
            vec!["Purchase Date", "Shares", "Symbol", "Cost Basis", "COMMISSION"]
        );
    }

    #[test]
    fn test_generic_csv_reports_no_broker() {
        let (rows, broker) =
            read_broker_format("Symbol,Shares\nAAPL,1", None).unwrap();
        assert_eq!(broker, None);
        assert_eq!(rows.headers, vec!["Symbol", "Shares"]);
    }

    #[test]
    fn test_schwab_preamble_and_footer_are_skipped() {
        let text = "\"Positions for account Individual ...123 as of 09:00 PM ET, 2024/01/15\"\n\
                    \n\
                    \"Symbol\",\"Description\",\"Qty (Quantity)\",\"Price\",\"Price Chng %\",\"Market Value\",\"Cost Basis\"\n\
                    \"SCHD\",\"SCHWAB US DIVIDEND\",\"120\",\"78.10\",\"0.5%\",\"9372\",\"8400\"\n\
                    \"Cash & Cash Investments\",\"--\",\"--\",\"--\",\"--\",\"512.00\",\"--\"\n\
                    \"Account Total\",\"--\",\"--\",\"--\",\"--\",\"9884\",\"--\"\n";
        let (rows, broker) = read_broker_format(text, None).unwrap();

        assert_eq!(broker, Some(Broker::Schwab));
        assert_eq!(rows.rows.len(), 1);
        assert_eq!(rows.rows[0].get("Symbol"), Some("SCHD"));
        assert_eq!(rows.rows[0].get("Shares"), Some("120"));
        assert_eq!(rows.rows[0].get("Current Price"), Some("78.10"));
    }

    #[test]
    fn test_total_fund_names_are_not_footers() {
        let text = "Fund Name,Symbol,Share Balance,Price,Cost Basis\n\
                    Total Stock Market Index Admiral,VTSAX,40,120.50,4200\n\
                    Wellesley Income Admiral,VWIAX,25,61.10,1500\n\
                    Total:,,,,5700\n";
        let (rows, broker) = read_broker_format(text, None).unwrap();

        assert_eq!(broker, Some(Broker::Vanguard));
        assert_eq!(rows.rows.len(), 2);
        assert_eq!(rows.rows[0].get("Symbol"), Some("VTSAX"));
        assert_eq!(rows.rows[0].get("Shares"), Some("40"));
        assert_eq!(rows.rows[1].get("Symbol"), Some("VWIAX"));
    }

    #[test]
    fn test_hint_applies_translation_table() {
        let text = "Instrument,Quantity,Average Cost,Activity Date\nJEPI,10,55.20,2024-03-01";
        let (rows, broker) = read_broker_format(text, Some("robinhood")).unwrap();

        assert_eq!(broker, Some(Broker::Robinhood));
        assert_eq!(
            rows.headers,
            vec!["Symbol", "Shares", "Cost Basis", "Purchase Date"]
        );
        assert_eq!(rows.rows[0].get("Cost Basis"), Some("55.20"));
    }

    #[test]
    fn test_hint_without_signature_uses_first_line() {
        let text = "Quantity,Symbol\n5,VTI";
        let (rows, broker) = read_broker_format(text, Some("Fidelity")).unwrap();

        assert_eq!(broker, Some(Broker::Fidelity));
        assert_eq!(rows.headers, vec!["Shares", "Symbol"]);
    }

    #[test]
    fn test_unknown_hint_is_rejected() {
        let err = read_broker_format("Symbol\nO", Some("mystery")).unwrap_err();
        assert_eq!(err, ImportError::UnknownBroker("mystery".to_string()));
    }

    #[test]
    fn test_blank_hint_means_detect() {
        let (_, broker) = read_broker_format("Symbol\nO", Some("  ")).unwrap();
        assert_eq!(broker, None);
    }

    #[test]
    fn test_empty_broker_input() {
        assert_eq!(read_broker_format("", None), Err(ImportError::EmptyInput));
    }
}
