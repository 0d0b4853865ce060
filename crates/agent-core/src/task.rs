//! Task kinds and immutable task descriptors

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Date format used for `asOf` on the command line and in storage paths
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The known analyst task kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Technical and market trend analysis
    Market,
    /// Social sentiment analysis
    Social,
    /// News and sentiment analysis
    News,
    /// Financial fundamentals and ratio analysis
    Fundamentals,
    /// Bullish thesis research
    Bull,
    /// Bearish thesis research
    Bear,
    /// Trade execution strategy
    Trader,
    /// Aggressive risk perspective
    Risky,
    /// Balanced risk perspective
    Neutral,
    /// Conservative risk perspective
    Safe,
}

impl TaskKind {
    /// Every known task kind, in default batch order
    pub const ALL: [TaskKind; 10] = [
        TaskKind::Market,
        TaskKind::Social,
        TaskKind::News,
        TaskKind::Fundamentals,
        TaskKind::Bull,
        TaskKind::Bear,
        TaskKind::Trader,
        TaskKind::Risky,
        TaskKind::Neutral,
        TaskKind::Safe,
    ];

    /// Identifier used on the command line and in file names
    pub fn id(self) -> &'static str {
        match self {
            TaskKind::Market => "market",
            TaskKind::Social => "social",
            TaskKind::News => "news",
            TaskKind::Fundamentals => "fundamentals",
            TaskKind::Bull => "bull",
            TaskKind::Bear => "bear",
            TaskKind::Trader => "trader",
            TaskKind::Risky => "risky",
            TaskKind::Neutral => "neutral",
            TaskKind::Safe => "safe",
        }
    }

    /// Human-readable analyst name
    pub fn display_name(self) -> &'static str {
        match self {
            TaskKind::Market => "Market Analyst",
            TaskKind::Social => "Social Media Analyst",
            TaskKind::News => "News Analyst",
            TaskKind::Fundamentals => "Fundamentals Analyst",
            TaskKind::Bull => "Bull Researcher",
            TaskKind::Bear => "Bear Researcher",
            TaskKind::Trader => "Trader",
            TaskKind::Risky => "Risky Debater",
            TaskKind::Neutral => "Neutral Debater",
            TaskKind::Safe => "Safe Debater",
        }
    }

    /// One-line description of what the analyst covers
    pub fn description(self) -> &'static str {
        match self {
            TaskKind::Market => "Technical and market trend analysis",
            TaskKind::Social => "Social sentiment and social media analysis",
            TaskKind::News => "News sentiment and news-based analysis",
            TaskKind::Fundamentals => "Financial fundamentals and ratio analysis",
            TaskKind::Bull => "Bullish thesis and upside potential research",
            TaskKind::Bear => "Bearish thesis and downside risk research",
            TaskKind::Trader => "Trade execution and strategy recommendations",
            TaskKind::Risky => "Aggressive perspective on risk management",
            TaskKind::Neutral => "Balanced perspective on risk management",
            TaskKind::Safe => "Conservative perspective on risk management",
        }
    }

    /// Tools this kind may call unless the caller overrides the set
    pub fn default_tools(self) -> &'static [&'static str] {
        match self {
            TaskKind::Market => &["get_stock_data", "get_indicators"],
            TaskKind::Social => &["get_news"],
            TaskKind::News => &["get_news", "get_global_news"],
            TaskKind::Fundamentals => &[
                "get_fundamentals",
                "get_balance_sheet",
                "get_cashflow",
                "get_income_statement",
            ],
            _ => &[],
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for TaskKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_ascii_lowercase();
        TaskKind::ALL
            .into_iter()
            .find(|kind| kind.id() == needle)
            .ok_or_else(|| {
                let known: Vec<&str> = TaskKind::ALL.iter().map(|k| k.id()).collect();
                Error::Config(format!(
                    "unknown task '{}' (known: {})",
                    s.trim(),
                    known.join(", ")
                ))
            })
    }
}

/// Parse a calendar date in `YYYY-MM-DD` form
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| Error::Config(format!("invalid date '{raw}', expected YYYY-MM-DD")))
}

/// Immutable descriptor of one task execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Which analyst runs
    pub task_id: TaskKind,
    /// The subject under analysis (a ticker symbol)
    pub subject: String,
    /// The analysis date
    pub as_of: NaiveDate,
    /// Ordered list of tools this task may call
    pub tool_set: Vec<String>,
}

impl TaskSpec {
    /// Create a task spec with the kind's default tool set
    pub fn new(task_id: TaskKind, subject: impl Into<String>, as_of: NaiveDate) -> Self {
        Self {
            task_id,
            subject: subject.into(),
            as_of,
            tool_set: task_id
                .default_tools()
                .iter()
                .map(|t| (*t).to_string())
                .collect(),
        }
    }

    /// Replace the tool set
    pub fn with_tool_set<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tool_set = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Whether `tool` is in this task's tool set
    pub fn permits(&self, tool: &str) -> bool {
        self.tool_set.iter().any(|t| t == tool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_task_kind() {
        assert_eq!("market".parse::<TaskKind>().unwrap(), TaskKind::Market);
        assert_eq!(" NEWS ".parse::<TaskKind>().unwrap(), TaskKind::News);

        let err = "astrology".parse::<TaskKind>().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("astrology"));
    }

    #[test]
    fn test_ids_round_trip() {
        for kind in TaskKind::ALL {
            assert_eq!(kind.id().parse::<TaskKind>().unwrap(), kind);
            assert_eq!(kind.to_string(), kind.id());
        }
    }

    #[test]
    fn test_serde_uses_ids() {
        let json = serde_json::to_string(&TaskKind::Fundamentals).unwrap();
        assert_eq!(json, "\"fundamentals\"");
    }

    #[test]
    fn test_default_tool_sets() {
        let date = parse_date("2025-12-25").unwrap();
        let spec = TaskSpec::new(TaskKind::News, "INTC", date);
        assert_eq!(spec.tool_set, vec!["get_news", "get_global_news"]);
        assert!(spec.permits("get_news"));
        assert!(!spec.permits("get_cashflow"));

        let trader = TaskSpec::new(TaskKind::Trader, "INTC", date);
        assert!(trader.tool_set.is_empty());
    }

    #[test]
    fn test_with_tool_set() {
        let date = parse_date("2025-12-25").unwrap();
        let spec = TaskSpec::new(TaskKind::Market, "INTC", date).with_tool_set(["echo"]);
        assert_eq!(spec.tool_set, vec!["echo".to_string()]);
    }

    #[test]
    fn test_parse_date() {
        assert!(parse_date("2025-02-28").is_ok());
        assert!(parse_date("2025-02-30").is_err());
        assert!(parse_date("12/25/2025").is_err());
    }
}
