use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SYMBOL_RE: Regex = Regex::new(r"\$?\b[A-Z]{1,5}\b").unwrap();
}

// Uppercase English words that show up in shouty titles and would
// otherwise look like tickers. A $ prefix overrides the list.
const STOP_WORDS: &[&str] = &[
    "A", "AI", "ALL", "AM", "AN", "AND", "ANY", "ARE", "AT", "BE", "BIG", "BUT", "BUY",
    "CAN", "CEO", "CFO", "CPI", "DAY", "DID", "DO", "ETF", "FED", "FOR", "GDP", "GET",
    "GO", "HAS", "HERE", "HOT", "HOW", "I", "IF", "IN", "IPO", "IS", "IT", "ITS", "JUST",
    "LIVE", "ME", "MUST", "MY", "NEW", "NEWS", "NO", "NOT", "NOW", "OF", "OK", "ON", "OR",
    "OUT", "SELL", "SO", "STOP", "THE", "THIS", "TO", "TOP", "UP", "US", "USA", "USD",
    "WAS", "WE", "WHAT", "WHEN", "WHY", "WILL", "WIN", "WITH", "YES", "YOU",
];

/// Scans title and description text for ticker symbols: uppercase
/// runs of 1-5 letters, optionally $-prefixed. Order of first
/// appearance is preserved and duplicates are dropped.
pub fn derive_symbols(text: &str) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for token in SYMBOL_RE.find_iter(text) {
        let token = token.as_str();
        let (explicit, ticker) = match token.strip_prefix('$') {
            Some(rest) => (true, rest),
            None => (false, token),
        };
        if !explicit && STOP_WORDS.contains(&ticker) {
            continue;
        }
        if !symbols.iter().any(|s| s == ticker) {
            symbols.push(ticker.to_string());
        }
    }
    symbols
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derives_dollar_and_bare_symbols() {
        let symbols = derive_symbols("Buying $NVDA and TSLA before earnings");
        assert_eq!(symbols, vec!["NVDA", "TSLA"]);
    }

    #[test]
    fn test_stop_words_are_filtered() {
        let symbols = derive_symbols("THE TOP AI STOCKS TO BUY NOW");
        assert!(symbols.is_empty());
    }

    #[test]
    fn test_dollar_prefix_bypasses_stop_list() {
        let symbols = derive_symbols("Going $ALL in on $AI");
        assert_eq!(symbols, vec!["ALL", "AI"]);
    }

    #[test]
    fn test_dedupes_preserving_first_appearance() {
        let symbols = derive_symbols("TSLA calls, $NVDA puts, TSLA again");
        assert_eq!(symbols, vec!["TSLA", "NVDA"]);
    }

    #[test]
    fn test_length_and_case_bounds() {
        assert_eq!(derive_symbols("ABCDE is fine"), vec!["ABCDE"]);
        assert!(derive_symbols("ABCDEF is too long").is_empty());
        assert!(derive_symbols("Nvidia spelled out").is_empty());
        assert!(derive_symbols("Q3 results").is_empty());
    }
}
