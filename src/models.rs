use serde::Serialize;

/// Raw fields read from one listing fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    pub title: String,
    pub raw_price_text: String,
    pub relative_link: String,
}

/// A candidate with a parsed price and an absolute link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedRecord {
    pub title: String,
    pub price: u64,
    pub absolute_url: String,
}

/// A record that passed every filter. Never modified after it is accumulated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MatchResult(NormalizedRecord);

impl MatchResult {
    pub fn title(&self) -> &str {
        &self.0.title
    }

    pub fn price(&self) -> u64 {
        self.0.price
    }

    pub fn url(&self) -> &str {
        &self.0.absolute_url
    }

    pub fn record(&self) -> &NormalizedRecord {
        &self.0
    }
}

impl From<NormalizedRecord> for MatchResult {
    fn from(record: NormalizedRecord) -> Self {
        Self(record)
    }
}

/// Matches of one run, in the document order of their listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResultSet {
    matches: Vec<MatchResult>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: MatchResult) {
        self.matches.push(result);
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MatchResult> {
        self.matches.iter()
    }

    pub fn into_vec(self) -> Vec<MatchResult> {
        self.matches
    }
}

impl IntoIterator for ResultSet {
    type Item = MatchResult;
    type IntoIter = std::vec::IntoIter<MatchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a MatchResult;
    type IntoIter = std::slice::Iter<'a, MatchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.iter()
    }
}

/// Why a listing did not make it into the [`ResultSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MissingTitle,
    MissingLink,
    MissingPrice,
    UnparseablePrice,
    Filtered,
}

/// Per-run counters, logged once the run is evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub listings: usize,
    pub matched: usize,
    pub missing_title: usize,
    pub missing_link: usize,
    pub missing_price: usize,
    pub unparseable_price: usize,
    pub filtered: usize,
    pub detail_lookups: usize,
}

impl RunStats {
    pub fn record_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::MissingTitle => self.missing_title += 1,
            DropReason::MissingLink => self.missing_link += 1,
            DropReason::MissingPrice => self.missing_price += 1,
            DropReason::UnparseablePrice => self.unparseable_price += 1,
            DropReason::Filtered => self.filtered += 1,
        }
    }

    pub fn dropped(&self) -> usize {
        self.missing_title
            + self.missing_link
            + self.missing_price
            + self.unparseable_price
            + self.filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, price: u64) -> NormalizedRecord {
        NormalizedRecord {
            title: title.to_string(),
            price,
            absolute_url: format!("https://www.amazon.co.jp/dp/{price}"),
        }
    }

    #[test]
    fn keeps_insertion_order_and_duplicates() {
        let mut results = ResultSet::new();
        results.push(record("LG OLED Curved", 75_000).into());
        results.push(record("MSI OLED 曲面", 60_000).into());
        results.push(record("LG OLED Curved", 75_000).into());

        let prices: Vec<u64> = results.iter().map(MatchResult::price).collect();
        assert_eq!(prices, vec![75_000, 60_000, 75_000]);
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn serializes_as_flat_list() {
        let mut results = ResultSet::new();
        results.push(record("LG OLED Curved", 75_000).into());

        let json = serde_json::to_value(&results).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "title": "LG OLED Curved",
                "price": 75000,
                "absolute_url": "https://www.amazon.co.jp/dp/75000"
            }])
        );
    }

    #[test]
    fn stats_count_drops_by_reason() {
        let mut stats = RunStats::default();
        stats.record_drop(DropReason::MissingLink);
        stats.record_drop(DropReason::UnparseablePrice);
        stats.record_drop(DropReason::Filtered);
        stats.record_drop(DropReason::Filtered);

        assert_eq!(stats.missing_link, 1);
        assert_eq!(stats.filtered, 2);
        assert_eq!(stats.dropped(), 4);
    }
}
