//! Price and link normalization.

use crate::config::WatchConfig;
use crate::models::{CandidateRecord, NormalizedRecord};

#[derive(Debug, Clone)]
pub struct Normalizer {
    origin: String,
    decorations: Vec<String>,
}

impl Normalizer {
    pub fn new(origin: impl Into<String>, decorations: Vec<String>) -> Self {
        Self {
            origin: origin.into(),
            decorations: decorations.into_iter().filter(|d| !d.is_empty()).collect(),
        }
    }

    pub fn from_config(config: &WatchConfig) -> Self {
        Self::new(config.origin.clone(), config.price_decorations.clone())
    }

    /// Strip every decoration token and parse what is left.
    ///
    /// Tokens are literal substrings, so `"中古品 ￥9,800 より"` becomes
    /// `9800`. Anything that is not a plain integer afterwards yields `None`.
    pub fn normalize_price(&self, raw: &str) -> Option<u64> {
        let mut text = raw.to_string();
        for token in &self.decorations {
            text = text.replace(token.as_str(), "");
        }
        text.trim().parse().ok()
    }

    pub fn normalize(&self, candidate: CandidateRecord) -> Option<NormalizedRecord> {
        let price = self.normalize_price(&candidate.raw_price_text)?;
        Some(NormalizedRecord {
            title: candidate.title,
            price,
            absolute_url: resolve_link(&self.origin, &candidate.relative_link),
        })
    }

    pub fn resolve(&self, link: &str) -> String {
        resolve_link(&self.origin, link)
    }
}

/// Prepend the marketplace origin to a listing link.
pub fn resolve_link(origin: &str, link: &str) -> String {
    let link = link.trim();
    if link.starts_with("http://") || link.starts_with("https://") {
        link.to_string()
    } else if let Some(rest) = link.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        format!(
            "{}/{}",
            origin.trim_end_matches('/'),
            link.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn normalizer() -> Normalizer {
        Normalizer::from_config(&WatchConfig::default())
    }

    #[rstest]
    #[case("￥12,345", Some(12_345))]
    #[case("中古品 ￥9,800 より", Some(9_800))]
    #[case("¥75,000", Some(75_000))]
    #[case("  ￥ 80,000  ", Some(80_000))]
    #[case("新品 ￥1,234,567", Some(1_234_567))]
    #[case("9800円", Some(9_800))]
    #[case("￥0", Some(0))]
    #[case("お問い合わせ", None)]
    #[case("", None)]
    #[case("￥12.5", None)]
    #[case("-￥500", None)]
    #[case("￥9,800 - ￥12,000", None)]
    fn normalizes_price_text(#[case] raw: &str, #[case] expected: Option<u64>) {
        assert_eq!(normalizer().normalize_price(raw), expected);
    }

    #[test]
    fn decorations_are_configurable() {
        let normalizer = Normalizer::new("https://example.com", vec!["$".into(), ",".into()]);
        assert_eq!(normalizer.normalize_price("$1,299"), Some(1_299));
        // the yen sign is not a decoration here
        assert_eq!(normalizer.normalize_price("￥1,299"), None);
    }

    #[test]
    fn empty_decoration_tokens_are_ignored() {
        let normalizer = Normalizer::new("https://example.com", vec![String::new(), ",".into()]);
        assert_eq!(normalizer.normalize_price("1,299"), Some(1_299));
    }

    #[rstest]
    #[case("/dp/B0C1234567", "https://www.amazon.co.jp/dp/B0C1234567")]
    #[case("dp/B0C1234567", "https://www.amazon.co.jp/dp/B0C1234567")]
    #[case(
        "/sspa/click?ie=UTF8&url=%2Fdp%2FB0C",
        "https://www.amazon.co.jp/sspa/click?ie=UTF8&url=%2Fdp%2FB0C"
    )]
    #[case("https://www.amazon.co.jp/dp/B0C", "https://www.amazon.co.jp/dp/B0C")]
    #[case("//www.amazon.co.jp/dp/B0C", "https://www.amazon.co.jp/dp/B0C")]
    fn resolves_links(#[case] link: &str, #[case] expected: &str) {
        assert_eq!(resolve_link("https://www.amazon.co.jp", link), expected);
        assert_eq!(resolve_link("https://www.amazon.co.jp/", link), expected);
    }

    #[test]
    fn unparseable_candidate_is_dropped() {
        let candidate = CandidateRecord {
            title: "LG UltraGear OLED Curved".into(),
            raw_price_text: "お問い合わせ".into(),
            relative_link: "/dp/B0C".into(),
        };
        assert_eq!(normalizer().normalize(candidate), None);
    }

    #[test]
    fn normalizes_candidate() {
        let candidate = CandidateRecord {
            title: "LG UltraGear OLED Curved".into(),
            raw_price_text: "中古品 ￥75,000 より".into(),
            relative_link: "/dp/B0C".into(),
        };
        assert_eq!(
            normalizer().normalize(candidate),
            Some(NormalizedRecord {
                title: "LG UltraGear OLED Curved".into(),
                price: 75_000,
                absolute_url: "https://www.amazon.co.jp/dp/B0C".into(),
            })
        );
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(raw in "\\PC{0,24}") {
            let normalizer = normalizer();
            prop_assert_eq!(normalizer.normalize_price(&raw), normalizer.normalize_price(&raw));
        }
    }
}
