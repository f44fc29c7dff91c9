/// Payment link detection in agent replies
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Domain the agent uses for generated payment links
pub const DEFAULT_LINK_DOMAIN: &str = "seimoney.link";

/// URL-like substrings: explicit scheme, `www.` prefix, or a bare host with optional path
static URL_REGEX: OnceLock<Regex> = OnceLock::new();

/// Punctuation that ends a sentence rather than a URL
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '\''];

fn url_regex() -> &'static Regex {
    URL_REGEX.get_or_init(|| {
        Regex::new(
            r#"(?xi)
            (?:
                https?://[^\s<>"]+
                |
                www\.[^\s<>"]+
                |
                (?:[a-z0-9][a-z0-9-]*\.)+[a-z]{2,}(?:/[^\s<>"]*)?
            )
            "#,
        )
        .expect("Failed to compile URL regex")
    })
}

/// Finds the first link pointing at the configured payment-link domain.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    domain: String,
}

impl Default for LinkExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_LINK_DOMAIN)
    }
}

impl LinkExtractor {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.trim().to_ascii_lowercase(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Every URL-like substring in `text`, in order, with trailing prose punctuation removed.
    pub fn candidates<'a>(&self, text: &'a str) -> Vec<&'a str> {
        url_regex()
            .find_iter(text)
            .map(|m| m.as_str().trim_end_matches(TRAILING_PUNCTUATION))
            .filter(|candidate| !candidate.is_empty())
            .collect()
    }

    /// Return the first candidate whose host is the payment-link domain or a
    /// subdomain of it, with an `https://` scheme added when the text had none.
    /// Links on any other host are never returned, even when the domain shows
    /// up in their path or query.
    pub fn extract(&self, text: &str) -> Option<String> {
        if self.domain.is_empty() {
            return None;
        }

        self.candidates(text)
            .into_iter()
            .map(normalize)
            .find(|link| self.is_on_domain(link))
    }

    /// The host must be the domain itself or one of its subdomains
    fn is_on_domain(&self, link: &str) -> bool {
        let Ok(url) = Url::parse(link) else {
            return false;
        };
        match url.host_str() {
            Some(host) => {
                let host = host.trim_end_matches('.').to_ascii_lowercase();
                host == self.domain
                    || host
                        .strip_suffix(self.domain.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }
            None => false,
        }
    }
}

/// Extract a payment link using the default domain
pub fn extract_payment_link(text: &str) -> Option<String> {
    LinkExtractor::default().extract(text)
}

fn normalize(candidate: &str) -> String {
    let lower = candidate.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        candidate.to_string()
    } else {
        format!("https://{}", candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_links() {
        assert_eq!(extract_payment_link("no links in here at all"), None);
        assert_eq!(extract_payment_link(""), None);
    }

    #[test]
    fn test_www_link_is_normalized() {
        assert_eq!(
            extract_payment_link("visit www.seimoney.link/pay/abc now"),
            Some("https://www.seimoney.link/pay/abc".to_string())
        );
    }

    #[test]
    fn test_other_domain_is_rejected() {
        assert_eq!(extract_payment_link("see https://example.com for info"), None);
    }

    #[test]
    fn test_marketing_link_among_others() {
        let text = "Docs at https://docs.sei.io/guide, your link: https://seimoney.link/pay/42 and www.google.com";
        assert_eq!(
            extract_payment_link(text),
            Some("https://seimoney.link/pay/42".to_string())
        );
    }

    #[test]
    fn test_first_of_many_marketing_links() {
        let text = "https://seimoney.link/pay/first then https://seimoney.link/pay/second";
        assert_eq!(
            extract_payment_link(text),
            Some("https://seimoney.link/pay/first".to_string())
        );
    }

    #[test]
    fn test_trailing_punctuation_is_trimmed() {
        assert_eq!(
            extract_payment_link("Here it is: https://seimoney.link/pay/abc."),
            Some("https://seimoney.link/pay/abc".to_string())
        );
        assert_eq!(
            extract_payment_link("(open https://seimoney.link/pay/abc)"),
            Some("https://seimoney.link/pay/abc".to_string())
        );
    }

    #[test]
    fn test_domain_match_is_case_insensitive() {
        assert_eq!(
            extract_payment_link("HTTPS://SeiMoney.Link/Pay/XYZ"),
            Some("HTTPS://SeiMoney.Link/Pay/XYZ".to_string())
        );
    }

    #[test]
    fn test_bare_domain_gets_scheme() {
        assert_eq!(
            extract_payment_link("go to pay.seimoney.link/abc"),
            Some("https://pay.seimoney.link/abc".to_string())
        );
    }

    #[test]
    fn test_link_inside_markup() {
        let html = r#"<p>Your link: <a href="https://seimoney.link/pay/7">https://seimoney.link/pay/7</a></p>"#;
        assert_eq!(
            extract_payment_link(html),
            Some("https://seimoney.link/pay/7".to_string())
        );
    }

    #[test]
    fn test_custom_domain() {
        let extractor = LinkExtractor::new("Pay.Example.org");
        assert_eq!(extractor.domain(), "pay.example.org");
        assert_eq!(
            extractor.extract("https://seimoney.link/x and https://pay.example.org/y"),
            Some("https://pay.example.org/y".to_string())
        );
    }

    #[test]
    fn test_candidates_keep_order() {
        let extractor = LinkExtractor::default();
        assert_eq!(
            extractor.candidates("a https://one.com, b www.two.org; c three.net/x"),
            vec!["https://one.com", "www.two.org", "three.net/x"]
        );
    }

    #[test]
    fn test_domain_in_query_is_rejected() {
        assert_eq!(
            extract_payment_link("click https://evil.example/phish?ref=seimoney.link now"),
            None
        );
    }

    #[test]
    fn test_lookalike_host_is_rejected() {
        assert_eq!(
            extract_payment_link("https://seimoney.link.evil.example/pay/1"),
            None
        );
        assert_eq!(extract_payment_link("https://notseimoney.link/pay/1"), None);
    }

    #[test]
    fn test_lookalike_is_skipped_for_real_link() {
        let text = "https://evil.example/?u=seimoney.link then https://seimoney.link/pay/9";
        assert_eq!(
            extract_payment_link(text),
            Some("https://seimoney.link/pay/9".to_string())
        );
    }

    #[test]
    fn test_userinfo_does_not_count_as_host() {
        assert_eq!(extract_payment_link("https://seimoney.link@evil.example/pay"), None);
    }
}
