//! Source classification from URL domains

use crate::config::ScorerConfig;
use thirdeye_domain::SourceType;

/// Host name of a URL, lower-cased; `None` if the URL does not parse or has no host
pub fn extract_domain(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url.trim()).ok()?;
    parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
}

/// Classifies domains into source types with a base score
#[derive(Debug, Clone)]
pub struct DomainClassifier {
    academic_repositories: Vec<String>,
    journalism_domains: Vec<String>,
    social_domains: Vec<String>,
}

impl DomainClassifier {
    /// Build a classifier from the scorer vocabularies
    pub fn new(config: &ScorerConfig) -> Self {
        Self {
            academic_repositories: config.academic_repositories.clone(),
            journalism_domains: config.journalism_domains.clone(),
            social_domains: config.social_domains.clone(),
        }
    }

    /// Source type and base score, first matching rule wins
    ///
    /// `.gov` 85, `.edu` 80, academic repository 85, journalism 75,
    /// social media 30, anything else blog 40.
    pub fn classify(&self, domain: &str) -> (SourceType, u8) {
        let domain = domain.to_lowercase();
        let contains_any = |list: &[String]| list.iter().any(|d| domain.contains(d.as_str()));

        if domain.ends_with(".gov") {
            (SourceType::Government, 85)
        } else if domain.ends_with(".edu") {
            (SourceType::Academic, 80)
        } else if contains_any(&self.academic_repositories) {
            (SourceType::Academic, 85)
        } else if contains_any(&self.journalism_domains) {
            (SourceType::Journalism, 75)
        } else if contains_any(&self.social_domains) {
            (SourceType::SocialMedia, 30)
        } else {
            (SourceType::Blog, 40)
        }
    }

    /// Classification of a possibly-missing domain; `None` degrades to blog
    pub fn classify_opt(&self, domain: Option<&str>) -> (SourceType, u8) {
        domain
            .map(|d| self.classify(d))
            .unwrap_or((SourceType::Blog, 40))
    }
}

impl Default for DomainClassifier {
    fn default() -> Self {
        Self::new(&ScorerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_domain() {
        assert_eq!(extract_domain("https://www.CIA.gov/readingroom").as_deref(), Some("www.cia.gov"));
        assert_eq!(extract_domain("not a url"), None);
        assert_eq!(extract_domain(""), None);
        assert_eq!(extract_domain("mailto:someone@example.com"), None);
    }

    #[test]
    fn test_classification_priority() {
        let c = DomainClassifier::default();
        assert_eq!(c.classify("vault.fbi.gov"), (SourceType::Government, 85));
        assert_eq!(c.classify("mit.edu"), (SourceType::Academic, 80));
        assert_eq!(c.classify("arxiv.org"), (SourceType::Academic, 85));
        assert_eq!(c.classify("pubmed.ncbi.nlm.nih.gov"), (SourceType::Government, 85));
        assert_eq!(c.classify("www.reuters.com"), (SourceType::Journalism, 75));
        assert_eq!(c.classify("old.reddit.com"), (SourceType::SocialMedia, 30));
        assert_eq!(c.classify("truth-seekers.blog"), (SourceType::Blog, 40));
    }

    #[test]
    fn test_missing_domain_is_blog() {
        let c = DomainClassifier::default();
        assert_eq!(c.classify_opt(None), (SourceType::Blog, 40));
    }
}
