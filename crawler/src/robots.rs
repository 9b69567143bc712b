//! Minimal robots.txt support: the `*` group's Allow/Disallow rules and Crawl-delay.

use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsRules {
    allows: Vec<String>,
    disallows: Vec<String>,
    pub crawl_delay: Option<Duration>,
}

impl RobotsRules {
    /// Rules for the wildcard agent. Missing or unreadable files allow everything.
    pub fn parse(txt: &str) -> Self {
        let mut active = false;
        let mut rules = RobotsRules::default();
        for line in txt.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else { continue };
            let value = value.trim();
            match key.trim().to_lowercase().as_str() {
                "user-agent" => active = value == "*",
                "allow" if active && !value.is_empty() => rules.allows.push(value.to_string()),
                // an empty Disallow means "allow all"
                "disallow" if active && !value.is_empty() => rules.disallows.push(value.to_string()),
                "crawl-delay" if active => {
                    if let Ok(secs) = value.parse::<f64>() {
                        if secs.is_finite() && secs >= 0.0 {
                            rules.crawl_delay = Some(Duration::from_secs_f64(secs));
                        }
                    }
                }
                _ => {}
            }
        }
        rules
    }

    /// Longest matching prefix wins; Allow wins a tie.
    pub fn allows(&self, path: &str) -> bool {
        let longest = |rules: &[String]| rules.iter().filter(|r| path.starts_with(r.as_str())).map(String::len).max();
        match (longest(&self.allows), longest(&self.disallows)) {
            (Some(a), Some(d)) => a >= d,
            (_, None) => true,
            (None, Some(_)) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROBOTS: &str = "
        User-agent: googlebot
        Disallow: /

        User-agent: *
        Disallow: /private
        Allow: /private/open   # public subtree
        Disallow:
        Crawl-delay: 1.5
    ";

    #[test]
    fn only_wildcard_group_applies() {
        let rules = RobotsRules::parse(ROBOTS);
        assert!(rules.allows("/"));
        assert!(rules.allows("/courses"));
        assert!(!rules.allows("/private/notes"));
        assert!(rules.allows("/private/open/file"));
        assert_eq!(rules.crawl_delay, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn empty_file_allows_everything() {
        assert!(RobotsRules::parse("").allows("/anything"));
    }
}
