//! Follower detection
//!
//! twtxt clients announce themselves in the `User-Agent` they fetch with.
//! Two shapes are recognised:
//!
//! ```text
//! single: <client>/<version> (+<feed-url>; @<nick>)
//! list:   <client>/<version> (~<list-url>; contact=<contact-url>)
//! ```

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// A follower identified from its user agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Follower {
    /// One person following from their own feed
    Single { nick: String, url: String },

    /// A multi-user client following on behalf of a list
    List { list_url: String, contact_url: String },
}

fn single_follower_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^/]+/[^(]+ \(+([^;]+); @([^(]+)\)$").expect("valid follower regex")
    })
}

fn list_follower_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^/]+/[^(]+ \(~([^;]+); contact=([^(]+)\)$").expect("valid list regex")
    })
}

impl Follower {
    /// Classify a user agent, `None` if it is not a twtxt follower
    pub fn parse(user_agent: &str) -> Option<Self> {
        if let Some(caps) = single_follower_regex().captures(user_agent) {
            let url = &caps[1];
            return Some(Follower::Single {
                url: url.strip_prefix('+').unwrap_or(url).to_string(),
                nick: caps[2].to_string(),
            });
        }

        list_follower_regex()
            .captures(user_agent)
            .map(|caps| Follower::List {
                list_url: caps[1].to_string(),
                contact_url: caps[2].to_string(),
            })
    }
}

/// Does this user agent belong to a twtxt follower?
pub fn is_follower_user_agent(user_agent: &str) -> bool {
    single_follower_regex().is_match(user_agent) || list_follower_regex().is_match(user_agent)
}

impl fmt::Display for Follower {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Follower::Single { nick, url } => write!(f, "follower\t{nick}\t{url}"),
            Follower::List {
                list_url,
                contact_url,
            } => write!(f, "list\t{list_url}\t{contact_url}"),
        }
    }
}
