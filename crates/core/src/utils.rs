//! URL and countdown helpers

use chrono::{DateTime, Utc};

/// Hosts accepted as replay sources
const REPLAY_HOSTS: &[&str] = &["everwebinar.com", "webinarjam.com"];

/// Hosts accepted as live sources
const LIVE_HOSTS: &[&str] = &["zoom.us"];

/// Extract a meeting number from a live session URL.
///
/// Tries `/j/<digits>`, then `meeting/<digits>`, then any run of nine or more
/// digits. Returns an empty string when nothing matches.
pub fn extract_meeting_number(url: &str) -> String {
    for marker in ["/j/", "meeting/"] {
        if let Some(pos) = url.find(marker) {
            let digits = leading_digits(&url[pos + marker.len()..]);
            if !digits.is_empty() {
                return digits.to_string();
            }
        }
    }

    let mut rest = url;
    while let Some(start) = rest.find(|c: char| c.is_ascii_digit()) {
        let digits = leading_digits(&rest[start..]);
        if digits.len() >= 9 {
            return digits.to_string();
        }
        rest = &rest[start + digits.len()..];
    }

    String::new()
}

fn leading_digits(s: &str) -> &str {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    &s[..end]
}

/// Split a URL into (scheme, authority) where authority is host[:port]
fn split_authority(url: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = url.split_once("://")?;
    if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.') {
        return None;
    }
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..end];
    let authority = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    if authority.is_empty() {
        return None;
    }
    Some((scheme, authority))
}

/// Host name of a URL, lowercased, without port
pub fn host_of(url: &str) -> Option<String> {
    let (_, authority) = split_authority(url)?;
    let host = match authority.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => authority,
    };
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}

/// Origin (`scheme://host[:port]`) of a URL, lowercased
pub fn origin_of(url: &str) -> Option<String> {
    let (scheme, authority) = split_authority(url)?;
    Some(format!(
        "{}://{}",
        scheme.to_ascii_lowercase(),
        authority.to_ascii_lowercase()
    ))
}

fn host_matches(url: &str, allowed: &[&str]) -> bool {
    host_of(url).is_some_and(|host| allowed.iter().any(|a| host.contains(a)))
}

/// Is this a recognised replay source?
pub fn is_valid_replay_url(url: &str) -> bool {
    host_matches(url, REPLAY_HOSTS)
}

/// Is this a recognised live session source?
pub fn is_valid_live_url(url: &str) -> bool {
    host_matches(url, LIVE_HOSTS)
}

/// Time left until a target instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Countdown {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    /// Total remaining milliseconds (0 once reached)
    pub total_ms: i64,
}

impl Countdown {
    pub fn reached(&self) -> bool {
        self.total_ms == 0
    }

    /// `HH:MM:SS` display
    pub fn display(&self) -> String {
        format!("{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// Countdown from `now` to `target`, clamped at zero
pub fn countdown(now: DateTime<Utc>, target: DateTime<Utc>) -> Countdown {
    let total_ms = (target - now).num_milliseconds();
    if total_ms <= 0 {
        return Countdown::default();
    }
    let total_secs = total_ms / 1000;
    Countdown {
        hours: total_secs / 3600,
        minutes: (total_secs % 3600) / 60,
        seconds: total_secs % 60,
        total_ms,
    }
}

/// Rules:
/// - reached -> "Time has passed"
/// - >= 1 hr -> "1h 15m remaining"
/// - otherwise -> "12m remaining"
pub fn time_remaining_label(now: DateTime<Utc>, target: DateTime<Utc>) -> String {
    let left = countdown(now, target);
    if left.reached() {
        return "Time has passed".to_string();
    }
    if left.hours > 0 {
        format!("{}h {}m remaining", left.hours, left.minutes)
    } else {
        format!("{}m remaining", left.minutes)
    }
}
